//! Parsing of raw-REPL replies.

use serde::{Deserialize, Serialize};

use crate::frame::{EOT, OK_MARKER};

/// Error text reported for replies that do not start with `OK`.
pub const NOT_OK: &str = "something is not ok";

/// Whether the board acknowledged the submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum ReplyStatus {
    /// The reply started with `OK`.
    Ok,
    /// The reply did not start with `OK`; output was discarded.
    Malformed,
}

/// A decoded reply to one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Reply {
    /// Whether the reply was well-formed.
    pub status: ReplyStatus,
    /// Text the code printed.
    pub stdout: String,
    /// Traceback text, or [`NOT_OK`] for malformed replies.
    pub stderr: String,
}

impl Reply {
    /// Parses a reply buffer, best-effort.
    ///
    /// `OK <stdout> EOT <stderr> EOT '>'` yields both halves. Without an
    /// inner `EOT` everything between the marker and the terminator is
    /// stdout. Anything not starting with `OK` becomes a [`NOT_OK`] error.
    /// Invalid UTF-8 is replaced rather than rejected, so partial buffers
    /// left behind by an interrupt still decode.
    pub fn parse(buf: &[u8]) -> Self {
        if !buf.starts_with(OK_MARKER) {
            return Self::malformed();
        }
        // Strip the marker and the two terminator bytes. Short buffers
        // leave nothing behind.
        let body = buf
            .get(OK_MARKER.len()..buf.len().saturating_sub(2))
            .unwrap_or_default();
        let (out, err) = match body.iter().position(|&b| b == EOT) {
            Some(i) => (&body[..i], &body[i + 1..]),
            None => (body, &[][..]),
        };
        Self {
            status: ReplyStatus::Ok,
            stdout: String::from_utf8_lossy(out).into_owned(),
            stderr: String::from_utf8_lossy(err).into_owned(),
        }
    }

    /// The reply reported for anything not starting with `OK`.
    pub fn malformed() -> Self {
        Self {
            status: ReplyStatus::Malformed,
            stdout: String::new(),
            stderr: NOT_OK.to_owned(),
        }
    }

    /// Returns `true` if the reply was well-formed.
    pub fn is_ok(&self) -> bool {
        self.status == ReplyStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_stdout_and_stderr() {
        let r = Reply::parse(b"OKhello\n\x04Traceback\n\x04>");
        assert_eq!(r.status, ReplyStatus::Ok);
        assert_eq!(r.stdout, "hello\n");
        assert_eq!(r.stderr, "Traceback\n");
    }

    #[test]
    fn parse_recovers_both_halves() {
        let cases = [
            ("", ""),
            ("2\n", ""),
            ("", "NameError: name 'x' isn't defined\n"),
            ("a\r\nb\r\n", "err > with prompt char"),
        ];
        for (out, err) in cases {
            let mut buf = b"OK".to_vec();
            buf.extend_from_slice(out.as_bytes());
            buf.push(EOT);
            buf.extend_from_slice(err.as_bytes());
            buf.extend_from_slice(b"\x04>");
            let r = Reply::parse(&buf);
            assert_eq!((r.stdout.as_str(), r.stderr.as_str()), (out, err));
        }
    }

    #[test]
    fn parse_without_separator_is_all_stdout() {
        let r = Reply::parse(b"OKhello\x04>");
        assert!(r.is_ok());
        assert_eq!(r.stdout, "hello");
        assert_eq!(r.stderr, "");
    }

    #[test]
    fn parse_splits_on_first_separator_only() {
        let r = Reply::parse(b"OKout\x04err\x04more\x04>");
        assert_eq!(r.stdout, "out");
        assert_eq!(r.stderr, "err\x04more");
    }

    #[test]
    fn parse_not_ok() {
        let r = Reply::parse(b"ERRbad");
        assert_eq!(r.status, ReplyStatus::Malformed);
        assert_eq!(r.stdout, "");
        assert_eq!(r.stderr, NOT_OK);
        assert_eq!(Reply::parse(b""), Reply::malformed());
    }

    #[test]
    fn parse_short_buffers() {
        let r = Reply::parse(b"OK");
        assert!(r.is_ok());
        assert_eq!((r.stdout.as_str(), r.stderr.as_str()), ("", ""));
        let r = Reply::parse(b"OKx");
        assert_eq!((r.stdout.as_str(), r.stderr.as_str()), ("", ""));
    }

    #[test]
    fn parse_replaces_invalid_utf8() {
        let r = Reply::parse(b"OKa\xffb\x04\x04>");
        assert_eq!(r.stdout, "a\u{fffd}b");
        assert_eq!(r.stderr, "");
    }
}
