//! Control bytes and submit framing.
//!
//! A submission is: `[ETX][utf8 code][EOT]`. The board answers with
//! `OK <stdout> [EOT <stderr>] EOT '>'`.

use std::io::{self, Write};

/// Ctrl-C: interrupts running code and clears the pending input line.
pub const ETX: u8 = 0x03;
/// Ctrl-A: switches the board into raw-REPL mode.
pub const SOH: u8 = 0x01;
/// Ctrl-D: ends a submission, and separates stdout from stderr in replies.
pub const EOT: u8 = 0x04;
/// Raw-REPL prompt character.
pub const PROMPT: u8 = b'>';

/// Bytes written on open to enter raw-REPL mode.
pub const ENTER_RAW_REPL: [u8; 2] = [ETX, SOH];
/// A lone interrupt, used to abort whatever the board is running.
pub const INTERRUPT: [u8; 1] = [ETX];
/// Every complete reply ends with these two bytes.
pub const REPLY_TERMINATOR: [u8; 2] = [EOT, PROMPT];
/// Every well-formed reply starts with these two bytes.
pub const OK_MARKER: &[u8; 2] = b"OK";
/// Acknowledgment the board prints after switching to raw-REPL mode.
pub const RAW_REPL_BANNER: &[u8] = b"raw REPL";
/// Prompt line that follows the banner.
pub const RAW_REPL_PROMPT: &[u8] = b"\r\n>";

/// Wraps `code` in submit framing.
pub fn encode_submit(code: &str) -> Vec<u8> {
    let mut frame = Vec::with_capacity(code.len() + 2);
    frame.push(ETX);
    frame.extend_from_slice(code.as_bytes());
    frame.push(EOT);
    frame
}

/// Writes a framed submission of `code` to `w` and flushes.
pub fn submit<W: Write + ?Sized>(w: &mut W, code: &str) -> io::Result<()> {
    w.write_all(&encode_submit(code))?;
    w.flush()
}

/// Returns `true` once `buf` holds a whole reply.
///
/// The raw REPL never length-prefixes its output, so completeness is
/// decided purely by the trailing terminator.
pub fn is_complete(buf: &[u8]) -> bool {
    buf.ends_with(&REPLY_TERMINATOR)
}
