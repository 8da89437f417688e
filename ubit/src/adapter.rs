//! One round trip over the link: submit, wait for the terminator, parse.
//!
//! Only one submission may be in flight on a link. Callers serialize
//! through the [`LinkHandle`](crate::LinkHandle) lock; nothing here
//! queues or interleaves.

use std::thread;
use std::time::Instant;

use tracing::{debug, warn};
use ubit_proto::Reply;

use crate::cancel::CancelToken;
use crate::config::{SETTLE_DELAY, WaitOptions};
use crate::link::Link;
use crate::Result;

/// Why a wait stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Ended {
    /// The reply terminator arrived.
    Complete,
    /// The caller cancelled.
    Interrupted,
    /// The configured deadline passed.
    TimedOut,
}

/// Bytes gathered by [`await_reply`].
#[derive(Debug)]
#[non_exhaustive]
pub struct Collected {
    /// Everything read, terminator included when complete.
    pub bytes: Vec<u8>,
    /// Why the wait stopped.
    pub ended: Ended,
}

/// A parsed reply and how the wait for it ended.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Outcome {
    /// The parsed (possibly partial) reply.
    pub reply: Reply,
    /// Why the wait stopped.
    pub ended: Ended,
}

/// Frames `code` and writes it to the board.
pub fn submit(link: &mut Link, code: &str) -> Result<()> {
    link.submit(code)
}

/// Collects the reply to the last submission.
///
/// Every poll interval the serial buffer is drained into an accumulating
/// buffer, until the buffer ends with `EOT '>'`. Without a
/// [`WaitOptions::timeout`] a board that never terminates blocks here until
/// `cancel` fires. On cancellation or timeout the board is interrupted,
/// given [`SETTLE_DELAY`] to stop, and both buffers are cleared; whatever
/// was gathered so far is returned.
pub fn await_reply(link: &mut Link, opts: &WaitOptions, cancel: &CancelToken) -> Result<Collected> {
    let deadline = opts.timeout.map(|t| Instant::now() + t);
    let mut bytes = Vec::new();
    loop {
        if cancel.wait_timeout(opts.poll_interval) {
            return abort(link, bytes, Ended::Interrupted);
        }
        bytes.extend(link.read_available()?);
        if ubit_proto::is_complete(&bytes) {
            debug!(bytes = bytes.len(), "reply complete");
            return Ok(Collected {
                bytes,
                ended: Ended::Complete,
            });
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return abort(link, bytes, Ended::TimedOut);
        }
    }
}

/// Submits `code`, waits for the reply, and parses it.
///
/// Re-arms `cancel` first, so an interrupt left over from an earlier
/// submission does not abort this one.
pub fn run_code(
    link: &mut Link,
    code: &str,
    opts: &WaitOptions,
    cancel: &CancelToken,
) -> Result<Outcome> {
    cancel.reset();
    submit(link, code)?;
    let collected = await_reply(link, opts, cancel)?;
    let reply = Reply::parse(&collected.bytes);
    if !reply.is_ok() && collected.ended == Ended::Complete {
        warn!(bytes = collected.bytes.len(), "reply did not start with OK");
    }
    Ok(Outcome {
        reply,
        ended: collected.ended,
    })
}

/// Stops the running code and resets the link.
fn abort(link: &mut Link, bytes: Vec<u8>, ended: Ended) -> Result<Collected> {
    warn!(?ended, partial = bytes.len(), port = link.name(), "interrupting board");
    link.interrupt()?;
    thread::sleep(SETTLE_DELAY);
    link.reset_buffers()?;
    Ok(Collected { bytes, ended })
}
