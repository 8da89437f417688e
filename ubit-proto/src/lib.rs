//! Raw-REPL wire protocol for MicroPython boards.
//!
//! The raw REPL has no length prefix: code goes out as
//! `ETX <utf8 code> EOT`, and the reply is a byte stream that must be
//! scanned for the `EOT '>'` terminator before it can be split into
//! stdout and stderr. This crate holds that framing, the reply parser,
//! the snippets of remote Python the host sends, and a restricted parser
//! for the list literals the board prints back. It does no I/O of its own
//! beyond writing frames into any [`std::io::Write`].

mod frame;
pub mod literal;
mod reply;
pub mod script;

pub use frame::{
    ENTER_RAW_REPL, EOT, ETX, INTERRUPT, OK_MARKER, PROMPT, RAW_REPL_BANNER, RAW_REPL_PROMPT,
    REPLY_TERMINATOR, SOH, encode_submit, is_complete, submit,
};
pub use literal::{LiteralError, parse_str_list};
pub use reply::{NOT_OK, Reply, ReplyStatus};
