//! Bridge notebook-style sessions to MicroPython on a BBC micro:bit.
//!
//! `ubit` finds the board on USB serial, switches it to raw-REPL mode,
//! and runs code fragments on it, returning what they printed on stdout
//! and stderr. Several sessions can share one board; each keeps its own
//! variables.
//!
//! # Quick start
//!
//! ```no_run
//! use ubit::{ConnectionManager, LinkConfig, Session};
//!
//! let mut manager = ConnectionManager::serial(LinkConfig::default());
//! let mut session = Session::new(manager.acquire().expect("no micro:bit found"));
//!
//! let out = session.execute("print(1 + 1)").expect("serial error");
//! assert_eq!(out.stdout, "2\r\n");
//!
//! session.shutdown(&mut manager, false).expect("serial error");
//! ```
//!
//! Replies are awaited without a deadline unless
//! [`WaitOptions::timeout`] is set: a board that never finishes blocks the
//! caller until the session's [`CancelToken`] is cancelled.

pub mod adapter;
mod cancel;
pub mod complete;
mod config;
mod error;
pub mod info;
mod link;
mod manager;
mod scope;
mod session;

pub use cancel::CancelToken;
pub use complete::Completion;
pub use config::{
    BAUD_RATE, LinkConfig, MICROBIT_PID, MICROBIT_VID, POLL_INTERVAL, SETTLE_DELAY, WaitOptions,
};
pub use error::{Error, Result};
pub use link::{Connector, Link, Port, PortInfo, SerialConnector, list_ports, locate};
pub use manager::{ConnectionManager, LinkHandle, Shared};
pub use scope::{Scope, SessionId};
pub use session::{ExecOutput, Session, Status};
pub use ubit_proto::{Reply, ReplyStatus};
