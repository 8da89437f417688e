//! Error types for ubit operations.

/// Alias for `Result<T, ubit::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by link, manager, and session operations.
///
/// Malformed, interrupted, and timed-out replies are not errors: they come
/// back as an [`ExecOutput`](crate::ExecOutput) with a non-`Ok` status.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No serial port carries the expected USB vendor/product ids.
    #[error("no serial port matches USB id {vid:04x}:{pid:04x}; is the micro:bit plugged in?")]
    DeviceNotFound {
        /// Expected USB vendor id.
        vid: u16,
        /// Expected USB product id.
        pid: u16,
    },

    /// The board did not reach the raw-REPL prompt.
    #[error("raw REPL handshake failed: {0}")]
    Handshake(String),

    /// Another thread panicked while holding the link.
    #[error("serial link lock poisoned")]
    LinkPoisoned,

    /// Introspection output was not a list of strings.
    #[error("unexpected introspection output: {0}")]
    Literal(#[from] ubit_proto::LiteralError),

    /// Port enumeration or configuration failed.
    #[error(transparent)]
    Serial(#[from] serialport::Error),

    /// An I/O error on the serial link.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
