//! Link and wait settings.
//!
//! There is no configuration file: the board is found at connect time and
//! every knob has a default matching the micro:bit's USB serial interface.

use std::time::Duration;

/// USB vendor id of the micro:bit's interface chip (3368).
pub const MICROBIT_VID: u16 = 0x0d28;
/// USB product id of the micro:bit's interface chip (516).
pub const MICROBIT_PID: u16 = 0x0204;
/// Serial speed of the MicroPython REPL.
pub const BAUD_RATE: u32 = 115_200;
/// How often a pending reply is polled.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Time the board gets to settle after an interrupt before buffers are cleared.
pub const SETTLE_DELAY: Duration = Duration::from_millis(100);

/// How to find and open the board.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct LinkConfig {
    /// Explicit port path; skips USB discovery when set.
    pub port: Option<String>,
    /// USB vendor id to match.
    pub vid: u16,
    /// USB product id to match.
    pub pid: u16,
    /// Serial speed.
    pub baud_rate: u32,
    /// Limit on the raw-REPL handshake; `None` waits forever.
    pub handshake_timeout: Option<Duration>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: None,
            vid: MICROBIT_VID,
            pid: MICROBIT_PID,
            baud_rate: BAUD_RATE,
            handshake_timeout: None,
        }
    }
}

impl LinkConfig {
    /// Uses `port` instead of discovering one.
    #[must_use]
    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    /// Matches a different USB vendor/product pair.
    #[must_use]
    pub const fn with_signature(mut self, vid: u16, pid: u16) -> Self {
        self.vid = vid;
        self.pid = pid;
        self
    }

    /// Sets the serial speed.
    #[must_use]
    pub const fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Bounds the raw-REPL handshake.
    #[must_use]
    pub const fn with_handshake_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.handshake_timeout = timeout;
        self
    }
}

/// How a submission waits for its reply.
///
/// By default there is no deadline: a board that never prints the
/// terminator blocks the caller until it is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct WaitOptions {
    /// Delay between drains of the serial buffer.
    pub poll_interval: Duration,
    /// Optional deadline, after which the board is interrupted.
    pub timeout: Option<Duration>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
            timeout: None,
        }
    }
}

impl WaitOptions {
    /// Sets the poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets or clears the reply deadline.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}
