//! Device link: finds the board, opens it, and enters raw-REPL mode.
//!
//! Everything above this module talks to the board through [`Link`],
//! which only knows how to move bytes. [`Port`] is the seam between the
//! link and the physical serial port, so tests can plug in a scripted
//! board instead.

use std::fmt;
use std::io::{self, Read, Write};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use serialport::{
    ClearBuffer, DataBits, Parity, SerialPort, SerialPortInfo, SerialPortType, StopBits,
};
use tracing::{debug, info};
use ubit_proto::{ENTER_RAW_REPL, INTERRUPT, RAW_REPL_BANNER, RAW_REPL_PROMPT};

use crate::config::LinkConfig;
use crate::{Error, Result};

/// Read timeout set on the serial port. Reads only ever ask for bytes
/// already buffered, so this just bounds a misbehaving driver.
const PORT_TIMEOUT: Duration = Duration::from_millis(100);
/// Poll interval while waiting for the raw-REPL handshake.
const HANDSHAKE_POLL: Duration = Duration::from_millis(10);

/// A byte stream to the board.
pub trait Port: Read + Write + Send {
    /// Number of bytes that can be read without blocking.
    fn bytes_to_read(&self) -> io::Result<usize>;

    /// Discards everything buffered in both directions.
    fn clear_buffers(&self) -> io::Result<()>;
}

impl Port for Box<dyn SerialPort> {
    fn bytes_to_read(&self) -> io::Result<usize> {
        let n = SerialPort::bytes_to_read(&**self)?;
        Ok(usize::try_from(n).unwrap_or(usize::MAX))
    }

    fn clear_buffers(&self) -> io::Result<()> {
        Ok(SerialPort::clear(&**self, ClearBuffer::All)?)
    }
}

/// An open connection to a board in raw-REPL mode.
pub struct Link {
    /// Underlying byte stream.
    port: Box<dyn Port>,
    /// Port path, for logging.
    name: String,
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link").field("name", &self.name).finish_non_exhaustive()
    }
}

impl Link {
    /// Locates and opens the board described by `config`.
    pub fn open(config: &LinkConfig) -> Result<Self> {
        let path = locate(config)?;
        let port = serialport::new(&path, config.baud_rate)
            .parity(Parity::None)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .timeout(PORT_TIMEOUT)
            .open()?;
        info!(port = %path, baud = config.baud_rate, "serial port opened");
        Self::establish(Box::new(port), path, config.handshake_timeout)
    }

    /// Wraps an already-open port and switches the board to raw-REPL mode.
    pub fn establish(
        port: Box<dyn Port>,
        name: impl Into<String>,
        handshake_timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut link = Self {
            port,
            name: name.into(),
        };
        link.enter_raw_repl(handshake_timeout)?;
        Ok(link)
    }

    /// Port path this link was opened on.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Interrupts whatever is running, switches to raw REPL, and waits for
    /// the banner and then the prompt.
    fn enter_raw_repl(&mut self, timeout: Option<Duration>) -> Result<()> {
        let deadline = timeout.map(|t| Instant::now() + t);
        self.write_all(&ENTER_RAW_REPL)?;

        let mut buf = Vec::new();
        let after_banner = self.read_until(&mut buf, 0, RAW_REPL_BANNER, deadline)?;
        self.read_until(&mut buf, after_banner, RAW_REPL_PROMPT, deadline)?;
        info!(port = %self.name, "entered raw REPL");
        Ok(())
    }

    /// Reads into `buf` until `needle` appears at or after `from`.
    /// Returns the offset just past the match.
    fn read_until(
        &mut self,
        buf: &mut Vec<u8>,
        from: usize,
        needle: &[u8],
        deadline: Option<Instant>,
    ) -> Result<usize> {
        loop {
            if let Some(i) = find(&buf[from..], needle) {
                return Ok(from + i + needle.len());
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(Error::Handshake(format!(
                    "timed out waiting for {:?}; got {:?}",
                    String::from_utf8_lossy(needle),
                    String::from_utf8_lossy(buf),
                )));
            }
            let chunk = self.read_available()?;
            if chunk.is_empty() {
                thread::sleep(HANDSHAKE_POLL);
            }
            buf.extend(chunk);
        }
    }

    /// Writes `bytes` and flushes.
    pub fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        debug!(port = %self.name, bytes = bytes.len(), "write");
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }

    /// Sends `code` in submit framing.
    pub fn submit(&mut self, code: &str) -> Result<()> {
        debug!(port = %self.name, bytes = code.len() + 2, "submit");
        ubit_proto::submit(self.port.as_mut(), code)?;
        Ok(())
    }

    /// Drains whatever the board has sent so far. Never blocks.
    pub fn read_available(&mut self) -> Result<Vec<u8>> {
        let n = self.port.bytes_to_read()?;
        if n == 0 {
            return Ok(Vec::new());
        }
        let mut buf = vec![0u8; n];
        let read = match self.port.read(&mut buf) {
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => 0,
            Err(e) => return Err(e.into()),
        };
        buf.truncate(read);
        debug!(port = %self.name, bytes = read, "read");
        Ok(buf)
    }

    /// Sends a lone interrupt byte.
    pub fn interrupt(&mut self) -> Result<()> {
        self.write_all(&INTERRUPT)
    }

    /// Discards everything buffered in both directions.
    pub fn reset_buffers(&mut self) -> Result<()> {
        self.port.clear_buffers()?;
        Ok(())
    }
}

/// Opens a [`Link`] on demand.
///
/// [`ConnectionManager`](crate::ConnectionManager) calls this when the
/// first handle is acquired.
pub trait Connector {
    /// Opens a fresh link.
    fn connect(&mut self) -> Result<Link>;
}

impl<F: FnMut() -> Result<Link>> Connector for F {
    fn connect(&mut self) -> Result<Link> {
        self()
    }
}

/// Connects to a real board over USB serial.
#[derive(Debug, Clone, Default)]
pub struct SerialConnector {
    /// Discovery and port settings.
    config: LinkConfig,
}

impl SerialConnector {
    /// Creates a connector using `config`.
    pub const fn new(config: LinkConfig) -> Self {
        Self { config }
    }
}

impl Connector for SerialConnector {
    fn connect(&mut self) -> Result<Link> {
        Link::open(&self.config)
    }
}

/// A serial port as seen by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct PortInfo {
    /// Port path, e.g. `/dev/ttyACM0` or `COM3`.
    pub name: String,
    /// USB vendor id, for USB ports.
    pub vid: Option<u16>,
    /// USB product id, for USB ports.
    pub pid: Option<u16>,
    /// USB product string, if reported.
    pub product: Option<String>,
    /// Whether the ids match the configured signature.
    pub matches: bool,
}

/// Returns the port to open: the configured one, or the first USB port
/// with the configured vendor/product ids.
pub fn locate(config: &LinkConfig) -> Result<String> {
    if let Some(port) = &config.port {
        return Ok(port.clone());
    }
    let ports = serialport::available_ports()?;
    debug!(count = ports.len(), "enumerated serial ports");
    find_matching(&ports, config.vid, config.pid)
        .map(|p| p.port_name.clone())
        .ok_or(Error::DeviceNotFound {
            vid: config.vid,
            pid: config.pid,
        })
}

/// Lists every serial port, flagging the ones that look like the board.
pub fn list_ports(config: &LinkConfig) -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .map(|p| match p.port_type {
            SerialPortType::UsbPort(usb) => PortInfo {
                matches: usb.vid == config.vid && usb.pid == config.pid,
                name: p.port_name,
                vid: Some(usb.vid),
                pid: Some(usb.pid),
                product: usb.product,
            },
            _ => PortInfo {
                name: p.port_name,
                vid: None,
                pid: None,
                product: None,
                matches: false,
            },
        })
        .collect())
}

/// First USB port in `ports` with the given ids.
fn find_matching(ports: &[SerialPortInfo], vid: u16, pid: u16) -> Option<&SerialPortInfo> {
    ports.iter().find(|p| {
        matches!(&p.port_type, SerialPortType::UsbPort(usb) if usb.vid == vid && usb.pid == pid)
    })
}

/// Offset of the first occurrence of `needle` in `haystack`.
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
