//! CLI for running MicroPython on a BBC micro:bit.

#![allow(
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::missing_docs_in_private_items
)]

mod interrupt;
mod repl;
mod run;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;
use ubit::{ConnectionManager, LinkConfig, SerialConnector, Session, WaitOptions};

#[derive(Parser)]
#[command(name = "ubit", version, about = "Run MicroPython on a BBC micro:bit")]
struct Cli {
    #[command(flatten)]
    link: LinkArgs,

    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` wins.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run code on the board and print what it printed.
    Exec(run::ExecArgs),

    /// List completions for the name before the cursor.
    Complete(run::CompleteArgs),

    /// Interactive session on the board.
    Repl,

    /// List serial ports and mark the ones that look like a micro:bit.
    Ports {
        /// Output format.
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },

    /// Generate shell completion scripts.
    #[command(hide = true)]
    Completion {
        /// Target shell.
        shell: Shell,
    },
}

/// Where the board is and how long to wait for it.
#[derive(clap::Args)]
pub(crate) struct LinkArgs {
    /// Serial port to use instead of searching by USB id.
    #[arg(long, global = true)]
    port: Option<String>,

    /// USB vendor id to search for (hex with `0x`, or decimal).
    #[arg(long, global = true, value_parser = parse_usb_id, default_value = "0x0d28")]
    vid: u16,

    /// USB product id to search for (hex with `0x`, or decimal).
    #[arg(long, global = true, value_parser = parse_usb_id, default_value = "0x0204")]
    pid: u16,

    /// Serial baud rate.
    #[arg(long, global = true, default_value_t = ubit::BAUD_RATE)]
    baud: u32,

    /// Seconds to wait for a reply before interrupting the board.
    #[arg(long, global = true)]
    timeout: Option<f64>,

    /// Seconds to wait for the raw-REPL prompt when connecting.
    #[arg(long, global = true, default_value_t = 5.0)]
    handshake_timeout: f64,
}

impl LinkArgs {
    pub(crate) fn config(&self) -> Result<LinkConfig> {
        let mut config = LinkConfig::default()
            .with_signature(self.vid, self.pid)
            .with_baud_rate(self.baud)
            .with_handshake_timeout(Some(seconds(self.handshake_timeout)?));
        if let Some(port) = &self.port {
            config = config.with_port(port.clone());
        }
        Ok(config)
    }

    pub(crate) fn wait(&self) -> Result<WaitOptions> {
        let timeout = self.timeout.map(seconds).transpose()?;
        Ok(WaitOptions::default().with_timeout(timeout))
    }

    /// Opens the board and starts one session on it.
    pub(crate) fn connect(&self) -> Result<(ConnectionManager<SerialConnector>, Session)> {
        let mut manager = ConnectionManager::serial(self.config()?);
        let handle = manager.acquire().context("connecting to micro:bit")?;
        let session = Session::new(handle).with_wait_options(self.wait()?);
        Ok((manager, session))
    }
}

/// Output format for structured results.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable text.
    #[default]
    Table,
    /// Machine-readable JSON.
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    if let Err(e) = cli.dispatch() {
        eprintln!("ubit: {e:#}");
        std::process::exit(1);
    }
}

impl Cli {
    fn dispatch(self) -> Result<()> {
        match self.command {
            Command::Exec(args) => run::exec(&args, &self.link),
            Command::Complete(args) => run::complete(&args, &self.link),
            Command::Repl => repl::run(&self.link),
            Command::Ports { format } => ports(&self.link, format),
            Command::Completion { shell } => {
                clap_complete::generate(shell, &mut Self::command(), "ubit", &mut std::io::stdout());
                Ok(())
            }
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn ports(link: &LinkArgs, format: OutputFormat) -> Result<()> {
    let list = ubit::list_ports(&link.config()?)?;

    if matches!(format, OutputFormat::Json) {
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    if list.is_empty() {
        println!("No serial ports.");
        return Ok(());
    }
    println!("  {:<24} {:<10} PRODUCT", "PORT", "USB ID");
    for port in &list {
        let mark = if port.matches { "*" } else { " " };
        let id = match (port.vid, port.pid) {
            (Some(vid), Some(pid)) => format!("{vid:04x}:{pid:04x}"),
            _ => "-".to_owned(),
        };
        println!(
            "{mark} {:<24} {:<10} {}",
            port.name,
            id,
            port.product.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn parse_usb_id(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid USB id '{s}': {e}"))
}

fn seconds(secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).with_context(|| format!("invalid duration: {secs}s"))
}
