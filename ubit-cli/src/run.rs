//! One-shot commands: exec, complete.

use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use colored::Colorize;
use ubit::{ConnectionManager, Connector, ExecOutput, Session, Status};

use crate::{LinkArgs, OutputFormat, interrupt};

/// Arguments for `ubit exec`.
///
/// Usage: `ubit exec [CODE | -f FILE]`; reads stdin when neither is given.
#[derive(clap::Args)]
pub struct ExecArgs {
    /// Code to run.
    #[arg(conflicts_with = "file")]
    pub code: Option<String>,

    /// Read the code from a file.
    #[arg(short = 'f', long)]
    pub file: Option<PathBuf>,

    /// Output format.
    #[arg(long, default_value = "table")]
    pub format: OutputFormat,
}

impl ExecArgs {
    fn source(&self) -> Result<String> {
        if let Some(code) = &self.code {
            return Ok(code.clone());
        }
        if let Some(path) = &self.file {
            return std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()));
        }
        let mut code = String::new();
        io::stdin()
            .read_to_string(&mut code)
            .context("reading code from stdin")?;
        Ok(code)
    }
}

/// Arguments for `ubit complete`.
#[derive(clap::Args)]
pub struct CompleteArgs {
    /// Code being edited.
    pub code: String,

    /// Cursor position in characters (default: end of code).
    #[arg(long)]
    pub cursor: Option<usize>,

    /// Output format.
    #[arg(long, default_value = "table")]
    pub format: OutputFormat,
}

pub fn exec(args: &ExecArgs, link: &LinkArgs) -> Result<()> {
    let code = args.source()?;
    let (manager, mut session) = link.connect()?;
    interrupt::forward(session.cancel_token())?;

    let executed = session.execute(&code);
    if let Ok(out) = &executed {
        match args.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(out)?),
            OutputFormat::Table => print_output(out)?,
        }
    }
    let out = finish(session, &manager, executed)?;

    match out.status {
        Status::Ok if out.stderr.is_empty() => Ok(()),
        Status::Ok => bail!("code raised an exception"),
        Status::Aborted => bail!("execution aborted"),
        _ => bail!("malformed reply from board"),
    }
}

pub fn complete(args: &CompleteArgs, link: &LinkArgs) -> Result<()> {
    let cursor = args.cursor.unwrap_or_else(|| args.code.chars().count());
    let (manager, mut session) = link.connect()?;

    let completed = session.complete(&args.code, cursor);
    let completion = finish(session, &manager, completed)?;

    if matches!(args.format, OutputFormat::Json) {
        println!("{}", serde_json::to_string_pretty(&completion)?);
        return Ok(());
    }
    for name in &completion.matches {
        println!("{name}");
    }
    Ok(())
}

/// Shuts `session` down whatever `result` is. An error in `result` wins
/// over a teardown error, which is then only logged.
pub fn finish<C: Connector, T, E: Into<anyhow::Error>>(
    session: Session,
    manager: &ConnectionManager<C>,
    result: std::result::Result<T, E>,
) -> Result<T> {
    let closed = session.shutdown(manager, false);
    match result {
        Ok(value) => {
            closed?;
            Ok(value)
        }
        Err(e) => {
            if let Err(close) = closed {
                tracing::warn!(error = %close, "session teardown failed");
            }
            Err(e.into())
        }
    }
}

/// Prints stdout as-is and stderr in red.
pub fn print_output(out: &ExecOutput) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(out.stdout.as_bytes())?;
    stdout.flush()?;
    if !out.stderr.is_empty() {
        eprint!("{}", out.stderr.red());
    }
    if out.status == Status::Aborted {
        eprintln!("{}", "[aborted]".yellow());
    }
    Ok(())
}
