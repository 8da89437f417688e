//! Interactive loop over one session.
//!
//! A line ending in `:` opens a block that runs once a blank line is
//! entered. `%complete TEXT` lists completions instead of running code.
//! Ctrl-C aborts the running execution; Ctrl-D ends the session.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use colored::Colorize;
use ubit::{Session, info};

use crate::run::{finish, print_output};
use crate::{LinkArgs, interrupt};

/// What to do with a line read at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum Step<'a> {
    /// Keep reading the current block.
    Continue,
    /// Run this code.
    Run(String),
    /// List completions for this text.
    Complete(&'a str),
    /// Nothing to do.
    Skip,
}

/// Accumulates lines into runnable fragments.
#[derive(Debug, Default)]
struct Editor {
    block: String,
}

impl Editor {
    fn in_block(&self) -> bool {
        !self.block.is_empty()
    }

    fn prompt(&self) -> &'static str {
        if self.in_block() { "... " } else { ">>> " }
    }

    fn feed<'a>(&mut self, raw: &'a str) -> Step<'a> {
        let line = raw.trim_end_matches(['\r', '\n']);
        if self.in_block() {
            if line.trim().is_empty() {
                return Step::Run(std::mem::take(&mut self.block));
            }
        } else {
            if let Some(text) = line.strip_prefix("%complete ") {
                return Step::Complete(text);
            }
            if line.trim().is_empty() {
                return Step::Skip;
            }
            if !line.trim_end().ends_with(':') {
                return Step::Run(line.to_owned());
            }
        }
        self.block.push_str(line);
        self.block.push('\n');
        Step::Continue
    }

    /// Whatever is left when input ends.
    fn finish(&mut self) -> Option<String> {
        self.in_block().then(|| std::mem::take(&mut self.block))
    }
}

pub fn run(link: &LinkArgs) -> Result<()> {
    let (manager, mut session) = link.connect()?;
    interrupt::forward(session.cancel_token())?;

    println!("{}", info::BANNER.bold());
    println!("{}", session.connect_message().dimmed());

    let result = interact(&mut session);
    println!();
    finish(session, &manager, result)
}

fn interact(session: &mut Session) -> Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut editor = Editor::default();
    let mut line = String::new();

    loop {
        print!("{}", editor.prompt());
        io::stdout().flush()?;
        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        match editor.feed(&line) {
            Step::Run(code) => print_output(&session.execute(&code)?)?,
            Step::Complete(text) => {
                let completion = session.complete(text, text.chars().count())?;
                if completion.matches.is_empty() {
                    println!("{}", "no completions".dimmed());
                } else {
                    println!("{}", completion.matches.join("  "));
                }
            }
            Step::Continue | Step::Skip => {}
        }
    }
    if let Some(code) = editor.finish() {
        print_output(&session.execute(&code)?)?;
    }
    Ok(())
}
