//! Scripted stand-in for a micro:bit in raw-REPL mode.
//!
//! Understands just enough Python for the tests: the scope init and
//! teardown snippets, `exec(..., g[id], l[id])` wrappers, `NAME = EXPR`,
//! `print(EXPR)`, bare expressions (echoed like the interactive REPL),
//! integer `+`, `dir()`, `dir(display)`, and `while True: pass`, which
//! runs until interrupted.

#![allow(dead_code, clippy::unwrap_used, clippy::missing_docs_in_private_items)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ubit::{Link, Port, WaitOptions};
use ubit_proto::script::py_repr;
use ubit_proto::{EOT, ETX, SOH};

/// Builtins every `dir()` listing includes.
const BUILTINS: &[&str] = &["__name__", "dir", "exec", "pow", "print", "range"];
/// Attributes of the fake `display` object.
const DISPLAY_ATTRS: &[&str] = &["clear", "scroll", "show"];

/// Fast polling so tests don't crawl.
pub fn fast_wait() -> WaitOptions {
    WaitOptions::default().with_poll_interval(Duration::from_millis(5))
}

/// A fresh board already switched into raw-REPL mode.
pub fn link(board: &FakeBoard) -> Link {
    Link::establish(Box::new(board.clone()), "fake", Some(Duration::from_secs(5))).unwrap()
}

#[derive(Debug, Default)]
struct Board {
    raw_mode: bool,
    /// Code received since the last ETX.
    pending: Vec<u8>,
    /// Bytes waiting to be read by the host.
    outgoing: VecDeque<u8>,
    /// Everything the host ever wrote.
    written: Vec<u8>,
    /// Session scopes, keyed by id. Ordered so `dir()` is stable.
    scopes: HashMap<String, BTreeMap<String, i64>>,
    /// Variables of code submitted without a scope wrapper.
    top: BTreeMap<String, i64>,
    running_forever: bool,
    /// Never answer anything.
    silent: bool,
    /// Replace the next reply with these bytes.
    override_reply: Option<Vec<u8>>,
    /// Cap on bytes handed out per read.
    chunk: Option<usize>,
    /// Times `clear_buffers` was called.
    clears: usize,
}

/// Cloneable handle: one clone goes into the link, the test keeps another.
#[derive(Debug, Clone, Default)]
pub struct FakeBoard {
    state: Arc<Mutex<Board>>,
}

impl FakeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles held elsewhere (the link, if still open).
    pub fn other_refs(&self) -> usize {
        Arc::strong_count(&self.state) - 1
    }

    pub fn set_silent(&self, silent: bool) {
        self.state.lock().unwrap().silent = silent;
    }

    pub fn set_chunk(&self, chunk: usize) {
        self.state.lock().unwrap().chunk = Some(chunk);
    }

    pub fn reply_next_with(&self, bytes: &[u8]) {
        self.state.lock().unwrap().override_reply = Some(bytes.to_vec());
    }

    pub fn written(&self) -> Vec<u8> {
        self.state.lock().unwrap().written.clone()
    }

    pub fn clears(&self) -> usize {
        self.state.lock().unwrap().clears
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().unwrap().running_forever
    }

    pub fn scope_count(&self) -> usize {
        self.state.lock().unwrap().scopes.len()
    }
}

impl Read for FakeBoard {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut b = self.state.lock().unwrap();
        let n = buf.len().min(b.outgoing.len());
        for slot in &mut buf[..n] {
            *slot = b.outgoing.pop_front().unwrap();
        }
        Ok(n)
    }
}

impl Write for FakeBoard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut b = self.state.lock().unwrap();
        b.written.extend_from_slice(buf);
        for &byte in buf {
            b.receive(byte);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Port for FakeBoard {
    fn bytes_to_read(&self) -> io::Result<usize> {
        let b = self.state.lock().unwrap();
        Ok(b.chunk.map_or(b.outgoing.len(), |c| c.min(b.outgoing.len())))
    }

    fn clear_buffers(&self) -> io::Result<()> {
        let mut b = self.state.lock().unwrap();
        b.outgoing.clear();
        b.pending.clear();
        b.clears += 1;
        Ok(())
    }
}

/// Value of a fake expression.
enum Value {
    Int(i64),
    Names(Vec<String>),
}

impl Value {
    fn render(&self) -> String {
        match self {
            Self::Int(n) => n.to_string(),
            Self::Names(names) => {
                let items: Vec<String> = names.iter().map(|n| py_repr(n)).collect();
                format!("[{}]", items.join(", "))
            }
        }
    }
}

fn name_error(name: &str) -> String {
    format!(
        "Traceback (most recent call last):\n  File \"<stdin>\", line 1, in <module>\n\
         NameError: name '{name}' isn't defined\n"
    )
}

impl Board {
    fn send(&mut self, bytes: &[u8]) {
        if !self.silent {
            self.outgoing.extend(bytes);
        }
    }

    fn receive(&mut self, byte: u8) {
        if self.running_forever {
            if byte == ETX {
                self.running_forever = false;
                self.send(b"\x04Traceback (most recent call last):\nKeyboardInterrupt: \n\x04>");
            }
            return;
        }
        match byte {
            ETX => self.pending.clear(),
            SOH => {
                self.raw_mode = true;
                self.send(b"raw REPL; CTRL-B to exit\r\n>");
            }
            EOT if self.raw_mode => {
                let code = String::from_utf8_lossy(&std::mem::take(&mut self.pending)).into_owned();
                self.execute(&code);
            }
            _ => self.pending.push(byte),
        }
    }

    fn execute(&mut self, code: &str) {
        if let Some(reply) = self.override_reply.take() {
            self.send(&reply);
            return;
        }
        self.send(b"OK");
        let (out, err) = if code.starts_with("try:\n    g[") {
            let id = scope_id(code);
            self.scopes.insert(id, BTreeMap::new());
            (String::new(), String::new())
        } else if code.starts_with("del g[") {
            let id = scope_id(code);
            match self.scopes.remove(&id) {
                Some(_) => (String::new(), String::new()),
                None => (String::new(), format!("KeyError: {}\n", py_repr(&id))),
            }
        } else if let Some(rest) = code.strip_prefix("exec(") {
            let split = rest.rfind(", g[").unwrap();
            let user = ubit_proto::parse_str_list(&format!("[{}]", &rest[..split]))
                .unwrap()
                .remove(0);
            let id = scope_id(&rest[split..]);
            match self.scopes.remove(&id) {
                Some(mut vars) => {
                    let r = self.run(&user, &mut vars);
                    self.scopes.insert(id, vars);
                    r
                }
                None => (String::new(), format!("KeyError: {}\n", py_repr(&id))),
            }
        } else {
            let mut vars = std::mem::take(&mut self.top);
            let r = self.run(code, &mut vars);
            self.top = vars;
            r
        };
        if self.running_forever {
            return;
        }
        self.send(out.as_bytes());
        self.send(&[EOT]);
        self.send(err.as_bytes());
        self.send(b"\x04>");
    }

    fn run(&mut self, code: &str, vars: &mut BTreeMap<String, i64>) -> (String, String) {
        let mut out = String::new();
        for line in code.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if line == "while True: pass" {
                self.running_forever = true;
                break;
            }
            let result = if let Some((name, expr)) = line.split_once(" = ") {
                eval(expr, vars).and_then(|v| match v {
                    Value::Int(n) => {
                        vars.insert(name.trim().to_owned(), n);
                        Ok(None)
                    }
                    Value::Names(_) => Err("TypeError: unsupported\n".to_owned()),
                })
            } else if let Some(inner) = line.strip_prefix("print(").and_then(|l| l.strip_suffix(')')) {
                eval(inner, vars).map(Some)
            } else {
                eval(line, vars).map(Some)
            };
            match result {
                Ok(Some(v)) => {
                    out.push_str(&v.render());
                    out.push('\n');
                }
                Ok(None) => {}
                Err(err) => return (out, err),
            }
        }
        (out, String::new())
    }
}

fn eval(expr: &str, vars: &BTreeMap<String, i64>) -> Result<Value, String> {
    let expr = expr.trim();
    if expr == "dir()" {
        let mut names: Vec<String> = BUILTINS.iter().map(|s| (*s).to_owned()).collect();
        names.extend(vars.keys().cloned());
        names.sort();
        return Ok(Value::Names(names));
    }
    if let Some(obj) = expr.strip_prefix("dir(").and_then(|e| e.strip_suffix(')')) {
        return if obj == "display" {
            Ok(Value::Names(DISPLAY_ATTRS.iter().map(|s| (*s).to_owned()).collect()))
        } else {
            Err(name_error(obj))
        };
    }
    let mut total = 0;
    for term in expr.split('+').map(str::trim) {
        total += match term.parse::<i64>() {
            Ok(n) => n,
            Err(_) => *vars.get(term).ok_or_else(|| name_error(term))?,
        };
    }
    Ok(Value::Int(total))
}

/// Id between the first `g['` and the following `']`.
fn scope_id(code: &str) -> String {
    let start = code.find("g['").unwrap() + 3;
    let end = start + code[start..].find("']").unwrap();
    code[start..end].to_owned()
}
