//! Notebook-facing session: execute, complete, shutdown.
//!
//! A session runs every fragment through `exec` against its own pair of
//! dicts on the board, so variables persist between fragments of one
//! session and stay invisible to other sessions sharing the link. The
//! scope is created on first use and deleted at shutdown.

use serde::Serialize;
use tracing::{debug, info, warn};
use ubit_proto::{Reply, ReplyStatus, script};

use crate::adapter::{self, Ended, Outcome};
use crate::cancel::CancelToken;
use crate::complete::{self, Completion};
use crate::config::WaitOptions;
use crate::link::Connector;
use crate::manager::{ConnectionManager, LinkHandle, Shared};
use crate::scope::{Scope, SessionId};
use crate::{Error, Result};

/// Result status of one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Status {
    /// The board replied normally. Python exceptions still count: their
    /// traceback is on stderr.
    Ok,
    /// The reply was malformed.
    Error,
    /// The wait was interrupted or timed out.
    Aborted,
}

/// What one execution printed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct ExecOutput {
    /// Printed output.
    pub stdout: String,
    /// Traceback or error text.
    pub stderr: String,
    /// How the execution ended.
    pub status: Status,
}

impl From<Outcome> for ExecOutput {
    fn from(o: Outcome) -> Self {
        let status = match (o.ended, o.reply.status) {
            (Ended::Complete, ReplyStatus::Ok) => Status::Ok,
            (Ended::Complete, _) => Status::Error,
            _ => Status::Aborted,
        };
        let Reply { stdout, stderr, .. } = o.reply;
        Self {
            stdout,
            stderr,
            status,
        }
    }
}

/// One notebook session on a shared link.
///
/// Dropping a session without [`shutdown`](Self::shutdown) still releases
/// the link, but its scope stays on the board until the link closes.
#[derive(Debug)]
pub struct Session {
    /// Names this session's scope on the board.
    id: SessionId,
    /// Counted reference to the link; dropping the session releases it.
    link: LinkHandle,
    /// Reply wait settings.
    wait: WaitOptions,
    /// Fired to abort the running execution.
    cancel: CancelToken,
}

impl Session {
    /// Starts a session with a fresh random id.
    pub fn new(link: LinkHandle) -> Self {
        Self::with_id(link, SessionId::generate())
    }

    /// Starts a session with a caller-chosen id.
    pub fn with_id(link: LinkHandle, id: SessionId) -> Self {
        Self {
            id,
            link,
            wait: WaitOptions::default(),
            cancel: CancelToken::new(),
        }
    }

    /// Replaces the reply wait settings.
    #[must_use]
    pub const fn with_wait_options(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    /// This session's id.
    pub const fn id(&self) -> &SessionId {
        &self.id
    }

    /// A token that aborts the current execution when cancelled.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Line a front-end prints once connected.
    pub fn connect_message(&self) -> String {
        format!("Kernel connected to microbit, uuid: {}", self.id)
    }

    /// Creates the session scope on the board if it does not exist yet.
    ///
    /// Returns the failed init output if the board did not acknowledge it.
    pub fn open_scope(&mut self) -> Result<Option<ExecOutput>> {
        let mut shared = self.link.lock()?;
        ensure_scope(&mut shared, &self.id, &self.wait, &self.cancel)
    }

    /// Runs `code` in this session's scope.
    pub fn execute(&mut self, code: &str) -> Result<ExecOutput> {
        let mut shared = self.link.lock()?;
        if let Some(failed) = ensure_scope(&mut shared, &self.id, &self.wait, &self.cancel)? {
            return Ok(failed);
        }
        let wrapped = script::exec_in_scope(code, self.id.as_str());
        let outcome = adapter::run_code(&mut shared.link, &wrapped, &self.wait, &self.cancel)?;
        if let Some(scope) = shared.scopes.get_mut(&self.id) {
            scope.submissions += 1;
        }
        let out = ExecOutput::from(outcome);
        debug!(session = %self.id, status = ?out.status, "executed");
        Ok(out)
    }

    /// Evaluates `expr` in this session's scope and reads the printed
    /// value back as a list of strings.
    pub fn eval_names(&mut self, expr: &str) -> Result<Vec<String>> {
        let out = self.execute(&script::print_expr(expr))?;
        if !out.stderr.is_empty() {
            debug!(session = %self.id, expr, stderr = %out.stderr, "introspection raised");
        }
        Ok(ubit_proto::parse_str_list(&out.stdout)?)
    }

    /// Completes the name before `cursor_pos` (in characters).
    ///
    /// Names are listed on the board; if that fails the result is empty.
    pub fn complete(&mut self, code: &str, cursor_pos: usize) -> Result<Completion> {
        let target = complete::target(code, cursor_pos);
        match self.eval_names(&target.listing()) {
            Ok(names) => Ok(Completion::new(names, &target, cursor_pos)),
            Err(Error::Literal(e)) => {
                debug!(session = %self.id, error = %e, "no completions");
                Ok(Completion::empty(cursor_pos))
            }
            Err(e) => Err(e),
        }
    }

    /// Deletes the session scope and hands the link back to `manager`.
    ///
    /// The handle is released even if the teardown fails. Returns
    /// `restart` for the front-end to echo.
    pub fn shutdown<C: Connector>(
        self,
        manager: &ConnectionManager<C>,
        restart: bool,
    ) -> Result<bool> {
        let closed = self.close_scope();
        manager.release(self.link);
        info!(session = %self.id, restart, "session shut down");
        closed.map(|()| restart)
    }

    /// Deletes the scope on the board and forgets it.
    fn close_scope(&self) -> Result<()> {
        let mut shared = self.link.lock()?;
        let Some(scope) = shared.scopes.remove(&self.id) else {
            return Ok(());
        };
        let teardown = script::scope_teardown(self.id.as_str());
        let outcome = adapter::run_code(&mut shared.link, &teardown, &self.wait, &self.cancel)?;
        if !outcome.reply.stderr.is_empty() {
            warn!(session = %self.id, stderr = %outcome.reply.stderr, "scope teardown failed");
        }
        debug!(
            session = %self.id,
            submissions = scope.submissions,
            age = ?scope.opened.elapsed(),
            "scope closed"
        );
        Ok(())
    }
}

/// Creates `id`'s scope on the board unless the link already hosts it.
fn ensure_scope(
    shared: &mut Shared,
    id: &SessionId,
    wait: &WaitOptions,
    cancel: &CancelToken,
) -> Result<Option<ExecOutput>> {
    if shared.scopes.contains_key(id) {
        return Ok(None);
    }
    let outcome = adapter::run_code(&mut shared.link, &script::scope_init(id.as_str()), wait, cancel)?;
    let out = ExecOutput::from(outcome);
    if out.status != Status::Ok || !out.stderr.is_empty() {
        warn!(session = %id, status = ?out.status, stderr = %out.stderr, "scope init failed");
        return Ok(Some(out));
    }
    shared.scopes.insert(id.clone(), Scope::new());
    info!(session = %id, port = shared.link.name(), "scope opened");
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(buf: &[u8], ended: Ended) -> Outcome {
        Outcome {
            reply: Reply::parse(buf),
            ended,
        }
    }

    #[test]
    fn status_from_outcome() {
        let ok = ExecOutput::from(outcome(b"OK2\n\x04\x04>", Ended::Complete));
        assert_eq!(ok.status, Status::Ok);
        assert_eq!(ok.stdout, "2\n");

        let bad = ExecOutput::from(outcome(b"ERRbad\x04>", Ended::Complete));
        assert_eq!(bad.status, Status::Error);
        assert_eq!(bad.stderr, ubit_proto::NOT_OK);

        let cut = ExecOutput::from(outcome(b"OK", Ended::Interrupted));
        assert_eq!(cut.status, Status::Aborted);
        assert_eq!((cut.stdout.as_str(), cut.stderr.as_str()), ("", ""));

        let late = ExecOutput::from(outcome(b"", Ended::TimedOut));
        assert_eq!(late.status, Status::Aborted);
    }
}
