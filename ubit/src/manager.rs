//! Sharing one physical link between sessions.
//!
//! The board is opened when the first [`LinkHandle`] is acquired and
//! closed when the last one goes away, whether it was handed back through
//! [`ConnectionManager::release`] or simply dropped. Handles are not
//! `Clone`: every holder acquired its own. The manager keeps only a weak
//! reference, so the handles alone decide how long the port stays open.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::{info, warn};

use crate::config::LinkConfig;
use crate::link::{Connector, Link, SerialConnector};
use crate::scope::{Scope, SessionId};
use crate::{Error, Result};

/// State behind a [`LinkHandle`]: the link and the scopes it hosts.
#[derive(Debug)]
#[non_exhaustive]
pub struct Shared {
    /// The open link.
    pub link: Link,
    /// Session scopes that currently exist on the board.
    pub scopes: HashMap<SessionId, Scope>,
}

/// A counted reference to the shared link. Dropping it releases it.
#[derive(Debug)]
pub struct LinkHandle {
    /// Shared with every other handle; the manager holds it weakly.
    shared: Arc<Mutex<Shared>>,
}

impl LinkHandle {
    /// Locks the link for one round trip.
    pub fn lock(&self) -> Result<MutexGuard<'_, Shared>> {
        self.shared.lock().map_err(|_| Error::LinkPoisoned)
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        info!(port = self.link.name(), scopes = self.scopes.len(), "link closed");
    }
}

/// Opens, shares, and closes the link.
#[derive(Debug)]
pub struct ConnectionManager<C = SerialConnector> {
    /// Opens the link on first acquire.
    connector: C,
    /// The open link, while any handle is alive.
    shared: Weak<Mutex<Shared>>,
}

impl ConnectionManager<SerialConnector> {
    /// A manager that finds the board over USB serial.
    pub const fn serial(config: LinkConfig) -> Self {
        Self::new(SerialConnector::new(config))
    }
}

impl<C: Connector> ConnectionManager<C> {
    /// Creates a manager with no open link.
    pub const fn new(connector: C) -> Self {
        Self {
            connector,
            shared: Weak::new(),
        }
    }

    /// Returns a handle to the link, opening it first if needed.
    pub fn acquire(&mut self) -> Result<LinkHandle> {
        if let Some(shared) = self.shared.upgrade() {
            return Ok(LinkHandle { shared });
        }
        let link = self.connector.connect()?;
        info!(port = link.name(), "link opened");
        let shared = Arc::new(Mutex::new(Shared {
            link,
            scopes: HashMap::new(),
        }));
        self.shared = Arc::downgrade(&shared);
        Ok(LinkHandle { shared })
    }

    /// Gives a handle back. The link closes with the last handle.
    ///
    /// A handle issued by another manager is dropped without touching
    /// this manager's link.
    pub fn release(&self, handle: LinkHandle) {
        if !std::ptr::eq(self.shared.as_ptr(), Arc::as_ptr(&handle.shared)) {
            warn!("released a link handle this manager did not issue");
        }
        drop(handle);
    }

    /// Number of live handles.
    pub fn active_handles(&self) -> usize {
        self.shared.strong_count()
    }

    /// Returns `true` while a link is open.
    pub fn is_open(&self) -> bool {
        self.shared.strong_count() > 0
    }
}
