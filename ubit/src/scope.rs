//! Session identifiers and the host-side record of remote scopes.

use std::fmt;
use std::time::Instant;

use serde::Serialize;
use uuid::Uuid;

/// Identifies a session and names its scope dicts on the board.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generates a random 32-digit hex identifier (a v4 UUID without
    /// dashes).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Uses `id` verbatim.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A session scope known to exist on the board.
#[derive(Debug, Clone, Copy)]
pub struct Scope {
    /// When the scope was created.
    pub opened: Instant,
    /// Submissions run in this scope so far.
    pub submissions: u64,
}

impl Scope {
    /// Records a freshly created scope.
    pub(crate) fn new() -> Self {
        Self {
            opened: Instant::now(),
            submissions: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_hex_and_distinct() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_eq!(a.as_str().len(), 32);
        assert!(a.as_str().chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
        assert_eq!(Uuid::parse_str(a.as_str()).unwrap().get_version_num(), 4);
        assert_ne!(a, b);
    }

    #[test]
    fn display_is_raw_id() {
        assert_eq!(SessionId::new("abc").to_string(), "abc");
    }
}
