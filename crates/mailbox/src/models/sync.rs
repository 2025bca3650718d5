//! Sync cursor and sync call results

use serde::{Deserialize, Serialize};

use super::EmailData;

/// Opaque marker for "last known mailbox state".
///
/// Issued by the provider, advanced after every successful sync. A cursor
/// belongs to the mailbox identity it was issued for and must never be
/// applied to a different account's sync.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncCursor(pub String);

impl SyncCursor {
    pub fn new(cursor: impl Into<String>) -> Self {
        Self(cursor.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SyncCursor {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SyncCursor {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Counters from one sync call, for the caller's logging.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncStats {
    /// Message identifiers the engine attempted to fetch
    pub fetched: usize,
    /// Messages decoded successfully
    pub decoded: usize,
    /// Messages dropped (fetch failure or undecodable payload)
    pub skipped: usize,
    /// Detail-fetch batches issued
    pub batches: usize,
}

/// Result of one full or incremental sync call.
///
/// Ephemeral: the engine retains nothing between calls. The caller persists
/// `new_cursor` and the emails; message order follows the provider's
/// listing order, which is not guaranteed chronological.
#[derive(Debug, Clone)]
pub struct SyncResult {
    pub emails: Vec<EmailData>,
    pub new_cursor: SyncCursor,
    /// Whether the provider listing was paginated beyond this call
    pub has_more: bool,
    pub stats: SyncStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_round_trip() {
        let cursor = SyncCursor::new("184290");
        assert_eq!(cursor.as_str(), "184290");
        let json = serde_json::to_string(&cursor).unwrap();
        let back: SyncCursor = serde_json::from_str(&json).unwrap();
        assert_eq!(cursor, back);
    }

    #[test]
    fn test_cursor_from_str() {
        let cursor: SyncCursor = "99".into();
        assert_eq!(cursor.as_str(), "99");
    }
}
