//! OAuth token record passed between the caller's store and the engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tokens for one connected account.
///
/// The engine never persists this; it is loaded by the caller, threaded
/// through calls by value, and written back when a refresh replaces it.
/// A record whose `refresh_token` is `None` cannot be renewed once
/// expired; the account must go through authorization again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Opaque bearer token presented to the remote API.
    pub access_token: String,
    /// Long-lived renewal token. Absent on refresh responses; the refresh
    /// path carries the previous value forward.
    pub refresh_token: Option<String>,
    /// Absolute expiry of `access_token`.
    pub expires_at: DateTime<Utc>,
    /// Granted capability scopes.
    pub scope: Vec<String>,
}

impl TokenRecord {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_at: DateTime<Utc>,
        scope: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at,
            scope,
        }
    }

    /// Whether this record can still be renewed after its access token
    /// lapses.
    pub fn is_renewable(&self) -> bool {
        self.refresh_token.is_some()
    }
}
