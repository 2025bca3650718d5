//! Token storage trait definition
//!
//! The engine itself never touches storage: callers load a record, thread it
//! through calls, and save whatever comes back. This trait is the contract a
//! production wrapper implements on top of its database.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::MailError;
use crate::models::TokenRecord;

/// Trait for durable token storage, one record per connected account.
pub trait TokenStore: Send + Sync {
    /// Load the token record for an account, if one exists
    fn load(&self, account_id: &str) -> Result<Option<TokenRecord>, MailError>;

    /// Insert or replace the token record for an account
    fn save(&self, account_id: &str, record: &TokenRecord) -> Result<(), MailError>;

    /// Remove the token record for an account (disconnect)
    fn delete(&self, account_id: &str) -> Result<(), MailError>;
}

/// In-memory token store for tests and short-lived callers.
#[derive(Default)]
pub struct InMemoryTokenStore {
    records: Mutex<HashMap<String, TokenRecord>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for InMemoryTokenStore {
    fn load(&self, account_id: &str) -> Result<Option<TokenRecord>, MailError> {
        let records = self.records.lock().map_err(|e| MailError::Api {
            status: None,
            message: format!("token store poisoned: {e}"),
        })?;
        Ok(records.get(account_id).cloned())
    }

    fn save(&self, account_id: &str, record: &TokenRecord) -> Result<(), MailError> {
        let mut records = self.records.lock().map_err(|e| MailError::Api {
            status: None,
            message: format!("token store poisoned: {e}"),
        })?;
        records.insert(account_id.to_string(), record.clone());
        Ok(())
    }

    fn delete(&self, account_id: &str) -> Result<(), MailError> {
        let mut records = self.records.lock().map_err(|e| MailError::Api {
            status: None,
            message: format!("token store poisoned: {e}"),
        })?;
        records.remove(account_id);
        Ok(())
    }
}
