//! Sync engine for fetching mailbox state
//!
//! Provides stateless full and incremental sync operations; the caller owns
//! the cursor and serializes syncs per account.

mod engine;

pub use engine::{SyncOptions, full_sync, incremental_sync};
