//! Mailbox crate - synchronization and OAuth token lifecycle engine
//!
//! This crate keeps a local record of a user's external mailbox in sync
//! with the remote provider and can send and reply to messages while
//! preserving threading. It provides:
//! - OAuth2 token lifecycle: authorization URL, code exchange, expiry-aware
//!   refresh, revocation
//! - Authenticated API client with a closed error taxonomy
//! - Message codec between wire payloads and normalized [`EmailData`]
//! - Stateless full and incremental (history-delta) sync
//! - Label/read/star mutation, single and batched
//! - Push notification decoding with HMAC signature verification
//!
//! The engine owns no long-lived state: token records and sync cursors are
//! owned by the caller's store and passed in and out by value, so every
//! operation is safely callable concurrently for different accounts. Syncs
//! for the *same* account must be serialized by the caller.

pub mod actions;
pub mod config;
pub mod error;
pub mod gmail;
pub mod models;
pub mod push;
pub mod store;
pub mod sync;

pub use actions::{
    archive, batch_modify_labels, mark_read, mark_unread, modify_labels, reply_to_thread,
    send_email, set_starred, trash,
};
pub use config::OauthCredentials;
pub use error::MailError;
pub use gmail::auth::EXPIRY_BUFFER_SECS;
pub use gmail::{GmailAuth, GmailClient, decode_message, is_token_expired};
pub use models::{
    EmailAddress, EmailData, ReplyRequest, SendRequest, SyncCursor, SyncResult, SyncStats,
    TokenRecord,
};
pub use push::{PushNotification, decode_push, decode_signed_push, verify_push_signature};
pub use store::{InMemoryTokenStore, TokenStore};
pub use sync::{SyncOptions, full_sync, incremental_sync};
