//! Mutations against the remote mailbox
//!
//! Label changes and outgoing mail. All of these are fire-and-forget from
//! the engine's perspective: the caller re-syncs to observe resulting
//! state instead of trusting an optimistic local update, since label
//! mutations race with concurrent provider-side changes.

mod mutate;
mod send;

pub use mutate::{
    archive, batch_modify_labels, mark_read, mark_unread, modify_labels, set_starred, trash,
};
pub use send::{reply_to_thread, send_email};

/// Label IDs the provider uses for common states
pub mod labels {
    pub const INBOX: &str = "INBOX";
    pub const SENT: &str = "SENT";
    pub const DRAFT: &str = "DRAFT";
    pub const UNREAD: &str = "UNREAD";
    pub const STARRED: &str = "STARRED";
    pub const TRASH: &str = "TRASH";
    pub const SPAM: &str = "SPAM";
    pub const IMPORTANT: &str = "IMPORTANT";
}
