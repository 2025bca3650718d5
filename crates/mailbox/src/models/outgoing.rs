//! Outgoing send and reply requests

use serde::{Deserialize, Serialize};

/// A new message to send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRequest {
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    #[serde(default)]
    pub bcc: Vec<String>,
    pub subject: String,
    pub body: String,
    /// Send as text/html when set; text/plain otherwise
    #[serde(default)]
    pub is_html: bool,
}

impl SendRequest {
    pub fn new(to: Vec<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to,
            cc: Vec::new(),
            bcc: Vec::new(),
            subject: subject.into(),
            body: body.into(),
            is_html: false,
        }
    }
}

/// A reply to an existing thread.
///
/// Recipients are not part of the request: they are resolved against the
/// thread's last message at send time, so a reply composed before new
/// messages arrive still answers the latest participant set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyRequest {
    /// Thread to reply within
    pub thread_id: String,
    pub body: String,
    #[serde(default)]
    pub is_html: bool,
    /// Reply to everyone on the last message instead of just its sender
    #[serde(default)]
    pub reply_all: bool,
}

impl ReplyRequest {
    pub fn new(thread_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            body: body.into(),
            is_html: false,
            reply_all: false,
        }
    }
}
