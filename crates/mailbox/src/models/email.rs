//! Normalized email message decoded from the provider's wire format

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An email address with optional display name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Display name (e.g., "John Doe")
    pub name: Option<String>,
    /// Email address (e.g., "john@example.com")
    pub email: String,
}

impl EmailAddress {
    /// Create a new email address with just the email
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            name: None,
            email: email.into(),
        }
    }

    /// Create a new email address with a display name
    pub fn with_name(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: email.into(),
        }
    }

    /// Parse an email address from a string like "John Doe <john@example.com>"
    pub fn parse(s: &str) -> Self {
        let s = s.trim();

        if let Some(angle_start) = s.rfind('<')
            && let Some(angle_end) = s.rfind('>')
            && angle_start < angle_end
        {
            let name = s[..angle_start].trim().trim_matches('"');
            let email = s[angle_start + 1..angle_end].trim();
            return Self {
                name: if name.is_empty() {
                    None
                } else {
                    Some(name.to_string())
                },
                email: email.to_string(),
            };
        }

        Self {
            name: None,
            email: s.to_string(),
        }
    }

    /// Format the email address for display
    pub fn display(&self) -> String {
        match &self.name {
            Some(name) => format!("{} <{}>", name, self.email),
            None => self.email.clone(),
        }
    }
}

/// A fully decoded message.
///
/// Built in one shot by the codec from the provider payload and immutable
/// afterwards. A message that cannot be decoded completely is dropped by
/// the sync engine, never returned half-filled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailData {
    /// Provider message ID
    pub id: String,
    /// Provider thread ID
    pub thread_id: String,
    /// Subject line
    pub subject: String,
    /// Decoded body; HTML is preferred over plain text when both exist
    pub body: String,
    /// Provider-supplied preview text
    pub snippet: String,
    /// Sender address and display name
    pub from: EmailAddress,
    /// Recipient addresses, display names stripped
    pub to: Vec<String>,
    /// Cc addresses, display names stripped
    pub cc: Vec<String>,
    /// Bcc addresses, display names stripped
    pub bcc: Vec<String>,
    /// When the provider received the message
    pub date: DateTime<Utc>,
    /// Derived from the absence of the UNREAD label
    pub is_read: bool,
    /// Derived from the presence of the STARRED label
    pub is_starred: bool,
    /// Provider label IDs attached to the message
    pub labels: Vec<String>,
    /// RFC 2822 Message-ID header
    pub message_id: Option<String>,
    /// RFC 2822 In-Reply-To header
    pub in_reply_to: Option<String>,
    /// RFC 2822 References header
    pub references: Option<String>,
}
