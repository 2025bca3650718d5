//! Label and read/star state mutation

use log::info;

use super::labels;
use crate::MailError;
use crate::gmail::GmailClient;

/// Apply arbitrary label changes to a single message.
pub fn modify_labels(
    client: &GmailClient,
    message_id: &str,
    add: &[&str],
    remove: &[&str],
) -> Result<(), MailError> {
    client.modify_message(message_id, add, remove)
}

/// Apply arbitrary label changes to many messages in one call.
pub fn batch_modify_labels(
    client: &GmailClient,
    message_ids: &[&str],
    add: &[&str],
    remove: &[&str],
) -> Result<(), MailError> {
    if message_ids.is_empty() {
        return Ok(());
    }
    client.batch_modify_messages(message_ids, add, remove)
}

/// Mark a message as read by removing the UNREAD label.
pub fn mark_read(client: &GmailClient, message_id: &str) -> Result<(), MailError> {
    info!("marking message {message_id} as read");
    modify_labels(client, message_id, &[], &[labels::UNREAD])
}

/// Mark a message as unread by adding the UNREAD label.
pub fn mark_unread(client: &GmailClient, message_id: &str) -> Result<(), MailError> {
    info!("marking message {message_id} as unread");
    modify_labels(client, message_id, &[labels::UNREAD], &[])
}

/// Star or unstar a message.
pub fn set_starred(
    client: &GmailClient,
    message_id: &str,
    starred: bool,
) -> Result<(), MailError> {
    info!(
        "{} message {message_id}",
        if starred { "starring" } else { "unstarring" }
    );
    if starred {
        modify_labels(client, message_id, &[labels::STARRED], &[])
    } else {
        modify_labels(client, message_id, &[], &[labels::STARRED])
    }
}

/// Archive messages by removing them from INBOX.
pub fn archive(client: &GmailClient, message_ids: &[&str]) -> Result<(), MailError> {
    info!("archiving {} messages", message_ids.len());
    batch_modify_labels(client, message_ids, &[], &[labels::INBOX])
}

/// Move messages to trash.
pub fn trash(client: &GmailClient, message_ids: &[&str]) -> Result<(), MailError> {
    info!("trashing {} messages", message_ids.len());
    batch_modify_labels(client, message_ids, &[labels::TRASH], &[labels::INBOX])
}
