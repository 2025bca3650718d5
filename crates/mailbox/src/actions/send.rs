//! Sending and replying
//!
//! The From address and reply recipients are resolved at send time: the
//! profile address is fetched fresh (never cached) and replies answer the
//! thread's *current* last message, not whatever it was when the request
//! was composed.

use log::info;

use crate::MailError;
use crate::gmail::codec::{
    self, OutgoingMessage, build_rfc2822, encode_raw, reply_references, resolve_reply_recipients,
};
use crate::gmail::GmailClient;
use crate::models::{ReplyRequest, SendRequest};

/// Send a new message. Returns the provider's id for the sent message.
pub fn send_email(client: &GmailClient, request: &SendRequest) -> Result<String, MailError> {
    if request.to.is_empty() {
        return Err(MailError::InvalidRequest {
            message: "send request has no recipients".to_string(),
        });
    }

    let profile = client.get_profile()?;

    let outgoing = OutgoingMessage {
        from: &profile.email_address,
        to: &request.to,
        cc: &request.cc,
        bcc: &request.bcc,
        subject: &request.subject,
        body: &request.body,
        is_html: request.is_html,
        in_reply_to: None,
        references: None,
    };
    let raw = encode_raw(&build_rfc2822(&outgoing));

    let response = client.send_message(&raw, None)?;
    info!("sent message {} to {} recipients", response.id, request.to.len());
    Ok(response.id)
}

/// Reply within a thread. Returns the provider's id for the sent message.
///
/// Threading headers follow the reply rule: In-Reply-To is the last
/// message's Message-ID and References is its References with that
/// Message-ID appended, so conversation grouping survives in other clients.
pub fn reply_to_thread(client: &GmailClient, request: &ReplyRequest) -> Result<String, MailError> {
    let profile = client.get_profile()?;
    let thread = client.get_thread(&request.thread_id)?;

    let last_raw = thread
        .messages
        .into_iter()
        .next_back()
        .ok_or_else(|| MailError::InvalidRequest {
            message: format!("thread {} has no messages to reply to", request.thread_id),
        })?;
    let last = codec::decode_message(last_raw)?;

    let (to, cc) = resolve_reply_recipients(&last, &profile.email_address, request.reply_all);
    let subject = reply_subject(&last.subject);
    let references = last
        .message_id
        .as_deref()
        .map(|mid| reply_references(last.references.as_deref(), mid));

    let outgoing = OutgoingMessage {
        from: &profile.email_address,
        to: &to,
        cc: &cc,
        bcc: &[],
        subject: &subject,
        body: &request.body,
        is_html: request.is_html,
        in_reply_to: last.message_id.as_deref(),
        references: references.as_deref(),
    };
    let raw = encode_raw(&build_rfc2822(&outgoing));

    let response = client.send_message(&raw, Some(&request.thread_id))?;
    info!(
        "replied in thread {} with message {}",
        request.thread_id, response.id
    );
    Ok(response.id)
}

/// Prefix the subject with "Re: " unless it already carries one.
fn reply_subject(subject: &str) -> String {
    let trimmed = subject.trim();
    if trimmed.len() >= 3 && trimmed[..3].eq_ignore_ascii_case("re:") {
        trimmed.to_string()
    } else if trimmed.is_empty() {
        "Re:".to_string()
    } else {
        format!("Re: {trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_subject_adds_prefix() {
        assert_eq!(reply_subject("Deal update"), "Re: Deal update");
    }

    #[test]
    fn test_reply_subject_keeps_existing_prefix() {
        assert_eq!(reply_subject("Re: Deal update"), "Re: Deal update");
        assert_eq!(reply_subject("RE: Deal update"), "RE: Deal update");
    }

    #[test]
    fn test_reply_subject_empty() {
        assert_eq!(reply_subject(""), "Re:");
    }
}
