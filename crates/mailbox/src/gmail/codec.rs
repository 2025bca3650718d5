//! Message codec between wire payloads and domain models
//!
//! Decoding converts a raw provider message (header list plus a possibly
//! nested part tree) into an [`EmailData`]. Encoding builds the RFC 2822
//! text for send/reply and its base64url transport form.
//!
//! Decoding is all-or-nothing per message: a payload that cannot be decoded
//! yields an error and the sync engine drops that one message. It never
//! yields a partially populated record.

use base64::prelude::*;
use chrono::{TimeZone, Utc};
use log::trace;

use super::api::{GmailMessage, Header, MessagePart, MessagePayload};
use crate::actions::labels;
use crate::error::MailError;
use crate::models::{EmailAddress, EmailData};

/// Nesting limit for multipart descent. Provider-issued trees are shallow;
/// anything deeper is treated as malformed.
const MAX_PART_DEPTH: usize = 10;

/// Decode a raw provider message into a normalized [`EmailData`].
pub fn decode_message(msg: GmailMessage) -> Result<EmailData, MailError> {
    let payload = msg.payload.as_ref().ok_or_else(|| MailError::InvalidRequest {
        message: format!("message {} has no payload", msg.id),
    })?;

    let headers = payload.headers.as_deref();

    let from = extract_header(headers, "From")
        .map(|s| EmailAddress::parse(&s))
        .unwrap_or_else(|| EmailAddress::new("unknown@unknown.com"));

    let to = extract_header(headers, "To")
        .map(|s| parse_address_list(&s))
        .unwrap_or_default();
    let cc = extract_header(headers, "Cc")
        .map(|s| parse_address_list(&s))
        .unwrap_or_default();
    let bcc = extract_header(headers, "Bcc")
        .map(|s| parse_address_list(&s))
        .unwrap_or_default();

    let subject = extract_header(headers, "Subject").unwrap_or_default();

    // Provider timestamp is milliseconds since epoch
    let internal_date: i64 = msg
        .internal_date
        .as_deref()
        .and_then(|d| d.parse().ok())
        .unwrap_or(0);
    let date = Utc
        .timestamp_millis_opt(internal_date)
        .single()
        .unwrap_or_else(Utc::now);

    let body = extract_body(payload, &msg.id)?;

    let label_ids = msg.label_ids.unwrap_or_default();
    let is_read = !label_ids.iter().any(|l| l == labels::UNREAD);
    let is_starred = label_ids.iter().any(|l| l == labels::STARRED);

    Ok(EmailData {
        id: msg.id,
        thread_id: msg.thread_id,
        subject,
        body,
        snippet: decode_html_entities(&msg.snippet),
        from,
        to,
        cc,
        bcc,
        date,
        is_read,
        is_starred,
        labels: label_ids,
        message_id: extract_header(headers, "Message-ID"),
        in_reply_to: extract_header(headers, "In-Reply-To"),
        references: extract_header(headers, "References"),
    })
}

/// An outgoing message ready to be rendered as RFC 2822 text
#[derive(Debug)]
pub struct OutgoingMessage<'a> {
    pub from: &'a str,
    pub to: &'a [String],
    pub cc: &'a [String],
    pub bcc: &'a [String],
    pub subject: &'a str,
    pub body: &'a str,
    pub is_html: bool,
    pub in_reply_to: Option<&'a str>,
    pub references: Option<&'a str>,
}

/// Render an outgoing message as RFC 2822 text.
///
/// Header values are sanitized against CR/LF injection before rendering.
pub fn build_rfc2822(msg: &OutgoingMessage) -> String {
    let mut out = String::new();

    out.push_str(&format!("From: {}\r\n", sanitize_header(msg.from)));
    out.push_str(&format!("To: {}\r\n", join_addresses(msg.to)));
    if !msg.cc.is_empty() {
        out.push_str(&format!("Cc: {}\r\n", join_addresses(msg.cc)));
    }
    if !msg.bcc.is_empty() {
        out.push_str(&format!("Bcc: {}\r\n", join_addresses(msg.bcc)));
    }
    out.push_str(&format!("Subject: {}\r\n", sanitize_header(msg.subject)));
    out.push_str("MIME-Version: 1.0\r\n");
    if msg.is_html {
        out.push_str("Content-Type: text/html; charset=utf-8\r\n");
    } else {
        out.push_str("Content-Type: text/plain; charset=utf-8\r\n");
    }
    if let Some(in_reply_to) = msg.in_reply_to {
        out.push_str(&format!("In-Reply-To: {}\r\n", sanitize_header(in_reply_to)));
    }
    if let Some(references) = msg.references {
        out.push_str(&format!("References: {}\r\n", sanitize_header(references)));
    }
    out.push_str("\r\n");
    out.push_str(msg.body);

    out
}

/// Transport-encode RFC 2822 text for the send endpoint (base64url, no
/// padding).
pub fn encode_raw(rfc2822: &str) -> String {
    BASE64_URL_SAFE_NO_PAD.encode(rfc2822.as_bytes())
}

/// Compute the References header for a reply: the prior message's
/// References with its Message-ID appended, or just the Message-ID when the
/// prior message had none.
pub fn reply_references(prior_references: Option<&str>, prior_message_id: &str) -> String {
    match prior_references {
        Some(refs) if !refs.trim().is_empty() => format!("{} {}", refs.trim(), prior_message_id),
        _ => prior_message_id.to_string(),
    }
}

/// Resolve reply recipients against the thread's last message.
///
/// For a plain reply the sole recipient is the last message's sender. For
/// reply-all the candidate set is {from} ∪ to ∪ cc minus `own_address`, so
/// the account never addresses itself; the first candidate becomes To and
/// the rest become Cc. Replying to a thread where the account was the only
/// participant falls back to the last sender.
pub fn resolve_reply_recipients(
    last: &EmailData,
    own_address: &str,
    reply_all: bool,
) -> (Vec<String>, Vec<String>) {
    if !reply_all {
        return (vec![last.from.email.clone()], Vec::new());
    }

    let own_lower = own_address.to_ascii_lowercase();
    let mut seen = std::collections::HashSet::new();
    let mut candidates = Vec::new();

    let all = std::iter::once(&last.from.email)
        .chain(last.to.iter())
        .chain(last.cc.iter());
    for addr in all {
        let key = addr.to_ascii_lowercase();
        if key == own_lower || key.is_empty() {
            continue;
        }
        if seen.insert(key) {
            candidates.push(addr.clone());
        }
    }

    match candidates.split_first() {
        Some((primary, rest)) => (vec![primary.clone()], rest.to_vec()),
        None => (vec![last.from.email.clone()], Vec::new()),
    }
}

/// Extract a header value by name, case-insensitively
fn extract_header(headers: Option<&[Header]>, name: &str) -> Option<String> {
    headers?.iter().find_map(|h| {
        if h.name.eq_ignore_ascii_case(name) {
            Some(h.value.clone())
        } else {
            None
        }
    })
}

/// Parse a comma-separated address-list header into bare addresses,
/// display names stripped
fn parse_address_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|addr| EmailAddress::parse(addr.trim()).email)
        .filter(|addr| !addr.is_empty())
        .collect()
}

/// Extract the message body, preferring text/html over text/plain.
///
/// Single-part messages carry the data on the payload itself; multipart
/// messages are searched recursively (alternative inside mixed, etc.) up to
/// [`MAX_PART_DEPTH`]. No text part at all is an empty body, not an error;
/// a text part whose data will not decode is an error.
fn extract_body(payload: &MessagePayload, message_id: &str) -> Result<String, MailError> {
    if let Some(mime) = &payload.mime_type
        && (mime.starts_with("text/html") || mime.starts_with("text/plain"))
        && let Some(body) = &payload.body
        && let Some(data) = &body.data
    {
        return decode_text(data, message_id);
    }

    if let Some(parts) = &payload.parts {
        if let Some(data) = find_part_data(parts, "text/html", 0) {
            return decode_text(data, message_id);
        }
        if let Some(data) = find_part_data(parts, "text/plain", 0) {
            return decode_text(data, message_id);
        }
    }

    // Unrecognized single-part type that still carries data
    if let Some(body) = &payload.body
        && let Some(data) = &body.data
    {
        return decode_text(data, message_id);
    }

    trace!("message {message_id} has no text body");
    Ok(String::new())
}

/// Recursively search the part tree for the first part of `mime_type`
fn find_part_data<'a>(parts: &'a [MessagePart], mime_type: &str, depth: usize) -> Option<&'a str> {
    if depth >= MAX_PART_DEPTH {
        return None;
    }

    for part in parts {
        if part
            .mime_type
            .as_ref()
            .is_some_and(|m| m.starts_with(mime_type))
            && let Some(body) = &part.body
            && let Some(data) = &body.data
        {
            return Some(data.as_str());
        }

        if let Some(nested) = &part.parts
            && let Some(data) = find_part_data(nested, mime_type, depth + 1)
        {
            return Some(data);
        }
    }

    None
}

fn decode_text(data: &str, message_id: &str) -> Result<String, MailError> {
    decode_base64(data)
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| MailError::InvalidRequest {
            message: format!("message {message_id} body data is not valid base64 text"),
        })
}

/// Decode base64 body data.
///
/// The provider uses URL-safe base64 but padding varies in practice, so
/// several engines are tried in order.
pub(crate) fn decode_base64(data: &str) -> Option<Vec<u8>> {
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE};

    let decoders: &[&base64::engine::GeneralPurpose] =
        &[&BASE64_URL_SAFE_NO_PAD, &URL_SAFE, &STANDARD, &STANDARD_NO_PAD];

    for decoder in decoders {
        if let Ok(decoded) = decoder.decode(data) {
            return Some(decoded);
        }
    }

    None
}

/// Decode HTML entities in snippet text
fn decode_html_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

fn sanitize_header(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

fn join_addresses(addresses: &[String]) -> String {
    addresses
        .iter()
        .map(|a| sanitize_header(a))
        .collect::<Vec<_>>()
        .join(", ")
}
