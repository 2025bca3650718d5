//! Push notification decoding
//!
//! The webhook relay delivers a base64-encoded JSON envelope naming the
//! mailbox and its new history cursor. Decoding is pure; whether and when
//! to trigger an incremental sync with the cursor (and debouncing rapid
//! notification bursts) stays with the caller.
//!
//! Signature verification is a real HMAC-SHA256 check over the raw envelope
//! and runs before any parsing. There is deliberately no unverified decode
//! path for webhook input; [`decode_push`] exists for payloads whose
//! authenticity was established by other means.

use ring::hmac;
use serde::Deserialize;

use crate::error::MailError;
use crate::gmail::codec::decode_base64;
use crate::models::SyncCursor;

/// A decoded push notification: which mailbox changed and up to where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushNotification {
    /// Mailbox identity the notification belongs to. The cursor must only
    /// ever be used for this account's sync.
    pub email_address: String,
    /// Cursor to hand to the incremental sync
    pub history_id: SyncCursor,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PushPayload {
    email_address: String,
    history_id: HistoryId,
}

/// The relay serializes historyId as a JSON number; older payloads carry a
/// string.
#[derive(Deserialize)]
#[serde(untagged)]
enum HistoryId {
    Number(u64),
    Text(String),
}

impl HistoryId {
    fn into_string(self) -> String {
        match self {
            HistoryId::Number(n) => n.to_string(),
            HistoryId::Text(s) => s,
        }
    }
}

/// Verify the relay's HMAC-SHA256 signature over the raw envelope.
///
/// `signature_hex` is the hex-encoded MAC. Verification is constant-time.
pub fn verify_push_signature(payload: &[u8], signature_hex: &str, secret: &[u8]) -> bool {
    let Ok(signature) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret);
    hmac::verify(&key, payload, &signature).is_ok()
}

/// Verify the envelope signature, then decode it.
///
/// A bad signature and a malformed envelope are both [`MailError::InvalidRequest`];
/// the error message distinguishes them for diagnostics without leaking the
/// expected MAC.
pub fn decode_signed_push(
    data_b64: &str,
    signature_hex: &str,
    secret: &[u8],
) -> Result<PushNotification, MailError> {
    if !verify_push_signature(data_b64.as_bytes(), signature_hex, secret) {
        return Err(MailError::InvalidRequest {
            message: "push envelope signature verification failed".to_string(),
        });
    }
    decode_push(data_b64)
}

/// Decode a base64 JSON push envelope into a [`PushNotification`].
pub fn decode_push(data_b64: &str) -> Result<PushNotification, MailError> {
    let bytes = decode_base64(data_b64.trim()).ok_or_else(|| MailError::InvalidRequest {
        message: "push envelope is not valid base64".to_string(),
    })?;

    let payload: PushPayload =
        serde_json::from_slice(&bytes).map_err(|e| MailError::InvalidRequest {
            message: format!("push envelope is not valid JSON: {e}"),
        })?;

    let history_id = payload.history_id.into_string();
    if payload.email_address.is_empty() || history_id.is_empty() {
        return Err(MailError::InvalidRequest {
            message: "push envelope missing emailAddress or historyId".to_string(),
        });
    }

    Ok(PushNotification {
        email_address: payload.email_address,
        history_id: SyncCursor::new(history_id),
    })
}
