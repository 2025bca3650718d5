//! Error taxonomy for mailbox operations
//!
//! Every remote-API failure is classified into one of the variants below so
//! callers can pattern-match on the kind instead of parsing provider strings.
//! The provider's own message is preserved verbatim for diagnostics.

use serde::Deserialize;

/// Classified failure raised by the mailbox engine.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// The bearer token was rejected (HTTP 401). The caller should refresh
    /// the token and retry the call once; the engine never retries itself.
    #[error("access token rejected: {message}")]
    InvalidToken {
        status: Option<u16>,
        message: String,
    },

    /// An OAuth code exchange or refresh did not produce a usable token.
    #[error("token refresh failed: {message}")]
    TokenRefreshFailed { message: String },

    /// HTTP 429. `retry_after` carries the provider's hint in seconds when
    /// one was supplied.
    #[error("rate limited by provider: {message}")]
    RateLimited {
        status: u16,
        retry_after: Option<u64>,
        message: String,
    },

    /// HTTP 404 on a resource the caller named explicitly.
    #[error("not found: {message}")]
    NotFound { status: u16, message: String },

    /// Locally-detected malformed input (push envelopes, undecodable
    /// message payloads). Never produced from a remote status code.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// Any remote failure that has no more specific classification,
    /// including all 5xx responses.
    #[error("provider api error: {message}")]
    Api {
        status: Option<u16>,
        message: String,
    },

    /// Connection-level failure: timeout, refused, DNS.
    #[error("network error: {message}")]
    Network { message: String },

    /// OAuth client credentials are missing or unreadable.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// HTTP 403 with an insufficient-permission reason. The granted scope
    /// does not cover the operation; the account must re-consent.
    #[error("insufficient oauth scope: {message}")]
    InsufficientScope { status: u16, message: String },

    /// The sync cursor is older than the provider's retained history.
    /// The caller must fall back to a full sync.
    #[error("history cursor expired; a full sync is required")]
    HistoryExpired,
}

impl MailError {
    /// HTTP status associated with this failure, when one exists.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            MailError::InvalidToken { status, .. } | MailError::Api { status, .. } => *status,
            MailError::RateLimited { status, .. }
            | MailError::NotFound { status, .. }
            | MailError::InsufficientScope { status, .. } => Some(*status),
            MailError::HistoryExpired => Some(410),
            _ => None,
        }
    }

    /// Provider-supplied retry hint in seconds, for `RateLimited` only.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            MailError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Whether a caller should retry this call with backoff. Only rate
    /// limits and connection failures qualify; everything else is terminal
    /// for the call that raised it.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MailError::RateLimited { .. } | MailError::Network { .. }
        )
    }
}

/// Google-style JSON error envelope: `{"error": {"code", "message", "errors": [{"reason"}]}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
    #[serde(default)]
    errors: Option<Vec<ErrorItem>>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorItem {
    reason: Option<String>,
    message: Option<String>,
}

/// Classify a non-2xx response into a `MailError`.
///
/// Rules are applied in priority order: 401, 403 + insufficient-permission
/// reason, 403, 404, 429, 410 + history-expired reason, 5xx, everything
/// else. The provider message is kept verbatim wherever it parses.
pub(crate) fn map_response_error(
    status: u16,
    retry_after: Option<u64>,
    body: &str,
) -> MailError {
    let (message, reasons) = parse_error_body(body);

    match status {
        401 => MailError::InvalidToken {
            status: Some(status),
            message,
        },
        403 if mentions_insufficient_permission(&reasons, &message) => {
            MailError::InsufficientScope { status, message }
        }
        403 => MailError::Api {
            status: Some(status),
            message,
        },
        404 => MailError::NotFound { status, message },
        429 => MailError::RateLimited {
            status,
            retry_after,
            message,
        },
        410 if mentions_history_expiry(&reasons, &message) => MailError::HistoryExpired,
        500..=599 => MailError::Api {
            status: Some(status),
            message,
        },
        _ => MailError::Api {
            status: Some(status),
            message,
        },
    }
}

/// Connection-level failures (timeout, refused, DNS) become `Network`.
pub(crate) fn transport_error(err: ureq::Error) -> MailError {
    MailError::Network {
        message: err.to_string(),
    }
}

fn parse_error_body(body: &str) -> (String, Vec<String>) {
    let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) else {
        return (body.trim().to_string(), Vec::new());
    };
    let Some(detail) = envelope.error else {
        return (body.trim().to_string(), Vec::new());
    };

    let mut reasons: Vec<String> = detail
        .errors
        .unwrap_or_default()
        .into_iter()
        .filter_map(|item| item.reason.or(item.message))
        .collect();
    if let Some(status) = detail.status {
        reasons.push(status);
    }

    let message = detail
        .message
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());

    (message, reasons)
}

fn mentions_insufficient_permission(reasons: &[String], message: &str) -> bool {
    let needle = "insufficientpermission";
    reasons
        .iter()
        .any(|r| r.to_ascii_lowercase().contains(needle) || r == "PERMISSION_DENIED")
        || message.to_ascii_lowercase().contains("insufficient permission")
}

fn mentions_history_expiry(reasons: &[String], message: &str) -> bool {
    reasons
        .iter()
        .any(|r| r.to_ascii_lowercase().contains("historyexpired"))
        || message.to_ascii_lowercase().contains("history")
}
