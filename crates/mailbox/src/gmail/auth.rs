//! OAuth2 token lifecycle management
//!
//! Implements authorization-URL construction, code exchange, expiry-aware
//! refresh and revocation for the remote mail API. Uses synchronous HTTP
//! (ureq) to be executor-agnostic.
//!
//! The manager holds no token state: callers pass a [`TokenRecord`] in and
//! persist whatever comes back. [`GmailAuth::get_valid_access_token`] is the
//! single entry point the rest of the engine uses, so the expiry policy
//! lives in exactly one place.

use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use serde::Deserialize;
use url::Url;

use crate::config::OauthCredentials;
use crate::error::MailError;
use crate::gmail::client::build_agent;
use crate::models::TokenRecord;

/// Seconds before actual expiry at which a token is treated as expired.
/// Refreshing ahead of the wall avoids building a request around a token
/// that lapses mid-flight.
pub const EXPIRY_BUFFER_SECS: i64 = 300;

/// Check whether a token is expired relative to "now + buffer".
pub fn is_token_expired(expires_at: DateTime<Utc>, buffer_secs: i64) -> bool {
    Utc::now() + Duration::seconds(buffer_secs) >= expires_at
}

/// Token response from the provider's token endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    scope: Option<String>,
}

/// OAuth2 configuration and token lifecycle for the remote mail API
pub struct GmailAuth {
    credentials: Option<OauthCredentials>,
    agent: ureq::Agent,
    auth_url: String,
    token_url: String,
    revoke_url: String,
}

impl GmailAuth {
    /// OAuth2 endpoints
    const AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";
    const TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";
    const REVOKE_URL: &'static str = "https://oauth2.googleapis.com/revoke";

    /// Required scope for mailbox access (modify allows read + label changes)
    const MODIFY_SCOPE: &'static str = "https://www.googleapis.com/auth/gmail.modify";

    /// Create a manager with explicit credentials.
    pub fn new(credentials: OauthCredentials) -> Self {
        Self::with_credentials(Some(credentials))
    }

    /// Create a manager from the ambient configuration (file, then env).
    /// If nothing is configured, calls that need credentials raise
    /// [`MailError::Config`] rather than failing construction.
    pub fn from_config() -> Self {
        Self::with_credentials(OauthCredentials::load().ok())
    }

    fn with_credentials(credentials: Option<OauthCredentials>) -> Self {
        Self {
            credentials,
            agent: build_agent(),
            auth_url: Self::AUTH_URL.to_string(),
            token_url: Self::TOKEN_URL.to_string(),
            revoke_url: Self::REVOKE_URL.to_string(),
        }
    }

    /// Override the token endpoint (tests)
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Override the revocation endpoint (tests)
    pub fn with_revoke_url(mut self, url: impl Into<String>) -> Self {
        self.revoke_url = url.into();
        self
    }

    fn credentials(&self) -> Result<&OauthCredentials, MailError> {
        self.credentials.as_ref().ok_or_else(|| MailError::Config {
            message: "OAuth client credentials are not configured".to_string(),
        })
    }

    /// Build the authorization URL the user is sent to.
    ///
    /// Requests offline access with forced consent so the provider issues a
    /// refresh token on first authorization. The redirect URI is supplied
    /// per call because web and mobile flows use different targets.
    pub fn build_authorization_url(&self, redirect_uri: &str) -> Result<String, MailError> {
        let creds = self.credentials()?;

        let mut url = Url::parse(&self.auth_url).map_err(|e| MailError::Config {
            message: format!("invalid authorization endpoint: {e}"),
        })?;
        url.query_pairs_mut()
            .append_pair("client_id", &creds.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", Self::MODIFY_SCOPE)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");

        Ok(url.into())
    }

    /// Exchange an authorization code for a token record.
    pub fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenRecord, MailError> {
        let creds = self.credentials()?;

        let response = self.token_request([
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ])?;

        Self::into_record(response, None)
    }

    /// Refresh an access token using a refresh token.
    ///
    /// The provider does not always reissue the refresh token; the input
    /// value is carried forward so the record stays renewable.
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenRecord, MailError> {
        let creds = self.credentials()?;

        let response = self.token_request([
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])?;

        Self::into_record(response, Some(refresh_token))
    }

    /// Return a usable access token for `record`, refreshing it first when
    /// it expires within the buffer window.
    ///
    /// The second element is the replacement record when a refresh happened;
    /// the caller must persist it. An expired record with no refresh token
    /// raises [`MailError::InvalidToken`]: the account has to re-authorize.
    pub fn get_valid_access_token(
        &self,
        record: &TokenRecord,
    ) -> Result<(String, Option<TokenRecord>), MailError> {
        if !is_token_expired(record.expires_at, EXPIRY_BUFFER_SECS) {
            return Ok((record.access_token.clone(), None));
        }

        let refresh_token =
            record
                .refresh_token
                .as_deref()
                .ok_or_else(|| MailError::InvalidToken {
                    status: None,
                    message: "access token expired and no refresh token is available; \
                              re-authorization required"
                        .to_string(),
                })?;

        debug!("access token expired or expiring; refreshing");
        let refreshed = self.refresh(refresh_token)?;
        Ok((refreshed.access_token.clone(), Some(refreshed)))
    }

    /// Revoke an access token. Best-effort: the caller's intent is to
    /// disconnect, which is satisfied even if the token was already
    /// invalid, so failures are logged and swallowed.
    pub fn revoke(&self, access_token: &str) {
        let result = self
            .agent
            .post(&self.revoke_url)
            .send_form([("token", access_token)]);

        match result {
            Ok(response) if response.status().is_success() => {
                debug!("revoked access token");
            }
            Ok(response) => {
                warn!("token revocation returned {}; ignoring", response.status());
            }
            Err(e) => {
                warn!("token revocation failed: {e}; ignoring");
            }
        }
    }

    fn token_request<'a>(
        &self,
        form: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<TokenResponse, MailError> {
        let mut response = self
            .agent
            .post(&self.token_url)
            .send_form(form)
            .map_err(|e| MailError::TokenRefreshFailed {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response
                .body_mut()
                .read_to_string()
                .unwrap_or_default();
            return Err(MailError::TokenRefreshFailed {
                message: format!("token endpoint returned {status}: {}", body.trim()),
            });
        }

        response
            .body_mut()
            .read_json()
            .map_err(|e| MailError::TokenRefreshFailed {
                message: format!("failed to parse token response: {e}"),
            })
    }

    fn into_record(
        response: TokenResponse,
        prior_refresh_token: Option<&str>,
    ) -> Result<TokenRecord, MailError> {
        let access_token = response
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| MailError::TokenRefreshFailed {
                message: "provider returned no access token".to_string(),
            })?;

        let refresh_token = response
            .refresh_token
            .or_else(|| prior_refresh_token.map(str::to_string));

        let expires_at = Utc::now() + Duration::seconds(response.expires_in.unwrap_or(3600));

        let scope = response
            .scope
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        Ok(TokenRecord::new(access_token, refresh_token, expires_at, scope))
    }
}
