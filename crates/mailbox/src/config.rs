//! OAuth credential loading
//!
//! Supports loading OAuth client credentials from (in order of priority):
//! 1. JSON file (Google Cloud Console format) in the Dealflow config dir
//! 2. Runtime environment variables
//!
//! Credentials are an explicit value injected into [`crate::GmailAuth`];
//! nothing here is global state, so multi-tenant credential sets can
//! coexist in one process.

use serde::Deserialize;

use crate::error::MailError;

/// Credentials filename in the Dealflow config directory
const CREDENTIALS_FILE: &str = "google-credentials.json";

/// OAuth client credentials for the remote mail API
#[derive(Debug, Clone)]
pub struct OauthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Google Cloud Console credential file format (installed app)
#[derive(Deserialize)]
struct GoogleCredentialFile {
    installed: Option<InstalledCredentials>,
    web: Option<InstalledCredentials>,
}

#[derive(Deserialize)]
struct InstalledCredentials {
    client_id: String,
    client_secret: String,
}

impl OauthCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Load credentials from the config file, falling back to environment
    /// variables.
    pub fn load() -> Result<Self, MailError> {
        if config::config_exists(CREDENTIALS_FILE) {
            let creds: GoogleCredentialFile =
                config::load_json(CREDENTIALS_FILE).map_err(|e| MailError::Config {
                    message: format!("failed to read {CREDENTIALS_FILE}: {e}"),
                })?;
            return Self::from_credential_file(creds);
        }

        Self::from_env()
    }

    /// Parse credentials from a JSON string (Google Cloud Console format)
    pub fn from_json(json: &str) -> Result<Self, MailError> {
        let creds: GoogleCredentialFile =
            serde_json::from_str(json).map_err(|e| MailError::Config {
                message: format!("failed to parse credentials JSON: {e}"),
            })?;
        Self::from_credential_file(creds)
    }

    /// Load credentials from environment variables
    pub fn from_env() -> Result<Self, MailError> {
        let client_id = std::env::var("GMAIL_CLIENT_ID").map_err(|_| MailError::Config {
            message: "GMAIL_CLIENT_ID environment variable not set".to_string(),
        })?;
        let client_secret = std::env::var("GMAIL_CLIENT_SECRET").map_err(|_| MailError::Config {
            message: "GMAIL_CLIENT_SECRET environment variable not set".to_string(),
        })?;

        Ok(Self {
            client_id,
            client_secret,
        })
    }

    /// Check if credentials are available (file or env vars)
    pub fn is_available() -> bool {
        if config::config_exists(CREDENTIALS_FILE) {
            return true;
        }
        std::env::var("GMAIL_CLIENT_ID").is_ok() && std::env::var("GMAIL_CLIENT_SECRET").is_ok()
    }

    /// Support both "installed" (desktop) and "web" credential types
    fn from_credential_file(creds: GoogleCredentialFile) -> Result<Self, MailError> {
        let installed = creds
            .installed
            .or(creds.web)
            .ok_or_else(|| MailError::Config {
                message: "credentials file missing 'installed' or 'web' section".to_string(),
            })?;

        Ok(Self {
            client_id: installed.client_id,
            client_secret: installed.client_secret,
        })
    }
}
