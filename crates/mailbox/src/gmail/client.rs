//! Remote mail API HTTP client
//!
//! Thin authenticated wrapper over the provider's REST endpoints. Uses
//! synchronous HTTP (ureq) to be executor-agnostic. The client is built
//! around one bearer token obtained by the caller through
//! [`crate::GmailAuth::get_valid_access_token`]; it never refreshes tokens
//! itself, so every instance is cheap and stateless.
//!
//! Every non-2xx response is classified through the error mapper so callers
//! receive a [`MailError`] kind instead of a raw status code.

use serde::Serialize;
use serde::de::DeserializeOwned;
use ureq::Body;
use ureq::http::Response;

use super::api::{
    BatchModifyRequest, GmailMessage, HistoryResponse, ListMessagesResponse,
    ModifyMessageRequest, ProfileResponse, SendMessageRequest, SendMessageResponse,
    ThreadResponse, WatchRequest, WatchResponse,
};
use crate::error::{MailError, map_response_error, transport_error};

/// Agent with non-2xx statuses surfaced as responses so the error mapper
/// can read the provider's JSON error body.
pub(crate) fn build_agent() -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(Some(std::time::Duration::from_secs(30)))
        .build();
    config.new_agent()
}

/// Authenticated client for the remote mail API
pub struct GmailClient {
    agent: ureq::Agent,
    bearer: String,
    base_url: String,
}

impl GmailClient {
    /// Remote API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1";

    /// Hard cap the provider documents for one listing call
    pub const MAX_LIST_RESULTS: usize = 500;

    /// Create a client around a valid access token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            agent: build_agent(),
            bearer: format!("Bearer {}", access_token.into()),
            base_url: Self::BASE_URL.to_string(),
        }
    }

    /// Override the API base URL (tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// List message IDs for the given labels.
    ///
    /// # Arguments
    /// * `label_ids` - Labels to restrict the listing to (all when empty)
    /// * `max_results` - Messages per page, capped at [`Self::MAX_LIST_RESULTS`]
    /// * `page_token` - Optional continuation token
    pub fn list_messages(
        &self,
        label_ids: &[String],
        max_results: usize,
        page_token: Option<&str>,
    ) -> Result<ListMessagesResponse, MailError> {
        let mut url = format!(
            "{}/users/me/messages?maxResults={}",
            self.base_url,
            max_results.min(Self::MAX_LIST_RESULTS)
        );
        for label in label_ids {
            url.push_str(&format!("&labelIds={}", urlencoding::encode(label)));
        }
        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }

        self.get_json(&url)
    }

    /// Get full message details by ID.
    pub fn get_message(&self, id: &str) -> Result<GmailMessage, MailError> {
        let url = format!(
            "{}/users/me/messages/{}?format=full",
            self.base_url,
            urlencoding::encode(id)
        );
        self.get_json(&url)
    }

    /// Get a full thread, messages in provider order.
    pub fn get_thread(&self, id: &str) -> Result<ThreadResponse, MailError> {
        let url = format!(
            "{}/users/me/threads/{}?format=full",
            self.base_url,
            urlencoding::encode(id)
        );
        self.get_json(&url)
    }

    /// List history records since a cursor.
    ///
    /// Provider quirk, not a choice of this client: the history endpoint
    /// accepts at most ONE label filter per call. Callers that sync several
    /// labels must issue separate calls (the sync engine uses the first
    /// label only and says so in its contract).
    ///
    /// Raises [`MailError::HistoryExpired`] when the provider has pruned
    /// history older than the cursor.
    pub fn list_history(
        &self,
        start_history_id: &str,
        label_id: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<HistoryResponse, MailError> {
        let mut url = format!(
            "{}/users/me/history?startHistoryId={}",
            self.base_url,
            urlencoding::encode(start_history_id)
        );
        if let Some(label) = label_id {
            url.push_str(&format!("&labelId={}", urlencoding::encode(label)));
        }
        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }

        self.get_json(&url)
    }

    /// Fetch the account profile, including its current history cursor.
    pub fn get_profile(&self) -> Result<ProfileResponse, MailError> {
        let url = format!("{}/users/me/profile", self.base_url);
        self.get_json(&url)
    }

    /// Send a transport-encoded RFC 2822 message. Passing `thread_id`
    /// keeps a reply inside its thread on the provider side.
    pub fn send_message(
        &self,
        raw: &str,
        thread_id: Option<&str>,
    ) -> Result<SendMessageResponse, MailError> {
        let url = format!("{}/users/me/messages/send", self.base_url);
        let request = SendMessageRequest {
            raw: raw.to_string(),
            thread_id: thread_id.map(str::to_string),
        };
        self.post_json(&url, &request)
    }

    /// Add and remove labels on a single message.
    pub fn modify_message(
        &self,
        id: &str,
        add_label_ids: &[&str],
        remove_label_ids: &[&str],
    ) -> Result<(), MailError> {
        let url = format!(
            "{}/users/me/messages/{}/modify",
            self.base_url,
            urlencoding::encode(id)
        );
        let request = ModifyMessageRequest {
            add_label_ids: to_owned(add_label_ids),
            remove_label_ids: to_owned(remove_label_ids),
        };
        self.post_unit(&url, &request)
    }

    /// Add and remove labels on many messages in one call.
    pub fn batch_modify_messages(
        &self,
        ids: &[&str],
        add_label_ids: &[&str],
        remove_label_ids: &[&str],
    ) -> Result<(), MailError> {
        let url = format!("{}/users/me/messages/batchModify", self.base_url);
        let request = BatchModifyRequest {
            ids: to_owned(ids),
            add_label_ids: to_owned(add_label_ids),
            remove_label_ids: to_owned(remove_label_ids),
        };
        self.post_unit(&url, &request)
    }

    /// Register a push-notification watch on the given labels.
    pub fn watch(
        &self,
        topic_name: &str,
        label_ids: &[&str],
    ) -> Result<WatchResponse, MailError> {
        let url = format!("{}/users/me/watch", self.base_url);
        let request = WatchRequest {
            topic_name: topic_name.to_string(),
            label_ids: if label_ids.is_empty() {
                None
            } else {
                Some(to_owned(label_ids))
            },
        };
        self.post_json(&url, &request)
    }

    /// Stop push notifications for the account.
    pub fn stop_watch(&self) -> Result<(), MailError> {
        let url = format!("{}/users/me/stop", self.base_url);
        let response = self
            .agent
            .post(&url)
            .header("Authorization", &self.bearer)
            .send_empty()
            .map_err(transport_error)?;
        Self::check_unit(response)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, MailError> {
        let response = self
            .agent
            .get(url)
            .header("Authorization", &self.bearer)
            .call()
            .map_err(transport_error)?;
        Self::check_json(response)
    }

    fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        body: &impl Serialize,
    ) -> Result<T, MailError> {
        let response = self
            .agent
            .post(url)
            .header("Authorization", &self.bearer)
            .send_json(body)
            .map_err(transport_error)?;
        Self::check_json(response)
    }

    fn post_unit(&self, url: &str, body: &impl Serialize) -> Result<(), MailError> {
        let response = self
            .agent
            .post(url)
            .header("Authorization", &self.bearer)
            .send_json(body)
            .map_err(transport_error)?;
        Self::check_unit(response)
    }

    fn check_json<T: DeserializeOwned>(
        mut response: Response<Body>,
    ) -> Result<T, MailError> {
        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(Self::classify(response));
        }
        response
            .body_mut()
            .read_json()
            .map_err(|e| MailError::Api {
                status: Some(status),
                message: format!("failed to decode response body: {e}"),
            })
    }

    fn check_unit(response: Response<Body>) -> Result<(), MailError> {
        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(Self::classify(response));
        }
        Ok(())
    }

    fn classify(mut response: Response<Body>) -> MailError {
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let body = response.body_mut().read_to_string().unwrap_or_default();
        map_response_error(status, retry_after, &body)
    }
}

fn to_owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
