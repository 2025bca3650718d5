//! Full and incremental sync implementation
//!
//! Both entry points are stateless: the cursor comes in from the caller and
//! a new one goes out with the result. Concurrent syncs for *different*
//! accounts are safe; two syncs for the same account race on the cursor and
//! must be serialized by the caller.

use std::collections::HashSet;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::gmail::api::HistoryRecord;
use crate::gmail::{GmailClient, codec};
use crate::models::{EmailData, SyncCursor, SyncResult, SyncStats};
use crate::MailError;
use crate::actions::labels;

/// Tuning knobs for a sync call
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Labels to sync. Incremental sync honors only the FIRST entry: the
    /// provider's history API accepts a single label filter per call.
    pub label_ids: Vec<String>,
    /// Listing cap for full sync, bounded by the provider's per-call ceiling
    pub max_results: usize,
    /// Messages per detail-fetch batch
    pub batch_size: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            label_ids: vec![labels::INBOX.to_string()],
            max_results: GmailClient::MAX_LIST_RESULTS,
            batch_size: 100,
        }
    }
}

/// Full sync: list identifiers for the configured labels, fetch and decode
/// every message, and return the account's current cursor.
///
/// `has_more` reports whether the listing was paginated beyond this call;
/// the caller re-invokes to continue. The returned cursor is read from the
/// account profile after the fetch completes, so it reflects state the
/// caller has actually received.
pub fn full_sync(client: &GmailClient, options: &SyncOptions) -> Result<SyncResult, MailError> {
    let listing = client.list_messages(&options.label_ids, options.max_results, None)?;
    let has_more = listing.next_page_token.is_some();
    let ids: Vec<String> = listing
        .messages
        .unwrap_or_default()
        .into_iter()
        .map(|r| r.id)
        .collect();

    debug!("full sync: {} message ids listed", ids.len());
    let (emails, stats) = fetch_and_decode(client, &ids, options.batch_size);

    let profile = client.get_profile()?;
    info!(
        "full sync complete: {} of {} messages decoded, cursor {}",
        stats.decoded, stats.fetched, profile.history_id
    );

    Ok(SyncResult {
        emails,
        new_cursor: SyncCursor::new(profile.history_id),
        has_more,
        stats,
    })
}

/// Incremental sync: fetch only the messages referenced by change history
/// since `cursor`.
///
/// The union of "message added", "label added" and "label removed" records
/// is fetched once per message regardless of how many records reference it.
/// A message that 404s between the history event and the fetch was deleted
/// remotely and is skipped silently.
///
/// Provider quirk: the history API filters on a single label, so only the
/// first entry of `options.label_ids` is honored here.
///
/// [`MailError::HistoryExpired`] propagates untouched; falling back to a
/// full sync is the caller's decision.
pub fn incremental_sync(
    client: &GmailClient,
    cursor: &SyncCursor,
    options: &SyncOptions,
) -> Result<SyncResult, MailError> {
    let label = options.label_ids.first().map(String::as_str);
    if options.label_ids.len() > 1 {
        warn!(
            "history api supports one label filter; syncing {:?} and ignoring the rest",
            label
        );
    }

    let mut records: Vec<HistoryRecord> = Vec::new();
    let mut latest_history_id = None;
    let mut page_token: Option<String> = None;

    loop {
        let response = client.list_history(cursor.as_str(), label, page_token.as_deref())?;

        if let Some(history) = response.history {
            records.extend(history);
        }
        if response.history_id.is_some() {
            latest_history_id = response.history_id;
        }

        match response.next_page_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    let ids = collect_changed_ids(&records);
    debug!(
        "incremental sync: {} history records referencing {} messages",
        records.len(),
        ids.len()
    );

    let (emails, stats) = fetch_and_decode(client, &ids, options.batch_size);

    let new_cursor = latest_history_id
        .map(SyncCursor::new)
        .unwrap_or_else(|| cursor.clone());
    info!(
        "incremental sync complete: {} of {} messages decoded, cursor {}",
        stats.decoded,
        stats.fetched,
        new_cursor.as_str()
    );

    Ok(SyncResult {
        emails,
        new_cursor,
        has_more: false,
        stats,
    })
}

/// Union of message ids referenced by added/label-changed history records,
/// deduplicated, provider order preserved.
fn collect_changed_ids(records: &[HistoryRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();

    let mut push = |id: &str| {
        if seen.insert(id.to_string()) {
            ids.push(id.to_string());
        }
    };

    for record in records {
        for added in record.messages_added.iter().flatten() {
            push(&added.message.id);
        }
        for change in record.labels_added.iter().flatten() {
            push(&change.message.id);
        }
        for change in record.labels_removed.iter().flatten() {
            push(&change.message.id);
        }
    }

    ids
}

/// Fetch message details in batches and decode each.
///
/// Fetches within a batch fan out over the rayon pool, so concurrency is
/// bounded by the pool size. A failed fetch or an undecodable payload drops
/// that one message (logged); the rest of the batch continues.
fn fetch_and_decode(
    client: &GmailClient,
    ids: &[String],
    batch_size: usize,
) -> (Vec<EmailData>, SyncStats) {
    let mut stats = SyncStats {
        fetched: ids.len(),
        ..SyncStats::default()
    };
    let mut emails = Vec::with_capacity(ids.len());

    for chunk in ids.chunks(batch_size.max(1)) {
        stats.batches += 1;

        let batch: Vec<Option<EmailData>> = chunk
            .par_iter()
            .map(|id| match client.get_message(id) {
                Ok(raw) => match codec::decode_message(raw) {
                    Ok(email) => Some(email),
                    Err(e) => {
                        warn!("dropping message {id}: {e}");
                        None
                    }
                },
                Err(MailError::NotFound { .. }) => {
                    debug!("message {id} deleted remotely; skipping");
                    None
                }
                Err(e) => {
                    warn!("failed to fetch message {id}: {e}");
                    None
                }
            })
            .collect();

        for email in batch.into_iter().flatten() {
            emails.push(email);
        }
    }

    stats.decoded = emails.len();
    stats.skipped = stats.fetched - stats.decoded;
    (emails, stats)
}
