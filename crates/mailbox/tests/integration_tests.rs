//! Integration tests for the mailbox crate
//!
//! These tests drive the token lifecycle, transport client and sync engine
//! against a local mock of the remote API.

use base64::prelude::*;
use chrono::{Duration, Utc};
use mockito::Matcher;
use serde_json::json;

use mailbox::{
    GmailAuth, GmailClient, MailError, OauthCredentials, ReplyRequest, SendRequest, SyncCursor,
    SyncOptions, TokenRecord, full_sync, incremental_sync,
};

fn b64(content: &str) -> String {
    BASE64_URL_SAFE_NO_PAD.encode(content)
}

/// A full message payload: multipart/alternative with plain and HTML parts
fn message_json(id: &str, from: &str, to: &str, cc: &str) -> serde_json::Value {
    json!({
        "id": id,
        "threadId": "t1",
        "labelIds": ["INBOX", "UNREAD"],
        "snippet": "preview text",
        "internalDate": "1723000000000",
        "payload": {
            "mimeType": "multipart/alternative",
            "headers": [
                {"name": "From", "value": from},
                {"name": "To", "value": to},
                {"name": "Cc", "value": cc},
                {"name": "Subject", "value": "Deal update"},
                {"name": "Message-ID", "value": format!("<{id}@mail.example.com>")}
            ],
            "parts": [
                {"mimeType": "text/plain", "body": {"data": b64("plain body")}},
                {"mimeType": "text/html", "body": {"data": b64("<p>html body</p>")}}
            ]
        }
    })
}

fn profile_json(email: &str, history_id: &str) -> serde_json::Value {
    json!({
        "emailAddress": email,
        "messagesTotal": 42,
        "threadsTotal": 7,
        "historyId": history_id
    })
}

fn google_error(code: u16, message: &str, reason: &str) -> String {
    json!({
        "error": {
            "code": code,
            "message": message,
            "errors": [{"reason": reason, "message": message}]
        }
    })
    .to_string()
}

fn make_client(server: &mockito::Server) -> GmailClient {
    GmailClient::new("test-access-token").with_base_url(server.url())
}

#[test]
fn test_full_sync_fetches_all_messages_in_batches() {
    let mut server = mockito::Server::new();

    let refs: Vec<_> = (0..250)
        .map(|i| json!({"id": format!("msg{i}"), "threadId": "t1"}))
        .collect();
    let list_mock = server
        .mock("GET", "/users/me/messages")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"messages": refs, "resultSizeEstimate": 250}).to_string())
        .expect(1)
        .create();

    let detail_mock = server
        .mock("GET", Matcher::Regex(r"^/users/me/messages/msg\d+.*$".to_string()))
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            message_json("msgN", "Alice <alice@example.com>", "me@example.com", "").to_string(),
        )
        .expect(250)
        .create();

    let profile_mock = server
        .mock("GET", "/users/me/profile")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(profile_json("me@example.com", "777").to_string())
        .create();

    let client = make_client(&server);
    let result = full_sync(&client, &SyncOptions::default()).unwrap();

    assert_eq!(result.emails.len(), 250);
    assert_eq!(result.stats.fetched, 250);
    assert_eq!(result.stats.decoded, 250);
    assert_eq!(result.stats.skipped, 0);
    // 250 ids at batch size 100: batches of 100, 100, 50
    assert_eq!(result.stats.batches, 3);
    assert_eq!(result.new_cursor, SyncCursor::new("777"));
    assert!(!result.has_more);

    list_mock.assert();
    detail_mock.assert();
    profile_mock.assert();
}

#[test]
fn test_full_sync_reports_pagination() {
    let mut server = mockito::Server::new();

    server
        .mock("GET", "/users/me/messages")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "messages": [{"id": "m1", "threadId": "t1"}],
                "nextPageToken": "page2",
                "resultSizeEstimate": 600
            })
            .to_string(),
        )
        .create();
    server
        .mock("GET", "/users/me/messages/m1")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(message_json("m1", "alice@example.com", "me@example.com", "").to_string())
        .create();
    server
        .mock("GET", "/users/me/profile")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(profile_json("me@example.com", "778").to_string())
        .create();

    let client = make_client(&server);
    let result = full_sync(&client, &SyncOptions::default()).unwrap();

    assert!(result.has_more);
    assert_eq!(result.emails.len(), 1);
    assert_eq!(result.emails[0].body, "<p>html body</p>");
    assert_eq!(result.emails[0].from.email, "alice@example.com");
    assert!(!result.emails[0].is_read);
}

#[test]
fn test_incremental_sync_fetches_each_changed_message_once() {
    let mut server = mockito::Server::new();

    // m1 appears under both messagesAdded and labelsAdded; it must be
    // fetched exactly once.
    server
        .mock("GET", "/users/me/history")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "history": [
                    {
                        "id": "501",
                        "messagesAdded": [{"message": {"id": "m1", "threadId": "t1"}}],
                        "labelsAdded": [
                            {"message": {"id": "m1", "threadId": "t1"}, "labelIds": ["STARRED"]}
                        ]
                    },
                    {
                        "id": "502",
                        "labelsRemoved": [
                            {"message": {"id": "m2", "threadId": "t1"}, "labelIds": ["UNREAD"]}
                        ]
                    }
                ],
                "historyId": "800"
            })
            .to_string(),
        )
        .create();

    let m1_mock = server
        .mock("GET", "/users/me/messages/m1")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(message_json("m1", "alice@example.com", "me@example.com", "").to_string())
        .expect(1)
        .create();
    let m2_mock = server
        .mock("GET", "/users/me/messages/m2")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(message_json("m2", "bob@example.com", "me@example.com", "").to_string())
        .expect(1)
        .create();

    let client = make_client(&server);
    let cursor = SyncCursor::new("700");
    let result = incremental_sync(&client, &cursor, &SyncOptions::default()).unwrap();

    assert_eq!(result.emails.len(), 2);
    assert_eq!(result.new_cursor, SyncCursor::new("800"));
    m1_mock.assert();
    m2_mock.assert();
}

#[test]
fn test_incremental_sync_propagates_history_expired() {
    let mut server = mockito::Server::new();

    server
        .mock("GET", "/users/me/history")
        .match_query(Matcher::Any)
        .with_status(410)
        .with_header("content-type", "application/json")
        .with_body(google_error(410, "Start history ID is too old", "historyExpired"))
        .create();

    let client = make_client(&server);
    let cursor = SyncCursor::new("1");
    let err = incremental_sync(&client, &cursor, &SyncOptions::default()).unwrap_err();

    // The exact kind must reach the caller so it can fall back to full sync
    assert!(matches!(err, MailError::HistoryExpired));
}

#[test]
fn test_incremental_sync_skips_deleted_messages() {
    let mut server = mockito::Server::new();

    server
        .mock("GET", "/users/me/history")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "history": [
                    {
                        "messagesAdded": [
                            {"message": {"id": "gone", "threadId": "t1"}},
                            {"message": {"id": "kept", "threadId": "t1"}}
                        ]
                    }
                ],
                "historyId": "801"
            })
            .to_string(),
        )
        .create();
    server
        .mock("GET", "/users/me/messages/gone")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_header("content-type", "application/json")
        .with_body(google_error(404, "Not Found", "notFound"))
        .create();
    server
        .mock("GET", "/users/me/messages/kept")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(message_json("kept", "alice@example.com", "me@example.com", "").to_string())
        .create();

    let client = make_client(&server);
    let result = incremental_sync(&client, &SyncCursor::new("700"), &SyncOptions::default())
        .unwrap();

    assert_eq!(result.emails.len(), 1);
    assert_eq!(result.emails[0].id, "kept");
    assert_eq!(result.stats.skipped, 1);
}

#[test]
fn test_incremental_sync_keeps_cursor_when_no_changes() {
    let mut server = mockito::Server::new();

    server
        .mock("GET", "/users/me/history")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("{}")
        .create();

    let client = make_client(&server);
    let cursor = SyncCursor::new("700");
    let result = incremental_sync(&client, &cursor, &SyncOptions::default()).unwrap();

    assert!(result.emails.is_empty());
    assert_eq!(result.new_cursor, cursor);
}

#[test]
fn test_get_valid_access_token_refreshes_and_preserves_refresh_token() {
    let mut server = mockito::Server::new();

    let token_mock = server
        .mock("POST", "/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "access_token": "new-access-token",
                "expires_in": 3600,
                "scope": "https://www.googleapis.com/auth/gmail.modify",
                "token_type": "Bearer"
            })
            .to_string(),
        )
        .expect(1)
        .create();

    let auth = GmailAuth::new(OauthCredentials::new("id", "secret"))
        .with_token_url(format!("{}/token", server.url()));

    let expired = TokenRecord::new(
        "stale-access-token",
        Some("keep-me".to_string()),
        Utc::now() - Duration::minutes(1),
        vec![],
    );

    let (access_token, refreshed) = auth.get_valid_access_token(&expired).unwrap();
    assert_eq!(access_token, "new-access-token");

    let refreshed = refreshed.expect("refresh should produce a new record");
    // The provider omitted refresh_token; the original must carry forward
    assert_eq!(refreshed.refresh_token.as_deref(), Some("keep-me"));
    assert!(refreshed.expires_at > Utc::now());

    token_mock.assert();
}

#[test]
fn test_get_valid_access_token_skips_refresh_for_fresh_token() {
    // No server: a network call here would fail the test
    let auth = GmailAuth::new(OauthCredentials::new("id", "secret"))
        .with_token_url("http://127.0.0.1:1/token".to_string());

    let fresh = TokenRecord::new(
        "fresh-access-token",
        Some("rt".to_string()),
        Utc::now() + Duration::hours(1),
        vec![],
    );

    let (access_token, refreshed) = auth.get_valid_access_token(&fresh).unwrap();
    assert_eq!(access_token, "fresh-access-token");
    assert!(refreshed.is_none());
}

#[test]
fn test_exchange_code_without_access_token_fails() {
    let mut server = mockito::Server::new();

    server
        .mock("POST", "/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("{}")
        .create();

    let auth = GmailAuth::new(OauthCredentials::new("id", "secret"))
        .with_token_url(format!("{}/token", server.url()));

    let err = auth
        .exchange_code("auth-code", "https://app.example.com/cb")
        .unwrap_err();
    assert!(matches!(err, MailError::TokenRefreshFailed { .. }));
}

#[test]
fn test_revoke_swallows_failures() {
    let mut server = mockito::Server::new();

    server
        .mock("POST", "/revoke")
        .with_status(400)
        .with_body(google_error(400, "Token expired or revoked", "invalid_token"))
        .create();

    let auth = GmailAuth::new(OauthCredentials::new("id", "secret"))
        .with_revoke_url(format!("{}/revoke", server.url()));

    // Best-effort: no panic, no error surface
    auth.revoke("already-dead-token");
}

#[test]
fn test_unauthorized_maps_to_invalid_token() {
    let mut server = mockito::Server::new();

    server
        .mock("GET", "/users/me/messages/m1")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(google_error(401, "Invalid Credentials", "authError"))
        .create();

    let client = make_client(&server);
    let err = client.get_message("m1").unwrap_err();
    assert!(matches!(err, MailError::InvalidToken { .. }));
    assert_eq!(err.http_status(), Some(401));
}

#[test]
fn test_rate_limit_carries_retry_after_header() {
    let mut server = mockito::Server::new();

    server
        .mock("GET", "/users/me/messages/m1")
        .match_query(Matcher::Any)
        .with_status(429)
        .with_header("content-type", "application/json")
        .with_header("retry-after", "7")
        .with_body(google_error(429, "Rate limit exceeded", "rateLimitExceeded"))
        .create();

    let client = make_client(&server);
    let err = client.get_message("m1").unwrap_err();
    assert!(matches!(err, MailError::RateLimited { .. }));
    assert_eq!(err.retry_after(), Some(7));
    assert!(err.is_retryable());
}

#[test]
fn test_insufficient_scope_maps_from_403_reason() {
    let mut server = mockito::Server::new();

    server
        .mock("GET", "/users/me/messages/m1")
        .match_query(Matcher::Any)
        .with_status(403)
        .with_header("content-type", "application/json")
        .with_body(google_error(403, "Insufficient Permission", "insufficientPermissions"))
        .create();

    let client = make_client(&server);
    let err = client.get_message("m1").unwrap_err();
    assert!(matches!(err, MailError::InsufficientScope { .. }));
    assert!(!err.is_retryable());
}

#[test]
fn test_send_email_posts_encoded_message() {
    let mut server = mockito::Server::new();

    server
        .mock("GET", "/users/me/profile")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(profile_json("me@example.com", "900").to_string())
        .create();
    let send_mock = server
        .mock("POST", "/users/me/messages/send")
        .match_body(Matcher::Regex("\"raw\":".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"id": "sent1", "threadId": "t9"}).to_string())
        .expect(1)
        .create();

    let client = make_client(&server);
    let request = SendRequest::new(
        vec!["alice@example.com".to_string()],
        "Deal update",
        "The numbers are in.",
    );
    let id = mailbox::send_email(&client, &request).unwrap();

    assert_eq!(id, "sent1");
    send_mock.assert();
}

#[test]
fn test_send_email_without_recipients_is_rejected_locally() {
    let server = mockito::Server::new();
    let client = make_client(&server);

    let request = SendRequest::new(vec![], "No one", "body");
    let err = mailbox::send_email(&client, &request).unwrap_err();
    assert!(matches!(err, MailError::InvalidRequest { .. }));
}

#[test]
fn test_reply_resolves_recipients_and_stays_in_thread() {
    let mut server = mockito::Server::new();

    server
        .mock("GET", "/users/me/profile")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(profile_json("me@example.com", "901").to_string())
        .create();
    server
        .mock("GET", Matcher::Regex(r"^/users/me/threads/t1.*$".to_string()))
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "t1",
                "historyId": "901",
                "messages": [
                    message_json(
                        "m1",
                        "Alice <alice@example.com>",
                        "me@example.com, bob@example.com",
                        "carol@example.com"
                    )
                ]
            })
            .to_string(),
        )
        .create();
    let send_mock = server
        .mock("POST", "/users/me/messages/send")
        .match_body(Matcher::PartialJson(json!({"threadId": "t1"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"id": "sent2", "threadId": "t1"}).to_string())
        .expect(1)
        .create();

    let client = make_client(&server);
    let request = ReplyRequest {
        thread_id: "t1".to_string(),
        body: "Agreed.".to_string(),
        is_html: false,
        reply_all: true,
    };
    let id = mailbox::reply_to_thread(&client, &request).unwrap();

    assert_eq!(id, "sent2");
    send_mock.assert();
}

#[test]
fn test_batch_modify_sends_all_ids() {
    let mut server = mockito::Server::new();

    let modify_mock = server
        .mock("POST", "/users/me/messages/batchModify")
        .match_body(Matcher::PartialJson(json!({
            "ids": ["m1", "m2"],
            "removeLabelIds": ["INBOX"]
        })))
        .with_status(204)
        .expect(1)
        .create();

    let client = make_client(&server);
    mailbox::archive(&client, &["m1", "m2"]).unwrap();
    modify_mock.assert();
}

#[test]
fn test_watch_registers_push_subscription() {
    let mut server = mockito::Server::new();

    server
        .mock("POST", "/users/me/watch")
        .match_body(Matcher::PartialJson(json!({
            "topicName": "projects/dealflow/topics/mail",
            "labelIds": ["INBOX"]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"historyId": "902", "expiration": "1723600000000"}).to_string())
        .create();

    let client = make_client(&server);
    let response = client
        .watch("projects/dealflow/topics/mail", &["INBOX"])
        .unwrap();
    assert_eq!(response.history_id, "902");
}
