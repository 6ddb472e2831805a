//! Token store flows that need a live token endpoint.

use inkdown_export::backend::auth::{AuthPrompt, NoPrompt, TokenStore};
use inkdown_export::http;
use inkdown_export::ExportError;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use crate::common::{scripted_server, ScriptedResponse};

fn write_credentials(dir: &Path, token_url: &str) -> PathBuf {
    let path = dir.join("credentials.json");
    let credentials = serde_json::json!({
        "client_id": "cid",
        "client_secret": "secret",
        "auth_url": "https://auth.invalid/authorize",
        "token_url": token_url,
    });
    fs::write(&path, credentials.to_string()).unwrap();
    path
}

fn stored_token(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn refresh_preserves_the_stored_refresh_token() {
    let dir = tempfile::tempdir().unwrap();
    let (base, requests) = scripted_server(vec![ScriptedResponse::json(
        r#"{"access_token":"fresh-token","expires_in":3600}"#,
    )]);
    let credentials = write_credentials(dir.path(), &format!("{base}/oauth/token"));

    let cache = dir.path().join("token.json");
    fs::write(
        &cache,
        r#"{"access_token":"stale","refresh_token":"refresh-1","expires_at":100}"#,
    )
    .unwrap();

    let store = TokenStore::new(&credentials);
    let token = store.access_token(&http::agent(), &NoPrompt).unwrap();
    assert_eq!(token, "fresh-token");

    let request = requests.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/oauth/token");
    let body = request.body_json();
    assert_eq!(body["grant_type"], "refresh_token");
    assert_eq!(body["refresh_token"], "refresh-1");
    assert_eq!(body["client_id"], "cid");
    assert_eq!(body["client_secret"], "secret");

    // The endpoint did not echo a refresh token; the old one must survive.
    let persisted = stored_token(&cache);
    assert_eq!(persisted["access_token"], "fresh-token");
    assert_eq!(persisted["refresh_token"], "refresh-1");
}

struct RecordingPrompt {
    seen_url: Mutex<Option<String>>,
}

impl AuthPrompt for RecordingPrompt {
    fn verification_code(&self, auth_url: &str) -> Result<String, ExportError> {
        *self.seen_url.lock().unwrap() = Some(auth_url.to_string());
        Ok("code-123".to_string())
    }
}

#[test]
fn interactive_exchange_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let (base, requests) = scripted_server(vec![ScriptedResponse::json(
        r#"{"access_token":"first-token","refresh_token":"granted-refresh","expires_in":1200}"#,
    )]);
    let credentials = write_credentials(dir.path(), &format!("{base}/oauth/token"));

    // Expired cache without a refresh token forces the interactive path.
    let cache = dir.path().join("token.json");
    fs::write(&cache, r#"{"access_token":"stale","expires_at":100}"#).unwrap();

    let prompt = RecordingPrompt {
        seen_url: Mutex::new(None),
    };
    let store = TokenStore::new(&credentials);
    let token = store.access_token(&http::agent(), &prompt).unwrap();
    assert_eq!(token, "first-token");

    assert_eq!(
        prompt.seen_url.lock().unwrap().as_deref(),
        Some("https://auth.invalid/authorize?client_id=cid&response_type=code")
    );

    let body = requests
        .recv_timeout(Duration::from_secs(5))
        .unwrap()
        .body_json();
    assert_eq!(body["grant_type"], "authorization_code");
    assert_eq!(body["code"], "code-123");
    assert_eq!(body["client_id"], "cid");

    let persisted = stored_token(&cache);
    assert_eq!(persisted["access_token"], "first-token");
    assert_eq!(persisted["refresh_token"], "granted-refresh");
}

#[test]
fn rejected_exchange_is_a_fatal_authentication_error() {
    let dir = tempfile::tempdir().unwrap();
    let (base, _requests) = scripted_server(vec![ScriptedResponse::status(400)]);
    let credentials = write_credentials(dir.path(), &format!("{base}/oauth/token"));

    let cache = dir.path().join("token.json");
    fs::write(
        &cache,
        r#"{"access_token":"stale","refresh_token":"refresh-1","expires_at":100}"#,
    )
    .unwrap();

    let store = TokenStore::new(&credentials);
    let err = store
        .access_token(&http::agent(), &NoPrompt)
        .expect_err("must fail");
    assert!(matches!(err, ExportError::Authentication(_)));
    assert!(err.is_fatal());
}
