//! Bearer-token store for the remote documents backend
//!
//! The remote service uses a code-grant sign-in: a credentials file supplies
//! the client identity and endpoint URLs, and the bearer token obtained from
//! the one-time interactive exchange is cached in a JSON file next to it.
//! Later runs reuse the cached token and refresh it in place when it
//! expires, so the interactive exchange happens once per credentials file.
//!
//! All failures surface as [`ExportError::Authentication`], which batch
//! callers treat as fatal: a bad token fails every document the same way,
//! so retrying the rest of a directory is pointless.

use crate::error::ExportError;
use crate::http;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Tokens this close to expiry (seconds) are refreshed eagerly.
const EXPIRY_MARGIN_SECS: u64 = 60;

/// Fallback lifetime when the token endpoint omits `expires_in`.
const DEFAULT_LIFETIME_SECS: u64 = 3600;

/// Client identity and endpoints, loaded from the credentials file.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    /// Authorization endpoint shown to the user during sign-in.
    pub auth_url: String,
    /// Token endpoint for code exchange and refresh.
    pub token_url: String,
}

/// Cached token as persisted on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Unix timestamp (seconds) after which the access token is invalid.
    pub expires_at: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Supplies the verification code for the one-time interactive exchange.
///
/// The library never talks to stdin or stdout itself; interactive callers
/// implement this trait, non-interactive ones pass [`NoPrompt`].
pub trait AuthPrompt: Send + Sync {
    /// Present `auth_url` to the user and return the code they obtained.
    fn verification_code(&self, auth_url: &str) -> Result<String, ExportError>;
}

/// Prompt that always refuses, for contexts without a user.
pub struct NoPrompt;

impl AuthPrompt for NoPrompt {
    fn verification_code(&self, _auth_url: &str) -> Result<String, ExportError> {
        Err(ExportError::Authentication(
            "interactive sign-in required but no prompt is available".to_string(),
        ))
    }
}

/// Loads, refreshes and persists the bearer token for one credentials file.
#[derive(Debug, Clone)]
pub struct TokenStore {
    credentials_path: PathBuf,
    token_path: PathBuf,
}

impl TokenStore {
    /// Store keyed by a credentials file; the token cache lands in
    /// `token.json` in the same directory.
    pub fn new(credentials_path: impl Into<PathBuf>) -> Self {
        let credentials_path = credentials_path.into();
        let token_path = credentials_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("token.json");
        Self {
            credentials_path,
            token_path,
        }
    }

    /// Override the token cache location.
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Current bearer token, going through cache, refresh and the
    /// interactive exchange in that order.
    pub fn access_token(
        &self,
        agent: &ureq::Agent,
        prompt: &dyn AuthPrompt,
    ) -> Result<String, ExportError> {
        if let Some(cached) = self.load_cached() {
            if !expired(&cached) {
                return Ok(cached.access_token);
            }
            if let Some(refresh_token) = cached.refresh_token {
                return self.refresh(agent, &refresh_token);
            }
        }
        self.interactive(agent, prompt)
    }

    /// Cached token, or None when the cache is absent or unreadable.
    fn load_cached(&self) -> Option<StoredToken> {
        let raw = fs::read_to_string(&self.token_path).ok()?;
        serde_json::from_str(&raw).ok()
    }

    fn refresh(&self, agent: &ureq::Agent, refresh_token: &str) -> Result<String, ExportError> {
        let credentials = self.load_credentials()?;
        let response = post_token_request(
            agent,
            &credentials.token_url,
            &serde_json::json!({
                "grant_type": "refresh_token",
                "refresh_token": refresh_token,
                "client_id": credentials.client_id,
                "client_secret": credentials.client_secret,
            }),
        )?;
        // Endpoints may not echo the refresh token back; keep the old one.
        let refresh_token = response
            .refresh_token
            .clone()
            .or_else(|| Some(refresh_token.to_string()));
        self.persist(&response, refresh_token)
    }

    fn interactive(
        &self,
        agent: &ureq::Agent,
        prompt: &dyn AuthPrompt,
    ) -> Result<String, ExportError> {
        let credentials = self.load_credentials()?;
        let auth_url = format!(
            "{}?client_id={}&response_type=code",
            credentials.auth_url, credentials.client_id
        );
        let code = prompt.verification_code(&auth_url)?;
        let response = post_token_request(
            agent,
            &credentials.token_url,
            &serde_json::json!({
                "grant_type": "authorization_code",
                "code": code,
                "client_id": credentials.client_id,
                "client_secret": credentials.client_secret,
            }),
        )?;
        let refresh_token = response.refresh_token.clone();
        self.persist(&response, refresh_token)
    }

    fn load_credentials(&self) -> Result<Credentials, ExportError> {
        let raw = fs::read_to_string(&self.credentials_path).map_err(|_| {
            ExportError::Authentication(format!(
                "credentials file '{}' not found",
                self.credentials_path.display()
            ))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            ExportError::Authentication(format!(
                "credentials file '{}' is malformed: {e}",
                self.credentials_path.display()
            ))
        })
    }

    fn persist(
        &self,
        response: &TokenResponse,
        refresh_token: Option<String>,
    ) -> Result<String, ExportError> {
        let token = StoredToken {
            access_token: response.access_token.clone(),
            refresh_token,
            expires_at: now() + response.expires_in.unwrap_or(DEFAULT_LIFETIME_SECS),
        };
        let serialized = serde_json::to_string_pretty(&token).map_err(|e| {
            ExportError::Authentication(format!("cannot serialize token cache: {e}"))
        })?;
        fs::write(&self.token_path, serialized).map_err(|e| {
            ExportError::Filesystem(format!(
                "writing token cache '{}': {e}",
                self.token_path.display()
            ))
        })?;
        Ok(token.access_token)
    }
}

fn post_token_request(
    agent: &ureq::Agent,
    url: &str,
    body: &serde_json::Value,
) -> Result<TokenResponse, ExportError> {
    let payload = body.to_string();
    let response = agent
        .post(url)
        .header("Content-Type", "application/json")
        .send(payload.as_str())
        .map_err(|e| ExportError::Authentication(format!("token request to {url} failed: {e}")))?;
    let text = response
        .into_body()
        .with_config()
        .limit(http::MAX_API_RESPONSE_SIZE)
        .read_to_string()
        .map_err(|e| ExportError::Authentication(format!("reading token response: {e}")))?;
    serde_json::from_str(&text)
        .map_err(|e| ExportError::Authentication(format!("malformed token response: {e}")))
}

fn expired(token: &StoredToken) -> bool {
    token.expires_at <= now() + EXPIRY_MARGIN_SECS
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
