// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth 2.0 client.
//!
//! Handles:
//! - Authorization URL construction with a signed `state`
//! - Authorization code exchange
//! - User info lookup
//! - Refresh-token grants

use crate::config::Config;
use crate::error::AppError;
use crate::models::UserCredentials;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Scopes requested at sign-in.
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/userinfo.profile",
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/drive.file",
];

/// How long a signed `state` stays valid.
pub const STATE_VALIDITY_SECS: i64 = 10 * 60;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// OAuth endpoints (overridable for tests).
#[derive(Debug, Clone)]
pub struct OAuthEndpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl Default for OAuthEndpoints {
    fn default() -> Self {
        Self {
            authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            userinfo_url: "https://www.googleapis.com/oauth2/v2/userinfo".to_string(),
        }
    }
}

/// Failure classes of the OAuth exchange.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// Authorization code expired, reused or otherwise rejected.
    #[error("invalid_grant: {0}")]
    InvalidGrant(String),

    /// Provider returned no access token.
    #[error("No access token in token response")]
    MissingAccessToken,

    /// Stored refresh token was rejected.
    #[error("Refresh token rejected: {0}")]
    RefreshToken(String),

    /// No stored refresh token to renew an expired access token with.
    #[error("No refresh token available")]
    NoRefreshToken,

    /// Profile missing id, email or name.
    #[error("Incomplete user info")]
    IncompleteUserInfo,

    #[error("HTTP {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),
}

impl OAuthError {
    /// Coarse reason reported to the browser after a failed callback.
    pub fn callback_reason(&self) -> &'static str {
        match self {
            OAuthError::InvalidGrant(_) => "code_expired",
            OAuthError::MissingAccessToken => "token_failed",
            OAuthError::RefreshToken(_) | OAuthError::NoRefreshToken => "reauth_needed",
            OAuthError::IncompleteUserInfo => "invalid_user",
            OAuthError::Provider { .. } | OAuthError::Transport(_) => "auth_failed",
        }
    }
}

impl From<OAuthError> for AppError {
    fn from(err: OAuthError) -> Self {
        AppError::OAuth(err.to_string())
    }
}

/// Google account profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleProfile {
    pub google_id: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    id: Option<String>,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Google OAuth client.
#[derive(Clone)]
pub struct GoogleOAuthClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    state_key: Vec<u8>,
    endpoints: OAuthEndpoints,
}

impl GoogleOAuthClient {
    pub fn new(config: &Config) -> Self {
        Self::with_endpoints(config, OAuthEndpoints::default())
    }

    pub fn with_endpoints(config: &Config, endpoints: OAuthEndpoints) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            redirect_uri: config.google_redirect_uri.clone(),
            state_key: config.oauth_state_key.clone(),
            endpoints,
        }
    }

    /// Consent-screen URL with a freshly signed `state`.
    pub fn authorization_url(&self) -> Result<String, AppError> {
        let state = sign_state(&self.state_key, Utc::now())?;
        let scope = SCOPES.join(" ");

        Ok(format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent&state={}",
            self.endpoints.authorize_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&scope),
            state
        ))
    }

    /// Check a `state` returned on the callback.
    pub fn verify_state(&self, state: &str) -> bool {
        verify_state(state, &self.state_key, Utc::now())
    }

    /// Exchange an authorization code for credentials.
    pub async fn exchange_code(&self, code: &str) -> Result<UserCredentials, OAuthError> {
        let response = self
            .http
            .post(&self.endpoints.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| OAuthError::Transport(e.to_string()))?;

        let token = parse_token_response(response, OAuthError::InvalidGrant).await?;
        let access_token = token.access_token.ok_or(OAuthError::MissingAccessToken)?;

        Ok(UserCredentials {
            access_token: Some(access_token),
            refresh_token: token.refresh_token,
            expires_at: token.expires_in.map(expires_at),
        })
    }

    /// Renew an access token with a refresh token.
    ///
    /// The returned credentials carry no refresh token unless Google rotated it.
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<UserCredentials, OAuthError> {
        let response = self
            .http
            .post(&self.endpoints.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| OAuthError::Transport(e.to_string()))?;

        let token = parse_token_response(response, OAuthError::RefreshToken).await?;
        let access_token = token.access_token.ok_or(OAuthError::MissingAccessToken)?;

        tracing::debug!("Google access token refreshed");

        Ok(UserCredentials {
            access_token: Some(access_token),
            refresh_token: token.refresh_token,
            expires_at: token.expires_in.map(expires_at),
        })
    }

    /// Fetch the signed-in account's profile.
    pub async fn fetch_user_info(&self, access_token: &str) -> Result<GoogleProfile, OAuthError> {
        let response = self
            .http
            .get(&self.endpoints.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| OAuthError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(OAuthError::Provider { status, body });
        }

        let info: UserInfoResponse = response
            .json()
            .await
            .map_err(|e| OAuthError::Transport(format!("JSON parse error: {}", e)))?;

        match (info.id, info.email, info.name) {
            (Some(google_id), Some(email), Some(name))
                if !google_id.is_empty() && !email.is_empty() && !name.is_empty() =>
            {
                Ok(GoogleProfile {
                    google_id,
                    email,
                    name,
                    picture: info.picture,
                })
            }
            _ => Err(OAuthError::IncompleteUserInfo),
        }
    }
}

fn expires_at(expires_in: i64) -> DateTime<Utc> {
    Utc::now() + Duration::seconds(expires_in)
}

/// Parse a token endpoint response; `invalid_grant` maps through `on_invalid_grant`.
async fn parse_token_response(
    response: reqwest::Response,
    on_invalid_grant: fn(String) -> OAuthError,
) -> Result<TokenResponse, OAuthError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| OAuthError::Transport(format!("JSON parse error: {}", e)));
    }

    let body = response.text().await.unwrap_or_default();
    if let Ok(err) = serde_json::from_str::<TokenErrorResponse>(&body) {
        if err.error == "invalid_grant" {
            return Err(on_invalid_grant(err.error_description.unwrap_or(err.error)));
        }
    }

    tracing::warn!(status = %status, "Google token endpoint returned error");
    Err(OAuthError::Provider {
        status: status.as_u16(),
        body,
    })
}

// ─── Signed state ────────────────────────────────────────────

/// Build a `state` value: base64url of `"<nonce_hex>|<timestamp_hex>|<hmac_hex>"`.
pub fn sign_state(key: &[u8], now: DateTime<Utc>) -> Result<String, AppError> {
    use ring::rand::{SecureRandom, SystemRandom};

    let mut nonce = [0u8; 16];
    SystemRandom::new()
        .fill(&mut nonce)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG failure")))?;

    let payload = format!("{}|{:x}", hex::encode(nonce), now.timestamp_millis());

    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature)))
}

/// Verify signature and age of a `state` value.
pub fn verify_state(state: &str, key: &[u8], now: DateTime<Utc>) -> bool {
    let Some(decoded) = URL_SAFE_NO_PAD
        .decode(state)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
    else {
        return false;
    };

    let parts: Vec<&str> = decoded.splitn(3, '|').collect();
    let [nonce_hex, timestamp_hex, signature_hex] = parts.as_slice() else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
        return false;
    };
    mac.update(format!("{}|{}", nonce_hex, timestamp_hex).as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    if !bool::from(expected.as_bytes().ct_eq(signature_hex.as_bytes())) {
        tracing::warn!("OAuth state signature mismatch");
        return false;
    }

    let Ok(issued_ms) = i64::from_str_radix(timestamp_hex, 16) else {
        return false;
    };
    let age_ms = now.timestamp_millis() - issued_ms;
    (0..=STATE_VALIDITY_SECS * 1000).contains(&age_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"secret_key";

    #[test]
    fn test_state_round_trip() {
        let now = Utc::now();
        let state = sign_state(KEY, now).unwrap();
        assert!(verify_state(&state, KEY, now + Duration::seconds(30)));
    }

    #[test]
    fn test_state_rejects_wrong_key() {
        let now = Utc::now();
        let state = sign_state(KEY, now).unwrap();
        assert!(!verify_state(&state, b"other_key", now));
    }

    #[test]
    fn test_state_expires() {
        let now = Utc::now();
        let state = sign_state(KEY, now).unwrap();
        assert!(!verify_state(
            &state,
            KEY,
            now + Duration::seconds(STATE_VALIDITY_SECS + 1)
        ));
    }

    #[test]
    fn test_state_rejects_tampering() {
        let now = Utc::now();
        let state = sign_state(KEY, now).unwrap();
        let decoded = String::from_utf8(URL_SAFE_NO_PAD.decode(&state).unwrap()).unwrap();

        // Shift the timestamp forward by editing the payload.
        let mut parts: Vec<String> = decoded.split('|').map(String::from).collect();
        parts[1] = format!("{:x}", now.timestamp_millis() + 1);
        let forged = URL_SAFE_NO_PAD.encode(parts.join("|"));

        assert!(!verify_state(&forged, KEY, now));
        assert!(!verify_state("not base64 !!", KEY, now));
        assert!(!verify_state(&URL_SAFE_NO_PAD.encode("a|b"), KEY, now));
    }

    #[test]
    fn test_authorization_url_parameters() {
        let client = GoogleOAuthClient::new(&Config::default());
        let url = client.authorization_url().unwrap();

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=test_client_id"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
        assert!(url.contains("drive.file"));
        assert!(url.contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A5000%2Fauth%2Fcallback"
        ));

        let state = url.rsplit("state=").next().unwrap();
        assert!(client.verify_state(state));
    }

    #[test]
    fn test_callback_reasons() {
        assert_eq!(
            OAuthError::InvalidGrant("expired".into()).callback_reason(),
            "code_expired"
        );
        assert_eq!(OAuthError::MissingAccessToken.callback_reason(), "token_failed");
        assert_eq!(OAuthError::NoRefreshToken.callback_reason(), "reauth_needed");
        assert_eq!(OAuthError::IncompleteUserInfo.callback_reason(), "invalid_user");
        assert_eq!(
            OAuthError::Transport("timeout".into()).callback_reason(),
            "auth_failed"
        );
    }
}
