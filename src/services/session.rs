// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Server-side login sessions.
//!
//! The browser holds only an opaque random token in the session cookie; the
//! token maps to a user ID here.

use crate::error::AppError;
use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use ring::rand::{SecureRandom, SystemRandom};
use std::sync::Arc;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "receipt_vault_session";

/// Session lifetime.
pub const SESSION_TTL_DAYS: i64 = 30;

#[derive(Debug, Clone)]
struct Session {
    user_id: u64,
    created_at: DateTime<Utc>,
}

impl Session {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at > Duration::days(SESSION_TTL_DAYS)
    }
}

/// In-memory session table shared across requests.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, Session>>,
    rng: SystemRandom,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            rng: SystemRandom::new(),
        }
    }

    /// Start a session for `user_id`, returning its token.
    ///
    /// Expired sessions are swept first.
    pub fn create(&self, user_id: u64) -> Result<String, AppError> {
        self.create_at(user_id, Utc::now())
    }

    fn create_at(&self, user_id: u64, now: DateTime<Utc>) -> Result<String, AppError> {
        self.purge_expired(now);

        let mut bytes = [0u8; 32];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG failure")))?;
        let token = URL_SAFE_NO_PAD.encode(bytes);

        self.sessions.insert(
            token.clone(),
            Session {
                user_id,
                created_at: now,
            },
        );
        tracing::debug!(user_id, "Session created");
        Ok(token)
    }

    /// User ID for a live session; expired sessions are dropped.
    pub fn user_id(&self, token: &str) -> Option<u64> {
        self.user_id_at(token, Utc::now())
    }

    fn user_id_at(&self, token: &str, now: DateTime<Utc>) -> Option<u64> {
        let session = self.sessions.get(token)?.clone();
        if session.is_expired(now) {
            self.sessions.remove(token);
            return None;
        }
        Some(session.user_id)
    }

    fn purge_expired(&self, now: DateTime<Utc>) {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired(now));
        let purged = before.saturating_sub(self.sessions.len());
        if purged > 0 {
            tracing::debug!(purged, "Expired sessions removed");
        }
    }

    /// End a session. Unknown tokens are ignored.
    pub fn destroy(&self, token: &str) {
        if let Some((_, session)) = self.sessions.remove(token) {
            tracing::debug!(user_id = session.user_id, "Session destroyed");
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Cookie carrying a session token.
pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::days(SESSION_TTL_DAYS))
        .build()
}

/// Cookie used to clear the session cookie.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}
