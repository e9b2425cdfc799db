// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google sign-in and session routes.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{GoogleSignIn, User, UserResponse};
use crate::services::google_oauth::OAuthError;
use crate::services::session::{removal_cookie, session_cookie, SESSION_COOKIE};
use crate::AppState;

/// Sign-in routes that work without a session.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/google", get(auth_start))
        .route("/auth/callback", get(auth_callback))
        .route("/api/auth/callback", post(auth_callback_json))
        .route("/api/auth/logout", post(logout))
}

/// Routes that require a session (auth middleware applied in routes/mod.rs).
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/auth/user", get(current_user))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AuthUrlResponse {
    pub auth_url: String,
}

/// Start OAuth flow - return the Google consent URL.
async fn auth_start(State(state): State<Arc<AppState>>) -> Result<Json<AuthUrlResponse>> {
    let auth_url = state.oauth.authorization_url()?;
    tracing::info!(client_id = %state.config.google_client_id, "Starting Google OAuth flow");
    Ok(Json(AuthUrlResponse { auth_url }))
}

/// Why a sign-in attempt failed.
#[derive(Debug)]
enum SignInFailure {
    OAuth(OAuthError),
    Store(AppError),
}

impl SignInFailure {
    fn reason(&self) -> &'static str {
        match self {
            SignInFailure::OAuth(e) => e.callback_reason(),
            SignInFailure::Store(_) => "user_creation_failed",
        }
    }
}

/// Exchange `code`, fetch the profile and create or update the user.
async fn sign_in_with_code(
    state: &AppState,
    code: &str,
) -> std::result::Result<User, SignInFailure> {
    let credentials = state
        .oauth
        .exchange_code(code)
        .await
        .map_err(SignInFailure::OAuth)?;

    let access_token = credentials
        .access_token
        .as_deref()
        .ok_or(SignInFailure::OAuth(OAuthError::MissingAccessToken))?;

    let profile = state
        .oauth
        .fetch_user_info(access_token)
        .await
        .map_err(SignInFailure::OAuth)?;

    let user = state
        .db
        .upsert_google_user(GoogleSignIn {
            google_id: profile.google_id,
            email: profile.email,
            name: profile.name,
            profile_picture: profile.picture,
            credentials,
        })
        .await
        .map_err(SignInFailure::Store)?;

    tracing::info!(user_id = user.id, "User signed in");
    Ok(user)
}

/// Start a session for `user` and attach its cookie.
fn start_session(state: &AppState, jar: CookieJar, user: &User) -> Result<CookieJar> {
    let token = state.sessions.create(user.id)?;
    Ok(jar.add(session_cookie(token, state.config.secure_cookies())))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn login_error(reason: &str) -> Redirect {
    Redirect::to(&format!("/login?error={}", reason))
}

/// OAuth redirect target - exchange code, create session, redirect home.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> (CookieJar, Redirect) {
    if let Some(error) = params.error.as_deref() {
        tracing::warn!(error, "OAuth error from Google");
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        tracing::warn!("OAuth callback without authorization code");
        return (jar, login_error("no_code"));
    };

    let state_ok = params
        .state
        .as_deref()
        .is_some_and(|s| state.oauth.verify_state(s));
    if !state_ok {
        tracing::warn!("Invalid or expired OAuth state parameter");
        return (jar, login_error("auth_failed"));
    }

    let user = match sign_in_with_code(&state, &code).await {
        Ok(user) => user,
        Err(failure) => {
            tracing::warn!(?failure, reason = failure.reason(), "OAuth callback failed");
            return (jar, login_error(failure.reason()));
        }
    };

    match start_session(&state, jar.clone(), &user) {
        Ok(jar) => (jar, Redirect::to("/")),
        Err(e) => {
            tracing::error!(error = %e, user_id = user.id, "Failed to create session");
            (jar, login_error("session_error"))
        }
    }
}

#[derive(Deserialize, Validate)]
pub struct CallbackBody {
    #[validate(length(min = 1, message = "Authorization code is required"))]
    #[serde(default)]
    code: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SignInResponse {
    pub user: UserResponse,
}

/// Code exchange for clients that complete the OAuth redirect themselves.
async fn auth_callback_json(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<CallbackBody>,
) -> Result<(CookieJar, Json<SignInResponse>)> {
    body.validate()?;

    let user = sign_in_with_code(&state, &body.code)
        .await
        .map_err(|failure| match failure {
            SignInFailure::OAuth(OAuthError::IncompleteUserInfo) => {
                AppError::BadRequest("Failed to get user information".to_string())
            }
            SignInFailure::OAuth(e) => e.into(),
            SignInFailure::Store(e) => e,
        })?;

    let jar = start_session(&state, jar, &user)?;
    Ok((
        jar,
        Json(SignInResponse {
            user: UserResponse::from(&user),
        }),
    ))
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Destroy the session and clear its cookie.
async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.destroy(cookie.value());
    }

    (
        jar.remove(removal_cookie()),
        Json(MessageResponse {
            message: "Logged out successfully".to_string(),
        }),
    )
}

/// Get the signed-in user's profile.
async fn current_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let profile = state
        .db
        .get_user(user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from(&profile)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_reasons() {
        assert_eq!(
            SignInFailure::Store(AppError::Database("down".into())).reason(),
            "user_creation_failed"
        );
        assert_eq!(
            SignInFailure::OAuth(OAuthError::InvalidGrant("used".into())).reason(),
            "code_expired"
        );
    }

    #[test]
    fn test_callback_body_requires_code() {
        let body: CallbackBody = serde_json::from_str("{}").unwrap();
        assert!(body.validate().is_err());

        let body: CallbackBody = serde_json::from_str(r#"{"code":"4/abc"}"#).unwrap();
        assert!(body.validate().is_ok());
    }
}
