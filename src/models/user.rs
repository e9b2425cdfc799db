// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// User profile stored in the metadata store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Locally assigned ID (also used as document ID)
    pub id: u64,
    /// Google account subject ID
    pub google_id: String,
    pub email: String,
    /// Display name
    pub name: String,
    /// Profile picture URL
    pub profile_picture: Option<String>,
    /// Google OAuth access token
    pub access_token: Option<String>,
    /// Google OAuth refresh token
    pub refresh_token: Option<String>,
    /// When the access token expires
    #[serde(default)]
    pub token_expires_at: Option<DateTime<Utc>>,
    /// When the user first signed in
    pub created_at: DateTime<Utc>,
}

/// Identity and credentials returned by a successful Google sign-in.
#[derive(Debug, Clone)]
pub struct GoogleSignIn {
    pub google_id: String,
    pub email: String,
    pub name: String,
    pub profile_picture: Option<String>,
    pub credentials: UserCredentials,
}

/// OAuth credentials for a user.
#[derive(Debug, Clone, Default)]
pub struct UserCredentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl User {
    /// Build a new user record from a first sign-in.
    pub fn from_sign_in(id: u64, sign_in: GoogleSignIn, now: DateTime<Utc>) -> Self {
        Self {
            id,
            google_id: sign_in.google_id,
            email: sign_in.email,
            name: sign_in.name,
            profile_picture: sign_in.profile_picture,
            access_token: sign_in.credentials.access_token,
            refresh_token: sign_in.credentials.refresh_token,
            token_expires_at: sign_in.credentials.expires_at,
            created_at: now,
        }
    }

    /// Replace stored credentials.
    ///
    /// Google only returns a refresh token on consent, so a missing one keeps
    /// the previously stored value.
    pub fn apply_credentials(&mut self, credentials: UserCredentials) {
        self.access_token = credentials.access_token;
        if credentials.refresh_token.is_some() {
            self.refresh_token = credentials.refresh_token;
        }
        self.token_expires_at = credentials.expires_at;
    }
}

/// Public view of a user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: u64,
    pub email: String,
    pub name: String,
    pub profile_picture: Option<String>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            profile_picture: user.profile_picture.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_in(refresh: Option<&str>) -> GoogleSignIn {
        GoogleSignIn {
            google_id: "g-1".to_string(),
            email: "jane@example.com".to_string(),
            name: "Jane".to_string(),
            profile_picture: None,
            credentials: UserCredentials {
                access_token: Some("access-1".to_string()),
                refresh_token: refresh.map(String::from),
                expires_at: None,
            },
        }
    }

    #[test]
    fn test_apply_credentials_keeps_refresh_token() {
        let mut user = User::from_sign_in(1, sign_in(Some("refresh-1")), Utc::now());

        user.apply_credentials(UserCredentials {
            access_token: Some("access-2".to_string()),
            refresh_token: None,
            expires_at: None,
        });

        assert_eq!(user.access_token.as_deref(), Some("access-2"));
        assert_eq!(user.refresh_token.as_deref(), Some("refresh-1"));
    }

    #[test]
    fn test_response_hides_credentials() {
        let user = User::from_sign_in(7, sign_in(Some("refresh-1")), Utc::now());
        let json = serde_json::to_value(UserResponse::from(&user)).unwrap();

        assert_eq!(json["id"], 7);
        assert_eq!(json["email"], "jane@example.com");
        assert!(json.get("profilePicture").is_some());
        assert!(json.get("accessToken").is_none());
    }
}
