use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Refresh this long before the access token actually expires.
pub(crate) const REFRESH_MARGIN_SECS: i64 = 60;

/// An authenticated backend session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub email: String,
}

impl AuthSession {
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now <= Duration::seconds(REFRESH_MARGIN_SECS)
    }
}

/// Token grant response from the auth endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub user: Option<TokenUser>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenUser {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthErrorResponse {
    pub error: Option<String>,
    pub error_description: Option<String>,
    pub msg: Option<String>,
}

impl AuthErrorResponse {
    pub fn message(self) -> Option<String> {
        self.error_description.or(self.msg).or(self.error)
    }
}

impl TokenResponse {
    pub fn into_session(self, fallback_email: &str, now: DateTime<Utc>) -> AuthSession {
        let expires_at = self
            .expires_at
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .unwrap_or_else(|| now + Duration::seconds(self.expires_in.unwrap_or(3600)));
        let email = self
            .user
            .and_then(|u| u.email)
            .unwrap_or_else(|| fallback_email.to_string());
        AuthSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            email,
        }
    }
}
