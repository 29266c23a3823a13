//! Authenticated user session.
//!
//! The login page stores the access token, refresh token and user profile;
//! every API call reads them back to build its `Authorization` header.

use serde::{Deserialize, Serialize};

/// Role allowed to delete stored models.
pub const ADMIN_ROLE: &str = "admin";

/// Profile of the logged-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Tokens and profile of the current session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    access_token: Option<String>,
    refresh_token: Option<String>,
    user: Option<User>,
}

impl Session {
    pub fn new(access_token: impl Into<String>, user: Option<User>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token: None,
            user,
        }
    }

    /// Session with no credentials; requests go out unauthenticated.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// `Authorization` header value, if logged in.
    pub fn bearer(&self) -> Option<String> {
        bearer_of(self.access_token.as_deref())
    }

    /// `Authorization` header value for the refresh endpoint.
    pub fn refresh_bearer(&self) -> Option<String> {
        bearer_of(self.refresh_token.as_deref())
    }

    /// Replace the access token after a refresh.
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = Some(token.into());
    }

    /// Whether the user carries `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.user
            .as_ref()
            .is_some_and(|u| u.roles.iter().any(|r| r == role))
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }

    #[cfg(target_arch = "wasm32")]
    const TOKEN_KEY: &'static str = "accessToken";
    #[cfg(target_arch = "wasm32")]
    const REFRESH_KEY: &'static str = "refreshToken";
    const USER_KEY: &'static str = "user";

    /// Read the session written by the login page (WASM only).
    #[cfg(target_arch = "wasm32")]
    pub fn load_from_local_storage() -> Self {
        let Some(storage) = web_sys::window().and_then(|w| w.local_storage().ok().flatten())
        else {
            log::warn!("localStorage not available, continuing without a session");
            return Self::anonymous();
        };

        let item = |key: &str| storage.get_item(key).ok().flatten();
        let session = Self::from_stored(item(Self::TOKEN_KEY), item(Self::USER_KEY).as_deref());
        match item(Self::REFRESH_KEY) {
            Some(token) => session.with_refresh_token(token),
            None => session,
        }
    }

    /// Persist a refreshed access token so other pages pick it up (WASM only).
    #[cfg(target_arch = "wasm32")]
    pub fn store_access_token(&self) {
        let Some(token) = self.access_token.as_deref() else {
            return;
        };
        let Some(storage) = web_sys::window().and_then(|w| w.local_storage().ok().flatten())
        else {
            return;
        };
        if let Err(e) = storage.set_item(Self::TOKEN_KEY, token) {
            log::warn!("Failed to store refreshed token: {:?}", e);
        }
    }

    fn parse_user(json: &str) -> Option<User> {
        match serde_json::from_str(json) {
            Ok(user) => Some(user),
            Err(e) => {
                log::warn!("Ignoring malformed stored user ({}): {}", Self::USER_KEY, e);
                None
            }
        }
    }

    /// Build a session from the raw stored values.
    pub fn from_stored(access_token: Option<String>, user_json: Option<&str>) -> Self {
        Self {
            access_token,
            refresh_token: None,
            user: user_json.and_then(Self::parse_user),
        }
    }
}

fn bearer_of(token: Option<&str>) -> Option<String> {
    token
        .filter(|t| !t.is_empty())
        .map(|t| format!("Bearer {}", t))
}
