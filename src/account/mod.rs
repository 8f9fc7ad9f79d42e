/// Account management
///
/// Credential storage and the session lifecycle: registration, login,
/// token rotation, and profile updates.

mod manager;
mod store;

pub use manager::{NewAccount, SessionManager};
pub use store::{AccountStore, NewAccountRecord};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{db::models::Account, token::TokenPair};

/// Public account projection
///
/// Constructed explicitly from the internal record; the password hash and
/// refresh token are structurally unrepresentable here, so no response can
/// leak them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicAccount {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub cover_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for PublicAccount {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            email: account.email,
            full_name: account.full_name,
            avatar_url: account.avatar_url,
            cover_url: account.cover_url,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Successful login: stripped account view plus the freshly minted pair
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutcome {
    pub account: PublicAccount,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// Login request: either identifier may be supplied
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

/// Refresh request body; the token may also arrive via cookie
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// Password change request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Profile update request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub full_name: String,
    pub email: String,
}
