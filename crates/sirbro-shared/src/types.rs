//! Wire types of the external SirBro REST API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub name: String,
}

/// Response of `POST /auth/magic-link/exchange` and `/exchange-app`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MagicLinkSession {
    pub access_token: String,
    pub refresh_token: String,
    pub user: AuthUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MagicLinkRequest {
    pub email: String,
    pub locale: String,
}

impl MagicLinkRequest {
    pub fn new(email: &str, locale: &str) -> Self {
        Self {
            email: email.trim().to_lowercase(),
            locale: locale.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenExchangeRequest {
    pub token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LifecycleState {
    New,
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSubscription {
    pub id: String,
    pub provider: Option<String>,
    pub active_plan: String,
    pub subscription_status: Option<String>,
    pub subscription_start_date: Option<String>,
    pub subscription_end_date: Option<String>,
    pub auto_renewing: bool,
}

/// Admin view of an app user. The upstream API mixes snake_case and
/// camelCase keys, hence the per-field renames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub telegram_id: Option<String>,
    pub name_tg: Option<String>,
    pub telegram_username: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub timezone: String,
    pub first_seen_at: Option<String>,
    pub last_active_at: Option<String>,
    pub app_user_id: Option<String>,
    pub sessions: Option<i64>,
    pub lifecycle_state: Option<LifecycleState>,
    pub name_app: Option<String>,
    pub language: String,
    #[serde(rename = "termsAndPoliciesAccepted")]
    pub terms_and_policies_accepted: bool,
    #[serde(rename = "totalXp")]
    pub total_xp: i64,
    #[serde(rename = "totalPoints")]
    pub total_points: i64,
    pub level: i64,
    #[serde(rename = "levelName")]
    pub level_name: String,
    pub subscription: Option<UserSubscription>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: i64,
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub message_type: Option<String>,
    pub content: Option<Map<String, Value>>,
    pub metadata: Option<Map<String, Value>>,
    pub timestamp: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatHistory {
    pub messages: Vec<ChatMessage>,
    pub daily_requests: i64,
}
