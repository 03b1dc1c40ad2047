//! Deep-link configuration, request parameters and URL construction.

use serde::{Deserialize, Serialize};

use crate::constants::{AUTH_CALLBACK_PATH, CHANNEL_JOIN_PATH, DEFAULT_ANDROID_PACKAGE, DEFAULT_APP_SCHEME};
use crate::error::InviteError;
use crate::platform::{app_store_url, Platform};

/// Scheme and store settings for one navigation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepLinkConfig {
    pub app_custom_scheme: String,
    pub ios_app_store_url: Option<String>,
    pub android_play_url: Option<String>,
    /// Only used for Android `intent://` URLs.
    pub android_package_name: String,
}

impl Default for DeepLinkConfig {
    fn default() -> Self {
        Self {
            app_custom_scheme: DEFAULT_APP_SCHEME.to_string(),
            ios_app_store_url: None,
            android_play_url: None,
            android_package_name: DEFAULT_ANDROID_PACKAGE.to_string(),
        }
    }
}

impl DeepLinkConfig {
    pub fn new(app_custom_scheme: impl Into<String>) -> Self {
        Self {
            app_custom_scheme: app_custom_scheme.into(),
            ..Self::default()
        }
    }

    /// Empty URLs are stored as `None` so they never render as a dead link.
    pub fn with_ios_store(mut self, url: impl Into<String>) -> Self {
        self.ios_app_store_url = non_empty(url.into());
        self
    }

    pub fn with_android_store(mut self, url: impl Into<String>) -> Self {
        self.android_play_url = non_empty(url.into());
        self
    }

    pub fn with_android_package(mut self, package: impl Into<String>) -> Self {
        self.android_package_name = package.into();
        self
    }

    pub fn store_url(&self, platform: Platform) -> Option<&str> {
        app_store_url(
            platform,
            self.ios_app_store_url.as_deref(),
            self.android_play_url.as_deref(),
        )
    }

    /// Platforms that get a download button.
    pub fn download_platforms(&self) -> Vec<Platform> {
        [Platform::Ios, Platform::Android]
            .into_iter()
            .filter(|p| self.store_url(*p).is_some())
            .collect()
    }
}

/// Route parameters of one invite link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteRequest {
    pub channel_id: String,
    pub token: Option<String>,
}

impl InviteRequest {
    /// Build a request without validating `channel_id`. An empty token is
    /// treated as no token.
    pub fn new(channel_id: impl Into<String>, token: Option<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            token: token.and_then(non_empty),
        }
    }

    /// Build a request from raw route parameters, rejecting a missing or empty
    /// channel id.
    pub fn from_params(
        channel_id: Option<String>,
        token: Option<String>,
    ) -> Result<Self, InviteError> {
        let channel_id = channel_id
            .and_then(non_empty)
            .ok_or(InviteError::MissingChannelId)?;
        Ok(Self::new(channel_id, token))
    }
}

/// `<scheme>://channels/join?channelId=<enc>[&token=<enc>]`
pub fn channel_join_url(scheme: &str, request: &InviteRequest) -> String {
    let mut url = format!(
        "{scheme}://{CHANNEL_JOIN_PATH}?channelId={}",
        urlencoding::encode(&request.channel_id)
    );
    if let Some(token) = &request.token {
        url.push_str("&token=");
        url.push_str(&urlencoding::encode(token));
    }
    url
}

/// Session handed to the app after a successful magic-link exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthCallback {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub locale: String,
}

impl AuthCallback {
    pub fn query(&self) -> String {
        let pairs = [
            ("access_token", &self.access_token),
            ("refresh_token", &self.refresh_token),
            ("user_id", &self.user_id),
            ("email", &self.email),
            ("name", &self.name),
            ("locale", &self.locale),
        ];
        pairs
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// `<scheme>://auth/callback?<query>`
pub fn auth_scheme_url(scheme: &str, callback: &AuthCallback) -> String {
    format!("{scheme}://{AUTH_CALLBACK_PATH}?{}", callback.query())
}

/// `intent://auth/callback?<query>#Intent;scheme=<scheme>;package=<pkg>;end`
///
/// Android WebViews (Gmail and friends) ignore bare custom schemes but honour
/// intent URLs.
pub fn android_intent_url(scheme: &str, package: &str, callback: &AuthCallback) -> String {
    format!(
        "intent://{AUTH_CALLBACK_PATH}?{}#Intent;scheme={scheme};package={package};end",
        callback.query()
    )
}

/// Pick the app-open URL for the magic-login flow.
pub fn auth_open_url(platform: Platform, config: &DeepLinkConfig, callback: &AuthCallback) -> String {
    match platform {
        Platform::Android => android_intent_url(
            &config.app_custom_scheme,
            &config.android_package_name,
            callback,
        ),
        Platform::Ios | Platform::Desktop => auth_scheme_url(&config.app_custom_scheme, callback),
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
