//! Server configuration loaded from environment variables.
//!
//! Everything except the app scheme and host has a usable default; those two
//! are reported by [`ServerConfig::validate`] so a misdeployed instance is
//! visible in the logs at startup.

use std::net::SocketAddr;
use std::time::Duration;

use sirbro_shared::constants::{
    DEFAULT_ANDROID_CERT_FINGERPRINT, DEFAULT_ANDROID_PACKAGE, DEFAULT_API_BASE_URL,
    DEFAULT_APP_HOST, DEFAULT_APP_SCHEME, DEFAULT_IOS_BUNDLE_ID, FALLBACK_DELAY_MS,
    PLACEHOLDER_TEAM_ID,
};
use sirbro_shared::deeplink::DeepLinkConfig;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Custom URL scheme registered by the mobile app.
    /// Env: `APP_CUSTOM_SCHEME`
    pub app_custom_scheme: String,

    /// Public host of this site, used for the sitemap link in robots.txt.
    /// Env: `APP_HOST`
    pub app_host: String,

    /// Env: `IOS_APP_STORE_URL`
    pub ios_app_store_url: Option<String>,

    /// Env: `IOS_BUNDLE_ID`
    pub ios_bundle_id: String,

    /// Apple developer team, first half of the AASA `appID`.
    /// Env: `IOS_TEAM_ID`
    pub ios_team_id: String,

    /// Env: `ANDROID_PLAY_URL`
    pub android_play_url: Option<String>,

    /// Env: `ANDROID_PACKAGE_NAME`
    pub android_package_name: String,

    /// SHA-256 signing certificate fingerprints for assetlinks.json.
    /// Env: `ANDROID_CERT_FINGERPRINTS` (comma separated)
    pub android_cert_fingerprints: Vec<String>,

    /// Base URL of the SirBro REST API.
    /// Env: `API_BASE_URL`
    /// Default: `https://api.tipsterbro.com/v1`
    pub api_base_url: String,

    /// How long the page waits for the app before falling back.
    /// Env: `FALLBACK_DELAY_MS`
    /// Default: `1500`
    pub fallback_delay: Duration,

    /// Whether a timed-out invite attempt navigates to the store by itself.
    /// Env: `AUTO_STORE_REDIRECT` (true/false)
    /// Default: `true`
    pub auto_store_redirect: bool,

    /// Mark auth cookies `Secure`. Disable only for plain-HTTP development.
    /// Env: `SECURE_COOKIES` (true/false)
    /// Default: `true`
    pub secure_cookies: bool,

    /// Sustained magic-link requests per minute and client.
    /// Env: `AUTH_RATE_PER_MINUTE`
    /// Default: `6`
    pub auth_rate_per_minute: u32,

    /// Requests a client may send in a burst.
    /// Env: `AUTH_RATE_BURST`
    /// Default: `5`
    pub auth_rate_burst: u32,

    /// Where the admin lands after `/magic-verify`.
    /// Env: `DASHBOARD_PATH`
    /// Default: `/en/dashboard`
    pub dashboard_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8080).into(),
            app_custom_scheme: DEFAULT_APP_SCHEME.to_string(),
            app_host: DEFAULT_APP_HOST.to_string(),
            ios_app_store_url: None,
            ios_bundle_id: DEFAULT_IOS_BUNDLE_ID.to_string(),
            ios_team_id: PLACEHOLDER_TEAM_ID.to_string(),
            android_play_url: None,
            android_package_name: DEFAULT_ANDROID_PACKAGE.to_string(),
            android_cert_fingerprints: vec![DEFAULT_ANDROID_CERT_FINGERPRINT.to_string()],
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            fallback_delay: Duration::from_millis(FALLBACK_DELAY_MS),
            auto_store_redirect: true,
            secure_cookies: true,
            auth_rate_per_minute: 6,
            auth_rate_burst: 5,
            dashboard_path: "/en/dashboard".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(addr) = var("HTTP_ADDR") {
            match addr.parse::<SocketAddr>() {
                Ok(parsed) => config.http_addr = parsed,
                Err(_) => tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default"),
            }
        }

        config.app_custom_scheme = var("APP_CUSTOM_SCHEME").unwrap_or_default();
        config.app_host = var("APP_HOST").unwrap_or_default();
        config.ios_app_store_url = var("IOS_APP_STORE_URL");
        config.android_play_url = var("ANDROID_PLAY_URL");

        if let Some(id) = var("IOS_BUNDLE_ID") {
            config.ios_bundle_id = id;
        }
        if let Some(team) = var("IOS_TEAM_ID") {
            config.ios_team_id = team;
        }
        if let Some(package) = var("ANDROID_PACKAGE_NAME") {
            config.android_package_name = package;
        }

        if let Some(list) = var("ANDROID_CERT_FINGERPRINTS") {
            let fingerprints: Vec<String> = list
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(String::from)
                .collect();
            if !fingerprints.is_empty() {
                config.android_cert_fingerprints = fingerprints;
            }
        }

        if let Some(url) = var("API_BASE_URL") {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }

        if let Some(val) = var("FALLBACK_DELAY_MS") {
            match val.parse::<u64>() {
                Ok(ms) => config.fallback_delay = Duration::from_millis(ms),
                Err(_) => tracing::warn!(value = %val, "Invalid FALLBACK_DELAY_MS, using default"),
            }
        }

        if let Some(val) = var("AUTO_STORE_REDIRECT") {
            config.auto_store_redirect = val != "false" && val != "0";
        }

        if let Some(val) = var("SECURE_COOKIES") {
            config.secure_cookies = val != "false" && val != "0";
        }

        for (key, field) in [
            ("AUTH_RATE_PER_MINUTE", &mut config.auth_rate_per_minute),
            ("AUTH_RATE_BURST", &mut config.auth_rate_burst),
        ] {
            if let Some(val) = var(key) {
                match val.parse::<u32>() {
                    Ok(n) => *field = n,
                    Err(_) => tracing::warn!(key, value = %val, "Invalid rate limit setting, using default"),
                }
            }
        }

        if let Some(path) = var("DASHBOARD_PATH") {
            config.dashboard_path = path;
        }

        config
    }

    /// Report required settings that were not provided.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if self.app_custom_scheme.is_empty() {
            missing.push("APP_CUSTOM_SCHEME");
        }
        if self.app_host.is_empty() {
            missing.push("APP_HOST");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Missing(missing))
        }
    }

    /// Deep-link settings handed to each flow. An unset scheme falls back to
    /// the app's default so links stay well-formed.
    pub fn deep_link_config(&self) -> DeepLinkConfig {
        let scheme = if self.app_custom_scheme.is_empty() {
            DEFAULT_APP_SCHEME
        } else {
            &self.app_custom_scheme
        };
        DeepLinkConfig::new(scheme)
            .with_ios_store(self.ios_app_store_url.clone().unwrap_or_default())
            .with_android_store(self.android_play_url.clone().unwrap_or_default())
            .with_android_package(self.android_package_name.clone())
    }

    pub fn public_host(&self) -> &str {
        if self.app_host.is_empty() {
            DEFAULT_APP_HOST
        } else {
            &self.app_host
        }
    }

    /// `<teamId>.<bundleId>` as published in the AASA file.
    pub fn ios_app_id(&self) -> String {
        format!("{}.{}", self.ios_team_id, self.ios_bundle_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.fallback_delay, Duration::from_millis(1500));
        assert!(config.auto_store_redirect);
        assert_eq!(config.api_base_url, "https://api.tipsterbro.com/v1");
    }

    #[test]
    fn test_validate_reports_missing_keys() {
        let config = config_from(&[]);
        assert_eq!(
            config.validate(),
            Err(ConfigError::Missing(vec!["APP_CUSTOM_SCHEME", "APP_HOST"]))
        );

        let config = config_from(&[("APP_CUSTOM_SCHEME", "tipsterbro"), ("APP_HOST", "  ")]);
        assert_eq!(config.validate(), Err(ConfigError::Missing(vec!["APP_HOST"])));

        let config = config_from(&[("APP_CUSTOM_SCHEME", "tipsterbro"), ("APP_HOST", "sirbro.app")]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let config = config_from(&[
            ("HTTP_ADDR", "127.0.0.1:3000"),
            ("ANDROID_CERT_FINGERPRINTS", "AA:BB, CC:DD ,"),
            ("API_BASE_URL", "http://localhost:4000/v1/"),
            ("FALLBACK_DELAY_MS", "2500"),
            ("AUTO_STORE_REDIRECT", "false"),
            ("IOS_TEAM_ID", "TEAM123"),
            ("AUTH_RATE_BURST", "2"),
        ]);
        assert_eq!(config.http_addr, ([127, 0, 0, 1], 3000).into());
        assert_eq!(config.android_cert_fingerprints, vec!["AA:BB", "CC:DD"]);
        assert_eq!(config.api_base_url, "http://localhost:4000/v1");
        assert_eq!(config.fallback_delay, Duration::from_millis(2500));
        assert!(!config.auto_store_redirect);
        assert_eq!(config.ios_app_id(), "TEAM123.ai.levantem.sirbro");
        assert_eq!(config.auth_rate_burst, 2);
        assert_eq!(config.auth_rate_per_minute, 6);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = config_from(&[("HTTP_ADDR", "not-an-addr"), ("FALLBACK_DELAY_MS", "soon")]);
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.fallback_delay, Duration::from_millis(1500));
    }

    #[test]
    fn test_deep_link_config_drops_empty_store_urls() {
        let config = config_from(&[
            ("APP_CUSTOM_SCHEME", "sirbro"),
            ("ANDROID_PLAY_URL", "https://play.google.com/store/apps/details?id=ai.levantem.sirbro"),
        ]);
        let deep_link = config.deep_link_config();
        assert_eq!(deep_link.app_custom_scheme, "sirbro");
        assert_eq!(deep_link.ios_app_store_url, None);
        assert!(deep_link.android_play_url.is_some());

        let unset = config_from(&[]).deep_link_config();
        assert_eq!(unset.app_custom_scheme, "tipsterbro");
    }
}
