//! Visitor platform classification from the `User-Agent` header.
//!
//! Classification is a pure function of the user-agent string: the same input
//! always yields the same [`PlatformInfo`]. Anything that is not positively
//! identified as iOS or Android resolves to [`Platform::Desktop`].

use serde::{Deserialize, Serialize};

/// User-agent fragments that identify an iOS device.
const IOS_MARKERS: [&str; 4] = ["iphone", "ipad", "ipod", "ios"];

/// User-agent fragment that identifies an Android device.
const ANDROID_MARKER: &str = "android";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    Desktop,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::Desktop => "desktop",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying one user agent. Recomputed per request, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformInfo {
    pub platform: Platform,
    pub user_agent: String,
    #[serde(rename = "isIOS")]
    pub is_ios: bool,
    pub is_android: bool,
    pub is_desktop: bool,
}

/// Classify a user-agent string.
///
/// iOS markers are checked before Android so that user agents carrying both
/// (some embedded browsers do) resolve to iOS.
pub fn detect(user_agent: &str) -> PlatformInfo {
    let ua = user_agent.to_ascii_lowercase();

    let platform = if IOS_MARKERS.iter().any(|marker| ua.contains(marker)) {
        Platform::Ios
    } else if ua.contains(ANDROID_MARKER) {
        Platform::Android
    } else {
        Platform::Desktop
    };

    PlatformInfo {
        platform,
        user_agent: user_agent.to_string(),
        is_ios: platform == Platform::Ios,
        is_android: platform == Platform::Android,
        is_desktop: platform == Platform::Desktop,
    }
}

/// Store URL for `platform`, or `None` on desktop or when the relevant URL was
/// not configured. Empty strings count as "not configured".
pub fn app_store_url<'a>(
    platform: Platform,
    ios_url: Option<&'a str>,
    android_url: Option<&'a str>,
) -> Option<&'a str> {
    let url = match platform {
        Platform::Ios => ios_url,
        Platform::Android => android_url,
        Platform::Desktop => None,
    };
    url.filter(|u| !u.is_empty())
}

pub fn supports_deep_linking(platform: Platform) -> bool {
    matches!(platform, Platform::Ios | Platform::Android)
}

#[cfg(test)]
mod tests {
    use super::*;

    const IOS_URL: &str = "https://apps.apple.com/app/test";
    const ANDROID_URL: &str = "https://play.google.com/store/apps/details?id=test";

    fn exactly_one_flag(info: &PlatformInfo) -> bool {
        [info.is_ios, info.is_android, info.is_desktop]
            .iter()
            .filter(|f| **f)
            .count()
            == 1
    }

    #[test]
    fn test_detect_ios_devices() {
        let agents = [
            "Mozilla/5.0 (iPhone; CPU iPhone OS 14_0 like Mac OS X)",
            "Mozilla/5.0 (iPad; CPU OS 14_0 like Mac OS X)",
            "Mozilla/5.0 (iPod touch; CPU iPhone OS 14_0 like Mac OS X)",
            "SirBroWebView/2.1 (iOS 17.2)",
            "mozilla/5.0 (IPHONE)",
        ];
        for ua in agents {
            let info = detect(ua);
            assert_eq!(info.platform, Platform::Ios, "{ua}");
            assert!(info.is_ios);
            assert!(exactly_one_flag(&info));
        }
    }

    #[test]
    fn test_detect_android_devices() {
        let agents = [
            "Mozilla/5.0 (Linux; Android 10; SM-G975F)",
            "Mozilla/5.0 (Linux; Android 11; Pixel 5)",
            "Dalvik/2.1.0 (Linux; U; ANDROID 13)",
        ];
        for ua in agents {
            let info = detect(ua);
            assert_eq!(info.platform, Platform::Android, "{ua}");
            assert!(info.is_android);
            assert!(exactly_one_flag(&info));
        }
    }

    #[test]
    fn test_ios_wins_over_android() {
        let info = detect("Mozilla/5.0 (iPad; Android compatibility shim)");
        assert_eq!(info.platform, Platform::Ios);
    }

    #[test]
    fn test_detect_desktop_and_empty() {
        let agents = [
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36",
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36",
            "",
        ];
        for ua in agents {
            let info = detect(ua);
            assert_eq!(info.platform, Platform::Desktop, "{ua}");
            assert!(info.is_desktop);
            assert!(exactly_one_flag(&info));
        }
    }

    #[test]
    fn test_detect_is_deterministic() {
        let ua = "Mozilla/5.0 (Linux; Android 11; Pixel 5)";
        assert_eq!(detect(ua), detect(ua));
        assert_eq!(detect(ua).user_agent, ua);
    }

    #[test]
    fn test_app_store_url() {
        assert_eq!(
            app_store_url(Platform::Ios, Some(IOS_URL), Some(ANDROID_URL)),
            Some(IOS_URL)
        );
        assert_eq!(
            app_store_url(Platform::Android, Some(IOS_URL), Some(ANDROID_URL)),
            Some(ANDROID_URL)
        );
        assert_eq!(
            app_store_url(Platform::Desktop, Some(IOS_URL), Some(ANDROID_URL)),
            None
        );
    }

    #[test]
    fn test_app_store_url_missing() {
        assert_eq!(app_store_url(Platform::Ios, None, Some(ANDROID_URL)), None);
        assert_eq!(app_store_url(Platform::Android, None, None), None);
        assert_eq!(app_store_url(Platform::Ios, Some(""), None), None);
    }

    #[test]
    fn test_supports_deep_linking() {
        assert!(supports_deep_linking(Platform::Ios));
        assert!(supports_deep_linking(Platform::Android));
        assert!(!supports_deep_linking(Platform::Desktop));
    }

    #[test]
    fn test_platform_info_serializes_camel_case() {
        let json = serde_json::to_value(detect("iPhone")).unwrap();
        assert_eq!(json["platform"], "ios");
        assert_eq!(json["isIOS"], true);
        assert_eq!(json["isAndroid"], false);
        assert_eq!(json["userAgent"], "iPhone");
    }
}
