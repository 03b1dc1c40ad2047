/// Application name shown on rendered pages
pub const APP_NAME: &str = "SirBro";

/// Custom URL scheme registered by the mobile app
pub const DEFAULT_APP_SCHEME: &str = "tipsterbro";

/// Public host the site is served from
pub const DEFAULT_APP_HOST: &str = "tipsterbro.com";

/// Android application id / iOS bundle id
pub const DEFAULT_ANDROID_PACKAGE: &str = "ai.levantem.sirbro";
pub const DEFAULT_IOS_BUNDLE_ID: &str = "ai.levantem.sirbro";

/// Placeholder used in the AASA file until a team id is configured
pub const PLACEHOLDER_TEAM_ID: &str = "PLACEHOLDER_TEAM_ID";

/// Release signing certificate of the Android app
pub const DEFAULT_ANDROID_CERT_FINGERPRINT: &str =
    "7E:5F:36:FB:27:5C:49:E2:68:58:A4:14:4D:84:C4:B2:47:2B:3F:AD:9D:30:37:71:89:CD:38:79:C8:57:9E:67";

/// How long a deep-link attempt waits for the page to be hidden
pub const FALLBACK_DELAY_MS: u64 = 1500;

/// External SirBro REST API
pub const DEFAULT_API_BASE_URL: &str = "https://api.tipsterbro.com/v1";

/// Locale sent along with magic-link requests
pub const MAGIC_LINK_LOCALE: &str = "en-us";

/// Deep-link path segments
pub const CHANNEL_JOIN_PATH: &str = "channels/join";
pub const AUTH_CALLBACK_PATH: &str = "auth/callback";

/// Cookie names used by the admin dashboard
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Auth cookie lifetime in days (backend tokens do not expire on their own)
pub const AUTH_COOKIE_DAYS: i64 = 365;
