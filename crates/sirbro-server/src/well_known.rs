//! App-link verification files and robots.txt.

use axum::extract::State;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CACHE_CONTROL, CONTENT_TYPE,
};
use axum::http::HeaderName;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::error::ServerError;

const PUBLIC_JSON_HEADERS: [(HeaderName, &str); 4] = [
    (CACHE_CONTROL, "public, max-age=300"),
    (ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (ACCESS_CONTROL_ALLOW_METHODS, "GET"),
    (ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
];

pub fn apple_app_site_association_json(config: &ServerConfig) -> Value {
    json!({
        "applinks": {
            "apps": [],
            "details": [{
                "appID": config.ios_app_id(),
                "paths": ["/invite/*", "/channels/*"],
            }],
        },
    })
}

pub fn asset_links_json(config: &ServerConfig) -> Value {
    json!([{
        "relation": ["delegate_permission/common.handle_all_urls"],
        "target": {
            "namespace": "android_app",
            "package_name": config.android_package_name,
            "sha256_cert_fingerprints": config.android_cert_fingerprints,
        },
    }])
}

pub fn robots_txt(host: &str) -> String {
    format!(
        "User-agent: *\nAllow: /\nDisallow: /invite/\nDisallow: /channels/\n\nSitemap: https://{host}/sitemap.xml"
    )
}

/// `GET /.well-known/apple-app-site-association`
pub async fn apple_app_site_association(State(state): State<AppState>) -> impl IntoResponse {
    (PUBLIC_JSON_HEADERS, Json(apple_app_site_association_json(&state.config)))
}

/// `GET /.well-known/assetlinks.json`
pub async fn asset_links(State(state): State<AppState>) -> impl IntoResponse {
    (PUBLIC_JSON_HEADERS, Json(asset_links_json(&state.config)))
}

/// Any other method on the verification files.
pub async fn method_not_allowed() -> ServerError {
    ServerError::MethodNotAllowed
}

/// `GET /robots.txt`
pub async fn robots(State(state): State<AppState>) -> impl IntoResponse {
    (
        [
            (CONTENT_TYPE, "text/plain"),
            (CACHE_CONTROL, "public, max-age=3600"),
        ],
        robots_txt(state.config.public_host()),
    )
}
