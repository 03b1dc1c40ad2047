use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use sirbro_shared::i18n::Locale;

/// Prefixes served without a locale segment.
const UNLOCALIZED_PREFIXES: [&str; 13] = [
    "/admin-login",
    "/magic-verify",
    "/magic-auth",
    "/login",
    "/channels",
    "/invite",
    "/api",
    "/favicon.ico",
    "/assets",
    "/.well-known",
    "/robots.txt",
    "/health",
    "/app-ads.txt",
];

/// Where a request without a locale segment should go, if anywhere.
pub fn localized_path(path: &str) -> Option<String> {
    if path == "/"
        || path.ends_with("embed")
        || UNLOCALIZED_PREFIXES.iter().any(|p| path.starts_with(p))
    {
        return None;
    }

    let has_locale = Locale::ALL.iter().any(|locale| {
        let code = locale.as_str();
        path.strip_prefix('/')
            .and_then(|rest| rest.strip_prefix(code))
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    });
    if has_locale {
        return None;
    }

    Some(format!("/{}{}", Locale::DEFAULT, path))
}

/// Redirect (307) paths missing a locale to the default one, keeping the query.
pub async fn locale_redirect(req: Request, next: Next) -> Response {
    let uri = req.uri();
    if let Some(path) = localized_path(uri.path()) {
        let target = match uri.query() {
            Some(query) => format!("{path}?{query}"),
            None => path,
        };
        return Redirect::temporary(&target).into_response();
    }

    next.run(req).await
}
