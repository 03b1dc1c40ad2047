//! HTML rendering and the localized landing page.

use axum::extract::{Path, State};
use axum::http::header::{AsHeaderName, ACCEPT_LANGUAGE};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Serialize;
use sirbro_shared::constants::APP_NAME;
use sirbro_shared::deeplink::DeepLinkConfig;
use sirbro_shared::i18n::{detect_locale, Dictionary, Locale};
use sirbro_shared::platform::Platform;
use tera::{Context, Tera};

use crate::api::AppState;
use crate::error::ServerError;

const TEMPLATES: [(&str, &str); 7] = [
    ("base.html", include_str!("../templates/base.html")),
    ("race.html", include_str!("../templates/race.html")),
    ("home.html", include_str!("../templates/home.html")),
    ("invite.html", include_str!("../templates/invite.html")),
    ("invalid_link.html", include_str!("../templates/invalid_link.html")),
    ("magic_auth.html", include_str!("../templates/magic_auth.html")),
    ("magic_error.html", include_str!("../templates/magic_error.html")),
];

/// Compiled page templates, built once at startup.
pub struct Pages {
    tera: Tera,
}

impl Pages {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES)?;
        Ok(Self { tera })
    }

    pub fn render(&self, template: &str, context: &Context) -> Result<Html<String>, ServerError> {
        Ok(Html(self.tera.render(template, context)?))
    }
}

/// Context shared by every localized page.
pub fn base_context(locale: Locale) -> Context {
    let mut context = Context::new();
    context.insert("app_name", APP_NAME);
    context.insert("lang", locale.as_str());
    context.insert("t", locale.dictionary());
    context
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StoreButton {
    pub platform: Platform,
    pub label: &'static str,
    pub url: String,
}

/// One button per store that has a URL configured.
pub fn store_buttons(config: &DeepLinkConfig, dictionary: &Dictionary) -> Vec<StoreButton> {
    config
        .download_platforms()
        .into_iter()
        .filter_map(|platform| {
            let url = config.store_url(platform)?.to_string();
            Some(StoreButton {
                platform,
                label: store_label(platform, dictionary),
                url,
            })
        })
        .collect()
}

pub fn store_label(platform: Platform, dictionary: &Dictionary) -> &'static str {
    match platform {
        Platform::Android => dictionary.download.google,
        _ => dictionary.download.apple,
    }
}

pub fn header_str<K: AsHeaderName>(headers: &HeaderMap, name: K) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// `GET /`: send the visitor to the home page of their browser language.
pub async fn root(headers: HeaderMap) -> Redirect {
    let locale = detect_locale(header_str(&headers, ACCEPT_LANGUAGE));
    Redirect::temporary(&format!("/{locale}"))
}

/// `GET /{lang}`
pub async fn home(State(state): State<AppState>, Path(lang): Path<String>) -> Result<Response, ServerError> {
    let locale = Locale::from_code(&lang).ok_or(ServerError::NotFound)?;
    let config = state.config.deep_link_config();

    let mut context = base_context(locale);
    context.insert("downloads", &store_buttons(&config, locale.dictionary()));
    context.insert("locales", &Locale::ALL.map(|l| l.as_str()));

    Ok(state.pages.render("home.html", &context)?.into_response())
}
