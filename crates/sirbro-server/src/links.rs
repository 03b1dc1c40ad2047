//! Invite and magic-login pages.
//!
//! Each request runs a fresh flow from `sirbro_shared::orchestrator`. The
//! effects it produces on entry are logged or turned into a [`PagePlan`];
//! the page carries the plan as data attributes and a small script runs the
//! timer against `visibilitychange` in the browser.

use axum::extract::{Path, Query, State};
use axum::http::header::{ACCEPT_LANGUAGE, USER_AGENT};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sirbro_shared::deeplink::InviteRequest;
use sirbro_shared::i18n::{detect_locale, Locale};
use sirbro_shared::magic::{resolve_magic_link, MagicAuthParams, INVALID_LINK_MESSAGE, MISSING_TOKEN_MESSAGE};
use sirbro_shared::orchestrator::{Effect, InviteFlow, LinkEvent, LinkFlow, LinkState, MagicLinkFlow};
use sirbro_shared::platform::detect;
use sirbro_shared::redact::redact_token;
use tracing::{info, warn};

use crate::api::{session_cookies, AppState};
use crate::error::ServerError;
use crate::pages::{base_context, header_str, store_buttons, store_label};

/// What the served page has to do once loaded.
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct PagePlan {
    pub navigate: Option<String>,
    pub fallback_ms: Option<u64>,
    pub observe_visibility: bool,
}

impl PagePlan {
    /// Log records are emitted here; the rest is left for the browser.
    pub fn from_effects(effects: Vec<Effect>) -> Self {
        let mut plan = Self::default();
        for effect in effects {
            match effect {
                Effect::Log(record) => {
                    let record = Value::Object(record);
                    info!(record = %record, "Deep link attempt");
                }
                Effect::Navigate(url) => plan.navigate = Some(url),
                Effect::StartTimer(delay) => {
                    plan.fallback_ms = Some(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX));
                }
                Effect::ObserveVisibility => plan.observe_visibility = true,
                Effect::OpenExternal(_) | Effect::CancelTimer | Effect::StopObservingVisibility => {}
            }
        }
        plan
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinQuery {
    pub channel_id: Option<String>,
    pub token: Option<String>,
}

/// `GET /invite/{channelId}`, localized from `Accept-Language`.
pub async fn invite(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Query(query): Query<TokenQuery>,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    let locale = detect_locale(header_str(&headers, ACCEPT_LANGUAGE));
    render_invite(&state, &headers, locale, Some(channel_id), query.token)
}

/// `GET /channels/{channelId}/join`
pub async fn channel_join(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Query(query): Query<TokenQuery>,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    render_invite(&state, &headers, Locale::En, Some(channel_id), query.token)
}

/// `GET /channels/join?channelId=&token=`
pub async fn channel_join_query(
    State(state): State<AppState>,
    Query(query): Query<JoinQuery>,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    render_invite(&state, &headers, Locale::En, query.channel_id, query.token)
}

fn render_invite(
    state: &AppState,
    headers: &HeaderMap,
    locale: Locale,
    channel_id: Option<String>,
    token: Option<String>,
) -> Result<Response, ServerError> {
    let dictionary = locale.dictionary();

    let request = match InviteRequest::from_params(channel_id, token) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Rejected invite link");
            let page = state.pages.render("invalid_link.html", &base_context(locale))?;
            return Ok((StatusCode::BAD_REQUEST, page).into_response());
        }
    };

    let platform = detect(header_str(headers, USER_AGENT).unwrap_or_default());
    let config = state.config.deep_link_config();
    let mut flow = InviteFlow::new(config.clone(), request, platform)
        .with_fallback_delay(state.config.fallback_delay)
        .with_store_redirect(state.config.auto_store_redirect);

    let plan = PagePlan::from_effects(flow.handle(LinkEvent::Mount));

    let channel_label = redact_token(Some(&flow.request().channel_id))
        .unwrap_or_else(|| dictionary.deep_link.invalid.to_string());

    let mut context = base_context(locale);
    context.insert("state", flow.state().name());
    context.insert("plan", &plan);
    context.insert("store_redirect", &flow.timeout_store_url());
    context.insert("open_app_url", flow.deep_link_url());
    context.insert("downloads", &store_buttons(&config, dictionary));
    context.insert("channel_label", &channel_label);

    Ok(state.pages.render("invite.html", &context)?.into_response())
}

/// `GET /magic-auth?token=&locale=&error=`: log a user into the mobile app.
pub async fn magic_auth(
    State(state): State<AppState>,
    Query(params): Query<MagicAuthParams>,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    let locale = Locale::En;
    let platform = detect(header_str(&headers, USER_AGENT).unwrap_or_default());
    let mut flow = MagicLinkFlow::new(state.config.deep_link_config(), platform)
        .with_fallback_delay(state.config.fallback_delay);

    let event = resolve_magic_link(&state.upstream, &params).await;
    let plan = PagePlan::from_effects(flow.handle(event));

    if let LinkState::Error { message } = flow.state() {
        return render_magic_error(&state, message);
    }

    let mut context = base_context(locale);
    context.insert("state", flow.state().name());
    context.insert("plan", &plan);
    context.insert("open_url", &flow.open_url());
    context.insert("store_url", &flow.store_url());
    context.insert("store_label", store_label(flow.platform().platform, locale.dictionary()));

    Ok(state.pages.render("magic_auth.html", &context)?.into_response())
}

/// `GET /magic-verify?token=`: dashboard login. Sets the auth cookies and
/// sends the admin on to the dashboard.
pub async fn magic_verify(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
    jar: CookieJar,
) -> Result<Response, ServerError> {
    let Some(token) = query.token.filter(|t| !t.is_empty()) else {
        return render_magic_error(&state, MISSING_TOKEN_MESSAGE);
    };

    match state.upstream.exchange_magic_link(&token).await {
        Ok(session) => {
            info!(user = %session.user.id, "Admin signed in via magic link");
            let jar = session_cookies(jar, &session, state.config.secure_cookies);
            Ok((jar, Redirect::to(&state.config.dashboard_path)).into_response())
        }
        Err(e) => {
            let redacted = redact_token(Some(&token)).unwrap_or_default();
            warn!(token = %redacted, error = %e, "Admin magic link rejected");
            render_magic_error(&state, INVALID_LINK_MESSAGE)
        }
    }
}

fn render_magic_error(state: &AppState, message: &str) -> Result<Response, ServerError> {
    let mut context = base_context(Locale::En);
    context.insert("message", message);
    let page = state.pages.render("magic_error.html", &context)?;
    Ok((StatusCode::BAD_REQUEST, page).into_response())
}
