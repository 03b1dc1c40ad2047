use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{
        header::{AUTHORIZATION, CACHE_CONTROL, REFERRER_POLICY, STRICT_TRANSPORT_SECURITY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS},
        HeaderMap, HeaderValue, Method,
    },
    middleware,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use sirbro_shared::auth::expired_claims;
use sirbro_shared::constants::{ACCESS_TOKEN_COOKIE, AUTH_COOKIE_DAYS, REFRESH_TOKEN_COOKIE};
use sirbro_shared::redact::redact_token;
use sirbro_shared::types::{AuthUser, ChatHistory, MagicLinkSession, TokenExchangeRequest, User};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::locale::locale_redirect;
use crate::pages::{header_str, Pages};
use crate::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::upstream::UpstreamApi;
use crate::{links, pages, well_known};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub pages: Arc<Pages>,
    pub upstream: UpstreamApi,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(config: ServerConfig, rate_limiter: RateLimiter) -> anyhow::Result<Self> {
        let upstream = UpstreamApi::new(config.api_base_url.clone())?;
        Ok(Self {
            config: Arc::new(config),
            pages: Arc::new(Pages::new()?),
            upstream,
            rate_limiter,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let auth_api = Router::new()
        .route("/api/auth/magic-link", post(request_magic_link))
        .route("/api/auth/magic-link/exchange", post(exchange_magic_link))
        .route_layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ));

    let api = Router::new()
        .merge(auth_api)
        .route("/api/auth/logout", post(logout))
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/:id", get(get_user))
        .route("/api/admin/chat/:user_id", get(chat_history))
        .layer(cors);

    let invite_links = Router::new()
        .route("/invite/:channel_id", get(links::invite))
        .route("/channels/join", get(links::channel_join_query))
        .route("/channels/:channel_id/join", get(links::channel_join))
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/", get(pages::root))
        .route("/:lang", get(pages::home))
        .route("/magic-auth", get(links::magic_auth))
        .route("/magic-verify", get(links::magic_verify))
        .route("/robots.txt", get(well_known::robots))
        .route(
            "/.well-known/apple-app-site-association",
            get(well_known::apple_app_site_association).fallback(well_known::method_not_allowed),
        )
        .route(
            "/.well-known/assetlinks.json",
            get(well_known::asset_links).fallback(well_known::method_not_allowed),
        )
        .merge(invite_links)
        .merge(api)
        .fallback(not_found)
        .layer(middleware::from_fn(locale_redirect))
        .layer(SetResponseHeaderLayer::overriding(
            STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=15552000; includeSubDomains; preload"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct SuccessResponse {
    success: bool,
}

#[derive(Deserialize)]
struct MagicLinkBody {
    email: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn not_found() -> ServerError {
    ServerError::NotFound
}

/// Attach the session tokens as long-lived cookies.
pub fn session_cookies(jar: CookieJar, session: &MagicLinkSession, secure: bool) -> CookieJar {
    jar.add(auth_cookie(ACCESS_TOKEN_COOKIE, session.access_token.clone(), secure))
        .add(auth_cookie(REFRESH_TOKEN_COOKIE, session.refresh_token.clone(), secure))
}

fn auth_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(AUTH_COOKIE_DAYS))
        .build()
}

pub fn clear_session_cookies(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(ACCESS_TOKEN_COOKIE).path("/"))
        .remove(Cookie::build(REFRESH_TOKEN_COOKIE).path("/"))
}

/// Admin token from `Authorization: Bearer` or the `accessToken` cookie.
/// A JWT whose `exp` has passed is refused here; every other token is left
/// for upstream to judge.
fn bearer_token(headers: &HeaderMap, jar: &CookieJar) -> Result<String, ServerError> {
    let token = header_str(headers, AUTHORIZATION)
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
        .or_else(|| jar.get(ACCESS_TOKEN_COOKIE).map(|c| c.value().to_string()))
        .filter(|t| !t.is_empty())
        .ok_or(ServerError::Unauthorized)?;

    if let Some(claims) = expired_claims(&token) {
        debug!(
            user = claims.user_id().unwrap_or("unknown"),
            token = %redact_token(Some(&token)).unwrap_or_default(),
            "Refusing expired admin token"
        );
        return Err(ServerError::Unauthorized);
    }

    Ok(token)
}

async fn request_magic_link(
    State(state): State<AppState>,
    Json(body): Json<MagicLinkBody>,
) -> Result<Json<SuccessResponse>, ServerError> {
    let email = body.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ServerError::BadRequest("A valid email address is required".into()));
    }

    state.upstream.request_magic_link(email).await?;
    info!("Magic link requested");
    Ok(Json(SuccessResponse { success: true }))
}

async fn exchange_magic_link(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<TokenExchangeRequest>,
) -> Result<(CookieJar, Json<AuthUser>), ServerError> {
    if body.token.is_empty() {
        return Err(ServerError::BadRequest("Missing token".into()));
    }

    let session = state.upstream.exchange_magic_link(&body.token).await?;
    info!(user = %session.user.id, "Admin session exchanged");
    let jar = session_cookies(jar, &session, state.config.secure_cookies);
    Ok((jar, Json(session.user)))
}

async fn logout(jar: CookieJar) -> (CookieJar, Json<SuccessResponse>) {
    (clear_session_cookies(jar), Json(SuccessResponse { success: true }))
}

async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<Json<Vec<User>>, ServerError> {
    let token = bearer_token(&headers, &jar)?;
    Ok(Json(state.upstream.list_users(&token).await?))
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<Json<User>, ServerError> {
    let token = bearer_token(&headers, &jar)?;
    Ok(Json(state.upstream.get_user(&token, &id).await?))
}

async fn chat_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<Json<ChatHistory>, ServerError> {
    let token = bearer_token(&headers, &jar)?;
    Ok(Json(state.upstream.chat_history(&token, &user_id).await?))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
