//! Magic-link token exchange feeding [`crate::orchestrator::MagicLinkFlow`].

use std::future::Future;

use serde::Deserialize;
use tracing::warn;

use crate::deeplink::AuthCallback;
use crate::error::ApiError;
use crate::orchestrator::LinkEvent;
use crate::redact::redact_token;
use crate::types::MagicLinkSession;

pub const INVALID_LINK_MESSAGE: &str = "This magic link is invalid or has expired.";
pub const MISSING_TOKEN_MESSAGE: &str = "No token provided.";

/// Locale forwarded to the app when the link does not carry one.
const DEFAULT_CALLBACK_LOCALE: &str = "en-us";

/// Exchanges a single-use magic-link token for an app session.
pub trait TokenExchange {
    fn exchange_for_app(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<MagicLinkSession, ApiError>> + Send;
}

/// Query parameters of `/magic-auth`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MagicAuthParams {
    pub token: Option<String>,
    pub locale: Option<String>,
    /// Set by the API when it already rejected the link before redirecting.
    pub error: Option<String>,
}

/// Run the exchange and turn its outcome into the event that moves the flow
/// out of `Loading`. Failures are never retried.
pub async fn resolve_magic_link<E: TokenExchange>(exchange: &E, params: &MagicAuthParams) -> LinkEvent {
    if params.error.as_deref() == Some("invalid_link") {
        return LinkEvent::ExchangeFailed(INVALID_LINK_MESSAGE.to_string());
    }

    let Some(token) = params.token.as_deref().filter(|t| !t.is_empty()) else {
        return LinkEvent::ExchangeFailed(MISSING_TOKEN_MESSAGE.to_string());
    };

    match exchange.exchange_for_app(token).await {
        Ok(session) => {
            let locale = params
                .locale
                .clone()
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| DEFAULT_CALLBACK_LOCALE.to_string());
            LinkEvent::ExchangeSucceeded(AuthCallback {
                access_token: session.access_token,
                refresh_token: session.refresh_token,
                user_id: session.user.id,
                email: session.user.email,
                name: session.user.name,
                locale,
            })
        }
        Err(e) => {
            let redacted = redact_token(Some(token)).unwrap_or_default();
            warn!(
                token = %redacted,
                error = %e,
                "Magic link exchange failed"
            );
            LinkEvent::ExchangeFailed(INVALID_LINK_MESSAGE.to_string())
        }
    }
}
