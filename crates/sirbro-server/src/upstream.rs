//! Client for the SirBro REST API.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sirbro_shared::constants::MAGIC_LINK_LOCALE;
use sirbro_shared::error::ApiError;
use sirbro_shared::magic::TokenExchange;
use sirbro_shared::types::{ChatHistory, MagicLinkRequest, MagicLinkSession, TokenExchangeRequest, User};
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct UpstreamApi {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl UpstreamApi {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Ask the API to email a magic link. The email is normalized first.
    pub async fn request_magic_link(&self, email: &str) -> Result<(), ApiError> {
        let body = MagicLinkRequest::new(email, MAGIC_LINK_LOCALE);
        let req = self.client.post(self.url("/auth/magic-link")).json(&body);
        send(req).await.map(drop)
    }

    /// Exchange an admin magic-link token for a dashboard session.
    pub async fn exchange_magic_link(&self, token: &str) -> Result<MagicLinkSession, ApiError> {
        self.exchange("/auth/magic-link/exchange", token).await
    }

    pub async fn list_users(&self, bearer: &str) -> Result<Vec<User>, ApiError> {
        let req = self.client.get(self.url("/user")).bearer_auth(bearer);
        decode(send(req).await?).await
    }

    pub async fn get_user(&self, bearer: &str, id: &str) -> Result<User, ApiError> {
        let path = format!("/user/{}", urlencoding::encode(id));
        let req = self.client.get(self.url(&path)).bearer_auth(bearer);
        decode(send(req).await?).await
    }

    pub async fn chat_history(&self, bearer: &str, user_id: &str) -> Result<ChatHistory, ApiError> {
        let path = format!("/chat/history/{}", urlencoding::encode(user_id));
        let req = self.client.get(self.url(&path)).bearer_auth(bearer);
        decode(send(req).await?).await
    }

    /// Token exchanges collapse every rejection into `InvalidMagicLink`;
    /// transport failures are kept apart so they can be logged as such.
    async fn exchange(&self, path: &str, token: &str) -> Result<MagicLinkSession, ApiError> {
        let body = TokenExchangeRequest { token: token.to_string() };
        let req = self.client.post(self.url(path)).json(&body);
        match send(req).await {
            Ok(resp) => decode(resp).await,
            Err(ApiError::Transport(e)) => Err(ApiError::Transport(e)),
            Err(e) => {
                debug!(error = %e, path, "Magic link rejected upstream");
                Err(ApiError::InvalidMagicLink)
            }
        }
    }
}

impl TokenExchange for UpstreamApi {
    async fn exchange_for_app(&self, token: &str) -> Result<MagicLinkSession, ApiError> {
        self.exchange("/auth/magic-link/exchange-app", token).await
    }
}

async fn send(req: RequestBuilder) -> Result<Response, ApiError> {
    let resp = req.send().await.map_err(|e| ApiError::Transport(e.to_string()))?;

    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    match status {
        StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
        StatusCode::NOT_FOUND => Err(ApiError::NotFound),
        _ => {
            let message = resp
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());
            Err(ApiError::Upstream {
                status: status.as_u16(),
                message,
            })
        }
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    resp.json::<T>().await.map_err(|e| ApiError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session_json() -> serde_json::Value {
        json!({
            "accessToken": "access-abc",
            "refreshToken": "refresh-def",
            "user": { "id": "u1", "email": "bro@example.com", "name": "Bro" }
        })
    }

    #[tokio::test]
    async fn test_request_magic_link_normalizes_email() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/magic-link"))
            .and(body_json(json!({ "email": "admin@sirbro.app", "locale": "en-us" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "sent" })))
            .expect(1)
            .mount(&server)
            .await;

        let api = UpstreamApi::new(server.uri()).unwrap();
        api.request_magic_link(" Admin@SirBro.app ").await.unwrap();
    }

    #[tokio::test]
    async fn test_upstream_error_message_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/magic-link"))
            .respond_with(
                ResponseTemplate::new(422).set_body_json(json!({ "message": "Email not allowed" })),
            )
            .mount(&server)
            .await;

        let api = UpstreamApi::new(server.uri()).unwrap();
        let err = api.request_magic_link("nobody@example.com").await.unwrap_err();
        assert_eq!(
            err,
            ApiError::Upstream {
                status: 422,
                message: "Email not allowed".into()
            }
        );
    }

    #[tokio::test]
    async fn test_exchange_for_app() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/magic-link/exchange-app"))
            .and(body_json(json!({ "token": "magic-123" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_json()))
            .mount(&server)
            .await;

        let api = UpstreamApi::new(server.uri()).unwrap();
        let session = api.exchange_for_app("magic-123").await.unwrap();
        assert_eq!(session.access_token, "access-abc");
        assert_eq!(session.user.email, "bro@example.com");
    }

    #[tokio::test]
    async fn test_rejected_exchange_is_invalid_link() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/magic-link/exchange"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "message": "expired" })))
            .mount(&server)
            .await;

        let api = UpstreamApi::new(server.uri()).unwrap();
        assert_eq!(
            api.exchange_magic_link("old-token").await.unwrap_err(),
            ApiError::InvalidMagicLink
        );
    }

    #[tokio::test]
    async fn test_unreachable_api_is_transport_error() {
        let api = UpstreamApi::new("http://127.0.0.1:9").unwrap();
        assert!(matches!(
            api.exchange_for_app("magic-123").await,
            Err(ApiError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_status_mapping_and_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/u404"))
            .and(header("authorization", "Bearer admin-token"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/chat/history/u1"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let api = UpstreamApi::new(server.uri()).unwrap();
        assert_eq!(api.get_user("admin-token", "u404").await.unwrap_err(), ApiError::NotFound);
        assert_eq!(
            api.chat_history("stale-token", "u1").await.unwrap_err(),
            ApiError::Unauthorized
        );
    }

    #[tokio::test]
    async fn test_chat_history_decodes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/chat/history/u1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messages": [{
                    "id": 1,
                    "userId": "u1",
                    "type": "user",
                    "messageType": "text",
                    "content": { "text": "Who wins tonight?" },
                    "metadata": null,
                    "timestamp": "2025-05-01T10:00:00Z",
                    "createdAt": "2025-05-01T10:00:00Z"
                }],
                "dailyRequests": 3
            })))
            .mount(&server)
            .await;

        let api = UpstreamApi::new(server.uri()).unwrap();
        let history = api.chat_history("admin-token", "u1").await.unwrap();
        assert_eq!(history.daily_requests, 3);
        assert_eq!(history.messages[0].kind.as_deref(), Some("user"));
    }
}
