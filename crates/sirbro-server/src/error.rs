use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sirbro_shared::error::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not authenticated")]
    Unauthorized,

    #[error("Not found")]
    NotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Too many requests")]
    RateLimited,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ServerError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, self.to_string()),
            ServerError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            ServerError::Api(api) => match api {
                ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, api.to_string()),
                ApiError::NotFound => (StatusCode::NOT_FOUND, api.to_string()),
                ApiError::InvalidMagicLink => (StatusCode::BAD_REQUEST, api.to_string()),
                ApiError::Upstream { status, message } => {
                    let status = StatusCode::from_u16(*status)
                        .ok()
                        .filter(|s| s.is_client_error())
                        .unwrap_or(StatusCode::BAD_GATEWAY);
                    (status, message.clone())
                }
                ApiError::Transport(_) | ApiError::Decode(_) => {
                    tracing::error!(error = %api, "Upstream API failure");
                    (StatusCode::BAD_GATEWAY, "Upstream API unavailable".to_string())
                }
            },
            ServerError::Template(e) => {
                tracing::error!(error = %e, "Template rendering failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
