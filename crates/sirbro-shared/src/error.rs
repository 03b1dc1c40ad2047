use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InviteError {
    #[error("Invitation link is missing the channel id")]
    MissingChannelId,
}

/// Failure of a call to the external SirBro API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Not authenticated")]
    Unauthorized,

    #[error("Not found")]
    NotFound,

    #[error("Invalid or expired magic link")]
    InvalidMagicLink,

    #[error("Upstream API returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Upstream API unreachable: {0}")]
    Transport(String),

    #[error("Malformed upstream response: {0}")]
    Decode(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token is not a three-part JWT")]
    InvalidFormat,

    #[error("Token payload is not valid base64: {0}")]
    Base64(String),

    #[error("Token payload is not valid JSON: {0}")]
    Json(String),
}
