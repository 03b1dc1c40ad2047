//! Inspection of admin access tokens.
//!
//! Tokens are issued by the external API; the signature is its business. We
//! only read the payload to skip upstream calls with a token that has already
//! expired. Anything we cannot read goes upstream and is judged there.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::TokenError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    pub sub: Option<String>,
    pub app_user_id: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    /// Seconds since the Unix epoch.
    pub exp: Option<i64>,
}

impl TokenClaims {
    /// Tokens without an `exp` claim never expire.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp.is_some_and(|exp| exp < now.timestamp())
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn user_id(&self) -> Option<&str> {
        self.app_user_id.as_deref().or(self.sub.as_deref())
    }
}

/// Decode the payload segment of a JWT without verifying it.
pub fn decode_claims(token: &str) -> Result<TokenClaims, TokenError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(TokenError::InvalidFormat);
    }

    let bytes = base64_url_decode(parts[1])?;
    serde_json::from_slice(&bytes).map_err(|e| TokenError::Json(e.to_string()))
}

/// Claims of a JWT whose `exp` has passed. Opaque tokens, undecodable ones
/// and tokens without `exp` yield `None`.
pub fn expired_claims(token: &str) -> Option<TokenClaims> {
    decode_claims(token).ok().filter(TokenClaims::is_expired)
}

fn base64_url_decode(s: &str) -> Result<Vec<u8>, TokenError> {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    URL_SAFE_NO_PAD
        .decode(s.trim_end_matches('='))
        .map_err(|e| TokenError::Base64(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    fn jwt(payload: &str) -> String {
        format!("eyJhbGciOiJIUzI1NiJ9.{}.sig", URL_SAFE_NO_PAD.encode(payload))
    }

    #[test]
    fn test_decode_claims() {
        let token = jwt(r#"{"sub":"42","email":"bro@example.com","exp":4102444800}"#);
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.email.as_deref(), Some("bro@example.com"));
        assert_eq!(claims.user_id(), Some("42"));
        assert!(expired_claims(&token).is_none());
    }

    #[test]
    fn test_app_user_id_preferred_over_sub() {
        let token = jwt(r#"{"sub":"42","appUserId":"app-7"}"#);
        assert_eq!(decode_claims(&token).unwrap().user_id(), Some("app-7"));
    }

    #[test]
    fn test_expired_token() {
        let token = jwt(r#"{"sub":"42","exp":1000}"#);
        let claims = expired_claims(&token).unwrap();
        assert_eq!(claims.user_id(), Some("42"));
    }

    #[test]
    fn test_token_without_exp_never_expires() {
        let token = jwt(r#"{"sub":"admin-1","email":"a@b.c"}"#);
        assert!(expired_claims(&token).is_none());
        assert!(!decode_claims(&token).unwrap().is_expired_at(Utc::now()));
    }

    #[test]
    fn test_malformed_tokens() {
        assert_eq!(decode_claims("not-a-jwt"), Err(TokenError::InvalidFormat));
        assert!(matches!(decode_claims("a.!!!.c"), Err(TokenError::Base64(_))));
        assert!(expired_claims("a.b").is_none());
        assert!(expired_claims("opaque-session-token").is_none());
    }
}
