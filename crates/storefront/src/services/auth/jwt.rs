//! Unverified JWT claim decoding.
//!
//! The backend validates its own tokens; the client only reads the payload
//! to learn who is signed in and when the token lapses.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::AuthError;

/// Claims the storefront cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct JwtClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default, rename = "userId", alias = "id")]
    pub user_id: Option<String>,
    #[serde(default, alias = "phoneNumber")]
    pub phone: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl JwtClaims {
    /// The user id, preferring an explicit claim over `sub`.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.user_id
            .as_deref()
            .or(self.sub.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Expiry as a timestamp.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }
}

/// Decode the payload segment of `token` without checking the signature.
///
/// # Errors
///
/// Returns [`AuthError::MalformedToken`] if the token does not have three
/// segments or the payload is not base64url-encoded JSON.
pub fn decode_claims(token: &str) -> Result<JwtClaims, AuthError> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(AuthError::MalformedToken("expected three segments".to_string()));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| AuthError::MalformedToken(format!("payload is not base64url: {e}")))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::MalformedToken(format!("payload is not JSON: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn token(payload: &str) -> String {
        format!("eyJhbGciOiJIUzI1NiJ9.{}.sig", URL_SAFE_NO_PAD.encode(payload))
    }

    #[test]
    fn test_decode_user_id_and_expiry() {
        let claims =
            decode_claims(&token(r#"{"userId":"u1","phone":"+919876543210","exp":1700000000}"#))
                .unwrap();
        assert_eq!(claims.subject(), Some("u1"));
        assert_eq!(claims.phone.as_deref(), Some("+919876543210"));
        assert_eq!(claims.expires_at().unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_subject_falls_back_to_sub() {
        let claims = decode_claims(&token(r#"{"sub":"u2"}"#)).unwrap();
        assert_eq!(claims.subject(), Some("u2"));
        assert_eq!(claims.expires_at(), None);
    }

    #[test]
    fn test_padded_payload_accepted() {
        let padded = format!(
            "h.{}.s",
            base64::engine::general_purpose::URL_SAFE.encode(r#"{"id":"u3"}"#)
        );
        assert_eq!(decode_claims(&padded).unwrap().subject(), Some("u3"));
    }

    #[test]
    fn test_malformed_tokens() {
        assert!(matches!(
            decode_claims("not-a-jwt"),
            Err(AuthError::MalformedToken(_))
        ));
        assert!(matches!(
            decode_claims("a.!!!.c"),
            Err(AuthError::MalformedToken(_))
        ));
        assert!(matches!(
            decode_claims(&token("not json")),
            Err(AuthError::MalformedToken(_))
        ));
    }
}
