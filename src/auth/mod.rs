use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identity claims carried by a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    /// Admin flag. Tokens minted before this claim existed omit it, and the
    /// policy checks treat absence differently from an explicit `false`.
    #[serde(rename = "isAdmin", default, skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token generation failed: {0}")]
    TokenGeneration(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

/// Issues and verifies bearer tokens.
///
/// Holds the signing secret it was constructed with; nothing here reads
/// ambient global state.
#[derive(Clone)]
pub struct AuthGate {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiry_hours: i64,
}

impl AuthGate {
    pub fn new(secret: &str, expiry_hours: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
            expiry_hours: expiry_hours as i64,
        }
    }

    /// Sign a token for `username`. New tokens always carry the admin flag.
    pub fn issue(&self, username: &str, is_admin: bool) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            username: username.to_string(),
            is_admin: Some(is_admin),
            exp: (now + Duration::hours(self.expiry_hours)).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenGeneration(e.to_string()))
    }

    /// Decode a token, checking the signature and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> AuthGate {
        AuthGate::new("test-secret", 1)
    }

    #[test]
    fn issue_then_verify_round_trips() {
        let token = gate().issue("pat", false).unwrap();
        let claims = gate().verify(&token).unwrap();

        assert_eq!(claims.username, "pat");
        assert_eq!(claims.is_admin, Some(false));
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let token = AuthGate::new("other-secret", 1).issue("pat", false).unwrap();
        assert!(gate().verify(&token).is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let now = Utc::now().timestamp();
        let claims = Claims {
            username: "pat".to_string(),
            is_admin: Some(false),
            // Well past the default validation leeway
            exp: now - 7200,
            iat: now - 10800,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(gate().verify(&token).is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(gate().verify("not-a-token").is_err());
    }

    #[test]
    fn missing_admin_claim_decodes_as_none() {
        let now = Utc::now().timestamp();
        let token = encode(
            &Header::default(),
            &serde_json::json!({ "username": "pat", "exp": now + 3600, "iat": now }),
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let claims = gate().verify(&token).unwrap();
        assert_eq!(claims.username, "pat");
        assert_eq!(claims.is_admin, None);
    }
}
