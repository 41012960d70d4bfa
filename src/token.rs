//! Bearer token encoding.
//!
//! Tokens are compact `header.claims.signature` strings, each segment
//! base64url without padding, signed with HMAC-SHA256. The APIs verify the
//! signature; clients only decode the claims, the way a browser would.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use thiserror::Error;

use crate::domain::{Account, Identity, Role};

type HmacSha256 = Hmac<Sha256>;

const TOKEN_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;
const MAX_TOKEN_LEN: usize = 4096;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TokenError {
    #[error("Malformed token: {0}")]
    Malformed(String),
    #[error("Invalid token claims: {0}")]
    InvalidClaims(String),
    #[error("Invalid token signature")]
    InvalidSignature,
    #[error("Token expired")]
    Expired,
    #[error("Invalid signing key")]
    InvalidKey,
}

/// An opaque bearer credential.
///
/// `Debug` never prints the token so that instrumented spans cannot leak it.
#[derive(Clone, PartialEq, Eq)]
pub struct Bearer(String);

impl Bearer {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Bearer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Bearer(..)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub name: Option<String>,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn identity(&self) -> Result<Identity, TokenError> {
        let expires_at = DateTime::from_timestamp(self.exp, 0)
            .ok_or_else(|| TokenError::InvalidClaims(format!("exp {} out of range", self.exp)))?;
        Ok(Identity {
            subject: self.sub.clone(),
            name: self.name.clone(),
            role: self.role,
            expires_at,
        })
    }
}

/// Decodes claims without checking the signature.
///
/// An unknown role, a missing field or a malformed segment are all decode
/// failures.
pub fn decode_claims(token: &str) -> Result<Claims, TokenError> {
    let (_, claims, _) = split_token(token)?;
    let raw = URL_SAFE_NO_PAD
        .decode(claims)
        .map_err(|e| TokenError::Malformed(e.to_string()))?;
    serde_json::from_slice(&raw).map_err(|e| TokenError::InvalidClaims(e.to_string()))
}

fn split_token(token: &str) -> Result<(&str, &str, &str), TokenError> {
    if token.len() > MAX_TOKEN_LEN {
        return Err(TokenError::Malformed("token too long".to_string()));
    }
    let mut parts = token.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(claims), Some(signature), None)
            if !header.is_empty() && !claims.is_empty() && !signature.is_empty() =>
        {
            Ok((header, claims, signature))
        }
        _ => Err(TokenError::Malformed("expected three segments".to_string())),
    }
}

/// Issues and verifies HS256 bearer tokens.
#[derive(Clone)]
pub struct TokenCodec {
    mac: HmacSha256,
    lifetime: Duration,
}

impl TokenCodec {
    pub fn new(secret: impl AsRef<[u8]>, lifetime: Duration) -> Result<Self, TokenError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(TokenError::InvalidKey);
        }
        let mac = HmacSha256::new_from_slice(secret).map_err(|_| TokenError::InvalidKey)?;
        Ok(Self { mac, lifetime })
    }

    pub fn issue(&self, account: &Account, now: DateTime<Utc>) -> Result<Bearer, TokenError> {
        let claims = Claims {
            sub: account.username.clone(),
            name: Some(account.name.clone()),
            role: account.role,
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };
        self.encode(&claims)
    }

    pub fn encode(&self, claims: &Claims) -> Result<Bearer, TokenError> {
        let payload =
            serde_json::to_vec(claims).map_err(|e| TokenError::InvalidClaims(e.to_string()))?;
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(TOKEN_HEADER),
            URL_SAFE_NO_PAD.encode(payload)
        );
        let signature = URL_SAFE_NO_PAD.encode(self.sign(&signing_input));
        Ok(Bearer(format!("{}.{}", signing_input, signature)))
    }

    /// Checks signature and expiry, then returns the claims.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let (header, claims, signature) = split_token(token)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|e| TokenError::Malformed(e.to_string()))?;

        let mut mac = self.mac.clone();
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(claims.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let claims = decode_claims(token)?;
        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    fn sign(&self, signing_input: &str) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(signing_input.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new("test-secret", Duration::minutes(30)).unwrap()
    }

    fn kasir() -> Account {
        Account {
            username: "sari".to_string(),
            name: "Sari".to_string(),
            role: Role::Kasir,
        }
    }

    #[test]
    fn issued_token_verifies_and_decodes() {
        let now = Utc::now();
        let bearer = codec().issue(&kasir(), now).unwrap();

        let claims = codec().verify(bearer.as_str(), now).unwrap();
        assert_eq!(claims.sub, "sari");
        assert_eq!(claims.role, Role::Kasir);
        assert_eq!(claims.exp - claims.iat, 30 * 60);

        assert_eq!(decode_claims(bearer.as_str()).unwrap(), claims);
    }

    #[test]
    fn rejects_foreign_signature_and_expired_tokens() {
        let now = Utc::now();
        let other = TokenCodec::new("other-secret", Duration::minutes(30)).unwrap();
        let forged = other.issue(&kasir(), now).unwrap();
        assert_eq!(
            codec().verify(forged.as_str(), now),
            Err(TokenError::InvalidSignature)
        );

        let bearer = codec().issue(&kasir(), now).unwrap();
        assert_eq!(
            codec().verify(bearer.as_str(), now + Duration::minutes(30)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn unknown_role_is_a_decode_failure() {
        let payload = URL_SAFE_NO_PAD.encode(r#"{"sub":"x","role":"SUPERUSER","iat":0,"exp":10}"#);
        let token = format!("aGVhZGVy.{}.c2ln", payload);
        assert!(matches!(
            decode_claims(&token),
            Err(TokenError::InvalidClaims(_))
        ));
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert!(matches!(decode_claims("garbage"), Err(TokenError::Malformed(_))));
        assert!(matches!(decode_claims("a.b.c.d"), Err(TokenError::Malformed(_))));
        assert!(matches!(decode_claims("a..c"), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn bearer_debug_hides_token() {
        let bearer = Bearer::new("secret-token");
        assert_eq!(format!("{:?}", bearer), "Bearer(..)");
    }
}
