//! Session-scoped upstream credentials.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{HuginnError, Result};

/// Default credential lifetime.
pub const DEFAULT_CREDENTIAL_TTL: Duration = Duration::from_secs(60);

/// Short-lived bearer token minted for one session.
///
/// Never reused across sessions and never revoked; it simply expires.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredential {
    token: String,
    expires_at: DateTime<Utc>,
}

impl SessionCredential {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// `bearer <token>` authorization header value.
    pub fn bearer(&self) -> String {
        format!("bearer {}", self.token)
    }
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredential")
            .field("token", &"[redacted]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Mints session credentials.
pub trait CredentialIssuer: Send + Sync {
    fn issue(&self, application_id: &str) -> Result<SessionCredential>;
}

/// JWT claims carried by a session credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Application id.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 JWT issuer.
#[derive(Clone)]
pub struct JwtIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtIssuer {
    pub fn new(secret: &[u8]) -> Result<Self> {
        if secret.is_empty() {
            return Err(HuginnError::Configuration("jwt secret is empty".into()));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: DEFAULT_CREDENTIAL_TTL,
        })
    }

    /// Set the credential lifetime.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Verify a token minted by this issuer and return its claims.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

impl fmt::Debug for JwtIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtIssuer")
            .field("secret", &"[redacted]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl CredentialIssuer for JwtIssuer {
    fn issue(&self, application_id: &str) -> Result<SessionCredential> {
        let issued_at = Utc::now();
        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| HuginnError::Credential(format!("invalid credential ttl: {e}")))?;
        let expires_at = issued_at
            .checked_add_signed(ttl)
            .ok_or_else(|| HuginnError::Credential("credential ttl out of range".into()))?;
        let claims = Claims {
            sub: application_id.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(SessionCredential::new(token, expires_at))
    }
}
