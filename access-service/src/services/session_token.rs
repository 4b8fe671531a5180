//! Long-lived "remember me" session tokens.
//!
//! A token is an RS256 JWT carried in the `GEWISSESSTOKEN` cookie. Signing
//! and verification need the configured key pair; a key that cannot be read
//! or parsed is logged once at start-up and every later sign or verify
//! fails closed.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;

use axum_extra::extract::cookie::Cookie;
use time::OffsetDateTime;

use super::error::ServiceError;
use crate::config::SessionConfig;
use crate::models::Lidnr;

pub const SESSION_TOKEN_COOKIE: &str = "GEWISSESSTOKEN";
/// Cookie namespace reserved for company sessions.
pub const COMPANY_SESSION_TOKEN_COOKIE: &str = "GEWISCOMPANYSESSTOKEN";
pub const TOKEN_ISSUER: &str = "gewis-web";
/// Value written over a revoked session cookie.
pub const DELETED_COOKIE_VALUE: &str = "deleted";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub iss: String,
    pub lidnr: Lidnr,
    pub exp: i64,
    pub iat: i64,
    /// 16 random bytes, hex encoded; makes every issuance unique.
    pub nonce: String,
}

/// Outcome of checking a presented token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenVerdict {
    Valid(Lidnr),
    /// Signature and issuer check out but `exp` has passed.
    Expired,
    /// Malformed, wrongly signed, wrong issuer, or no verification key.
    Invalid,
}

#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub claims: SessionClaims,
    pub cookie: Cookie<'static>,
}

#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub domain: Option<String>,
    /// Sets `Secure` and `HttpOnly`.
    pub secure: bool,
    pub lifetime: Duration,
}

#[derive(Clone)]
pub struct SessionTokenService {
    encoding_key: Option<EncodingKey>,
    decoding_key: Option<DecodingKey>,
    cookie: CookieSettings,
}

impl SessionTokenService {
    /// Load the key pair from the configured paths.
    pub fn new(config: &SessionConfig, secure: bool) -> Self {
        let private_pem = read_key(&config.private_key_path, "private");
        let public_pem = read_key(&config.public_key_path, "public");

        Self::from_pem(
            private_pem.as_deref(),
            public_pem.as_deref(),
            CookieSettings {
                domain: config.cookie_domain.clone(),
                secure,
                lifetime: Duration::days(config.lifetime_days),
            },
        )
    }

    pub fn from_pem(
        private_pem: Option<&[u8]>,
        public_pem: Option<&[u8]>,
        cookie: CookieSettings,
    ) -> Self {
        let encoding_key = private_pem.and_then(|pem| match EncodingKey::from_rsa_pem(pem) {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::error!(error = %e, "Failed to parse session private key");
                None
            }
        });
        let decoding_key = public_pem.and_then(|pem| match DecodingKey::from_rsa_pem(pem) {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::error!(error = %e, "Failed to parse session public key");
                None
            }
        });

        tracing::info!(
            can_sign = encoding_key.is_some(),
            can_verify = decoding_key.is_some(),
            "Session token service initialized"
        );

        Self {
            encoding_key,
            decoding_key,
            cookie,
        }
    }

    pub fn can_sign(&self) -> bool {
        self.encoding_key.is_some()
    }

    pub fn can_verify(&self) -> bool {
        self.decoding_key.is_some()
    }

    pub fn cookie_settings(&self) -> &CookieSettings {
        &self.cookie
    }

    /// Mint a token for `lidnr` and the cookie that carries it.
    pub fn encode_session(
        &self,
        lidnr: Lidnr,
        now: DateTime<Utc>,
    ) -> Result<IssuedSession, ServiceError> {
        let key = self
            .encoding_key
            .as_ref()
            .ok_or(ServiceError::SigningKeyUnavailable)?;

        let claims = SessionClaims {
            iss: TOKEN_ISSUER.to_string(),
            lidnr,
            exp: (now + self.cookie.lifetime).timestamp(),
            iat: now.timestamp(),
            nonce: hex::encode(rand::thread_rng().gen::<[u8; 16]>()),
        };

        let token = encode(&Header::new(Algorithm::RS256), &claims, key)?;
        let cookie = self.session_cookie(token.clone(), claims.exp)?;

        tracing::debug!(lidnr, exp = claims.exp, "Issued session token");

        Ok(IssuedSession {
            token,
            claims,
            cookie,
        })
    }

    /// Verify signature and issuer, then compare `exp` against `now`.
    pub fn decode_and_validate(&self, token: &str, now: DateTime<Utc>) -> TokenVerdict {
        let Some(key) = self.decoding_key.as_ref() else {
            tracing::warn!("Session token presented but no verification key is loaded");
            return TokenVerdict::Invalid;
        };

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_issuer(&[TOKEN_ISSUER]);

        match decode::<SessionClaims>(token, key, &validation) {
            Ok(data) if now.timestamp() >= data.claims.exp => {
                tracing::debug!(lidnr = data.claims.lidnr, "Session token expired");
                TokenVerdict::Expired
            }
            Ok(data) => TokenVerdict::Valid(data.claims.lidnr),
            Err(e) => {
                tracing::info!(error = %e, "Rejected session token");
                TokenVerdict::Invalid
            }
        }
    }

    /// Cookie that makes the browser discard the session token.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        self.expired_cookie(SESSION_TOKEN_COOKIE)
    }

    /// `name` overwritten with the sentinel value and an expiry in the past.
    pub fn expired_cookie(&self, name: &'static str) -> Cookie<'static> {
        let mut cookie = self.build_cookie(name, DELETED_COOKIE_VALUE.to_string());
        cookie.set_expires(OffsetDateTime::UNIX_EPOCH);
        cookie
    }

    fn session_cookie(&self, token: String, exp: i64) -> Result<Cookie<'static>, ServiceError> {
        let expires = OffsetDateTime::from_unix_timestamp(exp)
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Invalid expiry {}: {}", exp, e)))?;

        let mut cookie = self.build_cookie(SESSION_TOKEN_COOKIE, token);
        cookie.set_expires(expires);
        Ok(cookie)
    }

    /// A browser-session cookie with the shared path, domain and security attributes.
    pub fn build_cookie(&self, name: &'static str, value: String) -> Cookie<'static> {
        let mut cookie = Cookie::build((name, value))
            .path("/")
            .secure(self.cookie.secure)
            .http_only(self.cookie.secure)
            .build();
        if let Some(domain) = &self.cookie.domain {
            cookie.set_domain(domain.clone());
        }
        cookie
    }
}

fn read_key(path: &str, kind: &str) -> Option<Vec<u8>> {
    match fs::read(path) {
        Ok(pem) => Some(pem),
        Err(e) => {
            tracing::error!(path = %path, error = %e, "Failed to read session {} key", kind);
            None
        }
    }
}
