// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access and refresh token minting and verification.
//!
//! Both token kinds are HS256 JWTs but are signed with separate keys, so a
//! refresh token can never pass as an access token or vice versa.

use crate::config::Config;
use crate::models::User;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Claims carried by an access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    pub username: String,
    pub full_name: String,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
}

/// Claims carried by a refresh token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Random token ID; makes tokens minted in the same second distinct
    pub jti: String,
    pub iat: usize,
    pub exp: usize,
}

/// A freshly minted access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signs and verifies session tokens.
#[derive(Clone)]
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    access_ttl_secs: i64,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    refresh_ttl_secs: i64,
    rng: SystemRandom,
}

impl TokenService {
    pub fn new(config: &Config) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(&config.access_token_secret),
            access_decoding: DecodingKey::from_secret(&config.access_token_secret),
            access_ttl_secs: config.access_token_ttl_secs,
            refresh_encoding: EncodingKey::from_secret(&config.refresh_token_secret),
            refresh_decoding: DecodingKey::from_secret(&config.refresh_token_secret),
            refresh_ttl_secs: config.refresh_token_ttl_secs,
            rng: SystemRandom::new(),
        }
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl_secs
    }

    pub fn refresh_ttl_secs(&self) -> i64 {
        self.refresh_ttl_secs
    }

    /// Mint an access token for a user.
    pub fn issue_access_token(&self, user: &User) -> anyhow::Result<String> {
        let now = unix_now()?;
        let claims = AccessClaims {
            sub: user.id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            iat: now,
            exp: now + self.access_ttl_secs.max(0) as usize,
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.access_encoding,
        )?)
    }

    /// Mint a refresh token for a user ID.
    pub fn issue_refresh_token(&self, user_id: &str) -> anyhow::Result<String> {
        let now = unix_now()?;
        let mut jti = [0u8; 16];
        self.rng
            .fill(&mut jti)
            .map_err(|_| anyhow::anyhow!("System RNG unavailable"))?;

        let claims = RefreshClaims {
            sub: user_id.to_string(),
            jti: hex::encode(jti),
            iat: now,
            exp: now + self.refresh_ttl_secs.max(0) as usize,
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.refresh_encoding,
        )?)
    }

    pub fn issue_pair(&self, user: &User) -> anyhow::Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue_access_token(user)?,
            refresh_token: self.issue_refresh_token(&user.id)?,
        })
    }

    /// Check signature and expiry of an access token.
    pub fn verify_access_token(
        &self,
        token: &str,
    ) -> Result<AccessClaims, jsonwebtoken::errors::Error> {
        decode::<AccessClaims>(token, &self.access_decoding, &validation())
            .map(|data| data.claims)
    }

    /// Check signature and expiry of a refresh token.
    pub fn verify_refresh_token(
        &self,
        token: &str,
    ) -> Result<RefreshClaims, jsonwebtoken::errors::Error> {
        decode::<RefreshClaims>(token, &self.refresh_decoding, &validation())
            .map(|data| data.claims)
    }
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation
}

fn unix_now() -> anyhow::Result<usize> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        User {
            id: "65a1b2c3d4e5f60718293a4b".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            full_name: "Alice Liddell".to_string(),
            password_hash: String::new(),
            avatar: String::new(),
            cover_image: String::new(),
            watch_history: vec![],
            refresh_token: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_access_token_roundtrip() {
        let service = TokenService::new(&Config::test_default());
        let token = service.issue_access_token(&test_user()).unwrap();

        let claims = service.verify_access_token(&token).unwrap();
        assert_eq!(claims.sub, "65a1b2c3d4e5f60718293a4b");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[test]
    fn test_token_kinds_are_not_interchangeable() {
        let service = TokenService::new(&Config::test_default());
        let pair = service.issue_pair(&test_user()).unwrap();

        assert!(service.verify_access_token(&pair.refresh_token).is_err());
        assert!(service.verify_refresh_token(&pair.access_token).is_err());
        assert!(service.verify_refresh_token(&pair.refresh_token).is_ok());
    }

    #[test]
    fn test_refresh_tokens_are_unique() {
        let service = TokenService::new(&Config::test_default());
        let a = service.issue_refresh_token("u1").unwrap();
        let b = service.issue_refresh_token("u1").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_expired_token_rejected() {
        let config = Config::test_default();
        let service = TokenService::new(&config);
        let user = test_user();

        let now = unix_now().unwrap();
        let claims = AccessClaims {
            sub: user.id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            iat: now - 120,
            exp: now - 60,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&config.access_token_secret),
        )
        .unwrap();

        let err = service.verify_access_token(&token).unwrap_err();
        assert!(matches!(
            err.kind(),
            jsonwebtoken::errors::ErrorKind::ExpiredSignature
        ));
    }
}
