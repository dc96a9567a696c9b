//! Authentication utilities
//!
//! Provides:
//! - JWT access token generation and validation
//! - Stateless signup confirmation codes
//! - Bearer token extraction

use crate::db::models::{Role, User};
use crate::errors::{AppError, Result};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const CONFIRMATION_SALT: &[u8] = b"yamdb.auth.ConfirmationCodes";

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,

    pub username: String,

    pub role: Role,

    /// Always "access"
    pub token_type: String,

    /// Unique token ID
    pub jti: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl JwtClaims {
    pub fn user_id(&self) -> Result<i32> {
        self.sub.parse().map_err(|_| AppError::InvalidToken)
    }
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs: expiration_secs as i64,
        }
    }

    /// Issue an access token for the user
    pub fn generate_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiration_secs);

        let claims = JwtClaims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role: user.role,
            token_type: "access".to_string(),
            jti: Uuid::new_v4().simple().to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| AppError::Internal {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims> {
        let claims = decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::InvalidToken,
            })?;

        if claims.token_type != "access" {
            return Err(AppError::InvalidToken);
        }
        Ok(claims)
    }
}

/// Issues and checks the codes emailed during signup.
///
/// A code is `<issued-at in base36>-<hex MAC>`, the MAC covering the
/// account's identity and activation flag. Nothing is stored: once the
/// account is activated (or its email/username change) every earlier code
/// stops verifying, and codes older than the TTL are rejected.
#[derive(Clone)]
pub struct ConfirmationCodes {
    mac: HmacSha256,
    ttl_secs: i64,
}

impl ConfirmationCodes {
    pub fn new(secret: &str, ttl_secs: u64) -> Result<Self> {
        let mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| {
            AppError::Configuration {
                message: format!("Invalid confirmation secret: {}", e),
            }
        })?;
        Ok(Self {
            mac,
            ttl_secs: ttl_secs as i64,
        })
    }

    pub fn make_code(&self, user: &User) -> String {
        self.make_code_at(user, Utc::now().timestamp())
    }

    pub fn check_code(&self, user: &User, code: &str) -> bool {
        self.check_code_at(user, code, Utc::now().timestamp())
    }

    fn make_code_at(&self, user: &User, issued_at: i64) -> String {
        let digest = self.keyed(user, issued_at).finalize().into_bytes();
        format!("{}-{}", to_base36(issued_at as u64), hex::encode(digest))
    }

    fn check_code_at(&self, user: &User, code: &str, now: i64) -> bool {
        let Some((stamp, digest)) = code.trim().split_once('-') else {
            return false;
        };
        let Some(issued_at) = from_base36(stamp).and_then(|t| i64::try_from(t).ok()) else {
            return false;
        };
        if issued_at > now || now - issued_at > self.ttl_secs {
            return false;
        }
        let Ok(digest) = hex::decode(digest) else {
            return false;
        };

        self.keyed(user, issued_at).verify_slice(&digest).is_ok()
    }

    fn keyed(&self, user: &User, issued_at: i64) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(CONFIRMATION_SALT);
        mac.update(&user.id.to_be_bytes());
        mac.update(user.username.as_bytes());
        mac.update(b"\x00");
        mac.update(user.email.as_bytes());
        mac.update(&[user.is_active as u8]);
        mac.update(&issued_at.to_be_bytes());
        mac
    }
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

fn from_base36(s: &str) -> Option<u64> {
    if s.is_empty() || s.len() > 13 {
        return None;
    }
    u64::from_str_radix(s, 36).ok()
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
