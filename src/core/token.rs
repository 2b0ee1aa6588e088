//! JWT signing and verification

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use super::credentials::Credentials;
use super::error::GatewayError;

/// Token claims: the forged credentials plus the standard time fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(flatten)]
    pub credentials: Credentials,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and verifies gateway tokens with a shared secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    ttl_secs: i64,
}

impl TokenCodec {
    pub fn new(secret: &str, algorithm: Algorithm, ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            algorithm,
            ttl_secs,
        }
    }

    /// Issue a token for the given credentials. Returns both the compact
    /// token and the claims it carries, since the login response body is
    /// the claims object itself.
    pub fn sign(&self, credentials: Credentials) -> Result<(String, Claims), GatewayError> {
        let iat = Utc::now().timestamp();
        let claims = Claims {
            credentials,
            iat,
            exp: iat + self.ttl_secs,
        };
        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(|e| GatewayError::Internal(format!("token signing failed: {e}")))?;
        Ok((token, claims))
    }

    /// Verify signature and expiry, distinguishing an expired token from a
    /// malformed or forged one.
    pub fn verify(&self, token: &str) -> Result<Claims, GatewayError> {
        let validation = Validation::new(self.algorithm);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => GatewayError::ExpiredToken,
                _ => GatewayError::InvalidToken,
            })
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.algorithm)
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}
