//! Callback signature verification.
//!
//! The queue signs every callback with an HS256 JWT carried in the
//! `Dispatch-Signature` header. The token's `body` claim is the base64url
//! SHA-256 of the raw request body, binding the signature to the payload.
//! Verification accepts the current and the next signing key so the queue
//! side can rotate keys without dropping callbacks.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::settings::SigningConfig;
use crate::error::{AppError, AppResult};

/// Header carrying the signature token on both callbacks.
pub const SIGNATURE_HEADER: &str = "dispatch-signature";

/// Claims carried by the callback signature token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureClaims {
    /// Issuer, fixed by the queue deployment.
    pub iss: String,
    /// Destination URL the callback was sent to.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    /// Unique token id, distinct per delivery attempt.
    pub jti: String,
    /// base64url(sha256(request body)).
    pub body: String,
}

/// Verifies callback signatures against the current/next key pair.
#[derive(Clone)]
pub struct SignatureVerifier {
    current_key: String,
    next_key: Option<String>,
    issuer: String,
    strict: bool,
}

impl SignatureVerifier {
    pub fn from_config(config: &SigningConfig) -> Self {
        Self {
            current_key: config.current_key.clone(),
            next_key: config.next_key.clone(),
            issuer: config.issuer.clone(),
            strict: config.strict,
        }
    }

    /// Whether unsigned callbacks must be rejected.
    pub fn strict(&self) -> bool {
        self.strict
    }

    /// Verifies the token against the current key, falling back to the next
    /// key while a rotation is in progress.
    pub fn verify(&self, token: &str, body: &[u8]) -> AppResult<SignatureClaims> {
        match self.verify_with_key(&self.current_key, token, body) {
            Ok(claims) => Ok(claims),
            Err(current_err) => match self.next_key.as_deref() {
                Some(next) => self.verify_with_key(next, token, body),
                None => Err(current_err),
            },
        }
    }

    fn verify_with_key(&self, key: &str, token: &str, body: &[u8]) -> AppResult<SignatureClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);

        let data = decode::<SignatureClaims>(
            token,
            &DecodingKey::from_secret(key.as_bytes()),
            &validation,
        )
        .map_err(|e| AppError::Signature {
            message: format!("Token rejected: {}", e),
        })?;

        let digest = body_digest(body);
        if data.claims.body != digest {
            return Err(AppError::Signature {
                message: "Body hash mismatch".to_string(),
            });
        }

        Ok(data.claims)
    }
}

/// base64url-encoded SHA-256 digest of a callback body.
pub fn body_digest(body: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    const CURRENT_KEY: &str = "sig_current_key";
    const NEXT_KEY: &str = "sig_next_key";
    const ISSUER: &str = "dispatch-queue";

    fn verifier(next_key: Option<&str>) -> SignatureVerifier {
        SignatureVerifier::from_config(&SigningConfig {
            current_key: CURRENT_KEY.to_string(),
            next_key: next_key.map(|k| k.to_string()),
            issuer: ISSUER.to_string(),
            strict: true,
        })
    }

    fn sign(key: &str, body: &[u8], issuer: &str) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = SignatureClaims {
            iss: issuer.to_string(),
            sub: "https://cadence.test/hooks/delivery-callback".to_string(),
            iat: now,
            exp: now + 300,
            jti: uuid::Uuid::new_v4().to_string(),
            body: body_digest(body),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(key.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_signature_accepted() {
        let body = br#"{"source_body": "e30="}"#;
        let token = sign(CURRENT_KEY, body, ISSUER);

        let claims = verifier(None).verify(&token, body).unwrap();
        assert_eq!(claims.iss, ISSUER);
    }

    #[test]
    fn test_next_key_accepted_during_rotation() {
        let body = b"payload";
        let token = sign(NEXT_KEY, body, ISSUER);

        // current key fails, next key validates
        assert!(verifier(None).verify(&token, body).is_err());
        assert!(verifier(Some(NEXT_KEY)).verify(&token, body).is_ok());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let body = b"payload";
        let token = sign("some_other_key", body, ISSUER);

        let result = verifier(Some(NEXT_KEY)).verify(&token, body);
        assert!(matches!(result, Err(AppError::Signature { .. })));
    }

    #[test]
    fn test_tampered_body_rejected() {
        let token = sign(CURRENT_KEY, b"original body", ISSUER);

        let result = verifier(None).verify(&token, b"tampered body");
        assert!(matches!(result, Err(AppError::Signature { .. })));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let body = b"payload";
        let token = sign(CURRENT_KEY, body, "someone-else");

        let result = verifier(None).verify(&token, body);
        assert!(matches!(result, Err(AppError::Signature { .. })));
    }

    #[test]
    fn test_expired_token_rejected() {
        let now = chrono::Utc::now().timestamp();
        let body = b"payload";
        let claims = SignatureClaims {
            iss: ISSUER.to_string(),
            sub: "https://cadence.test/hooks/delivery-callback".to_string(),
            iat: now - 600,
            exp: now - 300,
            jti: uuid::Uuid::new_v4().to_string(),
            body: body_digest(body),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(CURRENT_KEY.as_bytes()),
        )
        .unwrap();

        let result = verifier(None).verify(&token, body);
        assert!(matches!(result, Err(AppError::Signature { .. })));
    }
}
