//! Capability-token verification for the provider router
//!
//! The router extracts the reserved `token` query parameter and hands it
//! to a [`TokenVerifier`] before binding parameters. The default
//! [`AcceptAll`] verifier admits every request; deployments holding the
//! orchestrator's public key can install [`JwtVerifier`] instead.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;

use crate::{Error, Result};

/// A rejected capability token; the router answers 401 with this message
#[derive(Debug, Error)]
#[error("token rejected: {0}")]
pub struct TokenRejected(pub String);

/// Verification seam between token extraction and parameter binding
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Accept or reject the token presented for `service_definition`
    ///
    /// `token` is `None` when the caller supplied no `token` parameter.
    async fn verify(
        &self,
        service_definition: &str,
        token: Option<&str>,
    ) -> std::result::Result<(), TokenRejected>;
}

/// Verifier that admits every request without inspecting the token
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

#[async_trait]
impl TokenVerifier for AcceptAll {
    async fn verify(
        &self,
        _service_definition: &str,
        _token: Option<&str>,
    ) -> std::result::Result<(), TokenRejected> {
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TokenClaims {
    #[serde(default)]
    sub: Option<String>,
}

/// RS256 verifier for orchestrator-issued capability tokens
///
/// Checks the signature against the orchestrator's public key and the
/// `exp` claim against the clock.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// Build a verifier from a PEM-encoded RSA public key
    ///
    /// # Errors
    ///
    /// Returns [`Error::Credential`] if the key does not parse.
    pub fn from_public_key_pem(pem: &[u8]) -> Result<Self> {
        let key = DecodingKey::from_rsa_pem(pem)
            .map_err(|e| Error::Credential(format!("invalid RSA public key: {e}")))?;

        let mut validation = Validation::new(Algorithm::RS256);
        // Audience varies per consumer system; expiry is the claim that matters
        validation.validate_aud = false;

        Ok(Self { key, validation })
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(
        &self,
        service_definition: &str,
        token: Option<&str>,
    ) -> std::result::Result<(), TokenRejected> {
        let token = token.ok_or_else(|| TokenRejected("no token supplied".to_string()))?;

        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.key, &self.validation)
            .map_err(|e| TokenRejected(e.to_string()))?;

        tracing::debug!(
            service = service_definition,
            subject = data.claims.sub.as_deref().unwrap_or("-"),
            "capability token accepted"
        );
        Ok(())
    }
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtVerifier").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_accept_all_passes_missing_token() {
        assert!(AcceptAll.verify("create-car", None).await.is_ok());
        assert!(AcceptAll.verify("create-car", Some("anything")).await.is_ok());
    }

    #[tokio::test]
    async fn test_jwt_verifier_rejects_missing_token() {
        let rsa = openssl::rsa::Rsa::generate(2048).unwrap();
        let pem = rsa.public_key_to_pem().unwrap();
        let verifier = JwtVerifier::from_public_key_pem(&pem).unwrap();

        assert!(verifier.verify("create-car", None).await.is_err());
    }

    #[tokio::test]
    async fn test_jwt_verifier_rejects_garbage() {
        let rsa = openssl::rsa::Rsa::generate(2048).unwrap();
        let pem = rsa.public_key_to_pem().unwrap();
        let verifier = JwtVerifier::from_public_key_pem(&pem).unwrap();

        assert!(verifier.verify("create-car", Some("not-a-jwt")).await.is_err());
    }

    #[tokio::test]
    async fn test_jwt_verifier_accepts_signed_token() {
        use jsonwebtoken::{EncodingKey, Header, encode};

        let rsa = openssl::rsa::Rsa::generate(2048).unwrap();
        let public_pem = rsa.public_key_to_pem().unwrap();
        let private_pem = rsa.private_key_to_pem().unwrap();

        let exp = chrono::Utc::now().timestamp() + 600;
        let claims = serde_json::json!({ "sub": "consumer1", "exp": exp });
        let token = encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &EncodingKey::from_rsa_pem(&private_pem).unwrap(),
        )
        .unwrap();

        let verifier = JwtVerifier::from_public_key_pem(&public_pem).unwrap();
        assert!(verifier.verify("create-car", Some(&token)).await.is_ok());
    }
}
