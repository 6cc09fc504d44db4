//! Mutual-TLS identity loaded from a PKCS#12 keystore
//!
//! The same loader backs both sides of the wire: the outbound client
//! presents the identity to the core services, and the provider server
//! presents it to inbound callers while requiring client certificates.
//! Key material stays in process memory; nothing is written to disk.

use std::path::Path;

use base64::Engine;
use openssl::pkcs12::Pkcs12;

use crate::{Error, Result};

/// Private key and certificate chain materialized from a PKCS#12 bundle
///
/// Held for the process lifetime and torn down once; [`Identity::close`]
/// (or drop, whichever comes first) erases the key material.
pub struct Identity {
    pkcs12_der: Vec<u8>,
    password: String,
    chain_pem: Vec<u8>,
    leaf_pem: Vec<u8>,
    key_pem: Vec<u8>,
    authentication_info: String,
    closed: bool,
}

impl Identity {
    /// Load an identity from a PKCS#12 bundle
    ///
    /// The chain is ordered leaf first, then any additional certificates
    /// found in the bundle, verbatim. Trust validation happens later, in
    /// the TLS stack, against the separately supplied truststore.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Credential`] if the container cannot be parsed,
    /// the password is wrong, or no private key or leaf certificate is
    /// present.
    pub fn load(bundle_path: &Path, password: &str) -> Result<Self> {
        let der = std::fs::read(bundle_path).map_err(|e| {
            Error::Credential(format!("cannot read keystore {}: {e}", bundle_path.display()))
        })?;

        let parsed = Pkcs12::from_der(&der)
            .map_err(|e| Error::Credential(format!("invalid PKCS#12 container: {e}")))?
            .parse2(password)
            .map_err(|e| Error::Credential(format!("cannot open keystore: {e}")))?;

        let key = parsed
            .pkey
            .ok_or_else(|| Error::Credential("keystore holds no private key".to_string()))?;
        let leaf = parsed
            .cert
            .ok_or_else(|| Error::Credential("keystore holds no certificate".to_string()))?;

        let leaf_pem = leaf
            .to_pem()
            .map_err(|e| Error::Credential(format!("cannot encode certificate: {e}")))?;

        let mut chain_pem = leaf_pem.clone();
        if let Some(extras) = parsed.ca {
            for cert in &extras {
                let pem = cert
                    .to_pem()
                    .map_err(|e| Error::Credential(format!("cannot encode chain: {e}")))?;
                chain_pem.extend_from_slice(&pem);
            }
        }

        let key_pem = key
            .private_key_to_pem_pkcs8()
            .map_err(|e| Error::Credential(format!("cannot encode private key: {e}")))?;

        let spki_der = leaf
            .public_key()
            .and_then(|key| key.public_key_to_der())
            .map_err(|e| Error::Credential(format!("cannot extract public key: {e}")))?;
        let authentication_info = base64::engine::general_purpose::STANDARD.encode(spki_der);

        tracing::debug!(path = %bundle_path.display(), "loaded mutual-TLS identity");

        Ok(Self {
            pkcs12_der: der,
            password: password.to_string(),
            chain_pem,
            leaf_pem,
            key_pem,
            authentication_info,
            closed: false,
        })
    }

    /// Raw PKCS#12 bytes, handed verbatim to the client TLS stack
    #[must_use]
    pub fn pkcs12_der(&self) -> &[u8] {
        &self.pkcs12_der
    }

    /// Keystore password
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Certificate chain PEM, leaf first
    #[must_use]
    pub fn chain_pem(&self) -> &[u8] {
        &self.chain_pem
    }

    /// Leaf certificate PEM
    #[must_use]
    pub fn leaf_pem(&self) -> &[u8] {
        &self.leaf_pem
    }

    /// Private key PEM (PKCS#8, unencrypted)
    #[must_use]
    pub fn key_pem(&self) -> &[u8] {
        &self.key_pem
    }

    /// The leaf certificate's public key as bare base64 DER, the textual
    /// form the registry expects in `authenticationInfo`
    #[must_use]
    pub fn authentication_info(&self) -> &str {
        &self.authentication_info
    }

    /// Erase the key material
    ///
    /// Safe to call more than once; the second call is a no-op.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        for byte in &mut self.key_pem {
            *byte = 0;
        }
        self.key_pem.clear();
        for byte in &mut self.pkcs12_der {
            *byte = 0;
        }
        self.pkcs12_der.clear();

        tracing::debug!("released identity material");
    }

    /// Whether [`close`](Self::close) has been called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for Identity {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}
