//! Credential selection and peer trust decisions.
//!
//! The engine never validates certificates itself. It asks a [`KeyManager`]
//! for local credentials and a [`TrustManager`] whether a peer chain is
//! acceptable. Both are called from delegated tasks, so they may block.

use std::fmt;
use std::sync::Arc;

use crate::certificate::{calculate_fingerprint, format_fingerprint, CertifiedKey};
use crate::crypto::{CryptoProvider, SigningKey};
use crate::types::{Role, SignatureScheme};
use crate::Error;

/// Whether a server asks for a client certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientAuth {
    /// Do not send a CertificateRequest.
    #[default]
    None,
    /// Request a certificate, continue without one.
    Want,
    /// Request a certificate, fail the handshake without one.
    Need,
}

impl ClientAuth {
    pub fn is_requested(&self) -> bool {
        !matches!(self, ClientAuth::None)
    }
}

/// A certificate chain (end-entity first, DER) and its private key.
#[derive(Clone)]
pub struct Credentials {
    pub chain: Vec<Vec<u8>>,
    pub key: Arc<dyn SigningKey>,
}

impl Credentials {
    pub fn new(chain: Vec<Vec<u8>>, key: Arc<dyn SigningKey>) -> Self {
        Credentials { chain, key }
    }

    /// Load a DER chain and a private key through the provider's key loader.
    pub fn from_der(
        chain: Vec<Vec<u8>>,
        private_key: &[u8],
        provider: &CryptoProvider,
    ) -> Result<Self, Error> {
        if chain.is_empty() {
            return Err(Error::Config("empty certificate chain".into()));
        }
        let key = provider
            .key_provider
            .load_private_key(private_key)
            .map_err(Error::Config)?;
        Ok(Credentials { chain, key })
    }

    /// Credentials from a single self-signed certificate.
    pub fn from_certified_key(key: &CertifiedKey, provider: &CryptoProvider) -> Result<Self, Error> {
        Self::from_der(vec![key.certificate.clone()], &key.private_key, provider)
    }

    pub fn end_entity(&self) -> &[u8] {
        // Constructors reject empty chains, but be lenient with struct literals.
        self.chain.first().map(|c| &c[..]).unwrap_or(&[])
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("chain", &self.chain.len())
            .field("key", &self.key)
            .finish()
    }
}

/// Source of local certificates and keys.
pub trait KeyManager: Send + Sync + fmt::Debug {
    /// Credentials for a server of the given key type (`"EC"`, `"RSA"`).
    fn choose_server_credentials(
        &self,
        key_type: &str,
        server_name: Option<&str>,
    ) -> Option<Credentials>;

    /// Credentials for a client asked to authenticate. `issuers` are the
    /// DER distinguished names from the CertificateRequest, possibly empty.
    fn choose_client_credentials(
        &self,
        key_types: &[&str],
        issuers: &[Vec<u8>],
    ) -> Option<Credentials>;
}

/// A key manager holding one set of credentials.
#[derive(Debug, Clone)]
pub struct StaticKeyManager {
    credentials: Credentials,
}

impl StaticKeyManager {
    pub fn new(credentials: Credentials) -> Self {
        StaticKeyManager { credentials }
    }
}

impl KeyManager for StaticKeyManager {
    fn choose_server_credentials(
        &self,
        key_type: &str,
        _server_name: Option<&str>,
    ) -> Option<Credentials> {
        (self.credentials.key.key_type() == key_type).then(|| self.credentials.clone())
    }

    fn choose_client_credentials(
        &self,
        key_types: &[&str],
        _issuers: &[Vec<u8>],
    ) -> Option<Credentials> {
        key_types
            .contains(&self.credentials.key.key_type())
            .then(|| self.credentials.clone())
    }
}

/// What a trust manager knows about the handshake it is judging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustContext {
    /// Role of the peer that sent the chain.
    pub peer_role: Role,
    pub peer_host: Option<String>,
    /// SNI value, when one was negotiated.
    pub server_name: Option<String>,
    /// E.g. `"HTTPS"`. Interpretation is up to the trust manager.
    pub endpoint_identification: Option<String>,
    /// Signature schemes the local end accepts.
    pub signature_schemes: Vec<SignatureScheme>,
}

/// Decides whether a peer certificate chain is acceptable.
pub trait TrustManager: Send + Sync + fmt::Debug {
    /// `chain` is end-entity first, DER encoded, and never empty.
    /// `auth_type` names the key exchange, e.g. `"ECDHE_ECDSA"`.
    fn check_trusted(
        &self,
        chain: &[Vec<u8>],
        auth_type: &str,
        context: &TrustContext,
    ) -> Result<(), Error>;

    /// DER distinguished names sent in a CertificateRequest.
    fn accepted_issuers(&self) -> Vec<Vec<u8>> {
        Vec::new()
    }
}

/// Trusts end-entity certificates whose SHA-256 fingerprint is pinned.
#[derive(Debug, Clone, Default)]
pub struct FingerprintTrustManager {
    pinned: Vec<[u8; 32]>,
}

impl FingerprintTrustManager {
    pub fn new(pinned: impl IntoIterator<Item = [u8; 32]>) -> Self {
        FingerprintTrustManager {
            pinned: pinned.into_iter().collect(),
        }
    }

    /// Pin the given DER certificates.
    pub fn from_certificates<'a>(certs: impl IntoIterator<Item = &'a [u8]>) -> Self {
        Self::new(certs.into_iter().map(calculate_fingerprint))
    }

    pub fn pin(&mut self, fingerprint: [u8; 32]) {
        self.pinned.push(fingerprint);
    }
}

impl TrustManager for FingerprintTrustManager {
    fn check_trusted(
        &self,
        chain: &[Vec<u8>],
        _auth_type: &str,
        context: &TrustContext,
    ) -> Result<(), Error> {
        let end_entity = chain
            .first()
            .ok_or_else(|| Error::CertificateRejected("empty chain".into()))?;
        let fingerprint = calculate_fingerprint(end_entity);

        if self.pinned.contains(&fingerprint) {
            debug!("Trusted {:?} certificate by fingerprint", context.peer_role);
            Ok(())
        } else {
            Err(Error::CertificateRejected(format!(
                "fingerprint {} not pinned",
                format_fingerprint(&fingerprint)
            )))
        }
    }
}
