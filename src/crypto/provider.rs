//! Cryptographic provider traits for pluggable crypto backends.
//!
//! The engine never calls a cryptographic library directly. Everything goes
//! through a [`CryptoProvider`]: a plain struct of static trait object
//! references, one per capability.
//!
//! - **Cipher suites** ([`SupportedCipherSuite`]): factory for AEAD ciphers
//! - **Key exchange groups** ([`SupportedKxGroup`]): factory for ECDHE exchanges
//! - **Signature verification** ([`SignatureVerifier`]): verify a signature
//!   against the public key of a DER certificate
//! - **Key provider** ([`KeyProvider`]): parse private keys into [`SigningKey`]s
//! - **Secure random** ([`SecureRandom`]): hello randoms and session ids
//!
//! There is no process-wide default. A provider is passed explicitly through
//! [`ConfigBuilder::with_crypto_provider`](crate::ConfigBuilder::with_crypto_provider),
//! and [`rust_crypto::default_provider`](super::rust_crypto::default_provider)
//! is used when none is given.
//!
//! # Implementing a custom cipher suite
//!
//! ```
//! use timpl::crypto::{Aad, Cipher, Nonce, SupportedCipherSuite};
//! use timpl::{Buf, CipherSuite};
//!
//! #[derive(Debug)]
//! struct NullCipher;
//!
//! impl Cipher for NullCipher {
//!     fn encrypt(&mut self, _: &mut Buf, _: Aad, _: Nonce) -> Result<(), String> {
//!         Ok(())
//!     }
//!     fn decrypt(&mut self, _: &mut Buf, _: Aad, _: Nonce) -> Result<(), String> {
//!         Ok(())
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct MySuite;
//!
//! impl SupportedCipherSuite for MySuite {
//!     fn suite(&self) -> CipherSuite {
//!         CipherSuite::ECDHE_ECDSA_AES128_GCM_SHA256
//!     }
//!     fn key_lengths(&self) -> (usize, usize) {
//!         (16, 4)
//!     }
//!     fn create_cipher(&self, _key: &[u8]) -> Result<Box<dyn Cipher>, String> {
//!         Ok(Box::new(NullCipher))
//!     }
//! }
//!
//! static MY_SUITE: MySuite = MySuite;
//! static SUITES: &[&dyn SupportedCipherSuite] = &[&MY_SUITE];
//! # assert_eq!(SUITES.len(), 1);
//! ```
//!
//! All provider traits require `Send + Sync + UnwindSafe + RefUnwindSafe`,
//! since signing and verification run inside delegated tasks on arbitrary
//! threads.

use std::fmt::Debug;
use std::panic::{RefUnwindSafe, UnwindSafe};
use std::sync::Arc;

use zeroize::Zeroizing;

use crate::buffer::Buf;
use crate::crypto::{Aad, Nonce};
use crate::types::{CipherSuite, HashAlgorithm, NamedGroup, SignatureScheme};
use crate::Error;

/// Marker trait for types that are safe to use in crypto provider components.
///
/// Automatically implemented for all types that satisfy the bounds.
pub trait CryptoSafe: Send + Sync + Debug + UnwindSafe + RefUnwindSafe {}

impl<T: Send + Sync + Debug + UnwindSafe + RefUnwindSafe> CryptoSafe for T {}

/// AEAD cipher for in-place encryption/decryption.
pub trait Cipher: CryptoSafe {
    /// Encrypt plaintext in-place, appending the authentication tag.
    fn encrypt(&mut self, plaintext: &mut Buf, aad: Aad, nonce: Nonce) -> Result<(), String>;

    /// Decrypt ciphertext in-place, verifying and removing the authentication tag.
    ///
    /// On failure the buffer content is unspecified and must not be used.
    fn decrypt(&mut self, ciphertext: &mut Buf, aad: Aad, nonce: Nonce) -> Result<(), String>;
}

/// Private key able to produce handshake signatures.
pub trait SigningKey: CryptoSafe {
    /// Sign `data` (the key hashes it as its scheme requires).
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, String>;

    /// Signature scheme produced by [`SigningKey::sign`].
    fn scheme(&self) -> SignatureScheme;

    /// Key type as understood by the key manager, e.g. `"EC"`.
    fn key_type(&self) -> &'static str;
}

/// Active key exchange instance (ephemeral keypair for one handshake).
pub trait ActiveKeyExchange: CryptoSafe {
    /// Public key to send to the peer.
    fn pub_key(&self) -> &[u8];

    /// Complete the exchange with the peer's public key, returning the
    /// shared secret.
    fn complete(self: Box<Self>, peer_pub: &[u8]) -> Result<Zeroizing<Vec<u8>>, String>;

    /// Named group for this exchange.
    fn group(&self) -> NamedGroup;
}

/// Cipher suite support (factory for [`Cipher`] instances).
pub trait SupportedCipherSuite: CryptoSafe {
    /// The cipher suite this supports.
    fn suite(&self) -> CipherSuite;

    /// Hash algorithm used by the suite's PRF.
    fn hash_algorithm(&self) -> HashAlgorithm {
        self.suite().hash_algorithm()
    }

    /// Key material lengths: (enc_key_len, fixed_iv_len).
    ///
    /// A 4-byte fixed IV means an explicit nonce on the wire (RFC 5288), a
    /// 12-byte one a nonce derived from the sequence number (RFC 7905).
    fn key_lengths(&self) -> (usize, usize);

    /// Create a cipher instance with the given key.
    fn create_cipher(&self, key: &[u8]) -> Result<Box<dyn Cipher>, String>;
}

/// Key exchange group support (factory for [`ActiveKeyExchange`]).
pub trait SupportedKxGroup: CryptoSafe {
    /// Named group for this key exchange group.
    fn name(&self) -> NamedGroup;

    /// Start a new key exchange, generating an ephemeral keypair.
    fn start_exchange(&self) -> Result<Box<dyn ActiveKeyExchange>, String>;
}

/// Signature verification against certificates.
pub trait SignatureVerifier: CryptoSafe {
    /// Verify a signature over `data` with the public key of a DER-encoded
    /// X.509 certificate.
    fn verify_signature(
        &self,
        cert_der: &[u8],
        data: &[u8],
        signature: &[u8],
        scheme: SignatureScheme,
    ) -> Result<(), String>;
}

/// Private key parser (factory for [`SigningKey`]).
pub trait KeyProvider: CryptoSafe {
    /// Parse and load a private key from DER or PEM bytes.
    fn load_private_key(&self, key_der: &[u8]) -> Result<Arc<dyn SigningKey>, String>;
}

/// Secure random number generator.
pub trait SecureRandom: CryptoSafe {
    /// Fill buffer with cryptographically secure random bytes.
    fn fill(&self, buf: &mut [u8]) -> Result<(), String>;
}

/// Cryptographic provider for the engine.
#[derive(Debug, Clone)]
pub struct CryptoProvider {
    /// Supported cipher suites, in default preference order.
    pub cipher_suites: &'static [&'static dyn SupportedCipherSuite],

    /// Supported key exchange groups, in preference order.
    pub kx_groups: &'static [&'static dyn SupportedKxGroup],

    /// Signature schemes the verifier accepts, in preference order.
    pub signature_schemes: &'static [SignatureScheme],

    /// Signature verification for certificates.
    pub signature_verifier: &'static dyn SignatureVerifier,

    /// Key provider for parsing private keys.
    pub key_provider: &'static dyn KeyProvider,

    /// Secure random number generator.
    pub secure_random: &'static dyn SecureRandom,
}

impl CryptoProvider {
    /// Cipher suites this provider can serve, in preference order.
    pub fn supported_cipher_suites(&self) -> impl Iterator<Item = CipherSuite> + '_ {
        self.cipher_suites.iter().map(|s| s.suite())
    }

    pub fn find_cipher_suite(&self, suite: CipherSuite) -> Option<&'static dyn SupportedCipherSuite> {
        self.cipher_suites.iter().copied().find(|s| s.suite() == suite)
    }

    pub fn supported_kx_groups(&self) -> impl Iterator<Item = NamedGroup> + '_ {
        self.kx_groups.iter().map(|g| g.name())
    }

    pub fn find_kx_group(&self, group: NamedGroup) -> Option<&'static dyn SupportedKxGroup> {
        self.kx_groups.iter().copied().find(|g| g.name() == group)
    }

    /// Check that the provider can run a handshake at all.
    pub fn validate(&self) -> Result<(), Error> {
        if self.cipher_suites.is_empty() {
            return Err(Error::Config("crypto provider has no cipher suites".into()));
        }
        if self.kx_groups.is_empty() {
            return Err(Error::Config(
                "crypto provider has no key exchange groups".into(),
            ));
        }
        if self.signature_schemes.is_empty() {
            return Err(Error::Config(
                "crypto provider has no signature schemes".into(),
            ));
        }
        for s in self.cipher_suites {
            let (key_len, iv_len) = s.key_lengths();
            let known = matches!((key_len, iv_len), (16, 4) | (32, 4) | (32, 12));
            if !known {
                return Err(Error::Config(format!(
                    "cipher suite {} has unsupported key lengths ({}, {})",
                    s.suite(),
                    key_len,
                    iv_len
                )));
            }
        }
        Ok(())
    }
}
