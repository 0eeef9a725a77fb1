//! RustCrypto cryptographic provider.
//!
//! A pure Rust backend built on crates from the
//! [RustCrypto](https://github.com/RustCrypto) organization.
//!
//! ```
//! use std::sync::Arc;
//! use timpl::Config;
//! use timpl::crypto::rust_crypto;
//!
//! let config = Arc::new(
//!     Config::builder()
//!         .with_crypto_provider(rust_crypto::default_provider())
//!         .build()
//!         .unwrap()
//! );
//! # let _ = config;
//! ```

mod cipher_suite;
mod kx_group;
mod random;
mod sign;

use crate::crypto::provider::CryptoProvider;

/// The RustCrypto provider.
///
/// # Supported Cipher Suites
///
/// - `TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256` (0xC02B)
/// - `TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384` (0xC02C)
///
/// # Supported Key Exchange Groups
///
/// - `x25519`
/// - `secp256r1` (P-256)
///
/// # Signatures
///
/// ECDSA with P-256 and SHA-256. Private keys are loaded from PKCS#8, DER
/// or PEM.
pub fn default_provider() -> CryptoProvider {
    CryptoProvider {
        cipher_suites: cipher_suite::ALL_CIPHER_SUITES,
        kx_groups: kx_group::ALL_KX_GROUPS,
        signature_schemes: sign::SIGNATURE_SCHEMES,
        signature_verifier: &sign::SIGNATURE_VERIFIER,
        key_provider: &sign::KEY_PROVIDER,
        secure_random: &random::SECURE_RANDOM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_provider_validates() {
        default_provider().validate().unwrap();
    }
}
