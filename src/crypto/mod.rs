//! Cryptographic provider seam and TLS 1.2 key derivation.

pub mod rust_crypto;

mod aead;
pub(crate) mod prf;
mod provider;

pub use aead::{Aad, Nonce};
pub(crate) use aead::{Iv, EXPLICIT_NONCE_LEN, TAG_LEN};

pub use provider::{ActiveKeyExchange, Cipher, CryptoProvider, CryptoSafe};
pub use provider::{KeyProvider, SecureRandom, SignatureVerifier, SigningKey};
pub use provider::{SupportedCipherSuite, SupportedKxGroup};

pub use crate::types::{HashAlgorithm, NamedGroup, SignatureScheme};
