//! Key exchange group implementations using RustCrypto.

use p256::{ecdh::EphemeralSecret, PublicKey as P256PublicKey};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::crypto::provider::{ActiveKeyExchange, SupportedKxGroup};
use crate::types::NamedGroup;

/// ECDHE key exchange implementation.
enum EcdhKeyExchange {
    P256 {
        secret: EphemeralSecret,
        public_key: Vec<u8>,
    },
    X25519 {
        secret: x25519_dalek::EphemeralSecret,
        public_key: [u8; 32],
    },
}

impl std::fmt::Debug for EcdhKeyExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EcdhKeyExchange::P256 { public_key, .. } => f
                .debug_struct("EcdhKeyExchange::P256")
                .field("public_key_len", &public_key.len())
                .finish_non_exhaustive(),
            EcdhKeyExchange::X25519 { .. } => f
                .debug_struct("EcdhKeyExchange::X25519")
                .finish_non_exhaustive(),
        }
    }
}

impl EcdhKeyExchange {
    fn new(group: NamedGroup) -> Result<Self, String> {
        match group {
            NamedGroup::Secp256r1 => {
                let secret = EphemeralSecret::random(&mut OsRng);
                let public_key = P256PublicKey::from(&secret).to_sec1_bytes().into_vec();
                Ok(EcdhKeyExchange::P256 { secret, public_key })
            }
            NamedGroup::X25519 => {
                let secret = x25519_dalek::EphemeralSecret::random_from_rng(OsRng);
                let public_key = *x25519_dalek::PublicKey::from(&secret).as_bytes();
                Ok(EcdhKeyExchange::X25519 { secret, public_key })
            }
            _ => Err("Unsupported group".to_string()),
        }
    }
}

impl ActiveKeyExchange for EcdhKeyExchange {
    fn pub_key(&self) -> &[u8] {
        match self {
            EcdhKeyExchange::P256 { public_key, .. } => public_key,
            EcdhKeyExchange::X25519 { public_key, .. } => public_key,
        }
    }

    fn complete(self: Box<Self>, peer_pub: &[u8]) -> Result<Zeroizing<Vec<u8>>, String> {
        match *self {
            EcdhKeyExchange::P256 { secret, .. } => {
                let peer_key = P256PublicKey::from_sec1_bytes(peer_pub)
                    .map_err(|_| "Invalid P-256 public key".to_string())?;
                let shared = secret.diffie_hellman(&peer_key);
                Ok(Zeroizing::new(shared.raw_secret_bytes().to_vec()))
            }
            EcdhKeyExchange::X25519 { secret, .. } => {
                let peer: [u8; 32] = peer_pub
                    .try_into()
                    .map_err(|_| "Invalid X25519 public key".to_string())?;
                let shared = secret.diffie_hellman(&x25519_dalek::PublicKey::from(peer));
                // RFC 7748 Section 6.1: an all-zero result means a low order point.
                if !shared.was_contributory() {
                    return Err("X25519 shared secret is all zeroes".to_string());
                }
                Ok(Zeroizing::new(shared.as_bytes().to_vec()))
            }
        }
    }

    fn group(&self) -> NamedGroup {
        match self {
            EcdhKeyExchange::P256 { .. } => NamedGroup::Secp256r1,
            EcdhKeyExchange::X25519 { .. } => NamedGroup::X25519,
        }
    }
}

/// X25519 key exchange group.
#[derive(Debug)]
struct X25519;

impl SupportedKxGroup for X25519 {
    fn name(&self) -> NamedGroup {
        NamedGroup::X25519
    }

    fn start_exchange(&self) -> Result<Box<dyn ActiveKeyExchange>, String> {
        Ok(Box::new(EcdhKeyExchange::new(NamedGroup::X25519)?))
    }
}

/// P-256 (secp256r1) key exchange group.
#[derive(Debug)]
struct P256;

impl SupportedKxGroup for P256 {
    fn name(&self) -> NamedGroup {
        NamedGroup::Secp256r1
    }

    fn start_exchange(&self) -> Result<Box<dyn ActiveKeyExchange>, String> {
        Ok(Box::new(EcdhKeyExchange::new(NamedGroup::Secp256r1)?))
    }
}

static KX_GROUP_X25519: X25519 = X25519;
static KX_GROUP_P256: P256 = P256;

/// All supported key exchange groups, in preference order.
pub(super) static ALL_KX_GROUPS: &[&dyn SupportedKxGroup] = &[&KX_GROUP_X25519, &KX_GROUP_P256];
