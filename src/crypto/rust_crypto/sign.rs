//! Signing and key loading implementations using RustCrypto.

use std::str;
use std::sync::Arc;

use der::Decode;
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use pkcs8::DecodePrivateKey;
use sha2::{Digest, Sha256};
use signature::hazmat::{PrehashSigner, PrehashVerifier};
use spki::ObjectIdentifier;
use x509_cert::Certificate as X509Certificate;

use crate::crypto::provider::{KeyProvider, SignatureVerifier, SigningKey as SigningKeyTrait};
use crate::types::SignatureScheme;

const OID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
const OID_P256: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");

/// ECDSA P-256 signing key.
struct EcdsaSigningKey(SigningKey);

impl std::fmt::Debug for EcdsaSigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("EcdsaSigningKey::P256").finish()
    }
}

impl SigningKeyTrait for EcdsaSigningKey {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, String> {
        // PrehashSigner expects the digest, not the message.
        let hash = Sha256::digest(data);
        let signature: Signature = self
            .0
            .sign_prehash(&hash)
            .map_err(|_| "Signing failed".to_string())?;
        Ok(signature.to_der().as_bytes().to_vec())
    }

    fn scheme(&self) -> SignatureScheme {
        SignatureScheme::ECDSA_SECP256R1_SHA256
    }

    fn key_type(&self) -> &'static str {
        "EC"
    }
}

/// Key provider implementation.
#[derive(Debug)]
pub(super) struct RustCryptoKeyProvider;

impl KeyProvider for RustCryptoKeyProvider {
    fn load_private_key(&self, key_der: &[u8]) -> Result<Arc<dyn SigningKeyTrait>, String> {
        if let Ok(key) = SigningKey::from_pkcs8_der(key_der) {
            return Ok(Arc::new(EcdsaSigningKey(key)));
        }

        // Check if it's a PEM encoded key
        if let Ok(pem_str) = str::from_utf8(key_der) {
            if pem_str.contains("-----BEGIN") {
                if let Ok((_label, doc)) = pkcs8::Document::from_pem(pem_str) {
                    return self.load_private_key(doc.as_bytes());
                }
            }
        }

        Err("Failed to parse private key in any supported format".to_string())
    }
}

/// Signature verifier implementation.
#[derive(Debug)]
pub(super) struct RustCryptoSignatureVerifier;

impl SignatureVerifier for RustCryptoSignatureVerifier {
    fn verify_signature(
        &self,
        cert_der: &[u8],
        data: &[u8],
        signature: &[u8],
        scheme: SignatureScheme,
    ) -> Result<(), String> {
        if scheme != SignatureScheme::ECDSA_SECP256R1_SHA256 {
            return Err(format!("Unsupported signature scheme: {:?}", scheme));
        }

        let cert = X509Certificate::from_der(cert_der)
            .map_err(|e| format!("Failed to parse certificate: {e}"))?;
        let spki = &cert.tbs_certificate.subject_public_key_info;

        if spki.algorithm.oid != OID_EC_PUBLIC_KEY {
            return Err(format!(
                "Unsupported public key algorithm: {}",
                spki.algorithm.oid
            ));
        }

        let curve_oid: ObjectIdentifier = spki
            .algorithm
            .parameters
            .as_ref()
            .ok_or("Missing EC curve parameter in certificate")?
            .decode_as()
            .map_err(|_| "Invalid EC curve parameter in certificate".to_string())?;

        if curve_oid != OID_P256 {
            return Err(format!("Unsupported EC curve: {}", curve_oid));
        }

        let pubkey_bytes = spki
            .subject_public_key
            .as_bytes()
            .ok_or_else(|| "Invalid EC subject_public_key bitstring".to_string())?;

        let verifying_key = VerifyingKey::from_sec1_bytes(pubkey_bytes)
            .map_err(|_| "Invalid P-256 public key".to_string())?;
        let sig =
            Signature::from_der(signature).map_err(|_| "Invalid signature format".to_string())?;

        let hash = Sha256::digest(data);
        verifying_key
            .verify_prehash(&hash, &sig)
            .map_err(|_| "ECDSA signature verification failed".to_string())
    }
}

pub(super) static KEY_PROVIDER: RustCryptoKeyProvider = RustCryptoKeyProvider;

pub(super) static SIGNATURE_VERIFIER: RustCryptoSignatureVerifier = RustCryptoSignatureVerifier;

/// Schemes the verifier handles.
pub(super) static SIGNATURE_SCHEMES: &[SignatureScheme] = &[SignatureScheme::ECDSA_SECP256R1_SHA256];
