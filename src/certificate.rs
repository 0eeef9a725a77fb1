//! Self-signed certificate generation and fingerprint helpers.
//!
//! Chain validation is not done here; a [`TrustManager`](crate::TrustManager)
//! makes that decision. These helpers produce credentials for tests and
//! peer-to-peer setups where endpoints pin each other's fingerprint.

use std::fmt;

use rcgen::{
    Certificate as RcgenCertificate, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair,
    PKCS_ECDSA_P256_SHA256,
};
use sha2::{Digest, Sha256};

/// Certificate utility errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateError {
    /// Input was not a usable certificate.
    InvalidFormat,
    /// Certificate generation failed.
    GenerationFailed,
}

impl fmt::Display for CertificateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CertificateError::InvalidFormat => write!(f, "Invalid certificate format"),
            CertificateError::GenerationFailed => write!(f, "Certificate generation failed"),
        }
    }
}

impl std::error::Error for CertificateError {}

/// DER certificate and the PKCS#8 DER private key that goes with it.
#[derive(Clone)]
pub struct CertifiedKey {
    /// Certificate in DER format
    pub certificate: Vec<u8>,
    /// Private key in PKCS#8 DER format
    pub private_key: Vec<u8>,
}

/// Generate a self-signed ECDSA P-256 certificate.
///
/// The first name becomes the common name and every name is added as a
/// DNS subject alternative name.
pub fn generate_self_signed_certificate(
    subject_alt_names: &[&str],
) -> Result<CertifiedKey, CertificateError> {
    let key_pair = KeyPair::generate(&PKCS_ECDSA_P256_SHA256)
        .map_err(|_| CertificateError::GenerationFailed)?;

    let names: Vec<String> = subject_alt_names.iter().map(|s| s.to_string()).collect();
    let common_name = names
        .first()
        .cloned()
        .unwrap_or_else(|| "timpl".to_string());

    let mut params = CertificateParams::new(names);

    let mut distinguished_name = DistinguishedName::new();
    distinguished_name.push(DnType::OrganizationName, "timpl".to_string());
    distinguished_name.push(DnType::CommonName, common_name);
    params.distinguished_name = distinguished_name;

    params.is_ca = IsCa::NoCa;
    params.key_pair = Some(key_pair);

    let not_before = time::OffsetDateTime::now_utc();
    params.not_before = not_before;
    params.not_after = not_before + time::Duration::days(365);

    let cert =
        RcgenCertificate::from_params(params).map_err(|_| CertificateError::GenerationFailed)?;

    let cert_der = cert
        .serialize_der()
        .map_err(|_| CertificateError::GenerationFailed)?;
    let key_der = cert.serialize_private_key_der();

    Ok(CertifiedKey {
        certificate: cert_der,
        private_key: key_der,
    })
}

/// SHA-256 fingerprint of a DER certificate.
pub fn calculate_fingerprint(cert_der: &[u8]) -> [u8; 32] {
    Sha256::digest(cert_der).into()
}

/// Format a fingerprint as colon separated uppercase hex, e.g. `"AF:12:F6"`.
pub fn format_fingerprint(fingerprint: &[u8]) -> String {
    fingerprint
        .iter()
        .map(|byte| format!("{:02X}", byte))
        .collect::<Vec<String>>()
        .join(":")
}

/// Parse the output of [`format_fingerprint`] back into bytes.
pub fn parse_fingerprint(s: &str) -> Result<Vec<u8>, CertificateError> {
    s.split(':')
        .map(|pair| {
            if pair.len() != 2 {
                return Err(CertificateError::InvalidFormat);
            }
            u8::from_str_radix(pair, 16).map_err(|_| CertificateError::InvalidFormat)
        })
        .collect()
}

impl CertifiedKey {
    /// SHA-256 fingerprint of the certificate.
    pub fn fingerprint(&self) -> [u8; 32] {
        calculate_fingerprint(&self.certificate)
    }

    /// Fingerprint formatted by [`format_fingerprint`].
    pub fn fingerprint_str(&self) -> String {
        format_fingerprint(&self.fingerprint())
    }
}

impl fmt::Debug for CertifiedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertifiedKey")
            .field("certificate", &self.certificate.len())
            .field("private_key", &self.private_key.len())
            .finish()
    }
}
