//! Cipher suite implementations using RustCrypto.
use aes_gcm::aead::consts::U12;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes128Gcm, Aes256Gcm, Key};
use chacha20poly1305::ChaCha20Poly1305;

use crate::buffer::Buf;
use crate::crypto::provider::{Cipher, SupportedCipherSuite};
use crate::crypto::{Aad, Nonce};
use crate::types::CipherSuite;

/// AES-GCM cipher implementation using RustCrypto.
enum AesGcm {
    Aes128(Box<Aes128Gcm>),
    Aes256(Box<Aes256Gcm>),
}

impl std::fmt::Debug for AesGcm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AesGcm::Aes128(_) => f.debug_tuple("AesGcm::Aes128").finish(),
            AesGcm::Aes256(_) => f.debug_tuple("AesGcm::Aes256").finish(),
        }
    }
}

impl AesGcm {
    fn new(key: &[u8]) -> Result<Self, String> {
        match key.len() {
            16 => {
                let key = Key::<Aes128Gcm>::from_slice(key);
                Ok(AesGcm::Aes128(Box::new(Aes128Gcm::new(key))))
            }
            32 => {
                let key = Key::<Aes256Gcm>::from_slice(key);
                Ok(AesGcm::Aes256(Box::new(Aes256Gcm::new(key))))
            }
            _ => Err(format!("Invalid key size for AES-GCM: {}", key.len())),
        }
    }
}

impl Cipher for AesGcm {
    fn encrypt(&mut self, data: &mut Buf, aad: Aad, nonce: Nonce) -> Result<(), String> {
        let nonce = aes_gcm::Nonce::<U12>::from_slice(&nonce.0);
        let res = match self {
            AesGcm::Aes128(cipher) => cipher.encrypt_in_place(nonce, &aad.0, data),
            AesGcm::Aes256(cipher) => cipher.encrypt_in_place(nonce, &aad.0, data),
        };
        res.map_err(|_| "AES-GCM encryption failed".to_string())
    }

    fn decrypt(&mut self, data: &mut Buf, aad: Aad, nonce: Nonce) -> Result<(), String> {
        if data.len() < 16 {
            return Err(format!("Ciphertext too short: {}", data.len()));
        }
        let nonce = aes_gcm::Nonce::<U12>::from_slice(&nonce.0);
        // decrypt_in_place verifies the tag before touching the buffer and
        // strips it on success.
        let res = match self {
            AesGcm::Aes128(cipher) => cipher.decrypt_in_place(nonce, &aad.0, data),
            AesGcm::Aes256(cipher) => cipher.decrypt_in_place(nonce, &aad.0, data),
        };
        res.map_err(|_| "AES-GCM decryption failed".to_string())
    }
}

/// ChaCha20-Poly1305 cipher implementation using RustCrypto.
struct ChaCha(Box<ChaCha20Poly1305>);

impl std::fmt::Debug for ChaCha {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ChaCha20Poly1305").finish()
    }
}

impl ChaCha {
    fn new(key: &[u8]) -> Result<Self, String> {
        if key.len() != 32 {
            return Err(format!(
                "Invalid key size for ChaCha20-Poly1305: {}",
                key.len()
            ));
        }
        let key = chacha20poly1305::Key::from_slice(key);
        Ok(ChaCha(Box::new(ChaCha20Poly1305::new(key))))
    }
}

impl Cipher for ChaCha {
    fn encrypt(&mut self, data: &mut Buf, aad: Aad, nonce: Nonce) -> Result<(), String> {
        let nonce = chacha20poly1305::Nonce::from_slice(&nonce.0);
        self.0
            .encrypt_in_place(nonce, &aad.0, data)
            .map_err(|_| "ChaCha20-Poly1305 encryption failed".to_string())
    }

    fn decrypt(&mut self, data: &mut Buf, aad: Aad, nonce: Nonce) -> Result<(), String> {
        if data.len() < 16 {
            return Err(format!("Ciphertext too short: {}", data.len()));
        }
        let nonce = chacha20poly1305::Nonce::from_slice(&nonce.0);
        self.0
            .decrypt_in_place(nonce, &aad.0, data)
            .map_err(|_| "ChaCha20-Poly1305 decryption failed".to_string())
    }
}

/// TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256 cipher suite.
#[derive(Debug)]
struct Aes128GcmSha256;

impl SupportedCipherSuite for Aes128GcmSha256 {
    fn suite(&self) -> CipherSuite {
        CipherSuite::ECDHE_ECDSA_AES128_GCM_SHA256
    }

    fn key_lengths(&self) -> (usize, usize) {
        (16, 4)
    }

    fn create_cipher(&self, key: &[u8]) -> Result<Box<dyn Cipher>, String> {
        Ok(Box::new(AesGcm::new(key)?))
    }
}

/// TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384 cipher suite.
#[derive(Debug)]
struct Aes256GcmSha384;

impl SupportedCipherSuite for Aes256GcmSha384 {
    fn suite(&self) -> CipherSuite {
        CipherSuite::ECDHE_ECDSA_AES256_GCM_SHA384
    }

    fn key_lengths(&self) -> (usize, usize) {
        (32, 4)
    }

    fn create_cipher(&self, key: &[u8]) -> Result<Box<dyn Cipher>, String> {
        Ok(Box::new(AesGcm::new(key)?))
    }
}

/// TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256 cipher suite (RFC 7905).
#[derive(Debug)]
struct ChaCha20Poly1305Sha256;

impl SupportedCipherSuite for ChaCha20Poly1305Sha256 {
    fn suite(&self) -> CipherSuite {
        CipherSuite::ECDHE_ECDSA_CHACHA20_POLY1305_SHA256
    }

    fn key_lengths(&self) -> (usize, usize) {
        (32, 12)
    }

    fn create_cipher(&self, key: &[u8]) -> Result<Box<dyn Cipher>, String> {
        Ok(Box::new(ChaCha::new(key)?))
    }
}

static AES_128_GCM_SHA256: Aes128GcmSha256 = Aes128GcmSha256;
static AES_256_GCM_SHA384: Aes256GcmSha384 = Aes256GcmSha384;
static CHACHA20_POLY1305_SHA256: ChaCha20Poly1305Sha256 = ChaCha20Poly1305Sha256;

/// All supported cipher suites, in default preference order.
pub(super) static ALL_CIPHER_SUITES: &[&dyn SupportedCipherSuite] = &[
    &AES_128_GCM_SHA256,
    &AES_256_GCM_SHA384,
    &CHACHA20_POLY1305_SHA256,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentType, ProtocolVersion};

    #[test]
    fn seal_then_open() {
        let mut c = AES_128_GCM_SHA256.create_cipher(&[1u8; 16]).unwrap();
        let aad = Aad::new(0, ContentType::ApplicationData, ProtocolVersion::TLS1_2, 5);
        let nonce = Nonce::explicit(&[0; 4], &[0; 8]);

        let mut buf = Buf::from_slice(b"hello");
        c.encrypt(&mut buf, aad.clone(), nonce).unwrap();
        assert_eq!(buf.len(), 5 + 16);

        c.decrypt(&mut buf, aad, nonce).unwrap();
        assert_eq!(&*buf, b"hello");
    }

    #[test]
    fn wrong_aad_fails() {
        let mut c = AES_256_GCM_SHA384.create_cipher(&[2u8; 32]).unwrap();
        let nonce = Nonce::explicit(&[0; 4], &[0; 8]);
        let aad = Aad::new(0, ContentType::ApplicationData, ProtocolVersion::TLS1_2, 3);
        let mut buf = Buf::from_slice(b"abc");
        c.encrypt(&mut buf, aad, nonce).unwrap();

        let other = Aad::new(1, ContentType::ApplicationData, ProtocolVersion::TLS1_2, 3);
        assert!(c.decrypt(&mut buf, other, nonce).is_err());
    }

    #[test]
    fn rejects_bad_key_size() {
        assert!(AES_128_GCM_SHA256.create_cipher(&[0u8; 15]).is_err());
        assert!(CHACHA20_POLY1305_SHA256.create_cipher(&[0u8; 16]).is_err());
    }

    // RFC 8439 Section 2.8.2.
    #[test]
    fn chacha_matches_reference_vector() {
        let key: Vec<u8> = (0x80..=0x9f).collect();
        let mut c = CHACHA20_POLY1305_SHA256.create_cipher(&key).unwrap();
        let nonce = Nonce([
            0x07, 0x00, 0x00, 0x00, 0x40, 0x41, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47,
        ]);
        let mut aad = Aad::new(0, ContentType::ApplicationData, ProtocolVersion::TLS1_2, 0);
        aad.0.clear();
        aad.0.extend([
            0x50, 0x51, 0x52, 0x53, 0xc0, 0xc1, 0xc2, 0xc3, 0xc4, 0xc5, 0xc6, 0xc7,
        ]);

        let plaintext = b"Ladies and Gentlemen of the class of '99: If I could offer you \
only one tip for the future, sunscreen would be it.";
        let mut buf = Buf::from_slice(plaintext);
        c.encrypt(&mut buf, aad.clone(), nonce).unwrap();
        assert_eq!(buf.len(), plaintext.len() + 16);
        assert_eq!(&buf[..4], &[0xd3, 0x1a, 0x8d, 0x34]);
        assert_eq!(
            &buf[plaintext.len()..],
            &[
                0x1a, 0xe1, 0x0b, 0x59, 0x4f, 0x09, 0xe2, 0x6a, 0x7e, 0x90, 0x2e, 0xcb, 0xd0,
                0x60, 0x06, 0x91
            ]
        );

        c.decrypt(&mut buf, aad, nonce).unwrap();
        assert_eq!(&*buf, plaintext);
    }
}
