use std::fmt;

use crate::buffer::Buf;
use crate::crypto::{Aad, Cipher, Iv, Nonce, SupportedCipherSuite};
use crate::crypto::{EXPLICIT_NONCE_LEN, TAG_LEN};
use crate::types::{CipherSuite, ContentType, ProtocolVersion};
use crate::Error;

/// Record protection for one direction of a connection.
///
/// AES-GCM as in RFC 5288: the fragment on the wire is
/// `explicit_nonce(8) ‖ ciphertext ‖ tag(16)`, where the explicit nonce is
/// the record sequence number.
///
/// ChaCha20-Poly1305 as in RFC 7905: the fragment is `ciphertext ‖ tag(16)`
/// and the nonce is derived from the sequence number alone.
pub struct CipherSpec {
    suite: CipherSuite,
    cipher: Box<dyn Cipher>,
    iv: Iv,
}

impl CipherSpec {
    pub fn new(
        suite: &'static dyn SupportedCipherSuite,
        key: &[u8],
        iv: &[u8],
    ) -> Result<Self, Error> {
        let cipher = suite.create_cipher(key).map_err(Error::Crypto)?;
        let iv = Iv::new(iv).ok_or_else(|| Error::Crypto("bad fixed IV length".into()))?;
        Ok(CipherSpec {
            suite: suite.suite(),
            cipher,
            iv,
        })
    }

    pub fn suite(&self) -> CipherSuite {
        self.suite
    }

    /// Bytes a protected fragment carries on top of the plaintext.
    pub fn overhead(&self) -> usize {
        self.iv.explicit_len() + TAG_LEN
    }

    /// Replace `fragment` (plaintext) with the protected fragment.
    pub fn seal(
        &mut self,
        content_type: ContentType,
        version: ProtocolVersion,
        seq: u64,
        fragment: &mut Buf,
    ) -> Result<(), Error> {
        let aad = Aad::new(seq, content_type, version, fragment.len() as u16);

        match &self.iv {
            Iv::Explicit(iv) => {
                let explicit_nonce = seq.to_be_bytes();
                let nonce = Nonce::explicit(iv, &explicit_nonce);
                self.cipher
                    .encrypt(fragment, aad, nonce)
                    .map_err(Error::Crypto)?;

                let ctext_len = fragment.len();
                fragment.resize(EXPLICIT_NONCE_LEN + ctext_len, 0);
                fragment.copy_within(0..ctext_len, EXPLICIT_NONCE_LEN);
                fragment[..EXPLICIT_NONCE_LEN].copy_from_slice(&explicit_nonce);
            }
            Iv::Implicit(iv) => {
                let nonce = Nonce::implicit(iv, seq);
                self.cipher
                    .encrypt(fragment, aad, nonce)
                    .map_err(Error::Crypto)?;
            }
        }
        Ok(())
    }

    /// Verify and strip protection from `fragment` in place.
    ///
    /// `seq` is the receiver's own count of records, never the value on the
    /// wire, so a replayed or reordered record fails authentication. Every
    /// failure is the same [`Error::BadRecordMac`].
    pub fn open(
        &mut self,
        content_type: ContentType,
        version: ProtocolVersion,
        seq: u64,
        fragment: &mut Buf,
    ) -> Result<(), Error> {
        if fragment.len() < self.overhead() {
            return Err(Error::BadRecordMac);
        }

        let nonce = match &self.iv {
            Iv::Explicit(iv) => {
                let mut explicit_nonce = [0u8; EXPLICIT_NONCE_LEN];
                explicit_nonce.copy_from_slice(&fragment[..EXPLICIT_NONCE_LEN]);
                fragment.consume(EXPLICIT_NONCE_LEN);
                Nonce::explicit(iv, &explicit_nonce)
            }
            Iv::Implicit(iv) => Nonce::implicit(iv, seq),
        };

        let plaintext_len = fragment.len() - TAG_LEN;
        let aad = Aad::new(seq, content_type, version, plaintext_len as u16);

        if self.cipher.decrypt(fragment, aad, nonce).is_err() {
            fragment.clear();
            return Err(Error::BadRecordMac);
        }
        Ok(())
    }
}

impl fmt::Debug for CipherSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherSpec")
            .field("suite", &self.suite)
            .finish_non_exhaustive()
    }
}
