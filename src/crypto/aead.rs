//! TLS 1.2 AEAD record formatting (RFC 5246 Section 6.2.3.3, RFC 5288,
//! RFC 7905).
//!
//! These types are separate from the pluggable provider so that every
//! backend receives the nonce and additional data already assembled.

use std::ops::Deref;

use arrayvec::ArrayVec;

use crate::types::{ContentType, ProtocolVersion};

/// Explicit nonce length of the GCM suites. The explicit nonce travels in
/// front of every protected fragment and equals the record sequence number.
pub(crate) const EXPLICIT_NONCE_LEN: usize = 8;

/// Authentication tag length, the same for GCM and Poly1305.
pub(crate) const TAG_LEN: usize = 16;

/// Fixed IV taken from the key block. Its length selects the nonce layout.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum Iv {
    /// GCM: `iv(4) ‖ explicit_nonce(8)`, explicit part on the wire.
    Explicit([u8; 4]),
    /// ChaCha20-Poly1305: `iv(12) XOR seq`, nothing on the wire.
    Implicit([u8; 12]),
}

impl Iv {
    pub(crate) fn new(iv: &[u8]) -> Option<Self> {
        match iv.len() {
            4 => Some(Iv::Explicit(iv.try_into().ok()?)),
            12 => Some(Iv::Implicit(iv.try_into().ok()?)),
            _ => None,
        }
    }

    /// Bytes written in front of each protected fragment.
    pub(crate) fn explicit_len(&self) -> usize {
        match self {
            Iv::Explicit(_) => EXPLICIT_NONCE_LEN,
            Iv::Implicit(_) => 0,
        }
    }
}

impl std::fmt::Debug for Iv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Iv::Explicit(_) => f.write_str("Iv::Explicit(..)"),
            Iv::Implicit(_) => f.write_str("Iv::Implicit(..)"),
        }
    }
}

impl zeroize::Zeroize for Iv {
    fn zeroize(&mut self) {
        match self {
            Iv::Explicit(iv) => iv.zeroize(),
            Iv::Implicit(iv) => iv.zeroize(),
        }
    }
}

/// Full 12-byte AEAD nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nonce(pub [u8; 12]);

impl Nonce {
    /// Fixed IV followed by the explicit nonce (RFC 5288).
    pub(crate) fn explicit(iv: &[u8; 4], explicit_nonce: &[u8; EXPLICIT_NONCE_LEN]) -> Self {
        let mut nonce = [0u8; 12];
        nonce[..4].copy_from_slice(iv);
        nonce[4..].copy_from_slice(explicit_nonce);
        Self(nonce)
    }

    /// Fixed IV XOR the sequence number, left padded to 12 bytes (RFC 7905).
    pub(crate) fn implicit(iv: &[u8; 12], sequence: u64) -> Self {
        let mut nonce = *iv;
        for (n, s) in nonce[4..].iter_mut().zip(sequence.to_be_bytes()) {
            *n ^= s;
        }
        Self(nonce)
    }
}

/// Additional authenticated data for a TLS 1.2 record.
///
/// `seq_num(8) ‖ type(1) ‖ version(2) ‖ length(2)`, where length is the
/// plaintext length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aad(pub ArrayVec<u8, 13>);

impl Aad {
    pub(crate) fn new(
        sequence: u64,
        content_type: ContentType,
        version: ProtocolVersion,
        length: u16,
    ) -> Self {
        let mut aad = ArrayVec::new();
        aad.extend(sequence.to_be_bytes());
        aad.push(content_type.as_u8());
        aad.extend(version.as_u16().to_be_bytes());
        aad.extend(length.to_be_bytes());
        Aad(aad)
    }
}

impl Deref for Aad {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Deref for Nonce {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
