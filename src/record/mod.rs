//! TLS record framing and protection.
//!
//! [`RecordCodec`] turns plaintext fragments into wire records and back.
//! Each direction has its own [`CipherSpec`] and sequence number. Until the
//! first change-cipher-spec both specs are absent and records travel in the
//! clear.

mod cipher_spec;
mod header;

pub use cipher_spec::CipherSpec;
pub use header::{RecordHeader, HEADER_LEN, MAX_CIPHERTEXT_LEN, MAX_PLAINTEXT_LEN};

use crate::buffer::Buf;
use crate::types::{ContentType, ProtocolVersion};
use crate::Error;

#[derive(Debug, Default)]
struct Direction {
    spec: Option<CipherSpec>,
    seq: u64,
}

impl Direction {
    fn install(&mut self, spec: CipherSpec) {
        // The previous spec is dropped here, together with its keys.
        self.spec = Some(spec);
        self.seq = 0;
    }

    fn next_seq(&mut self) -> Result<u64, Error> {
        let seq = self.seq;
        self.seq = seq.checked_add(1).ok_or(Error::SequenceOverflow)?;
        Ok(seq)
    }
}

/// Frames, protects and unprotects TLS records.
#[derive(Debug)]
pub struct RecordCodec {
    version: ProtocolVersion,
    read: Direction,
    write: Direction,
    max_plaintext: usize,
}

impl Default for RecordCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordCodec {
    pub fn new() -> Self {
        RecordCodec {
            // ClientHello is conventionally framed as TLS 1.0 until a version
            // is agreed.
            version: ProtocolVersion::TLS1_0,
            read: Direction::default(),
            write: Direction::default(),
            max_plaintext: MAX_PLAINTEXT_LEN,
        }
    }

    /// Version written into outgoing record headers.
    pub fn set_version(&mut self, version: ProtocolVersion) {
        self.version = version;
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Largest plaintext accepted from, or sent to, the peer.
    pub fn set_max_plaintext(&mut self, len: usize) {
        self.max_plaintext = len.min(MAX_PLAINTEXT_LEN);
    }

    pub fn max_plaintext(&self) -> usize {
        self.max_plaintext
    }

    pub fn install_read_spec(&mut self, spec: CipherSpec) {
        trace!("Install read spec {:?}", spec);
        self.read.install(spec);
    }

    pub fn install_write_spec(&mut self, spec: CipherSpec) {
        trace!("Install write spec {:?}", spec);
        self.write.install(spec);
    }

    pub fn is_read_protected(&self) -> bool {
        self.read.spec.is_some()
    }

    pub fn is_write_protected(&self) -> bool {
        self.write.spec.is_some()
    }

    /// Records sealed under the current write key.
    pub fn write_key_records(&self) -> u64 {
        if self.is_write_protected() {
            self.write.seq
        } else {
            0
        }
    }

    /// Wire size of a record carrying `plaintext_len` bytes.
    pub fn encoded_len(&self, plaintext_len: usize) -> usize {
        let overhead = self.write.spec.as_ref().map_or(0, CipherSpec::overhead);
        HEADER_LEN + plaintext_len + overhead
    }

    /// Upper bound for the plaintext inside a record of `record_len` wire
    /// bytes.
    pub fn plaintext_bound(&self, record_len: usize) -> usize {
        let overhead = self.read.spec.as_ref().map_or(0, CipherSpec::overhead);
        record_len
            .saturating_sub(HEADER_LEN)
            .saturating_sub(overhead)
    }

    /// Append one record holding `plaintext` to `out`.
    pub fn encode(
        &mut self,
        content_type: ContentType,
        plaintext: &[u8],
        out: &mut Buf,
    ) -> Result<(), Error> {
        if plaintext.len() > MAX_PLAINTEXT_LEN {
            return Err(Error::RecordOverflow(plaintext.len()));
        }
        let seq = self.write.next_seq()?;

        let mut fragment = Buf::from_slice(plaintext);
        if let Some(spec) = &mut self.write.spec {
            spec.seal(content_type, self.version, seq, &mut fragment)?;
        }

        RecordHeader::new(content_type, self.version, fragment.len()).serialize(out);
        out.extend_from_slice(&fragment);
        Ok(())
    }

    /// Total wire length of the record at the start of `input`, once the
    /// header is available. The record itself may still be incomplete.
    pub fn record_len(&self, input: &[u8]) -> Result<Option<usize>, Error> {
        if input.len() < HEADER_LEN {
            return Ok(None);
        }
        let (_, header) =
            RecordHeader::parse(input).map_err(|_| Error::MalformedRecord("header"))?;
        self.check_header(&header)?;
        Ok(Some(HEADER_LEN + header.length as usize))
    }

    fn check_header(&self, header: &RecordHeader) -> Result<(), Error> {
        if let ContentType::Unknown(t) = header.content_type {
            return Err(Error::UnexpectedMessage(format!("record type {}", t)));
        }
        if !header.version.is_tls() {
            return Err(Error::BadRecordVersion(header.version));
        }
        if header.length as usize > MAX_CIPHERTEXT_LEN {
            return Err(Error::RecordOverflow(header.length as usize));
        }
        Ok(())
    }

    /// Deframe and unprotect exactly one record.
    ///
    /// `record` must be the whole record: a declared length that differs
    /// from the payload length is rejected before anything else happens.
    pub fn decode(&mut self, record: &[u8]) -> Result<(ContentType, Buf), Error> {
        let (payload, header) =
            RecordHeader::parse(record).map_err(|_| Error::MalformedRecord("header"))?;
        self.check_header(&header)?;

        if payload.len() != header.length as usize {
            return Err(Error::LengthMismatch {
                declared: header.length as usize,
                actual: payload.len(),
            });
        }

        let seq = self.read.next_seq()?;
        let mut fragment = Buf::from_slice(payload);
        if let Some(spec) = &mut self.read.spec {
            spec.open(header.content_type, header.version, seq, &mut fragment)?;
        }

        if fragment.len() > self.max_plaintext {
            return Err(Error::RecordOverflow(fragment.len()));
        }

        Ok((header.content_type, fragment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::rust_crypto::default_provider;
    use crate::types::CipherSuite;

    fn spec(key_byte: u8) -> CipherSpec {
        let suite = default_provider()
            .find_cipher_suite(CipherSuite::ECDHE_ECDSA_AES128_GCM_SHA256)
            .unwrap();
        CipherSpec::new(suite, &[key_byte; 16], &[9; 4]).unwrap()
    }

    fn protected_pair() -> (RecordCodec, RecordCodec) {
        let mut tx = RecordCodec::new();
        let mut rx = RecordCodec::new();
        tx.set_version(ProtocolVersion::TLS1_2);
        rx.set_version(ProtocolVersion::TLS1_2);
        tx.install_write_spec(spec(1));
        rx.install_read_spec(spec(1));
        (tx, rx)
    }

    #[test]
    fn plaintext_records() {
        let mut codec = RecordCodec::new();
        let mut out = Buf::new();
        codec
            .encode(ContentType::Handshake, b"hello", &mut out)
            .unwrap();
        assert_eq!(&out[..5], &[22, 3, 1, 0, 5]);
        assert_eq!(codec.record_len(&out).unwrap(), Some(10));

        let (ctype, plain) = codec.decode(&out).unwrap();
        assert_eq!(ctype, ContentType::Handshake);
        assert_eq!(&*plain, b"hello");
    }

    #[test]
    fn protected_records() {
        let (mut tx, mut rx) = protected_pair();

        let mut out = Buf::new();
        tx.encode(ContentType::ApplicationData, b"secret", &mut out)
            .unwrap();
        assert_eq!(out.len(), tx.encoded_len(6));
        assert_eq!(out.len(), HEADER_LEN + 8 + 6 + 16);
        // Explicit nonce is the sequence number.
        assert_eq!(&out[5..13], &0u64.to_be_bytes());
        assert!(rx.plaintext_bound(out.len()) >= 6);

        let (ctype, plain) = rx.decode(&out).unwrap();
        assert_eq!(ctype, ContentType::ApplicationData);
        assert_eq!(&*plain, b"secret");
    }

    #[test]
    fn chacha_records_carry_no_explicit_nonce() {
        let suite = default_provider()
            .find_cipher_suite(CipherSuite::ECDHE_ECDSA_CHACHA20_POLY1305_SHA256)
            .unwrap();
        let chacha = || CipherSpec::new(suite, &[3; 32], &[7; 12]).unwrap();

        let mut tx = RecordCodec::new();
        let mut rx = RecordCodec::new();
        tx.install_write_spec(chacha());
        rx.install_read_spec(chacha());

        let mut first = Buf::new();
        let mut second = Buf::new();
        tx.encode(ContentType::ApplicationData, b"secret", &mut first)
            .unwrap();
        tx.encode(ContentType::ApplicationData, b"secret", &mut second)
            .unwrap();
        assert_eq!(first.len(), HEADER_LEN + 6 + 16);
        assert_eq!(first.len(), tx.encoded_len(6));
        assert_eq!(tx.write_key_records(), 2);
        // Same plaintext, different sequence number.
        assert_ne!(first[5..], second[5..]);

        assert_eq!(&*rx.decode(&first).unwrap().1, b"secret");
        assert_eq!(&*rx.decode(&second).unwrap().1, b"secret");
        assert_eq!(rx.decode(&first), Err(Error::BadRecordMac));

        let record = [23, 3, 1, 0, 15, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(rx.decode(&record), Err(Error::BadRecordMac));
    }

    #[test]
    fn write_key_records_restart_with_new_keys() {
        let (mut tx, _) = protected_pair();
        let mut out = Buf::new();
        for _ in 0..3 {
            tx.encode(ContentType::ApplicationData, b"x", &mut out)
                .unwrap();
        }
        assert_eq!(tx.write_key_records(), 3);
        tx.install_write_spec(spec(2));
        assert_eq!(tx.write_key_records(), 0);
        assert_eq!(RecordCodec::new().write_key_records(), 0);
    }

    #[test]
    fn tampered_record_fails_authentication() {
        let (mut tx, mut rx) = protected_pair();

        let mut out = Buf::new();
        tx.encode(ContentType::ApplicationData, b"secret", &mut out)
            .unwrap();
        let last = out.len() - 1;
        out[last] ^= 0x01;

        assert_eq!(rx.decode(&out), Err(Error::BadRecordMac));
    }

    #[test]
    fn replayed_record_fails_authentication() {
        let (mut tx, mut rx) = protected_pair();

        let mut out = Buf::new();
        tx.encode(ContentType::ApplicationData, b"once", &mut out)
            .unwrap();

        rx.decode(&out).unwrap();
        assert_eq!(rx.decode(&out), Err(Error::BadRecordMac));
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let mut tx = RecordCodec::new();
        let mut rx = RecordCodec::new();
        tx.install_write_spec(spec(1));
        rx.install_read_spec(spec(2));

        let mut out = Buf::new();
        tx.encode(ContentType::Handshake, b"x", &mut out).unwrap();
        assert_eq!(rx.decode(&out), Err(Error::BadRecordMac));
    }

    #[test]
    fn short_protected_fragment() {
        let (_, mut rx) = protected_pair();
        let record = [23, 3, 3, 0, 4, 1, 2, 3, 4];
        assert_eq!(rx.decode(&record), Err(Error::BadRecordMac));
    }

    #[test]
    fn declared_length_must_match() {
        let mut codec = RecordCodec::new();
        let record = [23, 3, 3, 0, 4, 1, 2, 3];
        assert_eq!(
            codec.decode(&record),
            Err(Error::LengthMismatch {
                declared: 4,
                actual: 3
            })
        );
        let record = [23, 3, 3, 0, 2, 1, 2, 3];
        assert!(matches!(
            codec.decode(&record),
            Err(Error::LengthMismatch { .. })
        ));
    }

    #[test]
    fn header_checks() {
        let codec = RecordCodec::new();
        assert_eq!(codec.record_len(&[22, 3, 3, 0]).unwrap(), None);
        assert!(matches!(
            codec.record_len(&[99, 3, 3, 0, 1]),
            Err(Error::UnexpectedMessage(_))
        ));
        assert!(matches!(
            codec.record_len(&[22, 2, 0, 0, 1]),
            Err(Error::BadRecordVersion(_))
        ));
        assert!(matches!(
            codec.record_len(&[23, 3, 3, 0xff, 0xff]),
            Err(Error::RecordOverflow(_))
        ));
    }

    #[test]
    fn inbound_plaintext_limit() {
        let mut tx = RecordCodec::new();
        let mut rx = RecordCodec::new();
        rx.set_max_plaintext(512);

        let mut out = Buf::new();
        tx.encode(ContentType::ApplicationData, &[0; 600], &mut out)
            .unwrap();
        assert_eq!(rx.decode(&out), Err(Error::RecordOverflow(600)));
    }

    #[test]
    fn new_spec_resets_sequence() {
        let (mut tx, mut rx) = protected_pair();
        let mut out = Buf::new();
        tx.encode(ContentType::Handshake, b"a", &mut out).unwrap();
        rx.decode(&out).unwrap();

        tx.install_write_spec(spec(3));
        rx.install_read_spec(spec(3));
        out.clear();
        tx.encode(ContentType::Handshake, b"b", &mut out).unwrap();
        assert_eq!(&out[5..13], &0u64.to_be_bytes());
        let (_, plain) = rx.decode(&out).unwrap();
        assert_eq!(&*plain, b"b");
    }
}
