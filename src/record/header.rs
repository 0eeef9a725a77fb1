use nom::number::complete::be_u16;
use nom::IResult;

use crate::buffer::Buf;
use crate::types::{ContentType, ProtocolVersion};

/// TLS record header length: content_type(1) + version(2) + length(2)
pub const HEADER_LEN: usize = 5;

/// Largest plaintext fragment, 2^14.
pub const MAX_PLAINTEXT_LEN: usize = 1 << 14;

/// Largest protected fragment, 2^14 + 2048.
pub const MAX_CIPHERTEXT_LEN: usize = MAX_PLAINTEXT_LEN + 2048;

/// TLS record header, RFC 5246 Section 6.2.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub content_type: ContentType,
    pub version: ProtocolVersion,
    pub length: u16,
}

impl RecordHeader {
    pub fn new(content_type: ContentType, version: ProtocolVersion, length: usize) -> Self {
        RecordHeader {
            content_type,
            version,
            length: length as u16,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], RecordHeader> {
        let (input, content_type) = ContentType::parse(input)?;
        let (input, version) = ProtocolVersion::parse(input)?;
        let (input, length) = be_u16(input)?;
        Ok((
            input,
            RecordHeader {
                content_type,
                version,
                length,
            },
        ))
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.push(self.content_type.as_u8());
        output.extend_from_slice(&self.version.as_u16().to_be_bytes());
        output.extend_from_slice(&self.length.to_be_bytes());
    }
}
