use nom::combinator::all_consuming;
use nom::multi::{length_data, many0};
use nom::number::complete::be_u16;
use nom::IResult;

use crate::buffer::Buf;
use crate::types::SignatureScheme;

/// SignatureAlgorithms extension as defined in RFC 5246 Section 7.4.1.4.1
///
/// The same list encoding is used by `CertificateRequest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureAlgorithmsExtension {
    pub schemes: Vec<SignatureScheme>,
}

impl SignatureAlgorithmsExtension {
    pub fn new(schemes: impl IntoIterator<Item = SignatureScheme>) -> Self {
        SignatureAlgorithmsExtension {
            schemes: schemes.into_iter().collect(),
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], SignatureAlgorithmsExtension> {
        let (input, list) = length_data(be_u16)(input)?;
        let (_, schemes) = all_consuming(many0(SignatureScheme::parse))(list)?;
        Ok((input, SignatureAlgorithmsExtension { schemes }))
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.extend_from_slice(&((self.schemes.len() * 2) as u16).to_be_bytes());
        for scheme in &self.schemes {
            output.extend_from_slice(&scheme.as_u16().to_be_bytes());
        }
    }
}
