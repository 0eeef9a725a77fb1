use nom::multi::length_data;
use nom::number::complete::be_u16;
use nom::IResult;

use crate::buffer::Buf;
use crate::types::SignatureScheme;

/// Signature with its scheme, RFC 5246 Section 4.7.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitallySigned {
    pub scheme: SignatureScheme,
    pub signature: Vec<u8>,
}

impl DigitallySigned {
    pub fn new(scheme: SignatureScheme, signature: Vec<u8>) -> Self {
        DigitallySigned { scheme, signature }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], DigitallySigned> {
        let (input, scheme) = SignatureScheme::parse(input)?;
        let (input, signature) = length_data(be_u16)(input)?;
        Ok((input, DigitallySigned::new(scheme, signature.to_vec())))
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.extend_from_slice(&self.scheme.as_u16().to_be_bytes());
        output.extend_from_slice(&(self.signature.len() as u16).to_be_bytes());
        output.extend_from_slice(&self.signature);
    }
}
