use nom::IResult;

use super::DigitallySigned;
use crate::buffer::Buf;

/// Client proof of key possession, RFC 5246 Section 7.4.8.
///
/// The signature covers every handshake message up to, not including, this
/// one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateVerify {
    pub signed: DigitallySigned,
}

impl CertificateVerify {
    pub fn new(signed: DigitallySigned) -> Self {
        CertificateVerify { signed }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], CertificateVerify> {
        let (input, signed) = DigitallySigned::parse(input)?;
        Ok((input, CertificateVerify { signed }))
    }

    pub fn serialize(&self, output: &mut Buf) {
        self.signed.serialize(output);
    }
}
