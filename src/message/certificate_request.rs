use nom::combinator::{all_consuming, verify};
use nom::multi::{length_data, many0};
use nom::number::complete::{be_u16, be_u8};
use nom::IResult;

use super::extensions::SignatureAlgorithmsExtension;
use crate::buffer::Buf;
use crate::types::SignatureScheme;

/// ClientCertificateType `ecdsa_sign`, RFC 8422 Section 5.5.
pub const ECDSA_SIGN: u8 = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRequest {
    pub certificate_types: Vec<u8>,
    pub signature_schemes: Vec<SignatureScheme>,
    /// DER encoded distinguished names.
    pub certificate_authorities: Vec<Vec<u8>>,
}

impl CertificateRequest {
    pub fn new(
        certificate_types: Vec<u8>,
        signature_schemes: Vec<SignatureScheme>,
        certificate_authorities: Vec<Vec<u8>>,
    ) -> Self {
        CertificateRequest {
            certificate_types,
            signature_schemes,
            certificate_authorities,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], CertificateRequest> {
        let (input, types) = verify(length_data(be_u8), |t: &[u8]| !t.is_empty())(input)?;
        let (input, sigs) = SignatureAlgorithmsExtension::parse(input)?;

        let (input, auths) = length_data(be_u16)(input)?;
        let (_, authorities) = all_consuming(many0(length_data(be_u16)))(auths)?;

        Ok((
            input,
            CertificateRequest {
                certificate_types: types.to_vec(),
                signature_schemes: sigs.schemes,
                certificate_authorities: authorities.into_iter().map(|a| a.to_vec()).collect(),
            },
        ))
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.push(self.certificate_types.len() as u8);
        output.extend_from_slice(&self.certificate_types);

        SignatureAlgorithmsExtension::new(self.signature_schemes.iter().copied()).serialize(output);

        let auth_len: usize = self
            .certificate_authorities
            .iter()
            .map(|a| 2 + a.len())
            .sum();
        output.extend_from_slice(&(auth_len as u16).to_be_bytes());
        for a in &self.certificate_authorities {
            output.extend_from_slice(&(a.len() as u16).to_be_bytes());
            output.extend_from_slice(a);
        }
    }
}
