use nom::combinator::{all_consuming, verify};
use nom::multi::{length_data, many0};
use nom::number::complete::be_u24;
use nom::IResult;

use crate::buffer::Buf;

/// Certificate chain, end entity first. Empty when a client has nothing to
/// send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    pub certificate_list: Vec<Vec<u8>>,
}

impl Certificate {
    pub fn new(certificate_list: Vec<Vec<u8>>) -> Self {
        Certificate { certificate_list }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], Certificate> {
        let (input, list) = length_data(be_u24)(input)?;
        let (_, certs) = all_consuming(many0(verify(length_data(be_u24), |c: &[u8]| {
            !c.is_empty()
        })))(list)?;

        Ok((
            input,
            Certificate {
                certificate_list: certs.into_iter().map(|c| c.to_vec()).collect(),
            },
        ))
    }

    pub fn serialize(&self, output: &mut Buf) {
        let total_len: usize = self.certificate_list.iter().map(|c| 3 + c.len()).sum();
        output.extend_from_slice(&(total_len as u32).to_be_bytes()[1..]);

        for cert in &self.certificate_list {
            output.extend_from_slice(&(cert.len() as u32).to_be_bytes()[1..]);
            output.extend_from_slice(cert);
        }
    }
}
