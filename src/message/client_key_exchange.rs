use nom::combinator::verify;
use nom::multi::length_data;
use nom::number::complete::be_u8;
use nom::IResult;

use crate::buffer::Buf;

/// ClientECDiffieHellmanPublic, RFC 8422 Section 5.7 (explicit encoding).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientKeyExchange {
    pub public_key: Vec<u8>,
}

impl ClientKeyExchange {
    pub fn new(public_key: &[u8]) -> Self {
        ClientKeyExchange {
            public_key: public_key.to_vec(),
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], ClientKeyExchange> {
        let (input, public_key) = verify(length_data(be_u8), |k: &[u8]| !k.is_empty())(input)?;
        Ok((input, ClientKeyExchange::new(public_key)))
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.push(self.public_key.len() as u8);
        output.extend_from_slice(&self.public_key);
    }
}
