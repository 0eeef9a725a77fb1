use nom::combinator::{all_consuming, verify};
use nom::error::{Error, ErrorKind};
use nom::multi::{length_data, many1};
use nom::number::complete::{be_u16, be_u8};
use nom::{Err, IResult};

use crate::buffer::Buf;

/// Application-Layer Protocol Negotiation, RFC 7301.
///
/// A client sends every protocol it is willing to speak; a server answers
/// with exactly one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlpnExtension {
    pub protocols: Vec<String>,
}

impl AlpnExtension {
    pub fn new<S: AsRef<str>>(protocols: &[S]) -> Self {
        AlpnExtension {
            protocols: protocols.iter().map(|p| p.as_ref().to_string()).collect(),
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], AlpnExtension> {
        let (input, list) = length_data(be_u16)(input)?;
        let (_, names) = all_consuming(many1(verify(length_data(be_u8), |n: &[u8]| {
            !n.is_empty()
        })))(list)?;

        let protocols = names
            .into_iter()
            .map(|n| String::from_utf8(n.to_vec()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| Err::Failure(Error::new(input, ErrorKind::Char)))?;

        Ok((input, AlpnExtension { protocols }))
    }

    pub fn serialize(&self, output: &mut Buf) {
        let list_len: usize = self.protocols.iter().map(|p| 1 + p.len()).sum();
        output.extend_from_slice(&(list_len as u16).to_be_bytes());
        for p in &self.protocols {
            output.push(p.len() as u8);
            output.extend_from_slice(p.as_bytes());
        }
    }
}
