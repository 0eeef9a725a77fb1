use nom::error::{Error, ErrorKind};
use nom::multi::length_data;
use nom::number::complete::be_u8;
use nom::{Err, IResult};

use super::DigitallySigned;
use crate::buffer::Buf;
use crate::types::NamedGroup;

/// ECCurveType `named_curve`, RFC 8422 Section 5.4.
pub const CURVE_TYPE_NAMED_CURVE: u8 = 3;

/// ECDHE parameters, RFC 8422 Section 5.4.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcdhParams {
    pub named_group: NamedGroup,
    pub public_key: Vec<u8>,
}

impl EcdhParams {
    pub fn parse(input: &[u8]) -> IResult<&[u8], EcdhParams> {
        let (rest, curve_type) = be_u8(input)?;
        if curve_type != CURVE_TYPE_NAMED_CURVE {
            return Err(Err::Failure(Error::new(input, ErrorKind::Tag)));
        }
        let (rest, named_group) = NamedGroup::parse(rest)?;
        let (rest, public_key) = length_data(be_u8)(rest)?;
        Ok((
            rest,
            EcdhParams {
                named_group,
                public_key: public_key.to_vec(),
            },
        ))
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.push(CURVE_TYPE_NAMED_CURVE);
        output.extend_from_slice(&self.named_group.as_u16().to_be_bytes());
        output.push(self.public_key.len() as u8);
        output.extend_from_slice(&self.public_key);
    }

    /// The bytes the server signs: both hello randoms then the params.
    pub fn signed_data(&self, client_random: &[u8; 32], server_random: &[u8; 32]) -> Vec<u8> {
        let mut data = Buf::new();
        data.extend_from_slice(client_random);
        data.extend_from_slice(server_random);
        self.serialize(&mut data);
        data.into_vec()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerKeyExchange {
    pub params: EcdhParams,
    pub signed: DigitallySigned,
}

impl ServerKeyExchange {
    pub fn parse(input: &[u8]) -> IResult<&[u8], ServerKeyExchange> {
        let (input, params) = EcdhParams::parse(input)?;
        let (input, signed) = DigitallySigned::parse(input)?;
        Ok((input, ServerKeyExchange { params, signed }))
    }

    pub fn serialize(&self, output: &mut Buf) {
        self.params.serialize(output);
        self.signed.serialize(output);
    }
}
