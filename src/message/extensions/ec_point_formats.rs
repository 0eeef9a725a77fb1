use nom::multi::length_data;
use nom::number::complete::be_u8;
use nom::IResult;

use crate::buffer::Buf;

/// The only point format TLS 1.2 peers are required to support.
pub const UNCOMPRESSED: u8 = 0x00;

/// ECPointFormats extension as defined in RFC 8422 Section 5.1.2
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ECPointFormatsExtension {
    pub formats: Vec<u8>,
}

impl Default for ECPointFormatsExtension {
    fn default() -> Self {
        ECPointFormatsExtension {
            formats: vec![UNCOMPRESSED],
        }
    }
}

impl ECPointFormatsExtension {
    pub fn parse(input: &[u8]) -> IResult<&[u8], ECPointFormatsExtension> {
        let (input, formats) = length_data(be_u8)(input)?;
        Ok((
            input,
            ECPointFormatsExtension {
                formats: formats.to_vec(),
            },
        ))
    }

    pub fn supports_uncompressed(&self) -> bool {
        self.formats.contains(&UNCOMPRESSED)
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.push(self.formats.len() as u8);
        output.extend_from_slice(&self.formats);
    }
}
