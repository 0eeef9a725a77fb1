use nom::combinator::all_consuming;
use nom::error::{Error, ErrorKind};
use nom::multi::{length_data, many0};
use nom::number::complete::{be_u16, be_u8};
use nom::{Err, IResult};

use crate::buffer::Buf;

const NAME_TYPE_HOST_NAME: u8 = 0;

/// Server Name Indication, RFC 6066 Section 3.
///
/// Only `host_name` entries are understood. A server echoes the extension
/// with an empty body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerNameExtension {
    pub host_name: Option<String>,
}

impl ServerNameExtension {
    pub fn new(host_name: &str) -> Self {
        ServerNameExtension {
            host_name: Some(host_name.to_string()),
        }
    }

    /// The empty acknowledgement a server sends.
    pub fn acknowledgement() -> Self {
        ServerNameExtension { host_name: None }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], ServerNameExtension> {
        if input.is_empty() {
            return Ok((input, Self::acknowledgement()));
        }

        let (input, list) = length_data(be_u16)(input)?;
        let (_, entries) = all_consuming(many0(parse_entry))(list)?;

        let mut host_name = None;
        for (name_type, name) in entries {
            if name_type != NAME_TYPE_HOST_NAME {
                continue;
            }
            // RFC 6066: at most one name of each type.
            if host_name.is_some() {
                return Err(Err::Failure(Error::new(input, ErrorKind::Verify)));
            }
            let name = std::str::from_utf8(name)
                .ok()
                .filter(|n| !n.is_empty() && n.is_ascii())
                .ok_or(Err::Failure(Error::new(input, ErrorKind::Char)))?;
            host_name = Some(name.to_string());
        }

        Ok((input, ServerNameExtension { host_name }))
    }

    pub fn serialize(&self, output: &mut Buf) {
        let Some(name) = &self.host_name else {
            return;
        };
        let entry_len = 1 + 2 + name.len();
        output.extend_from_slice(&(entry_len as u16).to_be_bytes());
        output.push(NAME_TYPE_HOST_NAME);
        output.extend_from_slice(&(name.len() as u16).to_be_bytes());
        output.extend_from_slice(name.as_bytes());
    }
}

fn parse_entry(input: &[u8]) -> IResult<&[u8], (u8, &[u8])> {
    let (input, name_type) = be_u8(input)?;
    let (input, name) = length_data(be_u16)(input)?;
    Ok((input, (name_type, name)))
}
