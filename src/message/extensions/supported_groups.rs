use nom::combinator::all_consuming;
use nom::multi::{length_data, many0};
use nom::number::complete::be_u16;
use nom::IResult;

use crate::buffer::Buf;
use crate::types::NamedGroup;

/// Supported Groups (previously known as EllipticCurves) extension
/// RFC 8422 Section 5.1.1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedGroupsExtension {
    pub groups: Vec<NamedGroup>,
}

impl SupportedGroupsExtension {
    pub fn new(groups: impl IntoIterator<Item = NamedGroup>) -> Self {
        SupportedGroupsExtension {
            groups: groups.into_iter().collect(),
        }
    }

    /// Unknown groups are kept as `NamedGroup::Unknown` so that
    /// negotiation can skip them.
    pub fn parse(input: &[u8]) -> IResult<&[u8], SupportedGroupsExtension> {
        let (input, list) = length_data(be_u16)(input)?;
        let (_, groups) = all_consuming(many0(NamedGroup::parse))(list)?;
        Ok((input, SupportedGroupsExtension { groups }))
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.extend_from_slice(&((self.groups.len() * 2) as u16).to_be_bytes());
        for group in &self.groups {
            output.extend_from_slice(&group.as_u16().to_be_bytes());
        }
    }
}
