use nom::error::{Error, ErrorKind};
use nom::number::complete::be_u8;
use nom::{Err, IResult};

use crate::buffer::Buf;

/// Plaintext limit when no smaller size was negotiated.
pub const DEFAULT_MAX_FRAGMENT: usize = 1 << 14;

/// Max fragment length codes, RFC 6066 Section 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MaxFragmentLength {
    /// 2^9
    Bytes512,
    /// 2^10
    Bytes1024,
    /// 2^11
    Bytes2048,
    /// 2^12
    Bytes4096,
}

impl MaxFragmentLength {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(MaxFragmentLength::Bytes512),
            2 => Some(MaxFragmentLength::Bytes1024),
            3 => Some(MaxFragmentLength::Bytes2048),
            4 => Some(MaxFragmentLength::Bytes4096),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            MaxFragmentLength::Bytes512 => 1,
            MaxFragmentLength::Bytes1024 => 2,
            MaxFragmentLength::Bytes2048 => 3,
            MaxFragmentLength::Bytes4096 => 4,
        }
    }

    /// Plaintext bytes per record.
    pub fn len(&self) -> usize {
        1 << (8 + self.as_u8())
    }

    /// Largest code whose length does not exceed `len`.
    pub fn at_most(len: usize) -> Option<Self> {
        [
            MaxFragmentLength::Bytes4096,
            MaxFragmentLength::Bytes2048,
            MaxFragmentLength::Bytes1024,
            MaxFragmentLength::Bytes512,
        ]
        .into_iter()
        .find(|m| m.len() <= len)
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], MaxFragmentLength> {
        let (rest, value) = be_u8(input)?;
        let mfl = Self::from_u8(value)
            .ok_or(Err::Failure(Error::new(input, ErrorKind::Switch)))?;
        Ok((rest, mfl))
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.push(self.as_u8());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_lengths() {
        assert_eq!(MaxFragmentLength::Bytes512.len(), 512);
        assert_eq!(MaxFragmentLength::Bytes4096.len(), 4096);
        assert_eq!(MaxFragmentLength::from_u8(3), Some(MaxFragmentLength::Bytes2048));
        assert_eq!(MaxFragmentLength::from_u8(5), None);
        assert!(MaxFragmentLength::parse(&[0]).is_err());
    }

    #[test]
    fn at_most_rounds_down() {
        assert_eq!(
            MaxFragmentLength::at_most(3000),
            Some(MaxFragmentLength::Bytes2048)
        );
        assert_eq!(
            MaxFragmentLength::at_most(DEFAULT_MAX_FRAGMENT),
            Some(MaxFragmentLength::Bytes4096)
        );
        assert_eq!(MaxFragmentLength::at_most(100), None);
    }
}
