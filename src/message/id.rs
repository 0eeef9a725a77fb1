use nom::bytes::complete::take;
use nom::error::{Error, ErrorKind};
use nom::number::complete::be_u8;
use nom::{Err, IResult};
use std::fmt;
use std::ops::Deref;

use crate::buffer::Buf;
use crate::crypto::SecureRandom;

/// Length of the session ids this engine generates.
pub const SESSION_ID_LEN: usize = 32;

/// Session identifier, 0 to 32 opaque bytes.
#[derive(Clone, Copy)]
pub struct SessionId([u8; SESSION_ID_LEN], usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidLength(pub usize);

impl fmt::Display for InvalidLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Incorrect session id length: {} should be at most {}",
            self.0, SESSION_ID_LEN
        )
    }
}

impl std::error::Error for InvalidLength {}

impl SessionId {
    pub fn empty() -> Self {
        SessionId([0; SESSION_ID_LEN], 0)
    }

    pub fn try_new(data: &[u8]) -> Result<Self, InvalidLength> {
        if data.len() > SESSION_ID_LEN {
            return Err(InvalidLength(data.len()));
        }
        let mut array = [0; SESSION_ID_LEN];
        array[..data.len()].copy_from_slice(data);
        Ok(SessionId(array, data.len()))
    }

    pub fn random(rng: &dyn SecureRandom) -> Result<Self, String> {
        let mut array = [0; SESSION_ID_LEN];
        rng.fill(&mut array)?;
        Ok(SessionId(array, SESSION_ID_LEN))
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, len) = be_u8(input)?;
        if len as usize > SESSION_ID_LEN {
            return Err(Err::Failure(Error::new(input, ErrorKind::LengthValue)));
        }
        let (input, data) = take(len as usize)(input)?;
        // unwrap() is ok because we check the size above.
        let instance = Self::try_new(data).unwrap();
        Ok((input, instance))
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.push(self.1 as u8);
        output.extend_from_slice(self);
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId(")?;
        for b in self.iter() {
            write!(f, "{:02x}", b)?;
        }
        write!(f, ")")
    }
}

impl PartialEq for SessionId {
    fn eq(&self, other: &Self) -> bool {
        self.deref() == other.deref()
    }
}

impl Eq for SessionId {}

impl std::hash::Hash for SessionId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.deref().hash(state);
    }
}

impl Deref for SessionId {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0[..self.1]
    }
}

impl<'a> TryFrom<&'a [u8]> for SessionId {
    type Error = InvalidLength;

    fn try_from(value: &'a [u8]) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}
