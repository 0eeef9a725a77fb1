use std::time::{SystemTime, UNIX_EPOCH};

use nom::bytes::complete::take;
use nom::number::complete::be_u32;
use nom::IResult;

use crate::buffer::Buf;
use crate::crypto::SecureRandom;

/// Hello random, RFC 5246 Section 7.4.1.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Random {
    pub gmt_unix_time: u32,
    pub random_bytes: [u8; 28],
}

impl Random {
    pub fn new(rng: &dyn SecureRandom) -> Result<Self, String> {
        // Wraps in 2106.
        let gmt_unix_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);

        let mut random_bytes = [0u8; 28];
        rng.fill(&mut random_bytes)?;

        Ok(Self {
            gmt_unix_time,
            random_bytes,
        })
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], Random> {
        let (input, gmt_unix_time) = be_u32(input)?;
        let (input, input_rand) = take(28_usize)(input)?;
        let mut random_bytes = [0u8; 28];
        random_bytes.copy_from_slice(input_rand);

        Ok((
            input,
            Random {
                gmt_unix_time,
                random_bytes,
            },
        ))
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.extend_from_slice(&self.gmt_unix_time.to_be_bytes());
        output.extend_from_slice(&self.random_bytes);
    }

    /// The 32 wire bytes, as fed into key derivation.
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out[..4].copy_from_slice(&self.gmt_unix_time.to_be_bytes());
        out[4..].copy_from_slice(&self.random_bytes);
        out
    }
}
