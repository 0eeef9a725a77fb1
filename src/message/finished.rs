use nom::bytes::complete::take;
use nom::IResult;

use crate::buffer::Buf;
use crate::crypto::prf::VERIFY_DATA_LEN;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finished {
    pub verify_data: [u8; VERIFY_DATA_LEN],
}

impl Finished {
    pub fn new(verify_data: [u8; VERIFY_DATA_LEN]) -> Self {
        Finished { verify_data }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], Finished> {
        let (input, data) = take(VERIFY_DATA_LEN)(input)?;
        let mut verify_data = [0u8; VERIFY_DATA_LEN];
        verify_data.copy_from_slice(data);
        Ok((input, Finished { verify_data }))
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.extend_from_slice(&self.verify_data);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn wire_format() {
        let finished = Finished::new([1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);

        let mut serialized = Buf::new();
        finished.serialize(&mut serialized);
        assert_eq!(serialized.len(), VERIFY_DATA_LEN);

        let (rest, parsed) = Finished::parse(&serialized).unwrap();
        assert_eq!(parsed, finished);
        assert!(rest.is_empty());
    }

    #[test]
    fn short_verify_data() {
        assert!(Finished::parse(&[0; 11]).is_err());
    }
}
