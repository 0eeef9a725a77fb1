use nom::multi::length_data;
use nom::number::complete::be_u8;
use nom::IResult;

use crate::buffer::Buf;

/// Secure renegotiation binding, RFC 5746 Section 3.2.
///
/// Empty on an initial handshake. On a renegotiation the client sends its
/// previous Finished verify data and the server both sides' values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenegotiationInfoExtension {
    pub renegotiated_connection: Vec<u8>,
}

impl RenegotiationInfoExtension {
    pub fn new(renegotiated_connection: &[u8]) -> Self {
        RenegotiationInfoExtension {
            renegotiated_connection: renegotiated_connection.to_vec(),
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], RenegotiationInfoExtension> {
        let (input, data) = length_data(be_u8)(input)?;
        Ok((input, RenegotiationInfoExtension::new(data)))
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.push(self.renegotiated_connection.len() as u8);
        output.extend_from_slice(&self.renegotiated_connection);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_handshake_is_single_zero() {
        let mut out = Buf::new();
        RenegotiationInfoExtension::default().serialize(&mut out);
        assert_eq!(&*out, &[0x00]);

        let (_, parsed) = RenegotiationInfoExtension::parse(&[0x02, 0xaa, 0xbb]).unwrap();
        assert_eq!(parsed.renegotiated_connection, vec![0xaa, 0xbb]);
    }
}
