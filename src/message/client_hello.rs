use nom::combinator::{all_consuming, verify};
use nom::multi::{length_data, many1};
use nom::number::complete::{be_u16, be_u8};
use nom::IResult;

use super::{HelloExtensions, Random, SessionId};
use crate::buffer::Buf;
use crate::types::{CipherSuite, ProtocolVersion};

/// The null compression method, the only one this engine speaks.
pub const COMPRESSION_NULL: u8 = 0;

/// Signalling suite value standing in for an empty `renegotiation_info`,
/// RFC 5746 Section 3.3.
pub const EMPTY_RENEGOTIATION_INFO_SCSV: CipherSuite = CipherSuite::Unknown(0x00FF);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHello {
    pub client_version: ProtocolVersion,
    pub random: Random,
    pub session_id: SessionId,
    pub cipher_suites: Vec<CipherSuite>,
    pub compression_methods: Vec<u8>,
    pub extensions: HelloExtensions,
}

impl ClientHello {
    pub fn new(
        client_version: ProtocolVersion,
        random: Random,
        session_id: SessionId,
        cipher_suites: Vec<CipherSuite>,
        extensions: HelloExtensions,
    ) -> Self {
        ClientHello {
            client_version,
            random,
            session_id,
            cipher_suites,
            compression_methods: vec![COMPRESSION_NULL],
            extensions,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], ClientHello> {
        let (input, client_version) = ProtocolVersion::parse(input)?;
        let (input, random) = Random::parse(input)?;
        let (input, session_id) = SessionId::parse(input)?;

        let (input, suites) = verify(length_data(be_u16), |s: &[u8]| s.len() % 2 == 0)(input)?;
        let (_, cipher_suites) = all_consuming(many1(CipherSuite::parse))(suites)?;

        let (input, compression) = verify(length_data(be_u8), |c: &[u8]| !c.is_empty())(input)?;
        let (input, extensions) = HelloExtensions::parse(input)?;

        Ok((
            input,
            ClientHello {
                client_version,
                random,
                session_id,
                cipher_suites,
                compression_methods: compression.to_vec(),
                extensions,
            },
        ))
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.extend_from_slice(&self.client_version.as_u16().to_be_bytes());
        self.random.serialize(output);
        self.session_id.serialize(output);
        output.extend_from_slice(&((self.cipher_suites.len() * 2) as u16).to_be_bytes());
        for suite in &self.cipher_suites {
            output.extend_from_slice(&suite.as_u16().to_be_bytes());
        }
        output.push(self.compression_methods.len() as u8);
        output.extend_from_slice(&self.compression_methods);
        self.extensions.serialize(output);
    }

    /// Whether the client signalled secure renegotiation support, either by
    /// extension or by the signalling suite.
    pub fn signals_secure_renegotiation(&self) -> bool {
        self.extensions.renegotiation_info.is_some()
            || self.cipher_suites.contains(&EMPTY_RENEGOTIATION_INFO_SCSV)
    }
}
