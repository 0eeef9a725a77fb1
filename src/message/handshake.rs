use nom::combinator::all_consuming;
use nom::number::complete::be_u24;
use nom::IResult;

use super::{
    Certificate, CertificateRequest, CertificateVerify, ClientHello, ClientKeyExchange, Finished,
    ServerHello, ServerKeyExchange,
};
use crate::buffer::Buf;
use crate::types::HandshakeType;
use crate::Error;

/// Handshake header length: type(1) and length(3).
pub const HEADER_LEN: usize = 4;

/// Largest handshake message the reassembly buffer accepts.
pub const MAX_HANDSHAKE_LEN: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub msg_type: HandshakeType,
    pub length: u32,
}

impl Header {
    pub fn parse(input: &[u8]) -> IResult<&[u8], Header> {
        let (input, msg_type) = HandshakeType::parse(input)?;
        let (input, length) = be_u24(input)?;
        Ok((input, Header { msg_type, length }))
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.push(self.msg_type.as_u8());
        output.extend_from_slice(&self.length.to_be_bytes()[1..]);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    HelloRequest,
    ClientHello(ClientHello),
    ServerHello(ServerHello),
    Certificate(Certificate),
    ServerKeyExchange(ServerKeyExchange),
    CertificateRequest(CertificateRequest),
    ServerHelloDone,
    CertificateVerify(CertificateVerify),
    ClientKeyExchange(ClientKeyExchange),
    Finished(Finished),
}

impl Body {
    pub fn msg_type(&self) -> HandshakeType {
        match self {
            Body::HelloRequest => HandshakeType::HelloRequest,
            Body::ClientHello(_) => HandshakeType::ClientHello,
            Body::ServerHello(_) => HandshakeType::ServerHello,
            Body::Certificate(_) => HandshakeType::Certificate,
            Body::ServerKeyExchange(_) => HandshakeType::ServerKeyExchange,
            Body::CertificateRequest(_) => HandshakeType::CertificateRequest,
            Body::ServerHelloDone => HandshakeType::ServerHelloDone,
            Body::CertificateVerify(_) => HandshakeType::CertificateVerify,
            Body::ClientKeyExchange(_) => HandshakeType::ClientKeyExchange,
            Body::Finished(_) => HandshakeType::Finished,
        }
    }

    /// Parse a complete message body. Trailing bytes are an error.
    pub fn parse(msg_type: HandshakeType, input: &[u8]) -> Result<Body, Error> {
        let decode = |name: &str| Error::DecodeError(name.to_string());

        let body = match msg_type {
            HandshakeType::HelloRequest | HandshakeType::ServerHelloDone => {
                if !input.is_empty() {
                    return Err(decode(&format!("{:?}", msg_type)));
                }
                if msg_type == HandshakeType::HelloRequest {
                    Body::HelloRequest
                } else {
                    Body::ServerHelloDone
                }
            }
            HandshakeType::ClientHello => all_consuming(ClientHello::parse)(input)
                .map(|(_, m)| Body::ClientHello(m))
                .map_err(|_| decode("ClientHello"))?,
            HandshakeType::ServerHello => all_consuming(ServerHello::parse)(input)
                .map(|(_, m)| Body::ServerHello(m))
                .map_err(|_| decode("ServerHello"))?,
            HandshakeType::Certificate => all_consuming(Certificate::parse)(input)
                .map(|(_, m)| Body::Certificate(m))
                .map_err(|_| decode("Certificate"))?,
            HandshakeType::ServerKeyExchange => all_consuming(ServerKeyExchange::parse)(input)
                .map(|(_, m)| Body::ServerKeyExchange(m))
                .map_err(|_| decode("ServerKeyExchange"))?,
            HandshakeType::CertificateRequest => all_consuming(CertificateRequest::parse)(input)
                .map(|(_, m)| Body::CertificateRequest(m))
                .map_err(|_| decode("CertificateRequest"))?,
            HandshakeType::CertificateVerify => all_consuming(CertificateVerify::parse)(input)
                .map(|(_, m)| Body::CertificateVerify(m))
                .map_err(|_| decode("CertificateVerify"))?,
            HandshakeType::ClientKeyExchange => all_consuming(ClientKeyExchange::parse)(input)
                .map(|(_, m)| Body::ClientKeyExchange(m))
                .map_err(|_| decode("ClientKeyExchange"))?,
            HandshakeType::Finished => all_consuming(Finished::parse)(input)
                .map(|(_, m)| Body::Finished(m))
                .map_err(|_| decode("Finished"))?,
            HandshakeType::Unknown(v) => {
                return Err(Error::UnexpectedMessage(format!(
                    "unknown handshake type {}",
                    v
                )))
            }
        };

        Ok(body)
    }

    fn serialize(&self, output: &mut Buf) {
        match self {
            Body::HelloRequest | Body::ServerHelloDone => {}
            Body::ClientHello(m) => m.serialize(output),
            Body::ServerHello(m) => m.serialize(output),
            Body::Certificate(m) => m.serialize(output),
            Body::ServerKeyExchange(m) => m.serialize(output),
            Body::CertificateRequest(m) => m.serialize(output),
            Body::CertificateVerify(m) => m.serialize(output),
            Body::ClientKeyExchange(m) => m.serialize(output),
            Body::Finished(m) => m.serialize(output),
        }
    }
}

/// A handshake message with its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub header: Header,
    pub body: Body,
}

impl Handshake {
    /// Append header and body to `output`.
    pub fn serialize_body(body: &Body, output: &mut Buf) {
        let start = output.len();
        output.extend_from_slice(&[0; HEADER_LEN]);
        body.serialize(output);

        let length = (output.len() - start - HEADER_LEN) as u32;
        let mut header = Buf::new();
        Header {
            msg_type: body.msg_type(),
            length,
        }
        .serialize(&mut header);
        output[start..start + HEADER_LEN].copy_from_slice(&header);
    }

    /// Parse one complete message, header included.
    pub fn parse(input: &[u8]) -> Result<Handshake, Error> {
        let (rest, header) =
            Header::parse(input).map_err(|_| Error::DecodeError("handshake header".into()))?;
        if rest.len() != header.length as usize {
            return Err(Error::DecodeError("handshake length".into()));
        }
        let body = Body::parse(header.msg_type, rest)?;
        Ok(Handshake { header, body })
    }
}

/// Reassembles handshake messages from the byte stream of handshake
/// records. A message may span several records and a record may carry
/// several messages.
#[derive(Debug, Default)]
pub struct HandshakeReader {
    buf: Buf,
}

impl HandshakeReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: &[u8]) {
        self.buf.extend_from_slice(fragment);
    }

    /// Whether bytes of a partial message are held.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Type of the message at the front, once its first byte arrived.
    pub fn peek_type(&self) -> Option<HandshakeType> {
        self.buf.first().map(|t| HandshakeType::from_u8(*t))
    }

    /// Take the next complete message (header included) off the front.
    pub fn next_message(&mut self) -> Result<Option<Vec<u8>>, Error> {
        if self.buf.len() < HEADER_LEN {
            return Ok(None);
        }
        let length = u32::from_be_bytes([0, self.buf[1], self.buf[2], self.buf[3]]) as usize;
        if length > MAX_HANDSHAKE_LEN {
            return Err(Error::IllegalParameter(format!(
                "handshake message of {} bytes",
                length
            )));
        }
        let total = HEADER_LEN + length;
        if self.buf.len() < total {
            return Ok(None);
        }
        let message = self.buf[..total].to_vec();
        self.buf.consume(total);
        Ok(Some(message))
    }
}
