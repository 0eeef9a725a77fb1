//! Handshake and alert message wire formats.
//!
//! Every message has a nom `parse` and a `serialize` into a [`Buf`](crate::Buf).
//! Parse failures are mapped to [`Error::DecodeError`](crate::Error::DecodeError)
//! at the [`Body::parse`] boundary.

mod alert;
mod certificate;
mod certificate_request;
mod certificate_verify;
mod client_hello;
mod client_key_exchange;
mod digitally_signed;
mod extension;
pub mod extensions;
mod finished;
mod handshake;
mod id;
mod random;
mod server_hello;
mod server_key_exchange;

pub use alert::Alert;
pub use certificate::Certificate;
pub use certificate_request::{CertificateRequest, ECDSA_SIGN};
pub use certificate_verify::CertificateVerify;
pub use client_hello::{ClientHello, COMPRESSION_NULL, EMPTY_RENEGOTIATION_INFO_SCSV};
pub use client_key_exchange::ClientKeyExchange;
pub use digitally_signed::DigitallySigned;
pub use extension::{Extension, ExtensionType};
pub use extensions::HelloExtensions;
pub use finished::Finished;
pub use handshake::{Body, Handshake, HandshakeReader, Header, HEADER_LEN, MAX_HANDSHAKE_LEN};
pub use id::{InvalidLength, SessionId, SESSION_ID_LEN};
pub use random::Random;
pub use server_hello::ServerHello;
pub use server_key_exchange::{EcdhParams, ServerKeyExchange};
