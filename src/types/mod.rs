//! Wire-level enums shared by the record layer and the handshake.

mod alert;
mod cipher_suite;
mod ctype;
mod handshake;
mod named_group;
mod signature;
mod version;

pub use alert::{AlertDescription, AlertLevel};
pub use cipher_suite::{CipherSuite, HashAlgorithm};
pub use ctype::ContentType;
pub use handshake::HandshakeType;
pub use named_group::NamedGroup;
pub use signature::SignatureScheme;
pub use version::ProtocolVersion;

/// Which end of the connection an engine plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Sends the ClientHello.
    Client,
    /// Answers the ClientHello.
    Server,
}

impl Role {
    /// The role of the other end.
    pub fn peer(&self) -> Role {
        match self {
            Role::Client => Role::Server,
            Role::Server => Role::Client,
        }
    }
}
