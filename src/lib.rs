//! timpl is a sans-IO TLS 1.2 engine.
//!
//! A [`TlsEngine`] is driven with `wrap` (application bytes to records) and
//! `unwrap` (records to application bytes). The engine never does I/O and
//! never blocks: slow steps of the handshake, such as certificate trust
//! decisions and signing, come out as [`DelegatedTask`]s the application
//! runs wherever it likes.
//!
//! Supported profile: TLS 1.0 to 1.2 framing, ECDHE key exchange over
//! X25519 or P-256, ECDSA certificates, AES-GCM or ChaCha20-Poly1305
//! record protection, the extended master secret, secure renegotiation,
//! session resumption by id, ALPN, SNI and the maximum fragment length
//! extension.

#![forbid(unsafe_code)]
#![warn(clippy::all)]
// #![deny(missing_docs)]

#[macro_use]
extern crate log;

mod buffer;
pub mod certificate;
mod config;
pub mod crypto;
mod engine;
mod error;
mod handshake;
pub(crate) mod message;
mod negotiate;
mod record;
mod session;
mod task;
mod tls;
mod trust;
mod types;

pub use buffer::Buf;
pub use config::{Config, ConfigBuilder, DEFAULT_AEAD_ENCRYPTION_LIMIT};
pub use error::{Error, ErrorKind};
pub use message::extensions::MaxFragmentLength;
pub use negotiate::{AlpnDecision, AlpnSelector, SniMatcher};
pub use session::{HandshakeSession, MemorySessionCache, Session, SessionCache};
pub use task::{DelegatedTask, TaskKind};
pub use tls::{EngineResult, HandshakePhase, HandshakeStatus, Status, TlsEngine};
pub use trust::{ClientAuth, Credentials, FingerprintTrustManager, KeyManager};
pub use trust::{StaticKeyManager, TrustContext, TrustManager};
pub use types::{AlertDescription, AlertLevel, CipherSuite, ContentType};
pub use types::{HandshakeType, NamedGroup, ProtocolVersion, Role, SignatureScheme};
