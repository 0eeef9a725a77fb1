//! Client and server handshake state machines.
//!
//! Each side is a `State` enum whose `make_progress` consumes handshake
//! messages from the [`Engine`] and queues its own flight there. A state
//! that needs a delegated task queues it and then waits until the outcome
//! came back through [`Handshake::task_done`].

use std::sync::Arc;

use crate::crypto::prf::VERIFY_DATA_LEN;
use crate::crypto::SigningKey;
use crate::engine::Engine;
use crate::message::DigitallySigned;
use crate::session::{HandshakeSession, Session};
use crate::task::{TaskKind, TaskOutcome, TaskOutput};
use crate::trust::{ClientAuth, TrustContext};
use crate::types::{CipherSuite, ProtocolVersion, Role};
use crate::Error;

mod client;
mod keys;
mod server;

use client::Client;
use server::Server;

/// Coarse progress of a handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakePhase {
    /// Nothing sent or received yet.
    Start,
    /// Client: ClientHello sent.
    HelloSent,
    /// Hellos exchanged, waiting on the server's certificate and keys.
    HelloReceived,
    /// Key exchange messages in flight.
    KeyExchange,
    /// Client certificate requested, sent or being checked.
    CertificateExchange,
    /// Change-cipher-spec and Finished in flight.
    FinishedPending,
    /// Both Finished messages verified.
    Established,
}

/// Verify data of both Finished messages of a handshake.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) struct VerifyData {
    pub client: [u8; VERIFY_DATA_LEN],
    pub server: [u8; VERIFY_DATA_LEN],
}

impl VerifyData {
    /// Contents of a ServerHello renegotiation_info during renegotiation.
    pub fn concat(&self) -> Vec<u8> {
        let mut v = Vec::with_capacity(2 * VERIFY_DATA_LEN);
        v.extend_from_slice(&self.client);
        v.extend_from_slice(&self.server);
        v
    }
}

impl std::fmt::Debug for VerifyData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("VerifyData")
    }
}

/// Settings fixed at the start of one handshake.
#[derive(Debug, Clone)]
pub(crate) struct Policy {
    pub cipher_suites: Vec<CipherSuite>,
    /// Enabled versions, lowest first.
    pub versions: Vec<ProtocolVersion>,
    pub client_auth: ClientAuth,
    pub peer_host: Option<String>,
    pub peer_port: Option<u16>,
    /// Finished values of the previous handshake, when renegotiating.
    pub renegotiation: Option<VerifyData>,
}

impl Policy {
    fn version_range(&self) -> Result<(ProtocolVersion, ProtocolVersion), Error> {
        match (self.versions.first(), self.versions.last()) {
            (Some(min), Some(max)) => Ok((*min, *max)),
            _ => Err(Error::NoProtocolVersion),
        }
    }
}

/// What a finished handshake hands to the engine.
#[derive(Debug)]
pub(crate) struct Outcome {
    pub session: Arc<Session>,
    pub application_protocol: Option<String>,
    pub verify_data: VerifyData,
    /// Whether the peer supports RFC 5746.
    pub secure_renegotiation: bool,
}

pub(crate) enum Handshake {
    Client(Box<Client>),
    Server(Box<Server>),
}

impl Handshake {
    pub fn new(role: Role, policy: Policy, engine: &Engine) -> Result<Self, Error> {
        Ok(match role {
            Role::Client => Handshake::Client(Box::new(Client::new(policy, engine)?)),
            Role::Server => Handshake::Server(Box::new(Server::new(policy, engine)?)),
        })
    }

    pub fn make_progress(&mut self, engine: &mut Engine) -> Result<(), Error> {
        match self {
            Handshake::Client(c) => c.make_progress(engine),
            Handshake::Server(s) => s.make_progress(engine),
        }
    }

    /// Feed back the outcome of a delegated task. A failed task fails the
    /// handshake.
    pub fn task_done(&mut self, kind: TaskKind, outcome: TaskOutcome) -> Result<(), Error> {
        let output = outcome?;
        trace!("Delegated task {:?} done", kind);
        match self {
            Handshake::Client(c) => c.task_done(kind, output),
            Handshake::Server(s) => s.task_done(kind, output),
        }
    }

    pub fn is_done(&self) -> bool {
        self.phase() == HandshakePhase::Established
    }

    pub fn take_outcome(&mut self) -> Option<Outcome> {
        match self {
            Handshake::Client(c) => c.take_outcome(),
            Handshake::Server(s) => s.take_outcome(),
        }
    }

    pub fn phase(&self) -> HandshakePhase {
        match self {
            Handshake::Client(c) => c.phase(),
            Handshake::Server(s) => s.phase(),
        }
    }

    pub fn snapshot(&self) -> HandshakeSession {
        match self {
            Handshake::Client(c) => c.snapshot(),
            Handshake::Server(s) => s.snapshot(),
        }
    }
}

impl std::fmt::Debug for Handshake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handshake::Client(c) => write!(f, "Client({:?})", c.phase()),
            Handshake::Server(s) => write!(f, "Server({:?})", s.phase()),
        }
    }
}

/// Queue a trust decision on a peer chain.
fn queue_chain_check(
    engine: &mut Engine,
    kind: TaskKind,
    chain: Vec<Vec<u8>>,
    auth_type: &'static str,
    context: TrustContext,
) -> Result<(), Error> {
    let Some(trust_manager) = engine.config().trust_manager().cloned() else {
        return Err(Error::CertificateRejected(
            "no trust manager configured".into(),
        ));
    };

    engine.tasks_mut().push(kind, move || {
        trust_manager.check_trusted(&chain, auth_type, &context)?;
        Ok(TaskOutput::Verified)
    });
    Ok(())
}

/// Queue verification of `signed` over `data` with the key of `cert`.
fn queue_signature_check(
    engine: &mut Engine,
    kind: TaskKind,
    cert: Vec<u8>,
    data: Vec<u8>,
    signed: DigitallySigned,
) {
    let verifier = engine.config().crypto_provider().signature_verifier;

    engine.tasks_mut().push(kind, move || {
        verifier
            .verify_signature(&cert, &data, &signed.signature, signed.scheme)
            .map_err(Error::BadSignature)?;
        Ok(TaskOutput::Verified)
    });
}

fn queue_signing(engine: &mut Engine, kind: TaskKind, key: Arc<dyn SigningKey>, data: Vec<u8>) {
    engine.tasks_mut().push(kind, move || {
        key.sign(&data)
            .map(TaskOutput::Signature)
            .map_err(Error::Crypto)
    });
}

fn trust_context(engine: &Engine, policy: &Policy, server_name: Option<String>) -> TrustContext {
    let config = engine.config();
    TrustContext {
        peer_role: engine.role().peer(),
        peer_host: policy.peer_host.clone(),
        server_name,
        endpoint_identification: config.endpoint_identification().map(str::to_string),
        signature_schemes: config.crypto_provider().signature_schemes.to_vec(),
    }
}

fn unexpected_outcome(kind: TaskKind) -> Error {
    Error::Crypto(format!("unexpected outcome for {:?}", kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::generate_self_signed_certificate;
    use crate::config::Config;
    use crate::crypto::rust_crypto::default_provider;
    use crate::trust::{Credentials, FingerprintTrustManager, StaticKeyManager};
    use crate::types::ContentType;

    fn policy() -> Policy {
        Policy {
            cipher_suites: vec![CipherSuite::ECDHE_ECDSA_AES128_GCM_SHA256],
            versions: vec![ProtocolVersion::TLS1_2],
            client_auth: ClientAuth::None,
            peer_host: None,
            peer_port: None,
            renegotiation: None,
        }
    }

    fn configs() -> (Arc<Config>, Arc<Config>) {
        let cert = generate_self_signed_certificate(&["localhost"]).unwrap();
        let creds = Credentials::from_certified_key(&cert, &default_provider()).unwrap();
        let server = Config::builder()
            .key_manager(Arc::new(StaticKeyManager::new(creds)))
            .build()
            .unwrap();
        let client = Config::builder()
            .trust_manager(Arc::new(FingerprintTrustManager::from_certificates([
                &cert.certificate[..],
            ])))
            .build()
            .unwrap();
        (Arc::new(client), Arc::new(server))
    }

    fn run_tasks(engine: &mut Engine, hs: &mut Handshake) {
        while let Some(task) = engine.tasks_mut().pop() {
            task.run();
        }
        for (kind, outcome) in engine.tasks_mut().completed() {
            hs.task_done(kind, outcome).unwrap();
        }
    }

    // Move every queued record from one engine into the other, driving the
    // receiving handshake after each record.
    fn transfer(from: &mut Engine, to: &mut Engine, hs: &mut Handshake) {
        while let Some(record) = from.pop_output() {
            let (content_type, plaintext) = to.decode_record(&record).unwrap();
            match content_type {
                ContentType::Handshake => to.push_handshake_fragment(&plaintext),
                ContentType::ChangeCipherSpec => to.receive_change_cipher_spec(&plaintext).unwrap(),
                other => panic!("unexpected {:?}", other),
            }
            drive(to, hs);
        }
    }

    // Progress until no delegated task holds the handshake back.
    fn drive(engine: &mut Engine, hs: &mut Handshake) {
        loop {
            hs.make_progress(engine).unwrap();
            if engine.tasks().is_idle() {
                break;
            }
            run_tasks(engine, hs);
        }
    }

    #[test]
    fn full_handshake_in_memory() {
        let _ = env_logger::try_init();
        let (client_config, server_config) = configs();

        let mut ce = Engine::new(client_config, Role::Client);
        let mut se = Engine::new(server_config, Role::Server);
        let mut client = Handshake::new(Role::Client, policy(), &ce).unwrap();
        let mut server = Handshake::new(Role::Server, policy(), &se).unwrap();

        drive(&mut ce, &mut client);

        for _ in 0..10 {
            transfer(&mut ce, &mut se, &mut server);
            transfer(&mut se, &mut ce, &mut client);

            if client.is_done() && server.is_done() {
                break;
            }
        }

        assert!(client.is_done());
        assert!(server.is_done());

        let c = client.take_outcome().unwrap();
        let s = server.take_outcome().unwrap();
        assert_eq!(c.session.id(), s.session.id());
        assert_eq!(c.verify_data, s.verify_data);
        assert!(c.secure_renegotiation);
        assert!(s.secure_renegotiation);
    }
}
