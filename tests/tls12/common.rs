//! Shared helpers for the TLS 1.2 integration tests.

#![allow(unused)]

use std::sync::Arc;

use timpl::certificate::{generate_self_signed_certificate, CertifiedKey};
use timpl::crypto::rust_crypto::default_provider;
use timpl::{
    Config, ConfigBuilder, Credentials, EngineResult, Error, FingerprintTrustManager,
    HandshakeStatus, StaticKeyManager, Status, TlsEngine,
};

/// Room for any single record.
pub const RECORD_BUF: usize = 17 * 1024 + 512;

/// Record content types (RFC 5246).
pub const CHANGE_CIPHER_SPEC: u8 = 20;
pub const ALERT: u8 = 21;
pub const HANDSHAKE: u8 = 22;
pub const APPLICATION_DATA: u8 = 23;

pub struct Certs {
    pub server: CertifiedKey,
    pub client: CertifiedKey,
}

pub fn certs() -> Certs {
    Certs {
        server: generate_self_signed_certificate(&["localhost"]).expect("gen server cert"),
        client: generate_self_signed_certificate(&["client"]).expect("gen client cert"),
    }
}

pub fn credentials(cert: &CertifiedKey) -> Credentials {
    Credentials::from_certified_key(cert, &default_provider()).expect("load credentials")
}

/// Server serving `certs.server` and trusting `certs.client`.
pub fn server_builder(certs: &Certs) -> ConfigBuilder {
    Config::builder()
        .key_manager(Arc::new(StaticKeyManager::new(credentials(&certs.server))))
        .trust_manager(Arc::new(FingerprintTrustManager::from_certificates([
            &certs.client.certificate[..],
        ])))
}

/// Client trusting `certs.server`, without a certificate of its own.
pub fn client_builder(certs: &Certs) -> ConfigBuilder {
    Config::builder().trust_manager(Arc::new(FingerprintTrustManager::from_certificates([
        &certs.server.certificate[..],
    ])))
}

/// Client trusting `certs.server` and able to present `certs.client`.
pub fn client_builder_with_cert(certs: &Certs) -> ConfigBuilder {
    client_builder(certs)
        .key_manager(Arc::new(StaticKeyManager::new(credentials(&certs.client))))
}

/// One end of an in-memory connection.
pub struct Peer {
    pub engine: TlsEngine,
    /// Bytes sent by the other end, not yet unwrapped.
    pub inbox: Vec<u8>,
    /// Application data unwrapped so far.
    pub received: Vec<u8>,
    /// How often `Finished` was reported.
    pub finished: usize,
    /// Delegated tasks run so far.
    pub tasks_run: usize,
    /// Content types of every record this end emitted.
    pub sent_types: Vec<u8>,
}

impl Peer {
    pub fn new(engine: TlsEngine) -> Self {
        Peer {
            engine,
            inbox: Vec::new(),
            received: Vec::new(),
            finished: 0,
            tasks_run: 0,
            sent_types: Vec::new(),
        }
    }

    fn note(&mut self, r: &EngineResult) {
        if r.handshake_status == HandshakeStatus::Finished {
            self.finished += 1;
        }
    }

    pub fn run_tasks(&mut self) {
        while let Some(task) = self.engine.delegated_task() {
            task.run();
            self.tasks_run += 1;
        }
    }

    /// Wrap until nothing more comes out. Returns the produced bytes.
    pub fn flush(&mut self) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        let mut buf = vec![0; RECORD_BUF];
        loop {
            self.run_tasks();
            let r = self.engine.wrap(&[], &mut buf)?;
            self.note(&r);
            if r.handshake_status == HandshakeStatus::NeedTask {
                continue;
            }
            if r.bytes_produced == 0 {
                break;
            }
            self.sent_types.extend(record_types(&buf[..r.bytes_produced]));
            out.extend_from_slice(&buf[..r.bytes_produced]);
            if r.status == Status::Closed {
                break;
            }
        }
        Ok(out)
    }

    /// Unwrap everything in the inbox.
    pub fn deliver(&mut self) -> Result<(), Error> {
        let mut app = vec![0; RECORD_BUF];
        while !self.inbox.is_empty() {
            let r = self.engine.unwrap(&self.inbox, &mut [&mut app[..]])?;
            self.note(&r);
            self.inbox.drain(..r.bytes_consumed);
            self.received.extend_from_slice(&app[..r.bytes_produced]);

            if r.handshake_status == HandshakeStatus::NeedTask {
                self.run_tasks();
                continue;
            }
            if r.bytes_consumed == 0 || r.status == Status::Closed {
                break;
            }
        }
        // Outcomes of the last tasks are picked up by the next call.
        self.run_tasks();
        Ok(())
    }

    /// Wrap one record of application data.
    pub fn send(&mut self, data: &[u8]) -> Result<(usize, Vec<u8>), Error> {
        let mut buf = vec![0; RECORD_BUF];
        let r = self.engine.wrap(&[data], &mut buf)?;
        assert_eq!(r.status, Status::Ok);
        Ok((r.bytes_consumed, buf[..r.bytes_produced].to_vec()))
    }

    pub fn is_idle(&self) -> bool {
        self.engine.handshake_status() == HandshakeStatus::NotHandshaking
    }
}

/// Content types of the records in `bytes`.
pub fn record_types(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut i = 0;
    while i + 5 <= bytes.len() {
        out.push(bytes[i]);
        let len = u16::from_be_bytes([bytes[i + 3], bytes[i + 4]]) as usize;
        i += 5 + len;
    }
    out
}

/// Move everything `from` has to send into `to` and unwrap it there.
pub fn pump(from: &mut Peer, to: &mut Peer) -> Result<(), Error> {
    let out = from.flush()?;
    to.inbox.extend_from_slice(&out);
    to.deliver()
}

pub fn client(config: Config) -> Peer {
    let mut engine = TlsEngine::with_peer(Arc::new(config), "localhost", 4433);
    engine.set_use_client_mode(true).expect("client mode");
    Peer::new(engine)
}

pub fn server(config: Config) -> Peer {
    let mut engine = TlsEngine::new(Arc::new(config));
    engine.set_use_client_mode(false).expect("server mode");
    Peer::new(engine)
}

pub fn client_on(config: &Arc<Config>) -> Peer {
    let mut engine = TlsEngine::with_peer(config.clone(), "localhost", 4433);
    engine.set_use_client_mode(true).expect("client mode");
    Peer::new(engine)
}

pub fn server_on(config: &Arc<Config>) -> Peer {
    let mut engine = TlsEngine::new(config.clone());
    engine.set_use_client_mode(false).expect("server mode");
    Peer::new(engine)
}

/// Drive both ends until a handshake completed on each. `expected` is the
/// number of completed handshakes each end should have reported.
pub fn handshake_n(client: &mut Peer, server: &mut Peer, expected: usize) -> Result<(), Error> {
    for _ in 0..20 {
        pump(client, server)?;
        pump(server, client)?;
        if client.finished >= expected
            && server.finished >= expected
            && client.is_idle()
            && server.is_idle()
        {
            return Ok(());
        }
    }
    panic!(
        "handshake did not complete: client {:?}, server {:?}",
        client.engine, server.engine
    );
}

pub fn handshake(client: &mut Peer, server: &mut Peer) -> Result<(), Error> {
    handshake_n(client, server, 1)
}

/// Send `data` from one end to the other, record by record.
pub fn transfer(from: &mut Peer, to: &mut Peer, data: &[u8]) -> Result<(), Error> {
    let mut rest = data;
    while !rest.is_empty() {
        let (consumed, record) = from.send(rest)?;
        assert!(consumed > 0);
        rest = &rest[consumed..];
        to.inbox.extend_from_slice(&record);
        to.deliver()?;
    }
    Ok(())
}

/// Join the plaintext handshake records in `bytes` into one record.
pub fn coalesce_handshake(bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    let mut i = 0;
    while i + 5 <= bytes.len() {
        assert_eq!(bytes[i], HANDSHAKE);
        let len = u16::from_be_bytes([bytes[i + 3], bytes[i + 4]]) as usize;
        body.extend_from_slice(&bytes[i + 5..i + 5 + len]);
        i += 5 + len;
    }

    let mut out = vec![HANDSHAKE, bytes[1], bytes[2]];
    out.extend_from_slice(&(body.len() as u16).to_be_bytes());
    out.extend_from_slice(&body);
    out
}
