// TLS 1.2 server handshake (RFC 5246, RFC 7627, RFC 5746):
//
// 1. Client sends ClientHello
//    - Known session id that may be resumed: send ServerHello,
//      ChangeCipherSpec, Finished and wait for the client's Finished
// 2. Server picks credentials (delegated) and signs its ECDH share
//    (delegated)
// 3. Server sends ServerHello, Certificate, ServerKeyExchange,
//    [CertificateRequest], ServerHelloDone
// 4. Client sends [Certificate], ClientKeyExchange, [CertificateVerify],
//    ChangeCipherSpec, Finished
//    - Client chain and CertificateVerify are checked in delegated tasks
// 5. Server sends ChangeCipherSpec, Finished. Done.

use std::sync::Arc;

use zeroize::Zeroizing;

use super::keys;
use super::{queue_chain_check, queue_signature_check, queue_signing, trust_context};
use super::{unexpected_outcome, HandshakePhase, Outcome, Policy, VerifyData};
use crate::config::Config;
use crate::crypto::prf::{transcript_hash, MASTER_SECRET_LEN, VERIFY_DATA_LEN};
use crate::crypto::{ActiveKeyExchange, SupportedCipherSuite};
use crate::engine::Engine;
use crate::message::extensions::{
    AlpnExtension, ECPointFormatsExtension, MaxFragmentLength, RenegotiationInfoExtension,
    ServerNameExtension,
};
use crate::message::{Body, Certificate, CertificateRequest, ClientHello, DigitallySigned};
use crate::message::{EcdhParams, Finished, HelloExtensions, Random, ServerHello};
use crate::message::{ServerKeyExchange, SessionId};
use crate::message::{COMPRESSION_NULL, ECDSA_SIGN, EMPTY_RENEGOTIATION_INFO_SCSV};
use crate::negotiate;
use crate::record::MAX_PLAINTEXT_LEN;
use crate::session::{HandshakeSession, Session, SessionParams};
use crate::task::{TaskKind, TaskOutput};
use crate::trust::{ClientAuth, Credentials};
use crate::types::{HandshakeType, NamedGroup, ProtocolVersion, Role, SignatureScheme};
use crate::Error;

pub(crate) struct Server {
    state: State,

    policy: Policy,

    /// Our hello random.
    random: Random,

    /// Client hello random. Set by ClientHello.
    client_random: [u8; 32],

    /// Negotiated values.
    session_id: SessionId,
    version: Option<ProtocolVersion>,
    suite: Option<&'static dyn SupportedCipherSuite>,
    group: Option<NamedGroup>,
    server_name: Option<String>,
    application_protocol: Option<String>,
    max_fragment: Option<MaxFragmentLength>,
    secure_renegotiation: bool,

    /// Whether the client sent ec_point_formats, which we then answer.
    client_point_formats: bool,

    /// signature_algorithms of the ClientHello.
    client_schemes: Option<Vec<SignatureScheme>>,

    /// Cached session being resumed.
    resumed_session: Option<Arc<Session>>,

    /// Chosen by the key manager task.
    credentials: Option<Credentials>,

    /// Our ephemeral ECDH key pair.
    key_exchange: Option<Box<dyn ActiveKeyExchange>>,
    params: Option<EcdhParams>,

    /// ServerKeyExchange signature, once the signing task is done.
    signature: Option<Vec<u8>>,

    /// Chain sent by the client. `None` when it sent none.
    client_certificates: Option<Vec<Vec<u8>>>,

    master_secret: Option<Zeroizing<[u8; MASTER_SECRET_LEN]>>,

    client_verify_data: Option<[u8; VERIFY_DATA_LEN]>,
    server_verify_data: Option<[u8; VERIFY_DATA_LEN]>,

    outcome: Option<Outcome>,
}

impl Server {
    pub fn new(policy: Policy, engine: &Engine) -> Result<Server, Error> {
        let random = Random::new(engine.rng()).map_err(Error::Crypto)?;

        Ok(Server {
            state: State::AwaitClientHello,
            policy,
            random,
            client_random: [0; 32],
            session_id: SessionId::empty(),
            version: None,
            suite: None,
            group: None,
            server_name: None,
            application_protocol: None,
            max_fragment: None,
            secure_renegotiation: false,
            client_point_formats: false,
            client_schemes: None,
            resumed_session: None,
            credentials: None,
            key_exchange: None,
            params: None,
            signature: None,
            client_certificates: None,
            master_secret: None,
            client_verify_data: None,
            server_verify_data: None,
            outcome: None,
        })
    }

    pub fn make_progress(&mut self, engine: &mut Engine) -> Result<(), Error> {
        loop {
            let prev_state = self.state;

            let new_state = prev_state.make_progress(self, engine)?;
            if prev_state != new_state {
                self.state = new_state;
                trace!("{:?} -> {:?}", prev_state, new_state);
            } else {
                break;
            }
        }
        Ok(())
    }

    pub fn task_done(&mut self, kind: TaskKind, output: TaskOutput) -> Result<(), Error> {
        match (kind, output) {
            (TaskKind::ChooseServerCredentials, TaskOutput::Credentials(c)) => {
                self.credentials = c;
            }
            (TaskKind::SignServerKeyExchange, TaskOutput::Signature(s)) => {
                self.signature = Some(s);
            }
            (TaskKind::VerifyClientChain, TaskOutput::Verified) => {
                debug!("Client certificate chain trusted");
            }
            (TaskKind::VerifyCertificateVerify, TaskOutput::Verified) => {}
            (kind, _) => return Err(unexpected_outcome(kind)),
        }
        Ok(())
    }

    pub fn take_outcome(&mut self) -> Option<Outcome> {
        self.outcome.take()
    }

    pub fn phase(&self) -> HandshakePhase {
        match self.state {
            State::AwaitClientHello => HandshakePhase::Start,
            State::AwaitServerCredentials | State::AwaitKeyExchangeSignature => {
                HandshakePhase::HelloReceived
            }
            State::AwaitClientCertificate | State::AwaitCertificateVerify => {
                HandshakePhase::CertificateExchange
            }
            State::AwaitClientKeyExchange => HandshakePhase::KeyExchange,
            State::AwaitClientFinished => HandshakePhase::FinishedPending,
            State::Done => HandshakePhase::Established,
        }
    }

    pub fn snapshot(&self) -> HandshakeSession {
        HandshakeSession {
            role: Some(Role::Server),
            session_id: self.session_id.to_vec(),
            version: self.version,
            cipher_suite: self.suite.map(|s| s.suite()),
            peer_host: self.policy.peer_host.clone(),
            peer_port: self.policy.peer_port,
            server_name: self.server_name.clone(),
            application_protocol: self.application_protocol.clone(),
            peer_certificates: self.client_certificates.clone(),
            local_certificates: self.local_certificates(),
            resumed: self.resumed_session.is_some(),
        }
    }

    fn local_certificates(&self) -> Vec<Vec<u8>> {
        match (&self.credentials, &self.resumed_session) {
            (Some(c), _) => c.chain.clone(),
            (None, Some(s)) => s.local_certificates().to_vec(),
            (None, None) => Vec::new(),
        }
    }

    fn suite(&self) -> Result<&'static dyn SupportedCipherSuite, Error> {
        self.suite
            .ok_or_else(|| Error::UnexpectedMessage("no cipher suite negotiated".into()))
    }

    fn master_secret(&self) -> Result<&[u8; MASTER_SECRET_LEN], Error> {
        self.master_secret
            .as_deref()
            .ok_or_else(|| Error::UnexpectedMessage("no master secret".into()))
    }

    /// RFC 5746 checks on the ClientHello.
    fn check_renegotiation_info(&mut self, ch: &ClientHello) -> Result<(), Error> {
        let info = ch.extensions.renegotiation_info.as_ref();

        self.secure_renegotiation = match &self.policy.renegotiation {
            None => {
                if info.is_some_and(|ri| !ri.renegotiated_connection.is_empty()) {
                    return Err(Error::HandshakeFailure(
                        "renegotiation_info on initial handshake".into(),
                    ));
                }
                ch.signals_secure_renegotiation()
            }
            Some(previous) => {
                if ch.cipher_suites.contains(&EMPTY_RENEGOTIATION_INFO_SCSV) {
                    return Err(Error::HandshakeFailure(
                        "renegotiation signalling suite during renegotiation".into(),
                    ));
                }
                match info {
                    Some(ri) if ri.renegotiated_connection == previous.client => true,
                    _ => {
                        return Err(Error::HandshakeFailure(
                            "renegotiation_info mismatch".into(),
                        ))
                    }
                }
            }
        };
        Ok(())
    }

    /// A cached session the client asked to resume, if it still fits this
    /// handshake.
    fn resumable_session(
        &self,
        config: &Config,
        ch: &ClientHello,
        version: ProtocolVersion,
    ) -> Option<Arc<Session>> {
        if ch.session_id.is_empty() {
            return None;
        }
        let session = config.session_cache().get(&ch.session_id)?;

        let usable = session.is_resumable()
            && session.protocol_version() == version
            && self.policy.cipher_suites.contains(&session.cipher_suite())
            && ch.cipher_suites.contains(&session.cipher_suite())
            && session.server_name() == self.server_name.as_deref();

        usable.then_some(session)
    }

    fn send_server_hello(&self, engine: &mut Engine) -> Result<(), Error> {
        let resumed = self.resumed_session.is_some();

        let renegotiation_info = self.secure_renegotiation.then(|| {
            let info = self
                .policy
                .renegotiation
                .map(|previous| previous.concat())
                .unwrap_or_default();
            RenegotiationInfoExtension::new(&info)
        });

        let extensions = HelloExtensions {
            server_name: (self.server_name.is_some() && !resumed)
                .then(ServerNameExtension::acknowledgement),
            max_fragment_length: self.max_fragment,
            ec_point_formats: (self.client_point_formats && !resumed)
                .then(ECPointFormatsExtension::default),
            alpn: self
                .application_protocol
                .as_ref()
                .map(|p| AlpnExtension::new(&[p])),
            extended_master_secret: true,
            renegotiation_info,
            ..Default::default()
        };

        let hello = ServerHello::new(
            self.version.ok_or(Error::NoProtocolVersion)?,
            self.random,
            self.session_id,
            self.suite()?.suite(),
            extensions,
        );
        engine.send_handshake(&Body::ServerHello(hello))
    }

    fn complete(&mut self, engine: &Engine) -> Result<(), Error> {
        let session = match &self.resumed_session {
            Some(session) => {
                session.touch();
                session.clone()
            }
            None => {
                let master_secret = self
                    .master_secret
                    .clone()
                    .ok_or_else(|| Error::UnexpectedMessage("no master secret".into()))?;
                let session = Arc::new(Session::new(SessionParams {
                    id: self.session_id.to_vec(),
                    version: self.version.ok_or(Error::NoProtocolVersion)?,
                    cipher_suite: self.suite()?.suite(),
                    peer_certificates: self.client_certificates.clone(),
                    local_certificates: self.local_certificates(),
                    peer_host: self.policy.peer_host.clone(),
                    peer_port: self.policy.peer_port,
                    server_name: self.server_name.clone(),
                    application_protocol: self.application_protocol.clone(),
                    max_fragment_len: self.max_fragment.map(|m| m.len()),
                    master_secret,
                }));
                engine.config().session_cache().put(session.clone());
                session
            }
        };

        let (Some(client), Some(server)) = (self.client_verify_data, self.server_verify_data) else {
            return Err(Error::UnexpectedMessage("handshake incomplete".into()));
        };

        debug!("Server handshake complete: {:?}", session);
        self.outcome = Some(Outcome {
            session,
            application_protocol: self.application_protocol.clone(),
            verify_data: VerifyData { client, server },
            secure_renegotiation: self.secure_renegotiation,
        });
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitClientHello,
    AwaitServerCredentials,
    AwaitKeyExchangeSignature,
    AwaitClientCertificate,
    AwaitClientKeyExchange,
    AwaitCertificateVerify,
    AwaitClientFinished,
    Done,
}

impl State {
    fn make_progress(self, server: &mut Server, engine: &mut Engine) -> Result<Self, Error> {
        match self {
            State::AwaitClientHello => self.await_client_hello(server, engine),
            State::AwaitServerCredentials => self.await_server_credentials(server, engine),
            State::AwaitKeyExchangeSignature => self.await_key_exchange_signature(server, engine),
            State::AwaitClientCertificate => self.await_client_certificate(server, engine),
            State::AwaitClientKeyExchange => self.await_client_key_exchange(server, engine),
            State::AwaitCertificateVerify => self.await_certificate_verify(server, engine),
            State::AwaitClientFinished => self.await_client_finished(server, engine),
            State::Done => Ok(self),
        }
    }

    fn await_client_hello(self, server: &mut Server, engine: &mut Engine) -> Result<Self, Error> {
        let Some(incoming) = engine.next_handshake(&[HandshakeType::ClientHello])? else {
            return Ok(self);
        };

        let Body::ClientHello(ch) = incoming.handshake.body else {
            unreachable!()
        };

        let config = engine.config().clone();
        let provider = config.crypto_provider();

        if !ch.compression_methods.contains(&COMPRESSION_NULL) {
            return Err(Error::IllegalParameter(
                "client does not offer null compression".into(),
            ));
        }

        let (min, max) = server.policy.version_range()?;
        let version =
            negotiate::select_version(min, max, &negotiate::offered_versions(ch.client_version))?;

        let ext = &ch.extensions;
        if !ext.extended_master_secret {
            return Err(Error::HandshakeFailure(
                "client did not offer extended master secret".into(),
            ));
        }

        server.check_renegotiation_info(&ch)?;

        if let Some(formats) = &ext.ec_point_formats {
            if !formats.supports_uncompressed() {
                return Err(Error::IllegalParameter(
                    "client does not support uncompressed points".into(),
                ));
            }
            server.client_point_formats = true;
        }

        let requested_name = ext.server_name.as_ref().and_then(|s| s.host_name.as_deref());
        server.server_name = negotiate::negotiate_server_name(requested_name, config.sni_matchers())?;

        server.application_protocol = negotiate::negotiate_alpn(
            ext.alpn.as_ref().map(|a| &a.protocols[..]),
            config.alpn_protocols(),
            config.alpn_selector(),
        )?;

        server.max_fragment =
            negotiate::negotiate_max_fragment(ext.max_fragment_length, config.max_fragment_length());
        server.client_schemes = ext.signature_algorithms.as_ref().map(|s| s.schemes.clone());
        server.client_random = ch.random.to_bytes();
        server.version = Some(version);

        engine.set_version(version);
        engine.set_max_fragment(
            server
                .max_fragment
                .map(|m| m.len())
                .unwrap_or(MAX_PLAINTEXT_LEN),
        );

        if let Some(session) = server.resumable_session(&config, &ch, version) {
            return self.resume(server, engine, session);
        }

        let local_groups: Vec<NamedGroup> = provider.supported_kx_groups().collect();
        let peer_groups = ext.supported_groups.as_ref().map(|g| &g.groups[..]);
        server.group = Some(negotiate::select_group(&local_groups, peer_groups)?);

        let cs = negotiate::select_cipher_suite(
            &server.policy.cipher_suites,
            &ch.cipher_suites,
            config.prefer_local_cipher_order(),
            version,
        )?;
        server.suite = Some(provider.find_cipher_suite(cs).ok_or(Error::NoCipherSuite)?);
        server.session_id = SessionId::random(engine.rng()).map_err(Error::Crypto)?;

        debug!(
            "Negotiated {} {} group {:?} (sni: {:?}, alpn: {:?})",
            version, cs, server.group, server.server_name, server.application_protocol
        );

        let key_manager = config.key_manager().cloned();
        let key_type = cs.key_type();
        let server_name = server.server_name.clone();
        engine
            .tasks_mut()
            .push(TaskKind::ChooseServerCredentials, move || {
                let credentials = key_manager
                    .and_then(|km| km.choose_server_credentials(key_type, server_name.as_deref()));
                Ok(TaskOutput::Credentials(credentials))
            });

        Ok(Self::AwaitServerCredentials)
    }

    /// Abbreviated handshake: ServerHello, ChangeCipherSpec, Finished.
    fn resume(
        self,
        server: &mut Server,
        engine: &mut Engine,
        session: Arc<Session>,
    ) -> Result<Self, Error> {
        debug!("Resume session {:?}", session);

        let suite = engine
            .config()
            .crypto_provider()
            .find_cipher_suite(session.cipher_suite())
            .ok_or(Error::NoCipherSuite)?;

        server.suite = Some(suite);
        server.session_id =
            SessionId::try_new(session.id()).map_err(|e| Error::Crypto(e.to_string()))?;
        server.client_certificates = session.peer_certificates().map(|c| c.to_vec());
        server.resumed_session = Some(session.clone());

        server.send_server_hello(engine)?;

        let master_secret = Zeroizing::new(*session.master_secret());
        let (read, write) = keys::cipher_specs(
            suite,
            &master_secret[..],
            &server.client_random,
            &server.random.to_bytes(),
            Role::Server,
        )?;
        engine.set_pending_specs(read, write);
        engine.send_change_cipher_spec()?;

        let handshake_hash = engine.transcript_hash(suite.hash_algorithm());
        let verify_data = keys::finished(suite, &master_secret[..], Role::Server, &handshake_hash)?;
        engine.send_handshake(&Body::Finished(Finished::new(verify_data)))?;

        server.server_verify_data = Some(verify_data);
        server.master_secret = Some(master_secret);
        engine.expect_change_cipher_spec();

        Ok(Self::AwaitClientFinished)
    }

    fn await_server_credentials(
        self,
        server: &mut Server,
        engine: &mut Engine,
    ) -> Result<Self, Error> {
        if !engine.tasks().is_idle() {
            return Ok(self);
        }

        let suite = server.suite()?.suite();
        let Some(credentials) = &server.credentials else {
            return Err(Error::NoCredentials(suite.key_type()));
        };

        let scheme = credentials.key.scheme();
        if let Some(schemes) = &server.client_schemes {
            if !schemes.contains(&scheme) {
                return Err(Error::HandshakeFailure(format!(
                    "client does not accept {:?} signatures",
                    scheme
                )));
            }
        }

        let group = server.group.ok_or(Error::NoKeyExchangeGroup)?;
        let key_exchange = engine
            .config()
            .crypto_provider()
            .find_kx_group(group)
            .ok_or(Error::NoKeyExchangeGroup)?
            .start_exchange()
            .map_err(Error::Crypto)?;

        let params = EcdhParams {
            named_group: group,
            public_key: key_exchange.pub_key().to_vec(),
        };
        let data = params.signed_data(&server.client_random, &server.random.to_bytes());
        let key = credentials.key.clone();
        queue_signing(engine, TaskKind::SignServerKeyExchange, key, data);

        server.key_exchange = Some(key_exchange);
        server.params = Some(params);

        Ok(Self::AwaitKeyExchangeSignature)
    }

    fn await_key_exchange_signature(
        self,
        server: &mut Server,
        engine: &mut Engine,
    ) -> Result<Self, Error> {
        if !engine.tasks().is_idle() {
            return Ok(self);
        }

        let (Some(signature), Some(params), Some(credentials)) = (
            server.signature.take(),
            server.params.take(),
            &server.credentials,
        ) else {
            return Err(Error::Crypto("ServerKeyExchange not signed".into()));
        };

        let scheme = credentials.key.scheme();
        let chain = credentials.chain.clone();

        server.send_server_hello(engine)?;
        engine.send_handshake(&Body::Certificate(Certificate::new(chain)))?;
        engine.send_handshake(&Body::ServerKeyExchange(ServerKeyExchange {
            params,
            signed: DigitallySigned::new(scheme, signature),
        }))?;

        let request_certificate = server.policy.client_auth.is_requested();
        if request_certificate {
            let config = engine.config().clone();
            let issuers = config
                .trust_manager()
                .map(|tm| tm.accepted_issuers())
                .unwrap_or_default();
            let request = CertificateRequest::new(
                vec![ECDSA_SIGN],
                config.crypto_provider().signature_schemes.to_vec(),
                issuers,
            );
            engine.send_handshake(&Body::CertificateRequest(request))?;
        }

        engine.send_handshake(&Body::ServerHelloDone)?;

        if request_certificate {
            Ok(Self::AwaitClientCertificate)
        } else {
            Ok(Self::AwaitClientKeyExchange)
        }
    }

    fn await_client_certificate(
        self,
        server: &mut Server,
        engine: &mut Engine,
    ) -> Result<Self, Error> {
        let Some(incoming) = engine.next_handshake(&[HandshakeType::Certificate])? else {
            return Ok(self);
        };

        let Body::Certificate(certificate) = incoming.handshake.body else {
            unreachable!()
        };

        if certificate.certificate_list.is_empty() {
            if server.policy.client_auth == ClientAuth::Need {
                return Err(Error::CertificateRequired);
            }
            debug!("Client sent no certificate");
            return Ok(Self::AwaitClientKeyExchange);
        }

        let auth_type = server.suite()?.suite().auth_type();
        let context = trust_context(engine, &server.policy, server.server_name.clone());
        queue_chain_check(
            engine,
            TaskKind::VerifyClientChain,
            certificate.certificate_list.clone(),
            auth_type,
            context,
        )?;
        server.client_certificates = Some(certificate.certificate_list);

        Ok(Self::AwaitClientKeyExchange)
    }

    fn await_client_key_exchange(
        self,
        server: &mut Server,
        engine: &mut Engine,
    ) -> Result<Self, Error> {
        let Some(incoming) = engine.next_handshake(&[HandshakeType::ClientKeyExchange])? else {
            return Ok(self);
        };

        let Body::ClientKeyExchange(cke) = incoming.handshake.body else {
            unreachable!()
        };

        let key_exchange = server
            .key_exchange
            .take()
            .ok_or_else(|| Error::UnexpectedMessage("ClientKeyExchange".into()))?;
        let pre_master_secret = key_exchange
            .complete(&cke.public_key)
            .map_err(Error::IllegalParameter)?;

        let suite = server.suite()?;
        let session_hash = engine.transcript_hash(suite.hash_algorithm());
        let master_secret = keys::master_secret(suite, &pre_master_secret, &session_hash)?;

        let (read, write) = keys::cipher_specs(
            suite,
            &master_secret[..],
            &server.client_random,
            &server.random.to_bytes(),
            Role::Server,
        )?;
        engine.set_pending_specs(read, write);
        server.master_secret = Some(master_secret);

        if server.client_certificates.is_some() {
            return Ok(Self::AwaitCertificateVerify);
        }

        engine.expect_change_cipher_spec();
        Ok(Self::AwaitClientFinished)
    }

    fn await_certificate_verify(
        self,
        server: &mut Server,
        engine: &mut Engine,
    ) -> Result<Self, Error> {
        let Some(incoming) = engine.next_handshake(&[HandshakeType::CertificateVerify])? else {
            return Ok(self);
        };

        let Body::CertificateVerify(cv) = incoming.handshake.body else {
            unreachable!()
        };

        let schemes = engine.config().crypto_provider().signature_schemes;
        if !schemes.contains(&cv.signed.scheme) {
            return Err(Error::IllegalParameter(format!(
                "client signed with {:?}, not requested",
                cv.signed.scheme
            )));
        }

        let Some(cert) = server.client_certificates.as_ref().and_then(|c| c.first()) else {
            return Err(Error::UnexpectedMessage("CertificateVerify".into()));
        };

        let data = engine.transcript()[..incoming.transcript_before].to_vec();
        queue_signature_check(
            engine,
            TaskKind::VerifyCertificateVerify,
            cert.clone(),
            data,
            cv.signed,
        );

        engine.expect_change_cipher_spec();
        Ok(Self::AwaitClientFinished)
    }

    fn await_client_finished(
        self,
        server: &mut Server,
        engine: &mut Engine,
    ) -> Result<Self, Error> {
        if !engine.tasks().is_idle() {
            return Ok(self);
        }

        let Some(incoming) = engine.next_handshake(&[HandshakeType::Finished])? else {
            return Ok(self);
        };

        let Body::Finished(finished) = incoming.handshake.body else {
            unreachable!()
        };

        let suite = server.suite()?;
        let handshake_hash = transcript_hash(
            suite.hash_algorithm(),
            &engine.transcript()[..incoming.transcript_before],
        );
        let expected =
            keys::finished(suite, server.master_secret()?, Role::Client, &handshake_hash)?;
        keys::check_finished(&expected, &finished.verify_data)?;
        server.client_verify_data = Some(expected);

        if server.resumed_session.is_none() {
            engine.send_change_cipher_spec()?;

            let handshake_hash = engine.transcript_hash(suite.hash_algorithm());
            let verify_data =
                keys::finished(suite, server.master_secret()?, Role::Server, &handshake_hash)?;
            engine.send_handshake(&Body::Finished(Finished::new(verify_data)))?;
            server.server_verify_data = Some(verify_data);
        }

        server.complete(engine)?;
        Ok(Self::Done)
    }
}
