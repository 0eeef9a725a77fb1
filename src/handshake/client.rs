// TLS 1.2 client handshake (RFC 5246, RFC 7627, RFC 5746):
//
// 1. Client sends ClientHello, offering a cached session id when it has one
// 2. Server sends ServerHello
//    - Same session id as offered: abbreviated handshake, go to 6
// 3. Server sends Certificate, ServerKeyExchange, [CertificateRequest],
//    ServerHelloDone
// 4. Client sends [Certificate], ClientKeyExchange, [CertificateVerify],
//    ChangeCipherSpec, Finished
// 5. Server sends ChangeCipherSpec, Finished. Done.
// 6. Server sends ChangeCipherSpec, Finished
// 7. Client sends ChangeCipherSpec, Finished. Done.
//
// Trust decisions, credential choice and all signature work are delegated
// tasks. The state that queues one waits for the task queue to drain.

use std::net::IpAddr;
use std::sync::Arc;

use zeroize::Zeroizing;

use super::keys;
use super::{queue_chain_check, queue_signature_check, queue_signing, trust_context};
use super::{unexpected_outcome, HandshakePhase, Outcome, Policy, VerifyData};
use crate::config::Config;
use crate::crypto::prf::{transcript_hash, MASTER_SECRET_LEN, VERIFY_DATA_LEN};
use crate::crypto::SupportedCipherSuite;
use crate::engine::Engine;
use crate::message::extensions::{
    AlpnExtension, ECPointFormatsExtension, MaxFragmentLength, RenegotiationInfoExtension,
    ServerNameExtension, SignatureAlgorithmsExtension, SupportedGroupsExtension,
};
use crate::message::{Body, Certificate, CertificateRequest, CertificateVerify, ClientHello};
use crate::message::{ClientKeyExchange, DigitallySigned, EcdhParams, ExtensionType, Finished};
use crate::message::{HelloExtensions, Random, ServerHello, SessionId};
use crate::message::{COMPRESSION_NULL, ECDSA_SIGN, EMPTY_RENEGOTIATION_INFO_SCSV};
use crate::record::MAX_PLAINTEXT_LEN;
use crate::session::{HandshakeSession, Session, SessionParams};
use crate::task::{TaskKind, TaskOutput};
use crate::trust::Credentials;
use crate::types::{CipherSuite, HandshakeType, NamedGroup, ProtocolVersion, Role};
use crate::Error;

pub(crate) struct Client {
    state: State,

    policy: Policy,

    /// Our hello random.
    random: Random,

    /// Server hello random. Set by ServerHello.
    server_random: Option<[u8; 32]>,

    /// Cached session offered for resumption.
    offered_session: Option<Arc<Session>>,

    /// What went into the ClientHello, to check the ServerHello against.
    offered_suites: Vec<CipherSuite>,
    offered_groups: Vec<NamedGroup>,
    offered_alpn: Vec<String>,
    sent_server_name: Option<String>,
    requested_max_fragment: Option<MaxFragmentLength>,

    /// Negotiated values.
    session_id: SessionId,
    version: Option<ProtocolVersion>,
    suite: Option<&'static dyn SupportedCipherSuite>,
    application_protocol: Option<String>,
    max_fragment: Option<MaxFragmentLength>,
    resumed: bool,
    secure_renegotiation: bool,

    server_certificates: Vec<Vec<u8>>,

    /// ECDH parameters of the ServerKeyExchange.
    server_params: Option<EcdhParams>,

    certificate_request: Option<CertificateRequest>,

    /// Credentials chosen in answer to a CertificateRequest.
    credentials: Option<Credentials>,

    /// CertificateVerify signature, once the signing task is done.
    signature: Option<Vec<u8>>,

    master_secret: Option<Zeroizing<[u8; MASTER_SECRET_LEN]>>,

    client_verify_data: Option<[u8; VERIFY_DATA_LEN]>,
    server_verify_data: Option<[u8; VERIFY_DATA_LEN]>,

    outcome: Option<Outcome>,
}

impl Client {
    pub fn new(policy: Policy, engine: &Engine) -> Result<Client, Error> {
        let random = Random::new(engine.rng()).map_err(Error::Crypto)?;

        Ok(Client {
            state: State::SendClientHello,
            policy,
            random,
            server_random: None,
            offered_session: None,
            offered_suites: Vec::new(),
            offered_groups: Vec::new(),
            offered_alpn: Vec::new(),
            sent_server_name: None,
            requested_max_fragment: None,
            session_id: SessionId::empty(),
            version: None,
            suite: None,
            application_protocol: None,
            max_fragment: None,
            resumed: false,
            secure_renegotiation: false,
            server_certificates: Vec::new(),
            server_params: None,
            certificate_request: None,
            credentials: None,
            signature: None,
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
            (TaskKind::VerifyServerChain, TaskOutput::Verified) => {
                debug!("Server certificate chain trusted");
            }
            (TaskKind::VerifyServerKeyExchange, TaskOutput::Verified) => {}
            (TaskKind::ChooseClientCredentials, TaskOutput::Credentials(c)) => {
                self.credentials = c;
            }
            (TaskKind::SignCertificateVerify, TaskOutput::Signature(s)) => {
                self.signature = Some(s);
            }
            (kind, _) => return Err(unexpected_outcome(kind)),
        }
        Ok(())
    }

    pub fn take_outcome(&mut self) -> Option<Outcome> {
        self.outcome.take()
    }

    pub fn phase(&self) -> HandshakePhase {
        match self.state {
            State::SendClientHello => HandshakePhase::Start,
            State::AwaitServerHello => HandshakePhase::HelloSent,
            State::AwaitCertificate | State::AwaitServerKeyExchange => {
                HandshakePhase::HelloReceived
            }
            State::AwaitCertificateRequest | State::AwaitServerHelloDone => {
                HandshakePhase::KeyExchange
            }
            State::SendClientFlight if self.certificate_request.is_some() => {
                HandshakePhase::CertificateExchange
            }
            State::SendClientFlight => HandshakePhase::KeyExchange,
            State::SendCertificateVerify => HandshakePhase::CertificateExchange,
            State::SendFinished | State::AwaitFinished => HandshakePhase::FinishedPending,
            State::Done => HandshakePhase::Established,
        }
    }

    pub fn snapshot(&self) -> HandshakeSession {
        HandshakeSession {
            role: Some(Role::Client),
            session_id: self.session_id.to_vec(),
            version: self.version,
            cipher_suite: self.suite.map(|s| s.suite()),
            peer_host: self.policy.peer_host.clone(),
            peer_port: self.policy.peer_port,
            server_name: self.sent_server_name.clone(),
            application_protocol: self.application_protocol.clone(),
            peer_certificates: (!self.server_certificates.is_empty())
                .then(|| self.server_certificates.clone()),
            local_certificates: self.local_certificates(),
            resumed: self.resumed,
        }
    }

    fn local_certificates(&self) -> Vec<Vec<u8>> {
        self.credentials
            .as_ref()
            .map(|c| c.chain.clone())
            .unwrap_or_default()
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

    fn server_random(&self) -> Result<[u8; 32], Error> {
        self.server_random
            .ok_or_else(|| Error::UnexpectedMessage("no ServerHello".into()))
    }

    /// A cached session for the same peer that this handshake could resume.
    fn resumable_session(&self, config: &Config) -> Option<Arc<Session>> {
        let host = self.policy.peer_host.as_deref()?;
        let port = self.policy.peer_port?;
        let session = config.session_cache().get_for_peer(host, port)?;

        let usable = session.is_resumable()
            && self.policy.versions.contains(&session.protocol_version())
            && self.policy.cipher_suites.contains(&session.cipher_suite());

        usable.then_some(session)
    }

    fn check_server_hello(&mut self, sh: &ServerHello) -> Result<(), Error> {
        let ext = &sh.extensions;

        if let Some(code) = ext.unknown.first() {
            return Err(Error::UnsupportedExtension(*code));
        }

        let unsolicited = [
            (
                ext.server_name.is_some() && self.sent_server_name.is_none(),
                ExtensionType::ServerName,
            ),
            (
                ext.max_fragment_length.is_some() && self.requested_max_fragment.is_none(),
                ExtensionType::MaxFragmentLength,
            ),
            (
                ext.alpn.is_some() && self.offered_alpn.is_empty(),
                ExtensionType::ApplicationLayerProtocolNegotiation,
            ),
            (ext.supported_groups.is_some(), ExtensionType::SupportedGroups),
            (
                ext.signature_algorithms.is_some(),
                ExtensionType::SignatureAlgorithms,
            ),
        ];
        for (bad, extension_type) in unsolicited {
            if bad {
                return Err(Error::UnsupportedExtension(extension_type.as_u16()));
            }
        }

        if !ext.extended_master_secret {
            return Err(Error::HandshakeFailure(
                "server did not negotiate extended master secret".into(),
            ));
        }

        self.secure_renegotiation = match (&self.policy.renegotiation, &ext.renegotiation_info) {
            (None, None) => false,
            (None, Some(ri)) if ri.renegotiated_connection.is_empty() => true,
            (Some(previous), Some(ri)) if ri.renegotiated_connection == previous.concat() => true,
            _ => {
                return Err(Error::HandshakeFailure(
                    "renegotiation_info mismatch".into(),
                ))
            }
        };

        if let Some(mfl) = ext.max_fragment_length {
            if Some(mfl) > self.requested_max_fragment {
                return Err(Error::IllegalParameter(format!(
                    "max fragment length {:?} exceeds request",
                    mfl
                )));
            }
        }
        self.max_fragment = ext.max_fragment_length;

        if let Some(alpn) = &ext.alpn {
            match &alpn.protocols[..] {
                [p] if self.offered_alpn.contains(p) => {
                    self.application_protocol = Some(p.clone());
                }
                _ => {
                    return Err(Error::IllegalParameter(
                        "server selected an application protocol not offered".into(),
                    ))
                }
            }
        }

        Ok(())
    }

    fn complete(&mut self, engine: &Engine) -> Result<(), Error> {
        let session = match (&self.offered_session, self.resumed) {
            (Some(session), true) => {
                session.touch();
                session.clone()
            }
            _ => {
                let master_secret = self
                    .master_secret
                    .clone()
                    .ok_or_else(|| Error::UnexpectedMessage("no master secret".into()))?;
                let session = Arc::new(Session::new(SessionParams {
                    id: self.session_id.to_vec(),
                    version: self.version.ok_or(Error::NoProtocolVersion)?,
                    cipher_suite: self.suite()?.suite(),
                    peer_certificates: Some(self.server_certificates.clone()),
                    local_certificates: self.local_certificates(),
                    peer_host: self.policy.peer_host.clone(),
                    peer_port: self.policy.peer_port,
                    server_name: self.sent_server_name.clone(),
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

        debug!("Client handshake complete: {:?}", session);
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
    SendClientHello,
    AwaitServerHello,
    AwaitCertificate,
    AwaitServerKeyExchange,
    AwaitCertificateRequest,
    AwaitServerHelloDone,
    SendClientFlight,
    SendCertificateVerify,
    SendFinished,
    AwaitFinished,
    Done,
}

impl State {
    fn make_progress(self, client: &mut Client, engine: &mut Engine) -> Result<Self, Error> {
        match self {
            State::SendClientHello => self.send_client_hello(client, engine),
            State::AwaitServerHello => self.await_server_hello(client, engine),
            State::AwaitCertificate => self.await_certificate(client, engine),
            State::AwaitServerKeyExchange => self.await_server_key_exchange(client, engine),
            State::AwaitCertificateRequest => self.await_certificate_request(client, engine),
            State::AwaitServerHelloDone => self.await_server_hello_done(client, engine),
            State::SendClientFlight => self.send_client_flight(client, engine),
            State::SendCertificateVerify => self.send_certificate_verify(client, engine),
            State::SendFinished => self.send_finished(client, engine),
            State::AwaitFinished => self.await_finished(client, engine),
            State::Done => Ok(self),
        }
    }

    fn send_client_hello(self, client: &mut Client, engine: &mut Engine) -> Result<Self, Error> {
        let config = engine.config().clone();
        let provider = config.crypto_provider();
        let (_, max_version) = client.policy.version_range()?;

        client.offered_session = client.resumable_session(&config);
        let session_id = match &client.offered_session {
            Some(s) => {
                debug!("Offer session {:?} for resumption", s);
                SessionId::try_new(s.id()).map_err(|e| Error::Crypto(e.to_string()))?
            }
            None => SessionId::empty(),
        };

        client.offered_suites = client.policy.cipher_suites.clone();
        client.offered_groups = provider.supported_kx_groups().collect();
        client.offered_alpn = config.alpn_protocols().to_vec();
        client.sent_server_name = sni_host(&config, client.policy.peer_host.as_deref());
        client.requested_max_fragment = config.max_fragment_length();

        let mut suites = client.offered_suites.clone();
        if client.policy.renegotiation.is_none() {
            suites.push(EMPTY_RENEGOTIATION_INFO_SCSV);
        }

        let extensions = HelloExtensions {
            server_name: client
                .sent_server_name
                .as_deref()
                .map(ServerNameExtension::new),
            max_fragment_length: client.requested_max_fragment,
            supported_groups: Some(SupportedGroupsExtension::new(
                client.offered_groups.iter().copied(),
            )),
            ec_point_formats: Some(ECPointFormatsExtension::default()),
            signature_algorithms: Some(SignatureAlgorithmsExtension::new(
                provider.signature_schemes.iter().copied(),
            )),
            alpn: (!client.offered_alpn.is_empty())
                .then(|| AlpnExtension::new(&client.offered_alpn[..])),
            extended_master_secret: true,
            renegotiation_info: client
                .policy
                .renegotiation
                .map(|previous| RenegotiationInfoExtension::new(&previous.client)),
            unknown: Vec::new(),
        };

        let hello = ClientHello::new(max_version, client.random, session_id, suites, extensions);
        engine.send_handshake(&Body::ClientHello(hello))?;

        Ok(Self::AwaitServerHello)
    }

    fn await_server_hello(self, client: &mut Client, engine: &mut Engine) -> Result<Self, Error> {
        let Some(incoming) = engine.next_handshake(&[HandshakeType::ServerHello])? else {
            return Ok(self);
        };

        let Body::ServerHello(sh) = incoming.handshake.body else {
            unreachable!()
        };

        let version = sh.server_version;
        if !client.policy.versions.contains(&version) {
            return Err(Error::NoProtocolVersion);
        }

        if sh.compression_method != COMPRESSION_NULL {
            return Err(Error::IllegalParameter("compression method".into()));
        }

        let cs = sh.cipher_suite;
        if !client.offered_suites.contains(&cs) || !cs.is_usable_with(version) {
            return Err(Error::IllegalParameter(format!(
                "server selected cipher suite {} not offered",
                cs
            )));
        }
        let config = engine.config().clone();
        let suite = config
            .crypto_provider()
            .find_cipher_suite(cs)
            .ok_or(Error::NoCipherSuite)?;

        client.check_server_hello(&sh)?;

        client.resumed = match &client.offered_session {
            Some(s) if !sh.session_id.is_empty() && &sh.session_id[..] == s.id() => {
                if s.protocol_version() != version || s.cipher_suite() != cs {
                    return Err(Error::IllegalParameter(
                        "resumed session parameters changed".into(),
                    ));
                }
                true
            }
            _ => false,
        };

        debug!(
            "Negotiated {} {} (resumed: {}, alpn: {:?})",
            version, cs, client.resumed, client.application_protocol
        );

        client.server_random = Some(sh.random.to_bytes());
        client.session_id = sh.session_id;
        client.version = Some(version);
        client.suite = Some(suite);

        engine.set_version(version);
        engine.set_max_fragment(
            client
                .max_fragment
                .map(|m| m.len())
                .unwrap_or(MAX_PLAINTEXT_LEN),
        );

        if !client.resumed {
            return Ok(Self::AwaitCertificate);
        }

        let Some(session) = client.offered_session.clone() else {
            unreachable!()
        };
        client.server_certificates = session
            .peer_certificates()
            .map(|c| c.to_vec())
            .unwrap_or_default();

        let master_secret = Zeroizing::new(*session.master_secret());
        let (read, write) = keys::cipher_specs(
            suite,
            &master_secret[..],
            &client.random.to_bytes(),
            &client.server_random()?,
            Role::Client,
        )?;
        engine.set_pending_specs(read, write);
        engine.expect_change_cipher_spec();
        client.master_secret = Some(master_secret);

        Ok(Self::AwaitFinished)
    }

    fn await_certificate(self, client: &mut Client, engine: &mut Engine) -> Result<Self, Error> {
        let Some(incoming) = engine.next_handshake(&[HandshakeType::Certificate])? else {
            return Ok(self);
        };

        let Body::Certificate(certificate) = incoming.handshake.body else {
            unreachable!()
        };

        if certificate.certificate_list.is_empty() {
            return Err(Error::CertificateRejected(
                "server sent no certificate".into(),
            ));
        }

        client.server_certificates = certificate.certificate_list;

        let auth_type = client.suite()?.suite().auth_type();
        let context = trust_context(engine, &client.policy, client.sent_server_name.clone());
        queue_chain_check(
            engine,
            TaskKind::VerifyServerChain,
            client.server_certificates.clone(),
            auth_type,
            context,
        )?;

        Ok(Self::AwaitServerKeyExchange)
    }

    fn await_server_key_exchange(
        self,
        client: &mut Client,
        engine: &mut Engine,
    ) -> Result<Self, Error> {
        let Some(incoming) = engine.next_handshake(&[HandshakeType::ServerKeyExchange])? else {
            return Ok(self);
        };

        let Body::ServerKeyExchange(ske) = incoming.handshake.body else {
            unreachable!()
        };

        if !client.offered_groups.contains(&ske.params.named_group) {
            return Err(Error::IllegalParameter(format!(
                "server chose group {:?} not offered",
                ske.params.named_group
            )));
        }

        let schemes = engine.config().crypto_provider().signature_schemes;
        if !schemes.contains(&ske.signed.scheme) {
            return Err(Error::IllegalParameter(format!(
                "server signed with {:?}, not offered",
                ske.signed.scheme
            )));
        }

        let data = ske
            .params
            .signed_data(&client.random.to_bytes(), &client.server_random()?);
        let cert = client.server_certificates[0].clone();
        queue_signature_check(
            engine,
            TaskKind::VerifyServerKeyExchange,
            cert,
            data,
            ske.signed,
        );

        client.server_params = Some(ske.params);

        Ok(Self::AwaitCertificateRequest)
    }

    fn await_certificate_request(
        self,
        client: &mut Client,
        engine: &mut Engine,
    ) -> Result<Self, Error> {
        let expected = [
            HandshakeType::CertificateRequest,
            HandshakeType::ServerHelloDone,
        ];
        let Some(incoming) = engine.next_handshake(&expected)? else {
            return Ok(self);
        };

        let Body::CertificateRequest(cr) = incoming.handshake.body else {
            return Ok(Self::SendClientFlight);
        };

        debug!("Received CertificateRequest");

        let key_types: Vec<&'static str> = if cr.certificate_types.contains(&ECDSA_SIGN) {
            vec!["EC"]
        } else {
            Vec::new()
        };
        let issuers = cr.certificate_authorities.clone();
        let key_manager = engine.config().key_manager().cloned();

        engine
            .tasks_mut()
            .push(TaskKind::ChooseClientCredentials, move || {
                let credentials = key_manager
                    .and_then(|km| km.choose_client_credentials(&key_types, &issuers));
                Ok(TaskOutput::Credentials(credentials))
            });

        client.certificate_request = Some(cr);

        Ok(Self::AwaitServerHelloDone)
    }

    fn await_server_hello_done(
        self,
        _client: &mut Client,
        engine: &mut Engine,
    ) -> Result<Self, Error> {
        match engine.next_handshake(&[HandshakeType::ServerHelloDone])? {
            Some(_) => Ok(Self::SendClientFlight),
            None => Ok(self),
        }
    }

    fn send_client_flight(self, client: &mut Client, engine: &mut Engine) -> Result<Self, Error> {
        if !engine.tasks().is_idle() {
            return Ok(self);
        }

        if let Some(cr) = &client.certificate_request {
            let credentials = client.credentials.take().filter(|c| {
                let ok = cr.signature_schemes.contains(&c.key.scheme());
                if !ok {
                    warn!("Client key scheme {:?} not accepted by server", c.key.scheme());
                }
                ok
            });
            let chain = credentials
                .as_ref()
                .map(|c| c.chain.clone())
                .unwrap_or_default();
            if chain.is_empty() {
                debug!("No client certificate to send");
            }
            engine.send_handshake(&Body::Certificate(Certificate::new(chain)))?;
            client.credentials = credentials;
        }

        let params = client
            .server_params
            .take()
            .ok_or_else(|| Error::UnexpectedMessage("ServerHelloDone before keys".into()))?;

        let provider = engine.config().crypto_provider().clone();
        let kx = provider
            .find_kx_group(params.named_group)
            .ok_or(Error::NoKeyExchangeGroup)?
            .start_exchange()
            .map_err(Error::Crypto)?;

        engine.send_handshake(&Body::ClientKeyExchange(ClientKeyExchange::new(
            kx.pub_key(),
        )))?;

        let pre_master_secret = kx
            .complete(&params.public_key)
            .map_err(Error::IllegalParameter)?;

        let suite = client.suite()?;
        let session_hash = engine.transcript_hash(suite.hash_algorithm());
        let master_secret = keys::master_secret(suite, &pre_master_secret, &session_hash)?;

        let (read, write) = keys::cipher_specs(
            suite,
            &master_secret[..],
            &client.random.to_bytes(),
            &client.server_random()?,
            Role::Client,
        )?;
        engine.set_pending_specs(read, write);
        client.master_secret = Some(master_secret);

        if let Some(credentials) = &client.credentials {
            let data = engine.transcript().to_vec();
            let key = credentials.key.clone();
            queue_signing(engine, TaskKind::SignCertificateVerify, key, data);
            return Ok(Self::SendCertificateVerify);
        }

        Ok(Self::SendFinished)
    }

    fn send_certificate_verify(
        self,
        client: &mut Client,
        engine: &mut Engine,
    ) -> Result<Self, Error> {
        if !engine.tasks().is_idle() {
            return Ok(self);
        }

        let (Some(signature), Some(credentials)) = (client.signature.take(), &client.credentials)
        else {
            return Err(Error::Crypto("CertificateVerify not signed".into()));
        };

        let signed = DigitallySigned::new(credentials.key.scheme(), signature);
        engine.send_handshake(&Body::CertificateVerify(CertificateVerify::new(signed)))?;

        Ok(Self::SendFinished)
    }

    fn send_finished(self, client: &mut Client, engine: &mut Engine) -> Result<Self, Error> {
        engine.send_change_cipher_spec()?;

        let suite = client.suite()?;
        let handshake_hash = engine.transcript_hash(suite.hash_algorithm());
        let verify_data =
            keys::finished(suite, client.master_secret()?, Role::Client, &handshake_hash)?;

        engine.send_handshake(&Body::Finished(Finished::new(verify_data)))?;
        client.client_verify_data = Some(verify_data);

        if client.resumed {
            client.complete(engine)?;
            return Ok(Self::Done);
        }

        engine.expect_change_cipher_spec();
        Ok(Self::AwaitFinished)
    }

    fn await_finished(self, client: &mut Client, engine: &mut Engine) -> Result<Self, Error> {
        if !engine.tasks().is_idle() {
            return Ok(self);
        }

        let Some(incoming) = engine.next_handshake(&[HandshakeType::Finished])? else {
            return Ok(self);
        };

        let Body::Finished(finished) = incoming.handshake.body else {
            unreachable!()
        };

        let suite = client.suite()?;
        let handshake_hash = transcript_hash(
            suite.hash_algorithm(),
            &engine.transcript()[..incoming.transcript_before],
        );
        let expected =
            keys::finished(suite, client.master_secret()?, Role::Server, &handshake_hash)?;
        keys::check_finished(&expected, &finished.verify_data)?;
        client.server_verify_data = Some(expected);

        if client.resumed {
            return Ok(Self::SendFinished);
        }

        client.complete(engine)?;
        Ok(Self::Done)
    }
}

/// Host name for SNI: the configured override, else the peer host unless
/// it is an IP literal.
fn sni_host(config: &Config, peer_host: Option<&str>) -> Option<String> {
    config
        .server_name()
        .or_else(|| peer_host.filter(|h| h.parse::<IpAddr>().is_err()))
        .map(str::to_string)
}
