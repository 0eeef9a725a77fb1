//! The `wrap`/`unwrap` engine.
//!
//! [`TlsEngine`] never touches a socket. The application moves bytes:
//! `wrap` turns application data (or nothing, during the handshake) into
//! records to send, `unwrap` turns received records into application data.
//! Every call reports how many bytes it consumed and produced, plus what the
//! handshake needs next.

use std::sync::Arc;

use crate::engine::Engine;
use crate::handshake::{Handshake, Outcome, Policy, VerifyData};
use crate::message::{Alert, Body};
use crate::session::{HandshakeSession, Session};
use crate::task::DelegatedTask;
use crate::trust::ClientAuth;
use crate::types::{AlertDescription, ContentType, HandshakeType, ProtocolVersion, Role};
use crate::{config, Buf, CipherSuite, Config, Error};

pub use crate::handshake::HandshakePhase;

/// Outcome of a `wrap` or `unwrap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    /// The destination cannot hold the next record or its plaintext.
    BufferOverflow,
    /// The source does not hold a whole record.
    BufferUnderflow,
    /// This direction is done.
    Closed,
}

/// What the handshake needs from the application next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStatus {
    /// No handshake has begun.
    NotStarted,
    NotHandshaking,
    /// Run the tasks from [`TlsEngine::delegated_task`].
    NeedTask,
    NeedWrap,
    NeedUnwrap,
    /// The call reporting this completed a handshake. Reported once.
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineResult {
    pub status: Status,
    pub handshake_status: HandshakeStatus,
    pub bytes_consumed: usize,
    pub bytes_produced: usize,
}

/// A TLS 1.2 connection, client or server.
pub struct TlsEngine {
    config: Arc<Config>,

    /// Unset until [`set_use_client_mode`](Self::set_use_client_mode).
    role: Option<Role>,

    peer_host: Option<String>,
    peer_port: Option<u16>,

    cipher_suites: Vec<CipherSuite>,
    /// Lowest first.
    protocols: Vec<ProtocolVersion>,
    client_auth: ClientAuth,

    engine: Engine,

    /// The handshake in progress, if any.
    handshake: Option<Handshake>,

    /// Set once the first handshake byte is produced or consumed.
    started: bool,

    /// Set once the initial handshake completed.
    established: bool,

    /// A handshake completed and `Finished` is still to be reported.
    finished_pending: bool,

    session: Option<Arc<Session>>,
    application_protocol: Option<String>,

    /// Finished values of the last completed handshake.
    verify_data: Option<VerifyData>,

    /// Whether the peer supports RFC 5746.
    secure_renegotiation: bool,

    /// A renegotiation was started because the write key hit its limit.
    key_renewal: bool,

    /// A close_notify or fatal alert is queued. Outbound is done once it
    /// has been emitted.
    close_queued: bool,
    close_notify_received: bool,
    outbound_done: bool,
    inbound_done: bool,
}

impl TlsEngine {
    pub fn new(config: Arc<Config>) -> Self {
        let cipher_suites = config.cipher_suites().to_vec();
        let protocols = config.protocols();
        let client_auth = config.client_auth();

        TlsEngine {
            engine: Engine::new(config.clone(), Role::Client),
            config,
            role: None,
            peer_host: None,
            peer_port: None,
            cipher_suites,
            protocols,
            client_auth,
            handshake: None,
            started: false,
            established: false,
            finished_pending: false,
            session: None,
            application_protocol: None,
            verify_data: None,
            secure_renegotiation: false,
            key_renewal: false,
            close_queued: false,
            close_notify_received: false,
            outbound_done: false,
            inbound_done: false,
        }
    }

    /// An engine for a known peer. Clients need the peer to resume sessions
    /// and to check the server's host name.
    pub fn with_peer(config: Arc<Config>, host: &str, port: u16) -> Self {
        let mut e = Self::new(config);
        e.peer_host = Some(host.to_string());
        e.peer_port = Some(port);
        e
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    #[inline(always)]
    pub fn peer_host(&self) -> Option<&str> {
        self.peer_host.as_deref()
    }

    #[inline(always)]
    pub fn peer_port(&self) -> Option<u16> {
        self.peer_port
    }

    /// Protocol agreed through ALPN in the last completed handshake.
    pub fn application_protocol(&self) -> Option<&str> {
        self.application_protocol.as_deref()
    }

    // Settings

    /// Choose between client and server. Allowed until handshaking begins.
    pub fn set_use_client_mode(&mut self, client: bool) -> Result<(), Error> {
        let role = if client { Role::Client } else { Role::Server };
        if self.started {
            return if self.role == Some(role) {
                Ok(())
            } else {
                Err(Error::RoleChange)
            };
        }
        self.role = Some(role);
        Ok(())
    }

    /// Whether this engine is a client. Fails until a role is set.
    pub fn use_client_mode(&self) -> Result<bool, Error> {
        self.role
            .map(|r| r == Role::Client)
            .ok_or(Error::RoleNotSet)
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    fn check_not_started(&self) -> Result<(), Error> {
        if self.started {
            return Err(Error::InvalidState("handshaking has begun"));
        }
        Ok(())
    }

    pub fn set_enabled_cipher_suites(&mut self, suites: &[CipherSuite]) -> Result<(), Error> {
        self.check_not_started()?;
        config::check_cipher_suites(self.config.crypto_provider(), suites)?;
        self.cipher_suites = suites.to_vec();
        Ok(())
    }

    pub fn enabled_cipher_suites(&self) -> &[CipherSuite] {
        &self.cipher_suites
    }

    /// Suites the crypto provider can serve.
    pub fn supported_cipher_suites(&self) -> Vec<CipherSuite> {
        self.config
            .crypto_provider()
            .supported_cipher_suites()
            .collect()
    }

    pub fn set_enabled_protocols(&mut self, versions: &[ProtocolVersion]) -> Result<(), Error> {
        self.check_not_started()?;
        config::check_versions(versions)?;
        let mut versions = versions.to_vec();
        versions.sort();
        versions.dedup();
        self.protocols = versions;
        Ok(())
    }

    /// Enabled versions, lowest first.
    pub fn enabled_protocols(&self) -> &[ProtocolVersion] {
        &self.protocols
    }

    pub fn supported_protocols(&self) -> Vec<ProtocolVersion> {
        ProtocolVersion::supported().to_vec()
    }

    pub fn set_client_auth(&mut self, client_auth: ClientAuth) -> Result<(), Error> {
        self.check_not_started()?;
        self.client_auth = client_auth;
        Ok(())
    }

    #[inline(always)]
    pub fn client_auth(&self) -> ClientAuth {
        self.client_auth
    }

    // Observability

    pub fn handshake_status(&self) -> HandshakeStatus {
        if !self.started {
            return HandshakeStatus::NotStarted;
        }
        if self.engine.tasks().is_running() {
            return HandshakeStatus::NeedTask;
        }
        if self.engine.has_output() || self.engine.tasks().has_completions() {
            return HandshakeStatus::NeedWrap;
        }
        if self.handshake.is_some() {
            return HandshakeStatus::NeedUnwrap;
        }
        HandshakeStatus::NotHandshaking
    }

    pub fn handshake_phase(&self) -> HandshakePhase {
        match &self.handshake {
            Some(hs) => hs.phase(),
            None if self.established => HandshakePhase::Established,
            None => HandshakePhase::Start,
        }
    }

    /// The session of the last completed handshake.
    pub fn session(&self) -> Option<Arc<Session>> {
        self.session.clone()
    }

    /// What the handshake in progress negotiated so far.
    pub fn handshake_session(&self) -> Option<HandshakeSession> {
        self.handshake.as_ref().map(|hs| hs.snapshot())
    }

    /// Next task to run before the handshake can continue.
    pub fn delegated_task(&mut self) -> Option<DelegatedTask> {
        self.engine.tasks_mut().pop()
    }

    #[inline(always)]
    pub fn is_outbound_done(&self) -> bool {
        self.outbound_done
    }

    #[inline(always)]
    pub fn is_inbound_done(&self) -> bool {
        self.inbound_done
    }

    // Handshake control

    /// Start the initial handshake or, once established, a renegotiation.
    ///
    /// A client renegotiates by sending a new ClientHello, a server by
    /// sending HelloRequest.
    pub fn begin_handshake(&mut self) -> Result<(), Error> {
        let role = self.role.ok_or(Error::RoleNotSet)?;
        if self.outbound_done || self.inbound_done || self.close_queued {
            return Err(Error::InvalidState("engine is closed"));
        }
        if self.handshake.is_some() {
            return Ok(());
        }

        if !self.established {
            return self.guard(|e| e.start_handshake(role, None));
        }

        if !self.config.allow_renegotiation() || !self.secure_renegotiation {
            return Err(Error::RenegotiationDisabled);
        }

        match role {
            Role::Client => {
                let previous = self.verify_data;
                self.guard(|e| e.start_handshake(role, previous))
            }
            Role::Server => {
                debug!("Request renegotiation");
                self.guard(|e| e.engine.send_handshake(&Body::HelloRequest))
            }
        }
    }

    fn start_handshake(
        &mut self,
        role: Role,
        renegotiation: Option<VerifyData>,
    ) -> Result<(), Error> {
        debug!(
            "Begin {} as {:?}",
            if renegotiation.is_some() {
                "renegotiation"
            } else {
                "handshake"
            },
            role
        );

        self.started = true;
        self.engine.set_role(role);
        self.engine.reset_handshake();

        let policy = Policy {
            cipher_suites: self.cipher_suites.clone(),
            versions: self.protocols.clone(),
            client_auth: self.client_auth,
            peer_host: self.peer_host.clone(),
            peer_port: self.peer_port,
            renegotiation,
        };
        self.handshake = Some(Handshake::new(role, policy, &self.engine)?);
        self.drive()
    }

    /// Feed completed tasks to the handshake and let it progress.
    fn drive(&mut self) -> Result<(), Error> {
        let Some(hs) = self.handshake.as_mut() else {
            return Ok(());
        };

        for (kind, outcome) in self.engine.tasks_mut().completed() {
            hs.task_done(kind, outcome)?;
        }
        hs.make_progress(&mut self.engine)?;

        if hs.is_done() {
            let outcome = hs.take_outcome();
            self.handshake = None;
            self.establish(outcome)?;
        }
        Ok(())
    }

    fn establish(&mut self, outcome: Option<Outcome>) -> Result<(), Error> {
        let Some(outcome) = outcome else {
            return Err(Error::InvalidState("handshake done without outcome"));
        };

        info!(
            "Handshake complete: {} {}",
            outcome.session.protocol_version(),
            outcome.session.cipher_suite()
        );

        self.session = Some(outcome.session);
        self.application_protocol = outcome.application_protocol;
        self.verify_data = Some(outcome.verify_data);
        self.secure_renegotiation = outcome.secure_renegotiation;
        self.key_renewal = false;
        self.established = true;
        self.finished_pending = true;
        Ok(())
    }

    /// Renegotiate once the write key sealed as many records as allowed.
    ///
    /// Application data keeps flowing under the old key while the new
    /// handshake runs, up to twice the limit.
    fn renew_write_key(&mut self) -> Result<(), Error> {
        let limit = self.config.aead_encryption_limit();
        let records = self.engine.record().write_key_records();
        if !self.established || records < limit {
            return Ok(());
        }

        if self.key_renewal || self.handshake.is_some() {
            if records >= limit.saturating_mul(2) {
                return Err(Error::AeadLimitReached);
            }
            return Ok(());
        }

        if !self.config.allow_renegotiation() || !self.secure_renegotiation {
            return Err(Error::AeadLimitReached);
        }

        info!("Write key sealed {} records, renegotiate", records);
        self.key_renewal = true;
        match self.engine.role() {
            Role::Client => {
                let previous = self.verify_data;
                self.start_handshake(Role::Client, previous)
            }
            Role::Server => self.engine.send_handshake(&Body::HelloRequest),
        }
    }

    /// Run `f`, turning a fatal error into a failed connection.
    fn guard<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, Error>) -> Result<T, Error> {
        f(self).map_err(|e| {
            if e.is_fatal() {
                self.fail(&e);
            }
            e
        })
    }

    /// Tear the connection down after a fatal error.
    fn fail(&mut self, error: &Error) {
        warn!("Fatal error: {}", error);

        self.handshake = None;
        self.engine.reset_handshake();
        self.engine.discard_handshake_output();
        self.inbound_done = true;
        self.finished_pending = false;

        if let Some(session) = &self.session {
            session.invalidate();
            self.config.session_cache().remove(session.id());
        }

        if self.outbound_done || self.close_queued {
            return;
        }
        match error.alert() {
            Some(description) => match self.engine.send_alert(Alert::fatal(description)) {
                Ok(()) => self.close_queued = true,
                Err(e) => {
                    debug!("Cannot send alert: {}", e);
                    self.outbound_done = true;
                }
            },
            None => self.outbound_done = true,
        }
    }

    // Closure

    /// Stop sending. Queues a close_notify for the next `wrap`.
    pub fn close_outbound(&mut self) {
        if self.outbound_done || self.close_queued {
            return;
        }
        if !self.started {
            self.outbound_done = true;
            return;
        }

        debug!("Close outbound");
        if self.handshake.take().is_some() {
            self.engine.reset_handshake();
            self.engine.discard_handshake_output();
        }
        self.finished_pending = false;

        match self.engine.send_alert(Alert::close_notify()) {
            Ok(()) => self.close_queued = true,
            Err(e) => {
                debug!("Cannot send close_notify: {}", e);
                self.outbound_done = true;
            }
        }
    }

    /// Stop receiving. Also closes outbound.
    pub fn close_inbound(&mut self) {
        if !self.inbound_done {
            self.inbound_done = true;
            if self.started && !self.close_notify_received {
                warn!("Inbound closed without close_notify, possible truncation attack");
            }
        }
        self.close_outbound();
    }

    // Data path

    fn result(&mut self, status: Status, consumed: usize, produced: usize) -> EngineResult {
        let handshake_status = if self.finished_pending && !self.engine.has_output() {
            self.finished_pending = false;
            HandshakeStatus::Finished
        } else {
            self.handshake_status()
        };

        EngineResult {
            status,
            handshake_status,
            bytes_consumed: consumed,
            bytes_produced: produced,
        }
    }

    fn closed(&self) -> EngineResult {
        EngineResult {
            status: Status::Closed,
            handshake_status: HandshakeStatus::NotHandshaking,
            bytes_consumed: 0,
            bytes_produced: 0,
        }
    }

    /// Produce records to send.
    ///
    /// Queued handshake and alert records go first, as many whole records
    /// as fit in `dst`. Application data from `srcs` is encoded only when
    /// nothing else is queued, one record per call.
    pub fn wrap(&mut self, srcs: &[&[u8]], dst: &mut [u8]) -> Result<EngineResult, Error> {
        if self.outbound_done {
            return Ok(self.closed());
        }
        self.role.ok_or(Error::RoleNotSet)?;
        if !self.started && !self.close_queued {
            self.begin_handshake()?;
        }
        self.guard(|e| e.do_wrap(srcs, dst))
    }

    fn do_wrap(&mut self, srcs: &[&[u8]], dst: &mut [u8]) -> Result<EngineResult, Error> {
        self.drive()?;

        if self.engine.tasks().is_running() {
            return Ok(self.result(Status::Ok, 0, 0));
        }

        let total: usize = srcs.iter().map(|s| s.len()).sum();
        if total > 0 && !self.close_queued {
            self.renew_write_key()?;
        }

        if self.engine.has_output() {
            let mut produced = 0;
            while let Some(record) = self.engine.peek_output() {
                if record.len() > dst.len() - produced {
                    break;
                }
                let Some(record) = self.engine.pop_output() else {
                    break;
                };
                dst[produced..produced + record.len()].copy_from_slice(&record);
                produced += record.len();
                self.engine.recycle(record);
            }

            if produced == 0 {
                return Ok(self.result(Status::BufferOverflow, 0, 0));
            }

            if self.close_queued && !self.engine.has_output() {
                debug!("Outbound done");
                self.outbound_done = true;
                let mut r = self.result(Status::Closed, 0, produced);
                r.handshake_status = HandshakeStatus::NotHandshaking;
                return Ok(r);
            }
            return Ok(self.result(Status::Ok, 0, produced));
        }

        if !self.established || total == 0 {
            return Ok(self.result(Status::Ok, 0, 0));
        }

        let len = total.min(self.engine.max_fragment());
        if self.engine.record().encoded_len(len) > dst.len() {
            return Ok(self.result(Status::BufferOverflow, 0, 0));
        }

        let mut fragment = Buf::new();
        for src in srcs {
            let take = (len - fragment.len()).min(src.len());
            fragment.extend_from_slice(&src[..take]);
            if fragment.len() == len {
                break;
            }
        }

        let mut out = Buf::new();
        self.engine.encode_application_data(&fragment, &mut out)?;
        dst[..out.len()].copy_from_slice(&out);
        trace!("Wrap {} bytes of application data", len);

        Ok(self.result(Status::Ok, len, out.len()))
    }

    /// Consume at most one record from `src`.
    ///
    /// Decrypted application data is scattered over `dsts` in order.
    pub fn unwrap(&mut self, src: &[u8], dsts: &mut [&mut [u8]]) -> Result<EngineResult, Error> {
        if self.inbound_done {
            return Ok(self.closed());
        }
        self.role.ok_or(Error::RoleNotSet)?;
        if !self.started && !self.close_queued && !self.outbound_done {
            self.begin_handshake()?;
        }
        self.guard(|e| e.do_unwrap(src, dsts))
    }

    fn do_unwrap(&mut self, src: &[u8], dsts: &mut [&mut [u8]]) -> Result<EngineResult, Error> {
        self.drive()?;

        if self.engine.tasks().is_running() {
            return Ok(self.result(Status::Ok, 0, 0));
        }

        let Some(len) = self.engine.record().record_len(src)? else {
            return Ok(self.result(Status::BufferUnderflow, 0, 0));
        };
        if src.len() < len {
            return Ok(self.result(Status::BufferUnderflow, 0, 0));
        }
        let record = &src[..len];

        if ContentType::from_u8(record[0]) == ContentType::ApplicationData {
            let codec = self.engine.record();
            let bound = codec.plaintext_bound(len).min(codec.max_plaintext());
            let capacity: usize = dsts.iter().map(|d| d.len()).sum();
            if bound > capacity {
                return Ok(self.result(Status::BufferOverflow, 0, 0));
            }
        }

        let (content_type, plaintext) = self.engine.decode_record(record)?;
        trace!("Unwrap {:?} record of {} bytes", content_type, len);

        let mut produced = 0;
        match content_type {
            ContentType::Handshake => {
                if plaintext.is_empty() {
                    return Err(Error::DecodeError("empty handshake fragment".into()));
                }
                self.engine.push_handshake_fragment(&plaintext);
            }
            ContentType::ChangeCipherSpec => self.engine.receive_change_cipher_spec(&plaintext)?,
            ContentType::Alert => self.receive_alert(&plaintext)?,
            ContentType::ApplicationData => {
                produced = self.receive_application_data(&plaintext, dsts)?;
            }
            ContentType::Unknown(t) => {
                return Err(Error::UnexpectedMessage(format!("record type {}", t)));
            }
        }

        self.drive()?;
        if self.handshake.is_none() && self.engine.has_handshake_input() {
            self.unsolicited_handshake()?;
        }

        let status = if self.inbound_done {
            Status::Closed
        } else {
            Status::Ok
        };
        Ok(self.result(status, len, produced))
    }

    fn receive_application_data(
        &mut self,
        plaintext: &[u8],
        dsts: &mut [&mut [u8]],
    ) -> Result<usize, Error> {
        if !self.established {
            return Err(Error::UnexpectedMessage(
                "application data before handshake completed".into(),
            ));
        }
        if self.engine.has_handshake_input() {
            return Err(Error::UnexpectedMessage(
                "application data inside a handshake message".into(),
            ));
        }

        let mut rest = plaintext;
        for dst in dsts.iter_mut() {
            if rest.is_empty() {
                break;
            }
            let n = dst.len().min(rest.len());
            dst[..n].copy_from_slice(&rest[..n]);
            rest = &rest[n..];
        }
        Ok(plaintext.len())
    }

    fn receive_alert(&mut self, plaintext: &[u8]) -> Result<(), Error> {
        if plaintext.len() != 2 {
            return Err(Error::DecodeError("alert".into()));
        }
        let (_, alert) = Alert::parse(plaintext).map_err(|_| Error::DecodeError("alert".into()))?;
        debug!("Received alert {:?} {}", alert.level, alert.description);

        if alert.description == AlertDescription::CloseNotify {
            self.close_notify_received = true;
            self.inbound_done = true;
            self.close_outbound();
            return Ok(());
        }

        if alert.is_fatal() {
            return Err(Error::AlertReceived(alert.description));
        }

        if alert.description == AlertDescription::NoRenegotiation {
            warn!("Peer refused renegotiation");
            if self.key_renewal {
                return Err(Error::AeadLimitReached);
            }
            if self.established && self.handshake.take().is_some() {
                self.engine.reset_handshake();
            }
        }
        Ok(())
    }

    /// A handshake message arrived while no handshake runs: a renegotiation
    /// request, or a protocol error.
    fn unsolicited_handshake(&mut self) -> Result<(), Error> {
        let Some(msg_type) = self.engine.peek_handshake_type() else {
            return Ok(());
        };

        if self.close_queued {
            self.engine.skip_handshake()?;
            return Ok(());
        }

        let role = self.engine.role();
        let request = matches!(
            (role, msg_type),
            (Role::Client, HandshakeType::HelloRequest) | (Role::Server, HandshakeType::ClientHello)
        );
        if !self.established || !request {
            return Err(Error::UnexpectedMessage(format!(
                "{:?} outside a handshake",
                msg_type
            )));
        }

        let accept = self.config.allow_renegotiation() && self.secure_renegotiation;

        if role == Role::Server && accept {
            // The ClientHello stays buffered for the new handshake.
            let previous = self.verify_data;
            return self.start_handshake(role, previous);
        }

        if self.engine.skip_handshake()?.is_none() {
            return Ok(());
        }

        if accept {
            let previous = self.verify_data;
            return self.start_handshake(role, previous);
        }

        warn!("Refuse renegotiation requested by peer");
        self.engine
            .send_alert(Alert::warning(AlertDescription::NoRenegotiation))
    }
}

impl std::fmt::Debug for TlsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsEngine")
            .field("role", &self.role)
            .field("handshake", &self.handshake)
            .field("established", &self.established)
            .field("outbound_done", &self.outbound_done)
            .field("inbound_done", &self.inbound_done)
            .field("engine", &self.engine)
            .finish()
    }
}
