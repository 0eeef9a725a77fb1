//! Established sessions and the cache used for resumption.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use zeroize::Zeroizing;

use crate::crypto::prf::MASTER_SECRET_LEN;
use crate::message::extensions::DEFAULT_MAX_FRAGMENT;
use crate::record::{HEADER_LEN, MAX_CIPHERTEXT_LEN, MAX_PLAINTEXT_LEN};
use crate::types::{CipherSuite, ProtocolVersion, Role};

/// The negotiated parameters of a completed handshake.
///
/// Shared as `Arc<Session>` between engines and the cache. Everything but
/// the validity flag and the last access time is fixed at creation.
pub struct Session {
    id: Vec<u8>,
    version: ProtocolVersion,
    cipher_suite: CipherSuite,
    peer_certificates: Option<Vec<Vec<u8>>>,
    local_certificates: Vec<Vec<u8>>,
    peer_host: Option<String>,
    peer_port: Option<u16>,
    server_name: Option<String>,
    application_protocol: Option<String>,
    max_fragment_len: usize,
    created: Instant,
    last_accessed: Mutex<Instant>,
    valid: AtomicBool,
    master_secret: Zeroizing<[u8; MASTER_SECRET_LEN]>,
}

/// Values the handshake collects for a new [`Session`].
pub(crate) struct SessionParams {
    pub id: Vec<u8>,
    pub version: ProtocolVersion,
    pub cipher_suite: CipherSuite,
    pub peer_certificates: Option<Vec<Vec<u8>>>,
    pub local_certificates: Vec<Vec<u8>>,
    pub peer_host: Option<String>,
    pub peer_port: Option<u16>,
    pub server_name: Option<String>,
    pub application_protocol: Option<String>,
    pub max_fragment_len: Option<usize>,
    pub master_secret: Zeroizing<[u8; MASTER_SECRET_LEN]>,
}

impl Session {
    pub(crate) fn new(p: SessionParams) -> Self {
        let now = Instant::now();
        Session {
            id: p.id,
            version: p.version,
            cipher_suite: p.cipher_suite,
            peer_certificates: p.peer_certificates,
            local_certificates: p.local_certificates,
            peer_host: p.peer_host,
            peer_port: p.peer_port,
            server_name: p.server_name,
            application_protocol: p.application_protocol,
            max_fragment_len: p.max_fragment_len.unwrap_or(DEFAULT_MAX_FRAGMENT),
            created: now,
            last_accessed: Mutex::new(now),
            valid: AtomicBool::new(true),
            master_secret: p.master_secret,
        }
    }

    /// Session identifier, 0 to 32 bytes. Empty sessions cannot be resumed.
    pub fn id(&self) -> &[u8] {
        &self.id
    }

    pub fn protocol_version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn cipher_suite(&self) -> CipherSuite {
        self.cipher_suite
    }

    /// Chain the peer presented, end-entity first. `None` when the peer did
    /// not authenticate.
    pub fn peer_certificates(&self) -> Option<&[Vec<u8>]> {
        self.peer_certificates.as_deref()
    }

    pub fn local_certificates(&self) -> &[Vec<u8>] {
        &self.local_certificates
    }

    pub fn peer_host(&self) -> Option<&str> {
        self.peer_host.as_deref()
    }

    pub fn peer_port(&self) -> Option<u16> {
        self.peer_port
    }

    pub fn server_name(&self) -> Option<&str> {
        self.server_name.as_deref()
    }

    pub fn application_protocol(&self) -> Option<&str> {
        self.application_protocol.as_deref()
    }

    /// Largest plaintext carried in one record.
    pub fn max_fragment_len(&self) -> usize {
        self.max_fragment_len
    }

    /// Destination size that always holds the plaintext of one record.
    pub fn application_buffer_size(&self) -> usize {
        self.max_fragment_len
    }

    /// Buffer size that always holds one wire record.
    pub fn packet_buffer_size(&self) -> usize {
        HEADER_LEN + self.max_fragment_len + (MAX_CIPHERTEXT_LEN - MAX_PLAINTEXT_LEN)
    }

    pub fn creation_time(&self) -> Instant {
        self.created
    }

    pub fn last_accessed_time(&self) -> Instant {
        match self.last_accessed.lock() {
            Ok(t) => *t,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub(crate) fn touch(&self) {
        match self.last_accessed.lock() {
            Ok(mut t) => *t = Instant::now(),
            Err(poisoned) => *poisoned.into_inner() = Instant::now(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// Mark the session unusable for resumption.
    pub fn invalidate(&self) {
        if self.valid.swap(false, Ordering::AcqRel) {
            debug!("Invalidate session {}", hex(&self.id));
        }
    }

    pub(crate) fn master_secret(&self) -> &[u8; MASTER_SECRET_LEN] {
        &self.master_secret
    }

    /// Whether the session may be resumed for a peer.
    pub(crate) fn is_resumable(&self) -> bool {
        self.is_valid() && !self.id.is_empty()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &hex(&self.id))
            .field("version", &self.version)
            .field("cipher_suite", &self.cipher_suite)
            .field("peer_host", &self.peer_host)
            .field("peer_port", &self.peer_port)
            .field("server_name", &self.server_name)
            .field("application_protocol", &self.application_protocol)
            .field("valid", &self.is_valid())
            .finish()
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// What has been negotiated so far in a handshake that is in progress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandshakeSession {
    pub role: Option<Role>,
    pub session_id: Vec<u8>,
    pub version: Option<ProtocolVersion>,
    pub cipher_suite: Option<CipherSuite>,
    pub peer_host: Option<String>,
    pub peer_port: Option<u16>,
    pub server_name: Option<String>,
    pub application_protocol: Option<String>,
    pub peer_certificates: Option<Vec<Vec<u8>>>,
    pub local_certificates: Vec<Vec<u8>>,
    /// Whether this handshake resumes an earlier session.
    pub resumed: bool,
}

/// Storage for sessions that may be resumed.
///
/// Implementations are shared between engines and must synchronize
/// internally.
pub trait SessionCache: Send + Sync + fmt::Debug {
    /// Look a session up by id. Expired or invalidated sessions are not
    /// returned.
    fn get(&self, id: &[u8]) -> Option<Arc<Session>>;

    /// The most recently used session for a peer, for clients offering
    /// resumption.
    fn get_for_peer(&self, host: &str, port: u16) -> Option<Arc<Session>>;

    fn put(&self, session: Arc<Session>);

    fn remove(&self, id: &[u8]);
}

/// In-memory [`SessionCache`] with a timeout and a size limit.
///
/// Sessions older than the timeout are dropped on access. When the cache
/// is full, the least recently accessed session is evicted.
pub struct MemorySessionCache {
    timeout: Option<Duration>,
    max_size: usize,
    sessions: Mutex<HashMap<Vec<u8>, Arc<Session>>>,
}

impl MemorySessionCache {
    /// `timeout` of `None` keeps sessions until evicted. A `max_size` of 0
    /// means unbounded.
    pub fn new(timeout: Option<Duration>, max_size: usize) -> Self {
        MemorySessionCache {
            timeout,
            max_size,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.with_sessions(|s| s.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_sessions<R>(&self, f: impl FnOnce(&mut HashMap<Vec<u8>, Arc<Session>>) -> R) -> R {
        match self.sessions.lock() {
            Ok(mut s) => f(&mut s),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    fn is_live(&self, session: &Session, now: Instant) -> bool {
        let fresh = match self.timeout {
            Some(t) => now.saturating_duration_since(session.creation_time()) < t,
            None => true,
        };
        fresh && session.is_valid()
    }
}

impl Default for MemorySessionCache {
    /// 24 hours, unbounded.
    fn default() -> Self {
        Self::new(Some(Duration::from_secs(24 * 60 * 60)), 0)
    }
}

impl SessionCache for MemorySessionCache {
    fn get(&self, id: &[u8]) -> Option<Arc<Session>> {
        let now = Instant::now();
        self.with_sessions(|sessions| {
            let session = sessions.get(id)?.clone();
            if !self.is_live(&session, now) {
                trace!("Drop expired session {}", hex(id));
                sessions.remove(id);
                return None;
            }
            session.touch();
            Some(session)
        })
    }

    fn get_for_peer(&self, host: &str, port: u16) -> Option<Arc<Session>> {
        let now = Instant::now();
        self.with_sessions(|sessions| {
            sessions.retain(|_, s| self.is_live(s, now));
            let session = sessions
                .values()
                .filter(|s| s.peer_host() == Some(host) && s.peer_port() == Some(port))
                .max_by_key(|s| s.last_accessed_time())?
                .clone();
            session.touch();
            Some(session)
        })
    }

    fn put(&self, session: Arc<Session>) {
        if !session.is_resumable() {
            return;
        }
        let now = Instant::now();
        self.with_sessions(|sessions| {
            sessions.retain(|_, s| self.is_live(s, now));
            sessions.insert(session.id().to_vec(), session);

            while self.max_size > 0 && sessions.len() > self.max_size {
                let oldest = sessions
                    .iter()
                    .min_by_key(|(_, s)| s.last_accessed_time())
                    .map(|(id, _)| id.clone());
                match oldest {
                    Some(id) => {
                        trace!("Evict session {}", hex(&id));
                        sessions.remove(&id);
                    }
                    None => break,
                }
            }
        });
    }

    fn remove(&self, id: &[u8]) {
        self.with_sessions(|sessions| {
            sessions.remove(id);
        });
    }
}

impl fmt::Debug for MemorySessionCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySessionCache")
            .field("timeout", &self.timeout)
            .field("max_size", &self.max_size)
            .field("len", &self.len())
            .finish()
    }
}
