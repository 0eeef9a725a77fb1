//! Record plumbing shared by the client and server handshakes.
//!
//! [`Engine`] owns the record codec, the queue of encoded records waiting
//! for `wrap`, the handshake reassembly buffer and transcript, the keys
//! waiting for a change-cipher-spec, and the delegated task queue.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::buffer::{Buf, BufferPool};
use crate::crypto::prf::transcript_hash;
use crate::crypto::SecureRandom;
use crate::message::{Alert, Body, Handshake, HandshakeReader};
use crate::record::{CipherSpec, RecordCodec, MAX_PLAINTEXT_LEN};
use crate::task::TaskQueue;
use crate::types::{ContentType, HandshakeType, HashAlgorithm, ProtocolVersion, Role};
use crate::{Config, Error};

/// Payload of a change-cipher-spec record.
const CHANGE_CIPHER_SPEC: u8 = 1;

/// A handshake message taken off the reassembly buffer.
#[derive(Debug)]
pub(crate) struct Incoming {
    pub handshake: Handshake,
    /// Transcript length before this message was added.
    pub transcript_before: usize,
}

/// A record waiting in the output queue.
struct Outgoing {
    record: Buf,
    /// Unprotected handshake record, safe to drop when the handshake is
    /// abandoned.
    discardable: bool,
}

pub(crate) struct Engine {
    config: Arc<Config>,

    role: Role,

    record: RecordCodec,

    /// Pool of buffers
    buffers_free: BufferPool,

    /// Encoded records waiting for wrap.
    queue_tx: VecDeque<Outgoing>,

    /// Reassembly of handshake messages.
    reader: HandshakeReader,

    /// Every handshake message of the current handshake, as sent and
    /// received, except HelloRequest.
    transcript: Buf,

    /// Whether the current handshake state accepts a change-cipher-spec.
    expect_ccs: bool,

    /// Keys that take effect at the next change-cipher-spec.
    pending_read: Option<CipherSpec>,
    pending_write: Option<CipherSpec>,

    /// Plaintext bytes per outgoing record.
    max_fragment: usize,

    tasks: TaskQueue,
}

impl Engine {
    pub fn new(config: Arc<Config>, role: Role) -> Self {
        Engine {
            config,
            role,
            record: RecordCodec::new(),
            buffers_free: BufferPool::default(),
            queue_tx: VecDeque::new(),
            reader: HandshakeReader::new(),
            transcript: Buf::new(),
            expect_ccs: false,
            pending_read: None,
            pending_write: None,
            max_fragment: MAX_PLAINTEXT_LEN,
            tasks: TaskQueue::new(),
        }
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn set_role(&mut self, role: Role) {
        self.role = role;
    }

    pub fn rng(&self) -> &'static dyn SecureRandom {
        self.config.crypto_provider().secure_random
    }

    pub fn record(&self) -> &RecordCodec {
        &self.record
    }

    pub fn tasks(&self) -> &TaskQueue {
        &self.tasks
    }

    pub fn tasks_mut(&mut self) -> &mut TaskQueue {
        &mut self.tasks
    }

    /// Version written into record headers from now on.
    pub fn set_version(&mut self, version: ProtocolVersion) {
        self.record.set_version(version);
    }

    /// Plaintext limit for both directions.
    pub fn set_max_fragment(&mut self, len: usize) {
        self.max_fragment = len.min(MAX_PLAINTEXT_LEN);
        self.record.set_max_plaintext(self.max_fragment);
    }

    pub fn max_fragment(&self) -> usize {
        self.max_fragment
    }

    // Outgoing

    pub fn has_output(&self) -> bool {
        !self.queue_tx.is_empty()
    }

    pub fn peek_output(&self) -> Option<&Buf> {
        self.queue_tx.front().map(|o| &o.record)
    }

    pub fn pop_output(&mut self) -> Option<Buf> {
        self.queue_tx.pop_front().map(|o| o.record)
    }

    /// Drop plaintext handshake records at the tail of the output queue.
    ///
    /// Protected records and everything before them stay, since the peer's
    /// sequence numbers count them.
    pub fn discard_handshake_output(&mut self) {
        let mut dropped = 0;
        while self.queue_tx.back().is_some_and(|o| o.discardable) {
            if let Some(o) = self.queue_tx.pop_back() {
                self.buffers_free.push(o.record);
                dropped += 1;
            }
        }
        if dropped > 0 {
            debug!("Discarded {} queued handshake records", dropped);
        }
    }

    pub fn recycle(&mut self, buf: Buf) {
        self.buffers_free.push(buf);
    }

    fn queue_record(&mut self, content_type: ContentType, fragment: &[u8]) -> Result<(), Error> {
        let discardable =
            content_type == ContentType::Handshake && !self.record.is_write_protected();

        let mut record = self.buffers_free.pop();
        self.record.encode(content_type, fragment, &mut record)?;
        self.queue_tx.push_back(Outgoing {
            record,
            discardable,
        });
        Ok(())
    }

    /// Serialize a handshake message, add it to the transcript and queue it
    /// in as many records as the fragment limit requires.
    pub fn send_handshake(&mut self, body: &Body) -> Result<(), Error> {
        debug!("Send {:?}", body.msg_type());

        let mut message = self.buffers_free.pop();
        Handshake::serialize_body(body, &mut message);

        if body.msg_type() != HandshakeType::HelloRequest {
            self.transcript.extend_from_slice(&message);
        }

        for chunk in message.chunks(self.max_fragment) {
            self.queue_record(ContentType::Handshake, chunk)?;
        }

        self.buffers_free.push(message);
        Ok(())
    }

    /// Queue a change-cipher-spec and switch the write direction to the
    /// pending keys.
    pub fn send_change_cipher_spec(&mut self) -> Result<(), Error> {
        let spec = self
            .pending_write
            .take()
            .ok_or_else(|| Error::Crypto("change cipher spec without write keys".into()))?;

        debug!("Send ChangeCipherSpec");
        self.queue_record(ContentType::ChangeCipherSpec, &[CHANGE_CIPHER_SPEC])?;
        self.record.install_write_spec(spec);
        Ok(())
    }

    pub fn send_alert(&mut self, alert: Alert) -> Result<(), Error> {
        debug!("Send alert {:?} {}", alert.level, alert.description);
        let mut body = Buf::new();
        alert.serialize(&mut body);
        self.queue_record(ContentType::Alert, &body)
    }

    /// Encode one application data record directly into `out`.
    pub fn encode_application_data(&mut self, data: &[u8], out: &mut Buf) -> Result<(), Error> {
        self.record.encode(ContentType::ApplicationData, data, out)
    }

    // Incoming

    pub fn decode_record(&mut self, record: &[u8]) -> Result<(ContentType, Buf), Error> {
        self.record.decode(record)
    }

    pub fn push_handshake_fragment(&mut self, fragment: &[u8]) {
        self.reader.push(fragment);
    }

    /// Whether bytes of a handshake message are waiting.
    pub fn has_handshake_input(&self) -> bool {
        !self.reader.is_empty()
    }

    /// Type of the next buffered handshake message, once its header arrived.
    pub fn peek_handshake_type(&self) -> Option<HandshakeType> {
        self.reader.peek_type()
    }

    /// Take the next complete message off the reassembly buffer without
    /// processing it.
    pub fn skip_handshake(&mut self) -> Result<Option<HandshakeType>, Error> {
        let Some(raw) = self.reader.next_message()? else {
            return Ok(None);
        };
        Ok(raw.first().map(|t| HandshakeType::from_u8(*t)))
    }

    /// Next handshake message, if a complete one is buffered.
    ///
    /// A message whose type is not in `expected` is fatal. A client skips
    /// HelloRequest here, since a handshake is already in progress.
    pub fn next_handshake(
        &mut self,
        expected: &[HandshakeType],
    ) -> Result<Option<Incoming>, Error> {
        loop {
            let Some(msg_type) = self.reader.peek_type() else {
                return Ok(None);
            };

            if self.expect_ccs {
                return Err(Error::UnexpectedMessage(format!(
                    "{:?} before ChangeCipherSpec",
                    msg_type
                )));
            }

            if msg_type == HandshakeType::HelloRequest && self.role == Role::Client {
                if self.skip_handshake()?.is_some() {
                    debug!("Ignore HelloRequest during handshake");
                    continue;
                }
                return Ok(None);
            }

            if !expected.contains(&msg_type) {
                return Err(Error::UnexpectedMessage(format!(
                    "{:?}, expected {:?}",
                    msg_type, expected
                )));
            }

            let Some(raw) = self.reader.next_message()? else {
                return Ok(None);
            };

            let handshake = Handshake::parse(&raw)?;
            debug!("Received {:?}", msg_type);

            let transcript_before = self.transcript.len();
            if msg_type != HandshakeType::HelloRequest {
                self.transcript.extend_from_slice(&raw);
            }

            return Ok(Some(Incoming {
                handshake,
                transcript_before,
            }));
        }
    }

    /// Handle a change-cipher-spec record.
    pub fn receive_change_cipher_spec(&mut self, payload: &[u8]) -> Result<(), Error> {
        if payload != [CHANGE_CIPHER_SPEC] {
            return Err(Error::DecodeError("ChangeCipherSpec".into()));
        }
        if !self.expect_ccs || self.has_handshake_input() {
            return Err(Error::UnexpectedMessage("ChangeCipherSpec".into()));
        }
        let spec = self
            .pending_read
            .take()
            .ok_or_else(|| Error::UnexpectedMessage("ChangeCipherSpec before keys".into()))?;

        debug!("Received ChangeCipherSpec");
        self.record.install_read_spec(spec);
        self.expect_ccs = false;
        Ok(())
    }

    /// Allow the next record to be a change-cipher-spec.
    pub fn expect_change_cipher_spec(&mut self) {
        self.expect_ccs = true;
    }

    pub fn set_pending_specs(&mut self, read: CipherSpec, write: CipherSpec) {
        self.pending_read = Some(read);
        self.pending_write = Some(write);
    }

    // Transcript

    pub fn transcript(&self) -> &[u8] {
        &self.transcript
    }

    pub fn transcript_hash(&self, hash: HashAlgorithm) -> Vec<u8> {
        transcript_hash(hash, &self.transcript)
    }

    /// Forget everything belonging to the handshake in progress. Keys in use
    /// and the records already queued stay.
    pub fn reset_handshake(&mut self) {
        self.transcript.clear();
        self.expect_ccs = false;
        self.pending_read = None;
        self.pending_write = None;
        self.tasks.reset();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("role", &self.role)
            .field("record", &self.record)
            .field("queue_tx", &self.queue_tx.len())
            .field("expect_ccs", &self.expect_ccs)
            .field("max_fragment", &self.max_fragment)
            .field("tasks", &self.tasks)
            .finish()
    }
}
