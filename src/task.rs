//! Delegated tasks.
//!
//! Steps that may be slow or need to call out to application code (trust
//! decisions, credential lookup, signing and signature verification) are
//! not run inside `wrap`/`unwrap`. The handshake queues them as a
//! [`DelegatedTask`] and reports `NeedTask`. The application takes tasks
//! with [`TlsEngine::delegated_task`](crate::TlsEngine::delegated_task),
//! runs them on any thread, and calls `wrap`/`unwrap` again.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

use crate::trust::Credentials;
use crate::Error;

/// What a delegated task does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Client: trust decision on the server certificate chain.
    VerifyServerChain,
    /// Client: check the ServerKeyExchange signature.
    VerifyServerKeyExchange,
    /// Client: pick a certificate in answer to a CertificateRequest.
    ChooseClientCredentials,
    /// Client: sign the handshake transcript for CertificateVerify.
    SignCertificateVerify,
    /// Server: pick a certificate for the negotiated suite.
    ChooseServerCredentials,
    /// Server: sign the ECDH parameters.
    SignServerKeyExchange,
    /// Server: trust decision on the client certificate chain.
    VerifyClientChain,
    /// Server: check the client's CertificateVerify.
    VerifyCertificateVerify,
}

/// Result of the work inside a task.
#[derive(Debug)]
pub(crate) enum TaskOutput {
    /// A check passed.
    Verified,
    /// Credential lookup finished. `None` means nothing suitable.
    Credentials(Option<Credentials>),
    /// A signature was produced.
    Signature(Vec<u8>),
}

pub(crate) type TaskOutcome = Result<TaskOutput, Error>;

type Work = Box<dyn FnOnce() -> TaskOutcome + Send>;

/// An outcome on its way back to the engine.
#[derive(Debug)]
pub(crate) struct Completion {
    pub generation: u64,
    pub kind: TaskKind,
    pub outcome: TaskOutcome,
}

/// A unit of deferred handshake work.
///
/// Running it delivers the outcome to the engine that created it. Dropping
/// it without running delivers an abandonment, which fails the handshake.
pub struct DelegatedTask {
    kind: TaskKind,
    generation: u64,
    work: Option<Work>,
    sink: Sender<Completion>,
    delivered: Arc<AtomicUsize>,
}

impl DelegatedTask {
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Execute the task. May be called on any thread.
    pub fn run(mut self) {
        if let Some(work) = self.work.take() {
            let outcome = work();
            self.deliver(outcome);
        }
    }

    fn deliver(&self, outcome: TaskOutcome) {
        let completion = Completion {
            generation: self.generation,
            kind: self.kind,
            outcome,
        };
        // The engine may be gone already.
        let _ = self.sink.send(completion);
        self.delivered.fetch_add(1, Ordering::AcqRel);
    }
}

impl Drop for DelegatedTask {
    fn drop(&mut self) {
        if self.work.take().is_some() {
            self.deliver(Err(Error::TaskAbandoned));
        }
    }
}

impl fmt::Debug for DelegatedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegatedTask")
            .field("kind", &self.kind)
            .field("generation", &self.generation)
            .finish()
    }
}

/// FIFO of tasks handed out by the engine, plus the channel their outcomes
/// come back on.
pub(crate) struct TaskQueue {
    queue: VecDeque<DelegatedTask>,
    sink: Sender<Completion>,
    source: Receiver<Completion>,
    /// Tasks created in this generation.
    created: usize,
    /// Outcomes taken off the channel in this generation.
    processed: usize,
    /// Outcomes sent by tasks of this generation.
    delivered: Arc<AtomicUsize>,
    /// Bumped when the queue is reset, so late outcomes can be told apart.
    generation: u64,
}

impl TaskQueue {
    pub fn new() -> Self {
        let (sink, source) = channel();
        TaskQueue {
            queue: VecDeque::new(),
            sink,
            source,
            created: 0,
            processed: 0,
            delivered: Arc::new(AtomicUsize::new(0)),
            generation: 0,
        }
    }

    pub fn push<F>(&mut self, kind: TaskKind, work: F)
    where
        F: FnOnce() -> TaskOutcome + Send + 'static,
    {
        trace!("Queue delegated task {:?}", kind);
        self.queue.push_back(DelegatedTask {
            kind,
            generation: self.generation,
            work: Some(Box::new(work)),
            sink: self.sink.clone(),
            delivered: self.delivered.clone(),
        });
        self.created += 1;
    }

    pub fn pop(&mut self) -> Option<DelegatedTask> {
        self.queue.pop_front()
    }

    /// Whether every task created has had its outcome collected.
    pub fn is_idle(&self) -> bool {
        self.processed == self.created
    }

    /// Whether some task is still queued or running.
    pub fn is_running(&self) -> bool {
        self.delivered.load(Ordering::Acquire) < self.created
    }

    /// Whether outcomes are waiting to be collected.
    pub fn has_completions(&self) -> bool {
        self.delivered.load(Ordering::Acquire) > self.processed
    }

    /// Collect every outcome that arrived so far, oldest first.
    pub fn completed(&mut self) -> Vec<(TaskKind, TaskOutcome)> {
        let mut done = Vec::new();
        while let Ok(c) = self.source.try_recv() {
            if c.generation != self.generation {
                trace!("Discard stale outcome of {:?}", c.kind);
                continue;
            }
            self.processed += 1;
            done.push((c.kind, c.outcome));
        }
        done
    }

    /// Forget all queued and running tasks.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.queue.clear();
        self.created = 0;
        self.processed = 0;
        self.delivered = Arc::new(AtomicUsize::new(0));
        // Drain the abandonments the cleared tasks just sent.
        while self.source.try_recv().is_ok() {}
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("queued", &self.queue.len())
            .field("created", &self.created)
            .field("processed", &self.processed)
            .finish()
    }
}
