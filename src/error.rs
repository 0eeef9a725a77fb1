use thiserror::Error;

use crate::types::{AlertDescription, ProtocolVersion};

/// Errors reported by the engine.
///
/// Usage errors leave the connection untouched. Every other error is fatal:
/// the engine sends the matching alert, if it still can, and reports
/// `Status::Closed` from then on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("client/server mode has not been set")]
    RoleNotSet,

    #[error("client/server mode cannot change once handshaking has begun")]
    RoleChange,

    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("renegotiation is disabled")]
    RenegotiationDisabled,

    #[error("malformed record: {0}")]
    MalformedRecord(&'static str),

    #[error("record length {declared} does not match payload length {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("record overflow: {0} bytes")]
    RecordOverflow(usize),

    #[error("unexpected record version {0}")]
    BadRecordVersion(ProtocolVersion),

    #[error("unexpected message: {0}")]
    UnexpectedMessage(String),

    #[error("failed to decode {0}")]
    DecodeError(String),

    #[error("illegal parameter: {0}")]
    IllegalParameter(String),

    #[error("unsupported extension 0x{0:04x}")]
    UnsupportedExtension(u16),

    #[error("record authentication failed")]
    BadRecordMac,

    #[error("finished verify data mismatch")]
    FinishedMismatch,

    #[error("signature verification failed: {0}")]
    BadSignature(String),

    #[error("record sequence number exhausted")]
    SequenceOverflow,

    #[error("write key reached its record limit and cannot be renewed")]
    AeadLimitReached,

    #[error("no mutually acceptable cipher suite")]
    NoCipherSuite,

    #[error("no mutually acceptable protocol version")]
    NoProtocolVersion,

    #[error("no mutually acceptable key exchange group")]
    NoKeyExchangeGroup,

    #[error("no mutually acceptable application protocol")]
    NoApplicationProtocol,

    #[error("unrecognized server name: {0}")]
    UnrecognizedName(String),

    #[error("handshake failure: {0}")]
    HandshakeFailure(String),

    #[error("peer certificate rejected: {0}")]
    CertificateRejected(String),

    #[error("peer did not provide a required certificate")]
    CertificateRequired,

    #[error("no credentials available for key type {0}")]
    NoCredentials(&'static str),

    #[error("delegated task was dropped without running")]
    TaskAbandoned,

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("received fatal alert: {0}")]
    AlertReceived(AlertDescription),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// API misuse. Not fatal.
    Usage,
    /// Malformed or out-of-sequence input.
    Protocol,
    /// Authentication tag, Finished or signature failure.
    Integrity,
    /// No common version, suite, group or application protocol.
    Negotiation,
    /// Trust decision or credential lookup failed.
    Trust,
    /// The peer sent a fatal alert.
    Remote,
    /// Local failure.
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        use Error::*;
        match self {
            RoleNotSet | RoleChange | InvalidState(_) | Config(_) | RenegotiationDisabled => {
                ErrorKind::Usage
            }
            MalformedRecord(_)
            | LengthMismatch { .. }
            | RecordOverflow(_)
            | BadRecordVersion(_)
            | UnexpectedMessage(_)
            | DecodeError(_)
            | IllegalParameter(_)
            | UnsupportedExtension(_) => ErrorKind::Protocol,
            BadRecordMac | FinishedMismatch | BadSignature(_) | SequenceOverflow => {
                ErrorKind::Integrity
            }
            NoCipherSuite
            | NoProtocolVersion
            | NoKeyExchangeGroup
            | NoApplicationProtocol
            | UnrecognizedName(_)
            | HandshakeFailure(_) => ErrorKind::Negotiation,
            CertificateRejected(_) | CertificateRequired | NoCredentials(_) => ErrorKind::Trust,
            AlertReceived(_) => ErrorKind::Remote,
            TaskAbandoned | AeadLimitReached | Crypto(_) => ErrorKind::Internal,
        }
    }

    /// Whether the error ends the connection.
    pub fn is_fatal(&self) -> bool {
        self.kind() != ErrorKind::Usage
    }

    /// The alert to send to the peer, if any.
    pub(crate) fn alert(&self) -> Option<AlertDescription> {
        use Error::*;
        let alert = match self {
            RoleNotSet | RoleChange | InvalidState(_) | Config(_) | RenegotiationDisabled => {
                return None
            }
            AlertReceived(_) => return None,
            MalformedRecord(_) | DecodeError(_) => AlertDescription::DecodeError,
            LengthMismatch { .. } | RecordOverflow(_) => AlertDescription::RecordOverflow,
            BadRecordVersion(_) | NoProtocolVersion => AlertDescription::ProtocolVersion,
            UnexpectedMessage(_) => AlertDescription::UnexpectedMessage,
            IllegalParameter(_) => AlertDescription::IllegalParameter,
            UnsupportedExtension(_) => AlertDescription::UnsupportedExtension,
            BadRecordMac => AlertDescription::BadRecordMac,
            FinishedMismatch | BadSignature(_) => AlertDescription::DecryptError,
            SequenceOverflow | AeadLimitReached | TaskAbandoned | Crypto(_) => {
                AlertDescription::InternalError
            }
            NoCipherSuite | NoKeyExchangeGroup | HandshakeFailure(_) | NoCredentials(_) => {
                AlertDescription::HandshakeFailure
            }
            NoApplicationProtocol => AlertDescription::NoApplicationProtocol,
            UnrecognizedName(_) => AlertDescription::UnrecognizedName,
            CertificateRejected(_) => AlertDescription::CertificateUnknown,
            CertificateRequired => AlertDescription::BadCertificate,
        };
        Some(alert)
    }
}
