//! Negotiation of version, cipher suite, key exchange group and hello
//! extensions.
//!
//! Everything here is a pure function of local policy and what the peer
//! offered. The handshake calls these and turns the error into an alert.

use std::fmt;

use crate::message::extensions::MaxFragmentLength;
use crate::types::{CipherSuite, NamedGroup, ProtocolVersion};
use crate::Error;

/// Outcome of an [`AlpnSelector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlpnDecision {
    /// Use this protocol. It must be one the client offered.
    Select(String),
    /// Continue without ALPN.
    Decline,
    /// Fail the handshake with `no_application_protocol`.
    Veto,
}

/// Server side application protocol choice.
///
/// When registered, the selector fully replaces the default first-match
/// algorithm. It is only consulted when the client sent ALPN.
pub trait AlpnSelector: Send + Sync {
    fn select(&self, offered: &[String]) -> AlpnDecision;
}

impl<F> AlpnSelector for F
where
    F: Fn(&[String]) -> AlpnDecision + Send + Sync,
{
    fn select(&self, offered: &[String]) -> AlpnDecision {
        self(offered)
    }
}

/// A host name pattern the server accepts in SNI.
///
/// Either an exact name or `*.` followed by a suffix, where the wildcard
/// stands for exactly one label. Comparison is ASCII case-insensitive.
#[derive(Clone, PartialEq, Eq)]
pub struct SniMatcher(String);

impl SniMatcher {
    pub fn new(pattern: &str) -> Self {
        SniMatcher(pattern.to_ascii_lowercase())
    }

    pub fn matches(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        match self.0.strip_prefix("*.") {
            Some(suffix) => match name.split_once('.') {
                Some((label, rest)) => !label.is_empty() && rest == suffix,
                None => false,
            },
            None => name == self.0,
        }
    }
}

impl fmt::Debug for SniMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SniMatcher({})", self.0)
    }
}

/// The versions a TLS 1.2 client implicitly offers: every known version up
/// to its `client_version`.
pub fn offered_versions(client_version: ProtocolVersion) -> Vec<ProtocolVersion> {
    ProtocolVersion::supported()
        .iter()
        .copied()
        .filter(|v| *v <= client_version)
        .collect()
}

/// Highest version inside `[local_min, local_max]` that the peer supports.
pub fn select_version(
    local_min: ProtocolVersion,
    local_max: ProtocolVersion,
    peer_versions: &[ProtocolVersion],
) -> Result<ProtocolVersion, Error> {
    peer_versions
        .iter()
        .copied()
        .filter(|v| v.is_supported() && *v >= local_min && *v <= local_max)
        .max()
        .ok_or(Error::NoProtocolVersion)
}

/// First mutually supported suite usable at `version`.
///
/// The peer's preference order wins unless `prefer_local` is set.
pub fn select_cipher_suite(
    local: &[CipherSuite],
    peer: &[CipherSuite],
    prefer_local: bool,
    version: ProtocolVersion,
) -> Result<CipherSuite, Error> {
    let (primary, secondary) = if prefer_local {
        (local, peer)
    } else {
        (peer, local)
    };

    primary
        .iter()
        .copied()
        .find(|s| secondary.contains(s) && s.is_usable_with(version))
        .ok_or(Error::NoCipherSuite)
}

/// First local group the peer supports. A peer that sent no list is taken
/// to support all of them.
pub fn select_group(local: &[NamedGroup], peer: Option<&[NamedGroup]>) -> Result<NamedGroup, Error> {
    local
        .iter()
        .copied()
        .find(|g| peer.map(|p| p.contains(g)).unwrap_or(true))
        .ok_or(Error::NoKeyExchangeGroup)
}

/// Check the requested SNI host against the configured matchers.
///
/// With no matchers any name is accepted. Returns the accepted name.
pub fn negotiate_server_name(
    requested: Option<&str>,
    matchers: &[SniMatcher],
) -> Result<Option<String>, Error> {
    let Some(name) = requested else {
        return Ok(None);
    };

    if matchers.is_empty() || matchers.iter().any(|m| m.matches(name)) {
        Ok(Some(name.to_string()))
    } else {
        Err(Error::UnrecognizedName(name.to_string()))
    }
}

/// Pick the application protocol.
///
/// Without a selector the first local protocol (in local preference order)
/// that the client offered is chosen, and no overlap means no ALPN.
pub fn negotiate_alpn(
    offered: Option<&[String]>,
    local: &[String],
    selector: Option<&dyn AlpnSelector>,
) -> Result<Option<String>, Error> {
    let Some(offered) = offered else {
        return Ok(None);
    };

    if let Some(selector) = selector {
        return match selector.select(offered) {
            AlpnDecision::Select(p) if offered.contains(&p) => Ok(Some(p)),
            AlpnDecision::Select(p) => {
                debug!("ALPN selector chose {:?}, which was not offered", p);
                Err(Error::NoApplicationProtocol)
            }
            AlpnDecision::Decline => Ok(None),
            AlpnDecision::Veto => Err(Error::NoApplicationProtocol),
        };
    }

    Ok(local.iter().find(|p| offered.contains(p)).cloned())
}

/// The smaller limit wins. A side without a limit uses the 2^14 default,
/// which is larger than every code, so the other side decides.
pub fn negotiate_max_fragment(
    requested: Option<MaxFragmentLength>,
    local_limit: Option<MaxFragmentLength>,
) -> Option<MaxFragmentLength> {
    let requested = requested?;
    Some(match local_limit {
        Some(local) => requested.min(local),
        None => requested,
    })
}
