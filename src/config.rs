use std::fmt;
use std::sync::Arc;

use crate::crypto::rust_crypto;
use crate::crypto::CryptoProvider;
use crate::message::extensions::MaxFragmentLength;
use crate::negotiate::{AlpnSelector, SniMatcher};
use crate::session::{MemorySessionCache, SessionCache};
use crate::trust::{ClientAuth, KeyManager, TrustManager};
use crate::types::{CipherSuite, ProtocolVersion};
use crate::Error;

/// Records sealed under one write key before new keys are negotiated.
pub const DEFAULT_AEAD_ENCRYPTION_LIMIT: u64 = 1 << 48;

/// TLS configuration.
///
/// Immutable once built and shared between engines as `Arc<Config>`.
#[derive(Clone)]
pub struct Config {
    crypto_provider: CryptoProvider,
    cipher_suites: Vec<CipherSuite>,
    min_version: ProtocolVersion,
    max_version: ProtocolVersion,
    prefer_local_cipher_order: bool,
    client_auth: ClientAuth,
    alpn_protocols: Vec<String>,
    alpn_selector: Option<Arc<dyn AlpnSelector>>,
    server_name: Option<String>,
    sni_matchers: Vec<SniMatcher>,
    max_fragment_length: Option<MaxFragmentLength>,
    endpoint_identification: Option<String>,
    allow_renegotiation: bool,
    aead_encryption_limit: u64,
    key_manager: Option<Arc<dyn KeyManager>>,
    trust_manager: Option<Arc<dyn TrustManager>>,
    session_cache: Arc<dyn SessionCache>,
}

impl Config {
    /// Create a new configuration builder.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder {
            crypto_provider: None,
            cipher_suites: None,
            min_version: ProtocolVersion::TLS1_2,
            max_version: ProtocolVersion::TLS1_2,
            prefer_local_cipher_order: false,
            client_auth: ClientAuth::None,
            alpn_protocols: Vec::new(),
            alpn_selector: None,
            server_name: None,
            sni_matchers: Vec::new(),
            max_fragment_length: None,
            endpoint_identification: None,
            allow_renegotiation: true,
            aead_encryption_limit: DEFAULT_AEAD_ENCRYPTION_LIMIT,
            key_manager: None,
            trust_manager: None,
            session_cache: None,
        }
    }

    /// Cryptographic provider.
    ///
    /// Provides ciphers, key exchange, signing, verification and randomness.
    #[inline(always)]
    pub fn crypto_provider(&self) -> &CryptoProvider {
        &self.crypto_provider
    }

    /// Cipher suites enabled for new engines, in local preference order.
    #[inline(always)]
    pub fn cipher_suites(&self) -> &[CipherSuite] {
        &self.cipher_suites
    }

    /// Lowest protocol version enabled for new engines.
    #[inline(always)]
    pub fn min_version(&self) -> ProtocolVersion {
        self.min_version
    }

    /// Highest protocol version enabled for new engines.
    #[inline(always)]
    pub fn max_version(&self) -> ProtocolVersion {
        self.max_version
    }

    /// Versions between [`min_version`](Self::min_version) and
    /// [`max_version`](Self::max_version), lowest first.
    pub fn protocols(&self) -> Vec<ProtocolVersion> {
        ProtocolVersion::supported()
            .iter()
            .copied()
            .filter(|v| *v >= self.min_version && *v <= self.max_version)
            .collect()
    }

    /// For a server, pick the cipher suite by local preference instead of
    /// the client's.
    #[inline(always)]
    pub fn prefer_local_cipher_order(&self) -> bool {
        self.prefer_local_cipher_order
    }

    /// For a server, whether to request a client certificate.
    #[inline(always)]
    pub fn client_auth(&self) -> ClientAuth {
        self.client_auth
    }

    /// Application protocols. Offered by a client, accepted by a server, in
    /// preference order.
    #[inline(always)]
    pub fn alpn_protocols(&self) -> &[String] {
        &self.alpn_protocols
    }

    /// Server side ALPN selector. Replaces the default selection entirely.
    #[inline(always)]
    pub fn alpn_selector(&self) -> Option<&dyn AlpnSelector> {
        self.alpn_selector.as_deref()
    }

    /// For a client, the host name sent in SNI instead of the peer host.
    #[inline(always)]
    pub fn server_name(&self) -> Option<&str> {
        self.server_name.as_deref()
    }

    /// For a server, the host names accepted in SNI. Empty accepts any.
    #[inline(always)]
    pub fn sni_matchers(&self) -> &[SniMatcher] {
        &self.sni_matchers
    }

    /// Maximum fragment length. Requested by a client, and the local limit
    /// of a server.
    #[inline(always)]
    pub fn max_fragment_length(&self) -> Option<MaxFragmentLength> {
        self.max_fragment_length
    }

    /// Endpoint identification algorithm handed to the trust manager.
    #[inline(always)]
    pub fn endpoint_identification(&self) -> Option<&str> {
        self.endpoint_identification.as_deref()
    }

    /// Whether renegotiation is permitted, both initiated locally and
    /// requested by the peer.
    #[inline(always)]
    pub fn allow_renegotiation(&self) -> bool {
        self.allow_renegotiation
    }

    /// Records sealed under one write key before a renegotiation is forced.
    #[inline(always)]
    pub fn aead_encryption_limit(&self) -> u64 {
        self.aead_encryption_limit
    }

    #[inline(always)]
    pub fn key_manager(&self) -> Option<&Arc<dyn KeyManager>> {
        self.key_manager.as_ref()
    }

    #[inline(always)]
    pub fn trust_manager(&self) -> Option<&Arc<dyn TrustManager>> {
        self.trust_manager.as_ref()
    }

    #[inline(always)]
    pub fn session_cache(&self) -> &Arc<dyn SessionCache> {
        &self.session_cache
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("cipher_suites", &self.cipher_suites)
            .field("min_version", &self.min_version)
            .field("max_version", &self.max_version)
            .field("prefer_local_cipher_order", &self.prefer_local_cipher_order)
            .field("client_auth", &self.client_auth)
            .field("alpn_protocols", &self.alpn_protocols)
            .field("alpn_selector", &self.alpn_selector.is_some())
            .field("server_name", &self.server_name)
            .field("sni_matchers", &self.sni_matchers)
            .field("max_fragment_length", &self.max_fragment_length)
            .field("allow_renegotiation", &self.allow_renegotiation)
            .field("aead_encryption_limit", &self.aead_encryption_limit)
            .field("key_manager", &self.key_manager)
            .field("trust_manager", &self.trust_manager)
            .field("session_cache", &self.session_cache)
            .finish()
    }
}

/// Builder for TLS configuration.
pub struct ConfigBuilder {
    crypto_provider: Option<CryptoProvider>,
    cipher_suites: Option<Vec<CipherSuite>>,
    min_version: ProtocolVersion,
    max_version: ProtocolVersion,
    prefer_local_cipher_order: bool,
    client_auth: ClientAuth,
    alpn_protocols: Vec<String>,
    alpn_selector: Option<Arc<dyn AlpnSelector>>,
    server_name: Option<String>,
    sni_matchers: Vec<SniMatcher>,
    max_fragment_length: Option<MaxFragmentLength>,
    endpoint_identification: Option<String>,
    allow_renegotiation: bool,
    aead_encryption_limit: u64,
    key_manager: Option<Arc<dyn KeyManager>>,
    trust_manager: Option<Arc<dyn TrustManager>>,
    session_cache: Option<Arc<dyn SessionCache>>,
}

impl ConfigBuilder {
    /// Set a custom crypto provider.
    ///
    /// Defaults to [`rust_crypto::default_provider`].
    pub fn with_crypto_provider(mut self, provider: CryptoProvider) -> Self {
        self.crypto_provider = Some(provider);
        self
    }

    /// Set the enabled cipher suites in preference order.
    ///
    /// Defaults to every suite the provider supports.
    pub fn cipher_suites(mut self, suites: &[CipherSuite]) -> Self {
        self.cipher_suites = Some(suites.to_vec());
        self
    }

    /// Set the enabled protocol version range.
    ///
    /// Defaults to TLS 1.2 only.
    pub fn protocol_versions(mut self, min: ProtocolVersion, max: ProtocolVersion) -> Self {
        self.min_version = min;
        self.max_version = max;
        self
    }

    /// Set whether a server picks the cipher suite in its own order.
    ///
    /// Defaults to false.
    pub fn prefer_local_cipher_order(mut self, prefer: bool) -> Self {
        self.prefer_local_cipher_order = prefer;
        self
    }

    /// Set whether a server requests a client certificate.
    ///
    /// Defaults to [`ClientAuth::None`].
    pub fn client_auth(mut self, client_auth: ClientAuth) -> Self {
        self.client_auth = client_auth;
        self
    }

    /// Set the application protocols in preference order.
    ///
    /// Defaults to none, which disables ALPN.
    pub fn alpn_protocols<S: AsRef<str>>(mut self, protocols: &[S]) -> Self {
        self.alpn_protocols = protocols.iter().map(|p| p.as_ref().to_string()).collect();
        self
    }

    /// Register a server side ALPN selector.
    pub fn alpn_selector(mut self, selector: impl AlpnSelector + 'static) -> Self {
        self.alpn_selector = Some(Arc::new(selector));
        self
    }

    /// Set the SNI host a client sends. Defaults to the engine's peer host.
    pub fn server_name(mut self, host: &str) -> Self {
        self.server_name = Some(host.to_string());
        self
    }

    /// Add a host name pattern a server accepts in SNI.
    pub fn sni_matcher(mut self, pattern: &str) -> Self {
        self.sni_matchers.push(SniMatcher::new(pattern));
        self
    }

    /// Set the maximum fragment length.
    ///
    /// Defaults to none, meaning 2^14 bytes.
    pub fn max_fragment_length(mut self, len: MaxFragmentLength) -> Self {
        self.max_fragment_length = Some(len);
        self
    }

    /// Set the endpoint identification algorithm, e.g. `"HTTPS"`.
    pub fn endpoint_identification(mut self, algorithm: &str) -> Self {
        self.endpoint_identification = Some(algorithm.to_string());
        self
    }

    /// Set whether renegotiation is permitted.
    ///
    /// Defaults to true. Only secure renegotiation (RFC 5746) is ever done.
    pub fn allow_renegotiation(mut self, allow: bool) -> Self {
        self.allow_renegotiation = allow;
        self
    }

    /// Set how many records may be sealed under one write key.
    ///
    /// Once reached, the engine renegotiates before sending more
    /// application data, or fails with [`Error::AeadLimitReached`] when
    /// secure renegotiation is not available. Defaults to
    /// [`DEFAULT_AEAD_ENCRYPTION_LIMIT`].
    pub fn aead_encryption_limit(mut self, records: u64) -> Self {
        self.aead_encryption_limit = records;
        self
    }

    pub fn key_manager(mut self, key_manager: Arc<dyn KeyManager>) -> Self {
        self.key_manager = Some(key_manager);
        self
    }

    pub fn trust_manager(mut self, trust_manager: Arc<dyn TrustManager>) -> Self {
        self.trust_manager = Some(trust_manager);
        self
    }

    /// Set the session cache.
    ///
    /// Defaults to a [`MemorySessionCache`] private to this config.
    pub fn session_cache(mut self, cache: Arc<dyn SessionCache>) -> Self {
        self.session_cache = Some(cache);
        self
    }

    /// Build the configuration.
    ///
    /// Returns `Error::Config` if the provider is invalid, a suite is not
    /// served by the provider, or the version range is empty.
    pub fn build(self) -> Result<Config, Error> {
        let crypto_provider = self
            .crypto_provider
            .unwrap_or_else(rust_crypto::default_provider);

        // Always validate the crypto provider
        crypto_provider.validate()?;

        let cipher_suites = match self.cipher_suites {
            Some(suites) => {
                check_cipher_suites(&crypto_provider, &suites)?;
                suites
            }
            None => crypto_provider.supported_cipher_suites().collect(),
        };

        check_versions(&[self.min_version, self.max_version])?;
        if self.min_version > self.max_version {
            return Err(Error::Config(format!(
                "empty version range {} to {}",
                self.min_version.name(),
                self.max_version.name()
            )));
        }

        for p in &self.alpn_protocols {
            if p.is_empty() || p.len() > 255 {
                return Err(Error::Config(format!("invalid ALPN protocol {:?}", p)));
            }
        }

        if self.aead_encryption_limit < 2 {
            return Err(Error::Config(format!(
                "key limit of {} records leaves no room for application data",
                self.aead_encryption_limit
            )));
        }

        let session_cache = self
            .session_cache
            .unwrap_or_else(|| Arc::new(MemorySessionCache::default()));

        Ok(Config {
            crypto_provider,
            cipher_suites,
            min_version: self.min_version,
            max_version: self.max_version,
            prefer_local_cipher_order: self.prefer_local_cipher_order,
            client_auth: self.client_auth,
            alpn_protocols: self.alpn_protocols,
            alpn_selector: self.alpn_selector,
            server_name: self.server_name,
            sni_matchers: self.sni_matchers,
            max_fragment_length: self.max_fragment_length,
            endpoint_identification: self.endpoint_identification,
            allow_renegotiation: self.allow_renegotiation,
            aead_encryption_limit: self.aead_encryption_limit,
            key_manager: self.key_manager,
            trust_manager: self.trust_manager,
            session_cache,
        })
    }
}

/// Every suite must be known and served by the provider.
pub(crate) fn check_cipher_suites(
    provider: &CryptoProvider,
    suites: &[CipherSuite],
) -> Result<(), Error> {
    if suites.is_empty() {
        return Err(Error::Config("no cipher suites enabled".into()));
    }
    for s in suites {
        if provider.find_cipher_suite(*s).is_none() {
            return Err(Error::Config(format!("unsupported cipher suite {}", s)));
        }
    }
    Ok(())
}

/// Every version must be one the engine speaks.
pub(crate) fn check_versions(versions: &[ProtocolVersion]) -> Result<(), Error> {
    if versions.is_empty() {
        return Err(Error::Config("no protocol versions enabled".into()));
    }
    for v in versions {
        if !v.is_supported() {
            return Err(Error::Config(format!("unsupported protocol version {}", v)));
        }
    }
    Ok(())
}

impl Default for Config {
    fn default() -> Self {
        Config::builder()
            .build()
            .expect("Default config should always validate")
    }
}
