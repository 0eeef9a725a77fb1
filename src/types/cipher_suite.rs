use std::fmt;

use nom::number::complete::be_u16;
use nom::IResult;

use super::ProtocolVersion;

/// Hash used by a suite's PRF, transcript and Finished computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    SHA256,
    SHA384,
}

impl HashAlgorithm {
    pub fn output_len(&self) -> usize {
        match self {
            HashAlgorithm::SHA256 => 32,
            HashAlgorithm::SHA384 => 48,
        }
    }
}

/// TLS cipher suites known to the engine.
///
/// Only AEAD suites with ephemeral ECDH are recognised. Whether a suite can
/// actually be negotiated depends on the crypto provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum CipherSuite {
    ECDHE_ECDSA_AES128_GCM_SHA256,
    ECDHE_ECDSA_AES256_GCM_SHA384,
    ECDHE_RSA_AES128_GCM_SHA256,
    ECDHE_RSA_AES256_GCM_SHA384,
    ECDHE_ECDSA_CHACHA20_POLY1305_SHA256,
    ECDHE_RSA_CHACHA20_POLY1305_SHA256,
    Unknown(u16),
}

impl CipherSuite {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0xC02B => CipherSuite::ECDHE_ECDSA_AES128_GCM_SHA256,
            0xC02C => CipherSuite::ECDHE_ECDSA_AES256_GCM_SHA384,
            0xC02F => CipherSuite::ECDHE_RSA_AES128_GCM_SHA256,
            0xC030 => CipherSuite::ECDHE_RSA_AES256_GCM_SHA384,
            0xCCA8 => CipherSuite::ECDHE_RSA_CHACHA20_POLY1305_SHA256,
            0xCCA9 => CipherSuite::ECDHE_ECDSA_CHACHA20_POLY1305_SHA256,
            _ => CipherSuite::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CipherSuite::ECDHE_ECDSA_AES128_GCM_SHA256 => 0xC02B,
            CipherSuite::ECDHE_ECDSA_AES256_GCM_SHA384 => 0xC02C,
            CipherSuite::ECDHE_RSA_AES128_GCM_SHA256 => 0xC02F,
            CipherSuite::ECDHE_RSA_AES256_GCM_SHA384 => 0xC030,
            CipherSuite::ECDHE_RSA_CHACHA20_POLY1305_SHA256 => 0xCCA8,
            CipherSuite::ECDHE_ECDSA_CHACHA20_POLY1305_SHA256 => 0xCCA9,
            CipherSuite::Unknown(value) => *value,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], CipherSuite> {
        let (input, value) = be_u16(input)?;
        Ok((input, CipherSuite::from_u16(value)))
    }

    /// IANA name of the suite.
    pub fn name(&self) -> &'static str {
        match self {
            CipherSuite::ECDHE_ECDSA_AES128_GCM_SHA256 => {
                "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256"
            }
            CipherSuite::ECDHE_ECDSA_AES256_GCM_SHA384 => {
                "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384"
            }
            CipherSuite::ECDHE_RSA_AES128_GCM_SHA256 => "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
            CipherSuite::ECDHE_RSA_AES256_GCM_SHA384 => "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384",
            CipherSuite::ECDHE_ECDSA_CHACHA20_POLY1305_SHA256 => {
                "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256"
            }
            CipherSuite::ECDHE_RSA_CHACHA20_POLY1305_SHA256 => {
                "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256"
            }
            CipherSuite::Unknown(_) => "UNKNOWN",
        }
    }

    /// Look up a suite by its IANA name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|s| s.name() == name)
    }

    /// Key type the server credential must have, as passed to the key manager.
    pub fn key_type(&self) -> &'static str {
        match self {
            CipherSuite::ECDHE_ECDSA_AES128_GCM_SHA256
            | CipherSuite::ECDHE_ECDSA_AES256_GCM_SHA384
            | CipherSuite::ECDHE_ECDSA_CHACHA20_POLY1305_SHA256 => "EC",
            CipherSuite::ECDHE_RSA_AES128_GCM_SHA256
            | CipherSuite::ECDHE_RSA_AES256_GCM_SHA384
            | CipherSuite::ECDHE_RSA_CHACHA20_POLY1305_SHA256 => "RSA",
            CipherSuite::Unknown(_) => "UNKNOWN",
        }
    }

    /// Authentication type handed to the trust manager.
    pub fn auth_type(&self) -> &'static str {
        match self.key_type() {
            "EC" => "ECDHE_ECDSA",
            "RSA" => "ECDHE_RSA",
            _ => "UNKNOWN",
        }
    }

    pub fn hash_algorithm(&self) -> HashAlgorithm {
        match self {
            CipherSuite::ECDHE_ECDSA_AES256_GCM_SHA384
            | CipherSuite::ECDHE_RSA_AES256_GCM_SHA384 => HashAlgorithm::SHA384,
            _ => HashAlgorithm::SHA256,
        }
    }

    /// Lowest protocol version the suite may be used with.
    ///
    /// AEAD suites are defined for TLS 1.2 only.
    pub fn min_version(&self) -> ProtocolVersion {
        ProtocolVersion::TLS1_2
    }

    pub fn is_usable_with(&self, version: ProtocolVersion) -> bool {
        !matches!(self, CipherSuite::Unknown(_)) && version >= self.min_version()
    }

    /// All recognized suites (every non-`Unknown` variant).
    pub const fn all() -> &'static [CipherSuite; 6] {
        &[
            CipherSuite::ECDHE_ECDSA_AES128_GCM_SHA256,
            CipherSuite::ECDHE_ECDSA_AES256_GCM_SHA384,
            CipherSuite::ECDHE_RSA_AES128_GCM_SHA256,
            CipherSuite::ECDHE_RSA_AES256_GCM_SHA384,
            CipherSuite::ECDHE_ECDSA_CHACHA20_POLY1305_SHA256,
            CipherSuite::ECDHE_RSA_CHACHA20_POLY1305_SHA256,
        ]
    }
}

impl fmt::Display for CipherSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CipherSuite::Unknown(v) => write!(f, "Unknown(0x{:04x})", v),
            _ => write!(f, "{}", self.name()),
        }
    }
}
