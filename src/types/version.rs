use std::cmp::Ordering;
use std::fmt;

use nom::number::complete::be_u16;
use nom::IResult;

/// TLS protocol version as carried in records and hellos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum ProtocolVersion {
    TLS1_0,
    TLS1_1,
    TLS1_2,
    Unknown(u16),
}

impl ProtocolVersion {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0x0301 => ProtocolVersion::TLS1_0,
            0x0302 => ProtocolVersion::TLS1_1,
            0x0303 => ProtocolVersion::TLS1_2,
            _ => ProtocolVersion::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            ProtocolVersion::TLS1_0 => 0x0301,
            ProtocolVersion::TLS1_1 => 0x0302,
            ProtocolVersion::TLS1_2 => 0x0303,
            ProtocolVersion::Unknown(value) => *value,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], ProtocolVersion> {
        let (input, version) = be_u16(input)?;
        Ok((input, Self::from_u16(version)))
    }

    /// Standard name, as used in enable lists (`"TLSv1.2"`).
    pub fn name(&self) -> &'static str {
        match self {
            ProtocolVersion::TLS1_0 => "TLSv1",
            ProtocolVersion::TLS1_1 => "TLSv1.1",
            ProtocolVersion::TLS1_2 => "TLSv1.2",
            ProtocolVersion::Unknown(_) => "UNKNOWN",
        }
    }

    /// Look up a version by its standard name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::supported().iter().copied().find(|v| v.name() == name)
    }

    /// Whether the record layer can carry this version at all (major 3).
    pub fn is_tls(&self) -> bool {
        self.as_u16() >> 8 == 3
    }

    pub fn is_supported(&self) -> bool {
        Self::supported().contains(self)
    }

    /// Versions this implementation can negotiate, lowest first.
    pub const fn supported() -> &'static [ProtocolVersion; 3] {
        &[
            ProtocolVersion::TLS1_0,
            ProtocolVersion::TLS1_1,
            ProtocolVersion::TLS1_2,
        ]
    }
}

impl PartialOrd for ProtocolVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ProtocolVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_u16().cmp(&other.as_u16())
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolVersion::Unknown(v) => write!(f, "Unknown(0x{:04x})", v),
            _ => write!(f, "{}", self.name()),
        }
    }
}
