use nom::multi::length_data;
use nom::number::complete::be_u16;
use nom::IResult;

use crate::buffer::Buf;

/// A raw extension, before the typed parse.
#[derive(Debug, PartialEq, Eq)]
pub struct Extension<'a> {
    pub extension_type: ExtensionType,
    pub extension_data: &'a [u8],
}

impl<'a> Extension<'a> {
    pub fn new(extension_type: ExtensionType, extension_data: &'a [u8]) -> Self {
        Extension {
            extension_type,
            extension_data,
        }
    }

    pub fn parse(input: &'a [u8]) -> IResult<&'a [u8], Extension<'a>> {
        let (input, extension_type) = ExtensionType::parse(input)?;
        let (input, extension_data) = length_data(be_u16)(input)?;

        Ok((
            input,
            Extension {
                extension_type,
                extension_data,
            },
        ))
    }

    pub fn serialize(&self, output: &mut Buf) {
        write_extension(self.extension_type, self.extension_data, output);
    }
}

/// Write type, length and body of one extension.
pub(crate) fn write_extension(extension_type: ExtensionType, data: &[u8], output: &mut Buf) {
    output.extend_from_slice(&extension_type.as_u16().to_be_bytes());
    output.extend_from_slice(&(data.len() as u16).to_be_bytes());
    output.extend_from_slice(data);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionType {
    ServerName,
    MaxFragmentLength,
    StatusRequest,
    SupportedGroups,
    EcPointFormats,
    SignatureAlgorithms,
    ApplicationLayerProtocolNegotiation,
    Padding,
    EncryptThenMac,
    ExtendedMasterSecret,
    SessionTicket,
    SupportedVersions,
    RenegotiationInfo,
    Unknown(u16),
}

impl ExtensionType {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0x0000 => ExtensionType::ServerName,
            0x0001 => ExtensionType::MaxFragmentLength,
            0x0005 => ExtensionType::StatusRequest,
            0x000A => ExtensionType::SupportedGroups,
            0x000B => ExtensionType::EcPointFormats,
            0x000D => ExtensionType::SignatureAlgorithms,
            0x0010 => ExtensionType::ApplicationLayerProtocolNegotiation,
            0x0015 => ExtensionType::Padding,
            0x0016 => ExtensionType::EncryptThenMac,
            0x0017 => ExtensionType::ExtendedMasterSecret,
            0x0023 => ExtensionType::SessionTicket,
            0x002B => ExtensionType::SupportedVersions,
            0xFF01 => ExtensionType::RenegotiationInfo,
            _ => ExtensionType::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            ExtensionType::ServerName => 0x0000,
            ExtensionType::MaxFragmentLength => 0x0001,
            ExtensionType::StatusRequest => 0x0005,
            ExtensionType::SupportedGroups => 0x000A,
            ExtensionType::EcPointFormats => 0x000B,
            ExtensionType::SignatureAlgorithms => 0x000D,
            ExtensionType::ApplicationLayerProtocolNegotiation => 0x0010,
            ExtensionType::Padding => 0x0015,
            ExtensionType::EncryptThenMac => 0x0016,
            ExtensionType::ExtendedMasterSecret => 0x0017,
            ExtensionType::SessionTicket => 0x0023,
            ExtensionType::SupportedVersions => 0x002B,
            ExtensionType::RenegotiationInfo => 0xFF01,
            ExtensionType::Unknown(value) => *value,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], ExtensionType> {
        let (input, value) = be_u16(input)?;
        Ok((input, ExtensionType::from_u16(value)))
    }
}
