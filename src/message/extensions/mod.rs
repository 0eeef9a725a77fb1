pub mod alpn;
pub mod ec_point_formats;
pub mod max_fragment_length;
pub mod renegotiation_info;
pub mod server_name;
pub mod signature_algorithms;
pub mod supported_groups;

pub use alpn::AlpnExtension;
pub use ec_point_formats::ECPointFormatsExtension;
pub use max_fragment_length::{MaxFragmentLength, DEFAULT_MAX_FRAGMENT};
pub use renegotiation_info::RenegotiationInfoExtension;
pub use server_name::ServerNameExtension;
pub use signature_algorithms::SignatureAlgorithmsExtension;
pub use supported_groups::SupportedGroupsExtension;

use nom::combinator::{all_consuming, complete};
use nom::error::{Error, ErrorKind};
use nom::multi::{length_data, many0};
use nom::number::complete::be_u16;
use nom::{Err, IResult};

use super::extension::{write_extension, Extension, ExtensionType};
use crate::buffer::Buf;

/// The extensions of a ClientHello or ServerHello, parsed into their typed
/// form.
///
/// Extensions this engine does not understand are listed in `unknown` so
/// that a client can reject unsolicited ones in a ServerHello.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelloExtensions {
    pub server_name: Option<ServerNameExtension>,
    pub max_fragment_length: Option<MaxFragmentLength>,
    pub supported_groups: Option<SupportedGroupsExtension>,
    pub ec_point_formats: Option<ECPointFormatsExtension>,
    pub signature_algorithms: Option<SignatureAlgorithmsExtension>,
    pub alpn: Option<AlpnExtension>,
    pub extended_master_secret: bool,
    pub renegotiation_info: Option<RenegotiationInfoExtension>,
    pub unknown: Vec<u16>,
}

impl HelloExtensions {
    /// Parse the optional extensions block that ends a hello message.
    ///
    /// An absent block is the same as an empty one. Each extension type may
    /// appear only once.
    pub fn parse(input: &[u8]) -> IResult<&[u8], HelloExtensions> {
        if input.is_empty() {
            return Ok((input, HelloExtensions::default()));
        }

        let (input, block) = length_data(be_u16)(input)?;
        let (_, raw) = all_consuming(many0(complete(Extension::parse)))(block)?;

        let mut ext = HelloExtensions::default();
        let mut seen: Vec<u16> = Vec::with_capacity(raw.len());

        for e in raw {
            let code = e.extension_type.as_u16();
            if seen.contains(&code) {
                return Err(Err::Failure(Error::new(input, ErrorKind::Verify)));
            }
            seen.push(code);

            let data = e.extension_data;
            match e.extension_type {
                ExtensionType::ServerName => {
                    ext.server_name = Some(typed(data, ServerNameExtension::parse)?);
                }
                ExtensionType::MaxFragmentLength => {
                    ext.max_fragment_length = Some(typed(data, MaxFragmentLength::parse)?);
                }
                ExtensionType::SupportedGroups => {
                    ext.supported_groups = Some(typed(data, SupportedGroupsExtension::parse)?);
                }
                ExtensionType::EcPointFormats => {
                    ext.ec_point_formats = Some(typed(data, ECPointFormatsExtension::parse)?);
                }
                ExtensionType::SignatureAlgorithms => {
                    ext.signature_algorithms =
                        Some(typed(data, SignatureAlgorithmsExtension::parse)?);
                }
                ExtensionType::ApplicationLayerProtocolNegotiation => {
                    ext.alpn = Some(typed(data, AlpnExtension::parse)?);
                }
                ExtensionType::ExtendedMasterSecret => {
                    if !data.is_empty() {
                        return Err(Err::Failure(Error::new(input, ErrorKind::LengthValue)));
                    }
                    ext.extended_master_secret = true;
                }
                ExtensionType::RenegotiationInfo => {
                    ext.renegotiation_info = Some(typed(data, RenegotiationInfoExtension::parse)?);
                }
                other => ext.unknown.push(other.as_u16()),
            }
        }

        Ok((input, ext))
    }

    /// Write the extensions block, length prefix included. Nothing is
    /// written when there are no extensions.
    pub fn serialize(&self, output: &mut Buf) {
        let mut block = Buf::new();
        let mut body = Buf::new();

        let put = |t: ExtensionType, body: &mut Buf, block: &mut Buf| {
            write_extension(t, &body[..], block);
            body.clear();
        };

        if let Some(sni) = &self.server_name {
            sni.serialize(&mut body);
            put(ExtensionType::ServerName, &mut body, &mut block);
        }
        if let Some(mfl) = &self.max_fragment_length {
            mfl.serialize(&mut body);
            put(ExtensionType::MaxFragmentLength, &mut body, &mut block);
        }
        if let Some(groups) = &self.supported_groups {
            groups.serialize(&mut body);
            put(ExtensionType::SupportedGroups, &mut body, &mut block);
        }
        if let Some(formats) = &self.ec_point_formats {
            formats.serialize(&mut body);
            put(ExtensionType::EcPointFormats, &mut body, &mut block);
        }
        if let Some(sigs) = &self.signature_algorithms {
            sigs.serialize(&mut body);
            put(ExtensionType::SignatureAlgorithms, &mut body, &mut block);
        }
        if let Some(alpn) = &self.alpn {
            alpn.serialize(&mut body);
            put(
                ExtensionType::ApplicationLayerProtocolNegotiation,
                &mut body,
                &mut block,
            );
        }
        if self.extended_master_secret {
            put(ExtensionType::ExtendedMasterSecret, &mut body, &mut block);
        }
        if let Some(reneg) = &self.renegotiation_info {
            reneg.serialize(&mut body);
            put(ExtensionType::RenegotiationInfo, &mut body, &mut block);
        }

        if block.is_empty() {
            return;
        }
        output.extend_from_slice(&(block.len() as u16).to_be_bytes());
        output.extend_from_slice(&block);
    }
}

/// Run a typed extension parser over the whole extension body.
fn typed<'a, O>(
    data: &'a [u8],
    parser: impl FnMut(&'a [u8]) -> IResult<&'a [u8], O>,
) -> Result<O, Err<Error<&'a [u8]>>> {
    let (_, value) = all_consuming(parser)(data)?;
    Ok(value)
}
