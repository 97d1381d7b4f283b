use crate::HelloTemplate;
use rustls::client::client_hello::CompressCertificateOptions;
use rustls::internal::msgs::enums::{ECPointFormat, ExtensionType, PSKKeyExchangeMode};
use rustls::internal::msgs::handshake::{ClientExtension, ClientSessionTicket, ProtocolName};
use rustls::{CipherSuite, NamedGroup, ProtocolVersion, SignatureScheme};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

pub enum ExtensionChunk {
    Grease,
    Sni,
    KeyShare,
    /// Key share slot with a one-byte GREASE entry in front of the real shares.
    GreasedKeyShare,
    /// ALPN slot; the list is used only when rustls generated no ALPN extension.
    Alpn(Vec<ProtocolName>),
    GreasedNameGroups(Vec<NamedGroup>),
    GreasedTLSVersion(Vec<ProtocolVersion>),
    Extension(ClientExtension),
}

impl ExtensionChunk {
    pub(crate) fn ext_type(&self) -> Option<ExtensionType> {
        match self {
            ExtensionChunk::Grease => None,
            ExtensionChunk::Sni => Some(ExtensionType::ServerName),
            ExtensionChunk::KeyShare | ExtensionChunk::GreasedKeyShare => {
                Some(ExtensionType::KeyShare)
            }
            ExtensionChunk::Alpn(_) => Some(ExtensionType::ALProtocolNegotiation),
            ExtensionChunk::GreasedNameGroups(_) => Some(ExtensionType::EllipticCurves),
            ExtensionChunk::GreasedTLSVersion(_) => Some(ExtensionType::SupportedVersions),
            ExtensionChunk::Extension(e) => Some(e.get_ext_type()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailReason<'a> {
    Part,
    CipherSuite(&'a str),
    NamedGroup(&'a str),
    ExtensionType(&'a str),
    MissingTLSVersion,
    MissingALPN,
    MissingSignatureAlgorithms,
    MissingCompressCertificate,
}

impl<'a> Display for FailReason<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Default)]
pub struct HelloTemplateBuilder {
    pub tls_versions: Option<Vec<ProtocolVersion>>,
    pub alpn: Option<Vec<ProtocolName>>,
    pub signature_algorithms: Option<Vec<SignatureScheme>>,
    pub compress_certificate: Option<CompressCertificateOptions>,
    // empirical
    pub grease: bool,
    pub unknown_extensions: HashMap<u16, ClientExtension>,
}

fn parse_codes<'a, T, F>(field: &'a str, err: F) -> Result<Vec<T>, FailReason<'a>>
where
    T: From<u16>,
    F: Fn(&'a str) -> FailReason<'a>,
{
    if field.is_empty() {
        return Ok(Vec::new());
    }
    field
        .split('-')
        .map(|code| code.parse::<u16>().map(T::from).map_err(|_| err(code)))
        .collect()
}

impl HelloTemplateBuilder {
    /// Compiles a JA3 full string (`version,ciphers,extensions,groups,formats`)
    /// into a template. Extensions whose body cannot be derived from the JA3
    /// string or the builder fields must be registered in `unknown_extensions`.
    pub fn build_from_ja3<'a>(&self, ja3: &'a str) -> Result<HelloTemplate, FailReason<'a>> {
        let parts: Vec<&str> = ja3.split(',').collect();
        if parts.len() != 5 {
            return Err(FailReason::Part);
        }
        let cipher_suites: Vec<CipherSuite> = parse_codes(parts[1], FailReason::CipherSuite)?;
        let named_groups: Vec<NamedGroup> = parse_codes(parts[3], FailReason::NamedGroup)?;

        let mut extensions = if self.grease {
            vec![ExtensionChunk::Grease]
        } else {
            Vec::new()
        };
        for code in parts[2].split('-') {
            let ty = ExtensionType::from(
                code.parse::<u16>()
                    .map_err(|_| FailReason::ExtensionType(code))?,
            );
            extensions.push(self.chunk_for(ty, code, &named_groups)?);
        }
        if self.grease {
            // trailing GREASE goes before padding, which must stay last
            let before_padding = matches!(
                extensions.last(),
                Some(ExtensionChunk::Extension(e)) if e.get_ext_type() == ExtensionType::Padding
            );
            if before_padding {
                extensions.insert(extensions.len() - 1, ExtensionChunk::Grease);
            } else {
                extensions.push(ExtensionChunk::Grease);
            }
        }
        Ok(HelloTemplate {
            cipher_suites,
            extensions,
        })
    }

    fn chunk_for<'a>(
        &self,
        ty: ExtensionType,
        code: &'a str,
        named_groups: &[NamedGroup],
    ) -> Result<ExtensionChunk, FailReason<'a>> {
        let chunk = match ty {
            ExtensionType::EllipticCurves if self.grease => {
                ExtensionChunk::GreasedNameGroups(named_groups.to_vec())
            }
            ExtensionType::EllipticCurves => {
                ExtensionChunk::Extension(ClientExtension::NamedGroups(named_groups.to_vec()))
            }
            ExtensionType::KeyShare if self.grease => ExtensionChunk::GreasedKeyShare,
            ExtensionType::SupportedVersions => {
                let versions = self
                    .tls_versions
                    .clone()
                    .ok_or(FailReason::MissingTLSVersion)?;
                if self.grease {
                    ExtensionChunk::GreasedTLSVersion(versions)
                } else {
                    ExtensionChunk::Extension(ClientExtension::SupportedVersions(versions))
                }
            }
            ExtensionType::ALProtocolNegotiation => {
                ExtensionChunk::Alpn(self.alpn.clone().ok_or(FailReason::MissingALPN)?)
            }
            ExtensionType::SignatureAlgorithms => {
                ExtensionChunk::Extension(ClientExtension::SignatureAlgorithms(
                    self.signature_algorithms
                        .clone()
                        .ok_or(FailReason::MissingSignatureAlgorithms)?,
                ))
            }
            ExtensionType::Unknown(27) => {
                ExtensionChunk::Extension(ClientExtension::compress_certificate(&[self
                    .compress_certificate
                    .ok_or(FailReason::MissingCompressCertificate)?]))
            }
            oth => match fixed_extension(oth) {
                Some(chunk) => chunk,
                None => ExtensionChunk::Extension(
                    self.unknown_extensions
                        .get(&u16::from(oth))
                        .ok_or(FailReason::ExtensionType(code))?
                        .clone(),
                ),
            },
        };
        Ok(chunk)
    }
}

/// Extensions whose body is the same for every client we imitate.
fn fixed_extension(ext_ty: ExtensionType) -> Option<ExtensionChunk> {
    let ext = match ext_ty {
        ExtensionType::ServerName => return Some(ExtensionChunk::Sni),
        ExtensionType::KeyShare => return Some(ExtensionChunk::KeyShare),
        ExtensionType::ExtendedMasterSecret => ClientExtension::ExtendedMasterSecretRequest,
        ExtensionType::RenegotiationInfo => ClientExtension::renegotiation_info(),
        ExtensionType::StatusRequest => ClientExtension::status_request(),
        ExtensionType::SCT => ClientExtension::signed_certificate_timestamp(),
        ExtensionType::Padding => ClientExtension::padding(vec![]),
        ExtensionType::PSKKeyExchangeModes => {
            ClientExtension::PresharedKeyModes(vec![PSKKeyExchangeMode::PSK_DHE_KE])
        }
        ExtensionType::SessionTicket => ClientExtension::SessionTicket(ClientSessionTicket::Request),
        ExtensionType::ECPointFormats => {
            ClientExtension::EcPointFormats(vec![ECPointFormat::Uncompressed])
        }
        _ => return None,
    };
    Some(ExtensionChunk::Extension(ext))
}

impl HelloTemplateBuilder {
    pub fn with_grease(&mut self, grease: bool) -> &mut Self {
        self.grease = grease;
        self
    }

    pub fn with_tls_versions(&mut self, tls_versions: Vec<ProtocolVersion>) -> &mut Self {
        self.tls_versions = Some(tls_versions);
        self
    }

    pub fn with_alpn(&mut self, alpn: Vec<ProtocolName>) -> &mut Self {
        self.alpn = Some(alpn);
        self
    }

    pub fn with_signature_algorithms(
        &mut self,
        signature_algorithms: Vec<SignatureScheme>,
    ) -> &mut Self {
        self.signature_algorithms = Some(signature_algorithms);
        self
    }

    pub fn with_compress_certificate(
        &mut self,
        compress_certificate: CompressCertificateOptions,
    ) -> &mut Self {
        self.compress_certificate = Some(compress_certificate);
        self
    }

    pub fn with_unknown_extension(&mut self, ext: ClientExtension) -> &mut Self {
        self.unknown_extensions
            .insert(u16::from(ext.get_ext_type()), ext);
        self
    }
}
