use rustls::client::client_hello::ClientHelloOverride;
use rustls::internal::msgs::handshake::{ClientExtension, KeyShareEntry, ProtocolName};
use rustls::{CipherSuite, NamedGroup, ProtocolVersion};
use std::fmt::Debug;

use crate::builder::{ExtensionChunk, HelloTemplateBuilder};

/// A compiled ClientHello shape.
///
/// Cipher suites are emitted verbatim. Extensions are emitted in chunk order;
/// chunks whose value is only known during the handshake (SNI, key share,
/// ALPN) are lifted out of the extensions rustls generated for the
/// connection, so the wire layout follows the template while the values stay
/// consistent with what rustls expects back from the server.
pub struct HelloTemplate {
    pub(crate) cipher_suites: Vec<CipherSuite>,
    pub(crate) extensions: Vec<ExtensionChunk>,
}

impl HelloTemplate {
    pub fn builder() -> HelloTemplateBuilder {
        HelloTemplateBuilder::default()
    }

    pub fn cipher_suites(&self) -> &[CipherSuite] {
        &self.cipher_suites
    }

    /// Extension type codes in emission order, GREASE slots excluded.
    pub fn extension_types(&self) -> Vec<u16> {
        self.extensions
            .iter()
            .filter_map(ExtensionChunk::ext_type)
            .map(u16::from)
            .collect()
    }

    /// ALPN list the template falls back to when rustls offers none.
    pub fn fallback_alpn(&self) -> Option<&[ProtocolName]> {
        self.extensions.iter().find_map(|e| match e {
            ExtensionChunk::Alpn(p) => Some(p.as_slice()),
            _ => None,
        })
    }

    fn lift<F>(generated: &[ClientExtension], pred: F) -> Option<ClientExtension>
    where
        F: Fn(&ClientExtension) -> bool,
    {
        generated.iter().find(|&ext| pred(ext)).cloned()
    }

    fn render(&self, chunk: &ExtensionChunk, generated: &[ClientExtension]) -> Option<ClientExtension> {
        match chunk {
            ExtensionChunk::Grease => Some(ClientExtension::grease()),
            ExtensionChunk::Sni => {
                Self::lift(generated, |ext| matches!(ext, ClientExtension::ServerName(_)))
            }
            ExtensionChunk::KeyShare => {
                Self::lift(generated, |ext| matches!(ext, ClientExtension::KeyShare(_)))
            }
            ExtensionChunk::GreasedKeyShare => {
                match Self::lift(generated, |ext| matches!(ext, ClientExtension::KeyShare(_)))? {
                    ClientExtension::KeyShare(shares) => {
                        let mut entries = Vec::with_capacity(shares.len() + 1);
                        entries.push(KeyShareEntry::new(NamedGroup::grease(), &[0u8][..]));
                        entries.extend(shares);
                        Some(ClientExtension::KeyShare(entries))
                    }
                    _ => None,
                }
            }
            ExtensionChunk::Alpn(fallback) => {
                Self::lift(generated, |ext| matches!(ext, ClientExtension::Protocols(_)))
                    .or_else(|| Some(ClientExtension::Protocols(fallback.clone())))
            }
            ExtensionChunk::Extension(ext) => Some(ext.clone()),
            ExtensionChunk::GreasedNameGroups(v) => {
                let mut groups = Vec::with_capacity(v.len() + 1);
                groups.push(NamedGroup::grease());
                groups.extend(v.iter().cloned());
                Some(ClientExtension::NamedGroups(groups))
            }
            ExtensionChunk::GreasedTLSVersion(v) => {
                let mut versions = Vec::with_capacity(v.len() + 1);
                versions.push(ProtocolVersion::grease());
                versions.extend(v.iter().cloned());
                Some(ClientExtension::SupportedVersions(versions))
            }
        }
    }
}

impl Debug for HelloTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HelloTemplate")
            .field("cipher_suites", &self.cipher_suites.len())
            .field("extensions", &self.extension_types())
            .finish()
    }
}

impl ClientHelloOverride for HelloTemplate {
    fn override_cipher_suites(&self, _cipher_suites: Vec<CipherSuite>) -> Vec<CipherSuite> {
        self.cipher_suites.clone()
    }

    fn override_extensions(&self, extensions: Vec<ClientExtension>) -> Vec<ClientExtension> {
        // slots that rustls did not generate (no SNI for IP targets) are dropped
        self.extensions
            .iter()
            .filter_map(|chunk| self.render(chunk, &extensions))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::FingerprintProfile;
    use rustls::internal::msgs::codec::Codec;

    fn types(exts: &[ClientExtension]) -> Vec<u16> {
        exts.iter().map(|e| u16::from(e.get_ext_type())).collect()
    }

    fn is_grease(v: u16) -> bool {
        v & 0x0f0f == 0x0a0a && v >> 8 == v & 0xff
    }

    #[test]
    fn test_missing_slots_are_dropped() {
        let template = FingerprintProfile::Android11OkHttp.template(&[]).unwrap();
        let rendered = template.override_extensions(Vec::new());
        let mut expected = template.extension_types();
        expected.retain(|t| *t != 0 && *t != 51);
        // ALPN falls back to the template's own list
        assert!(expected.contains(&16));
        assert_eq!(types(&rendered), expected);
    }

    #[test]
    fn test_render_is_stable_across_connections() {
        let template = FingerprintProfile::Chrome102.template(&[]).unwrap();
        let codes = || {
            let mut codes = types(&template.override_extensions(Vec::new()));
            codes.retain(|c| !is_grease(*c));
            codes
        };
        let first = codes();
        let mut expected = template.extension_types();
        expected.retain(|t| *t != 0 && *t != 51);
        assert_eq!(first, expected);
        for _ in 0..16 {
            assert_eq!(codes(), first);
        }
        assert_eq!(
            template.override_cipher_suites(Vec::new()),
            template.cipher_suites().to_vec()
        );
    }

    #[test]
    fn test_greased_key_share_leads_with_grease_entry() {
        let generated = vec![ClientExtension::KeyShare(vec![KeyShareEntry::new(
            NamedGroup::X25519,
            &[7u8; 32][..],
        )])];
        let chrome = FingerprintProfile::Chrome120.template(&[]).unwrap();
        let share = chrome
            .override_extensions(generated.clone())
            .into_iter()
            .find(|e| matches!(e, ClientExtension::KeyShare(_)))
            .unwrap();
        // type, length, list length, then entries
        let bytes = share.get_encoding();
        let grease = u16::from_be_bytes([bytes[6], bytes[7]]);
        assert!(is_grease(grease));
        assert_eq!(&bytes[8..11], &[0, 1, 0]);
        assert_eq!(u16::from_be_bytes([bytes[11], bytes[12]]), 0x001d);
        assert_eq!(bytes.len(), 6 + 5 + 4 + 32);

        let okhttp = FingerprintProfile::Android11OkHttp.template(&[]).unwrap();
        let share = okhttp
            .override_extensions(generated)
            .into_iter()
            .find(|e| matches!(e, ClientExtension::KeyShare(_)))
            .unwrap();
        let bytes = share.get_encoding();
        assert_eq!(u16::from_be_bytes([bytes[6], bytes[7]]), 0x001d);
    }
}
