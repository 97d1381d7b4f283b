//! JA3 / JA4 digests of a [`HelloTemplate`], used to label dialers in logs
//! and to check profiles against published client fingerprints.

use crate::builder::ExtensionChunk;
use crate::HelloTemplate;
use rustls::internal::msgs::handshake::ClientExtension;
#[cfg(feature = "ja4")]
use rustls::ProtocolVersion;
#[cfg(feature = "ja4")]
use sha2::Digest;
#[cfg(feature = "ja4")]
use std::fmt::Write;

#[cfg(feature = "ja4")]
const TLS_GREASE_VALUES_INT: [u16; 16] = [
    0x0a0a, 0x1a1a, 0x2a2a, 0x3a3a, 0x4a4a, 0x5a5a, 0x6a6a, 0x7a7a, 0x8a8a, 0x9a9a, 0xaaaa, 0xbaba,
    0xcaca, 0xdada, 0xeaea, 0xfafa,
];

fn dash_join<I, T>(items: I) -> String
where
    I: IntoIterator<Item = T>,
    T: ToString,
{
    items
        .into_iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(feature = "ja4")]
fn truncated_sha256(hasher: sha2::Sha256) -> String {
    hasher.finalize()[..6]
        .iter()
        .fold(String::new(), |mut output, b| {
            let _ = write!(&mut output, "{:02x}", b);
            output
        })
}

impl HelloTemplate {
    #[cfg(feature = "ja3")]
    pub fn ja3_full(&self) -> String {
        let groups = self
            .extensions
            .iter()
            .find_map(|e| match e {
                ExtensionChunk::Extension(ClientExtension::NamedGroups(g)) => Some(g),
                ExtensionChunk::GreasedNameGroups(g) => Some(g),
                _ => None,
            })
            .map(|g| dash_join(g.iter().map(|s| u16::from(*s))))
            .unwrap_or_default();
        let point_formats = self
            .extensions
            .iter()
            .find_map(|e| match e {
                ExtensionChunk::Extension(ClientExtension::EcPointFormats(f)) => Some(f),
                _ => None,
            })
            .map(|f| dash_join(f.iter().map(|p| u8::from(*p))))
            .unwrap_or_default();
        format!(
            "{},{},{},{},{}",
            771,
            dash_join(self.cipher_suites.iter().map(|c| u16::from(*c))),
            dash_join(self.extension_types()),
            groups,
            point_formats,
        )
    }

    #[cfg(feature = "ja3")]
    pub fn ja3_hash(&self) -> String {
        format!("{:x}", md5::compute(self.ja3_full().as_bytes()))
    }

    #[cfg(feature = "ja4")]
    pub fn ja4_hash(&self) -> String {
        let tls_version = self
            .extensions
            .iter()
            .find_map(|e| match e {
                ExtensionChunk::GreasedTLSVersion(v) => Some(v),
                ExtensionChunk::Extension(ClientExtension::SupportedVersions(v)) => Some(v),
                _ => None,
            })
            .and_then(|v| v.first())
            .map(|v| match *v {
                ProtocolVersion::TLSv1_3 => "13",
                _ => "12",
            })
            .unwrap_or("12");
        let has_domain = self.extensions.iter().any(|e| {
            matches!(e, ExtensionChunk::Sni)
                || matches!(e, ExtensionChunk::Extension(ClientExtension::ServerName(_)))
        });
        let mut ciphers = self
            .cipher_suites
            .iter()
            .map(|c| u16::from(*c))
            .filter(|c| !TLS_GREASE_VALUES_INT.contains(c))
            .map(|c| format!("{:04x}", c))
            .collect::<Vec<String>>();
        // SNI and ALPN are counted but excluded from the hashed list
        let ext_types = self.extension_types();
        let ext_count = ext_types.len();
        let mut extensions = ext_types
            .into_iter()
            .filter(|s| *s != 0 && *s != 0x10)
            .map(|s| format!("{:04x}", s))
            .collect::<Vec<_>>();
        let signature = self
            .extensions
            .iter()
            .find_map(|e| match e {
                ExtensionChunk::Extension(ClientExtension::SignatureAlgorithms(s)) => Some(
                    s.iter()
                        .map(|s| format!("{:04x}", u16::from(*s)))
                        .collect::<Vec<String>>(),
                ),
                _ => None,
            })
            .unwrap_or_default();
        ciphers.sort_unstable();
        extensions.sort_unstable();
        let part_b = truncated_sha256(sha2::Sha256::new_with_prefix(ciphers.join(",")));
        let part_c = {
            let mut hasher = sha2::Sha256::new_with_prefix(extensions.join(","));
            hasher.update(b"_");
            hasher.update(signature.join(","));
            truncated_sha256(hasher)
        };
        let alpn = self
            .fallback_alpn()
            .and_then(|p| p.first())
            .map(|n| match AsRef::<[u8]>::as_ref(n) {
                b"h2" => "h2",
                b"http/1.1" => "h1",
                _ => "00",
            })
            .unwrap_or("00");
        format!(
            "t{}{}{}{}{}_{}_{}",
            tls_version,
            if has_domain { "d" } else { "i" },
            ciphers.len(),
            ext_count,
            alpn,
            part_b,
            part_c
        )
    }
}

#[cfg(test)]
mod test {
    use crate::builder::HelloTemplateBuilder;
    use crate::extensions::application_settings;
    use rustls::client::client_hello::CompressCertificateOptions;
    use rustls::internal::msgs::handshake::ProtocolName;
    use rustls::{ProtocolVersion, SignatureScheme};

    #[test]
    fn test_chrome102_digests() {
        let ja3_full = "771,4865-4866-4867-49195-49199-49196-49200-52393-52392-49171-49172-156-157-47-53,0-23-65281-10-11-35-16-5-13-18-51-45-43-27-17513-21,29-23-24,0";
        let mut builder = HelloTemplateBuilder::default();
        builder
            .with_grease(true)
            .with_signature_algorithms(vec![
                SignatureScheme::ECDSA_NISTP256_SHA256,
                SignatureScheme::RSA_PSS_SHA256,
                SignatureScheme::RSA_PKCS1_SHA256,
                SignatureScheme::ECDSA_NISTP384_SHA384,
                SignatureScheme::RSA_PSS_SHA384,
                SignatureScheme::RSA_PKCS1_SHA384,
                SignatureScheme::RSA_PSS_SHA512,
                SignatureScheme::RSA_PKCS1_SHA512,
            ])
            .with_tls_versions(vec![ProtocolVersion::TLSv1_3, ProtocolVersion::TLSv1_2])
            .with_alpn(vec![ProtocolName::from(b"http/1.1".to_vec())])
            .with_compress_certificate(CompressCertificateOptions::Brotli)
            .with_unknown_extension(application_settings(&[b"h2"]));
        let template = builder.build_from_ja3(ja3_full).unwrap();
        #[cfg(feature = "ja3")]
        {
            assert_eq!(template.ja3_full(), ja3_full);
            assert_eq!(template.ja3_hash(), "cd08e31494f9531f560d64c695473da9");
        }
        #[cfg(feature = "ja4")]
        assert_eq!(template.ja4_hash(), "t13d1516h1_8daaf6152771_e5627efa2ab1");
    }
}
