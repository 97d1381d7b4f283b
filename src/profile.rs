//! Catalog of client fingerprints the dialer can reproduce.
//!
//! Each profile is the JA3 full string of a captured ClientHello plus the
//! extension bodies JA3 does not encode (signature algorithms, supported
//! versions, ALPS, certificate compression, GREASE placement).

use crate::builder::HelloTemplateBuilder;
use crate::error::{DialError, UnknownProfile};
use crate::extensions::{application_settings, grease_ech};
use crate::HelloTemplate;
use rustls::client::client_hello::CompressCertificateOptions;
use rustls::internal::msgs::handshake::ProtocolName;
use rustls::{ProtocolVersion, SignatureScheme};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FingerprintProfile {
    /// OkHttp on Android 11.
    #[default]
    Android11OkHttp,
    Chrome102,
    Chrome120,
}

const ANDROID_11_OKHTTP_JA3: &str = "771,4865-4866-4867-49195-49199-49196-49200-52393-52392-49171-49172-156-157-47-53,0-23-65281-10-11-35-16-5-13-51-45-43,29-23-24,0";
const CHROME_102_JA3: &str = "771,4865-4866-4867-49195-49199-49196-49200-52393-52392-49171-49172-156-157-47-53,0-23-65281-10-11-35-16-5-13-18-51-45-43-27-17513-21,29-23-24,0";
const CHROME_120_JA3: &str = "771,4865-4866-4867-49195-49199-49196-49200-52393-52392-49171-49172-156-157-47-53,51-10-5-43-65281-35-16-11-13-23-17513-27-18-45-0-65037,29-23-24,0";

const CHROME_SIGNATURE_ALGORITHMS: [SignatureScheme; 8] = [
    SignatureScheme::ECDSA_NISTP256_SHA256,
    SignatureScheme::RSA_PSS_SHA256,
    SignatureScheme::RSA_PKCS1_SHA256,
    SignatureScheme::ECDSA_NISTP384_SHA384,
    SignatureScheme::RSA_PSS_SHA384,
    SignatureScheme::RSA_PKCS1_SHA384,
    SignatureScheme::RSA_PSS_SHA512,
    SignatureScheme::RSA_PKCS1_SHA512,
];

impl FingerprintProfile {
    pub const ALL: [FingerprintProfile; 3] = [
        FingerprintProfile::Android11OkHttp,
        FingerprintProfile::Chrome102,
        FingerprintProfile::Chrome120,
    ];

    /// Reference JA3 full string of the imitated client.
    pub fn ja3(self) -> &'static str {
        match self {
            FingerprintProfile::Android11OkHttp => ANDROID_11_OKHTTP_JA3,
            FingerprintProfile::Chrome102 => CHROME_102_JA3,
            FingerprintProfile::Chrome120 => CHROME_120_JA3,
        }
    }

    /// ALPN list the client offers when its owner configures none.
    pub fn default_alpn(self) -> Vec<Vec<u8>> {
        vec![b"h2".to_vec(), b"http/1.1".to_vec()]
    }

    pub fn signature_algorithms(self) -> Vec<SignatureScheme> {
        match self {
            FingerprintProfile::Android11OkHttp => {
                let mut schemes = CHROME_SIGNATURE_ALGORITHMS.to_vec();
                schemes.push(SignatureScheme::RSA_PKCS1_SHA1);
                schemes
            }
            FingerprintProfile::Chrome102 | FingerprintProfile::Chrome120 => {
                CHROME_SIGNATURE_ALGORITHMS.to_vec()
            }
        }
    }

    fn grease(self) -> bool {
        !matches!(self, FingerprintProfile::Android11OkHttp)
    }

    /// Compiles the profile, placing `alpn` (or the profile default when
    /// empty) in the ALPN slot.
    pub fn template(self, alpn: &[Vec<u8>]) -> Result<HelloTemplate, DialError> {
        let alpn = if alpn.is_empty() {
            self.default_alpn()
        } else {
            alpn.to_vec()
        };
        let mut builder = HelloTemplateBuilder::default();
        builder
            .with_grease(self.grease())
            .with_signature_algorithms(self.signature_algorithms())
            .with_tls_versions(vec![ProtocolVersion::TLSv1_3, ProtocolVersion::TLSv1_2])
            .with_alpn(alpn.into_iter().map(ProtocolName::from).collect());
        if self != FingerprintProfile::Android11OkHttp {
            builder
                .with_compress_certificate(CompressCertificateOptions::Brotli)
                .with_unknown_extension(application_settings(&[b"h2"]));
        }
        if self == FingerprintProfile::Chrome120 {
            builder.with_unknown_extension(grease_ech());
        }
        builder.build_from_ja3(self.ja3()).map_err(DialError::Template)
    }
}

impl Display for FingerprintProfile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FingerprintProfile::Android11OkHttp => "android11_okhttp",
            FingerprintProfile::Chrome102 => "chrome102",
            FingerprintProfile::Chrome120 => "chrome120",
        })
    }
}

impl FromStr for FingerprintProfile {
    type Err = UnknownProfile;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "android11_okhttp" | "android_11_okhttp" | "okhttp" | "android" => {
                Ok(FingerprintProfile::Android11OkHttp)
            }
            "chrome102" | "chrome_102" => Ok(FingerprintProfile::Chrome102),
            "chrome120" | "chrome_120" | "chrome" => Ok(FingerprintProfile::Chrome120),
            _ => Err(UnknownProfile(s.to_owned())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_every_profile_compiles() {
        for profile in FingerprintProfile::ALL {
            let template = profile.template(&[]).unwrap();
            #[cfg(feature = "ja3")]
            assert_eq!(template.ja3_full(), profile.ja3(), "{}", profile);
            assert_eq!(template.cipher_suites().len(), 15);
        }
    }

    #[test]
    fn test_name_round_trip() {
        for profile in FingerprintProfile::ALL {
            assert_eq!(profile.to_string().parse::<FingerprintProfile>().unwrap(), profile);
        }
        assert_eq!(
            "OkHttp".parse::<FingerprintProfile>().unwrap(),
            FingerprintProfile::Android11OkHttp
        );
        assert_eq!(
            "safari".parse::<FingerprintProfile>().unwrap_err(),
            UnknownProfile("safari".into())
        );
    }

    #[test]
    fn test_okhttp_digests() {
        let template = FingerprintProfile::Android11OkHttp.template(&[]).unwrap();
        #[cfg(feature = "ja3")]
        assert_eq!(template.ja3_hash(), "cafe522b1f077145bca328ed52621259");
        #[cfg(feature = "ja4")]
        assert_eq!(template.ja4_hash(), "t13d1512h2_8daaf6152771_40271e0a5736");
        let _ = template;
    }

    #[test]
    fn test_alpn_slot_takes_client_list() {
        let template = FingerprintProfile::Android11OkHttp
            .template(&[b"http/1.1".to_vec()])
            .unwrap();
        let alpn = template.fallback_alpn().unwrap();
        assert_eq!(alpn.len(), 1);
        assert_eq!(AsRef::<[u8]>::as_ref(&alpn[0]), b"http/1.1");

        let default = FingerprintProfile::Chrome120.template(&[]).unwrap();
        assert_eq!(default.fallback_alpn().unwrap().len(), 2);
    }
}
