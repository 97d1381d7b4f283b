use rustls::internal::msgs::enums::ExtensionType;
use rustls::internal::msgs::enums::HpkeAead::AES_128_GCM;
use rustls::internal::msgs::enums::HpkeKdf::HKDF_SHA256;
use rustls::internal::msgs::handshake::ClientExtension;

/// Application settings (ALPS), not IANA assigned.
pub const APPLICATION_SETTINGS: u16 = 17513;
/// Encrypted client hello, draft code point.
pub const ENCRYPTED_CLIENT_HELLO: u16 = 65037;

/// GREASE ECH as sent by Chrome: an outer ClientHello with a random config id,
/// encapsulated key and payload.
pub fn grease_ech() -> ClientExtension {
    let mut payload = Vec::with_capacity(200);
    // outer client hello
    payload.push(0);
    payload.extend_from_slice(&u16::from(HKDF_SHA256).to_be_bytes());
    payload.extend_from_slice(&u16::from(AES_128_GCM).to_be_bytes());
    // config id
    payload.push(rand::random());
    payload.extend_from_slice(&32u16.to_be_bytes());
    payload.extend((0..32).map(|_| rand::random::<u8>()));
    payload.extend_from_slice(&144u16.to_be_bytes());
    payload.extend((0..144).map(|_| rand::random::<u8>()));
    ClientExtension::unknown(ExtensionType::Unknown(ENCRYPTED_CLIENT_HELLO), payload)
}

/// ALPS body: a u16-length-prefixed list of u8-length-prefixed protocol names.
pub fn application_settings(protocols: &[&[u8]]) -> ClientExtension {
    let list_len: usize = protocols.iter().map(|p| p.len() + 1).sum();
    let mut payload = Vec::with_capacity(list_len + 2);
    payload.extend_from_slice(&(list_len as u16).to_be_bytes());
    for proto in protocols {
        payload.push(proto.len() as u8);
        payload.extend_from_slice(proto);
    }
    ClientExtension::unknown(ExtensionType::Unknown(APPLICATION_SETTINGS), payload)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_extension_codes() {
        assert_eq!(
            application_settings(&[b"h2"]).get_ext_type(),
            ExtensionType::Unknown(APPLICATION_SETTINGS)
        );
        assert_eq!(
            grease_ech().get_ext_type(),
            ExtensionType::Unknown(ENCRYPTED_CLIENT_HELLO)
        );
    }
}
