use crate::error::DialError;
use rustls::pki_types::ServerName;

/// A dial target split at its rightmost colon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address<'a> {
    pub host: &'a str,
    /// Empty when the target carried no colon.
    pub port: &'a str,
}

impl<'a> Address<'a> {
    pub fn parse(addr: &'a str) -> Self {
        match addr.rfind(':') {
            Some(pos) => Address {
                host: &addr[..pos],
                port: &addr[pos + 1..],
            },
            None => Address {
                host: addr,
                port: "",
            },
        }
    }

    /// Host as it belongs in SNI / certificate checks, IPv6 brackets removed.
    pub fn sni_host(&self) -> &'a str {
        self.host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(self.host)
    }

    pub fn server_name(&self) -> Result<ServerName<'static>, DialError> {
        ServerName::try_from(self.sni_host().to_owned())
            .map_err(|_| DialError::InvalidServerName(self.sni_host().to_owned()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_host_port() {
        let addr = Address::parse("example.com:443");
        assert_eq!(addr.host, "example.com");
        assert_eq!(addr.port, "443");
    }

    #[test]
    fn test_no_colon() {
        let addr = Address::parse("example.com");
        assert_eq!(addr.host, "example.com");
        assert_eq!(addr.port, "");
    }

    #[test]
    fn test_rightmost_colon() {
        let addr = Address::parse("[::1]:8443");
        assert_eq!(addr.host, "[::1]");
        assert_eq!(addr.port, "8443");
        assert_eq!(addr.sni_host(), "::1");

        let addr = Address::parse("a:b:c");
        assert_eq!(addr.host, "a:b");
        assert_eq!(addr.port, "c");

        let addr = Address::parse("example.com:");
        assert_eq!(addr.host, "example.com");
        assert_eq!(addr.port, "");
    }

    #[test]
    fn test_server_name() {
        assert!(matches!(
            Address::parse("example.com:443").server_name(),
            Ok(ServerName::DnsName(_))
        ));
        assert!(matches!(
            Address::parse("127.0.0.1:443").server_name(),
            Ok(ServerName::IpAddress(_))
        ));
        assert!(matches!(
            Address::parse("[::1]:443").server_name(),
            Ok(ServerName::IpAddress(_))
        ));
        assert!(matches!(
            Address::parse("bad host:443").server_name(),
            Err(DialError::InvalidServerName(_))
        ));
    }
}
