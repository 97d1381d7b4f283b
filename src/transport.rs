use crate::error::DialError;
use std::fmt::{Display, Formatter};
use std::io;
use std::net::SocketAddr;
use std::str::FromStr;
use tokio::net::TcpStream;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Tcp,
    Tcp4,
    Tcp6,
}

impl Network {
    fn admits(self, addr: &SocketAddr) -> bool {
        match self {
            Network::Tcp => true,
            Network::Tcp4 => addr.is_ipv4(),
            Network::Tcp6 => addr.is_ipv6(),
        }
    }
}

impl FromStr for Network {
    type Err = DialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(Network::Tcp),
            "tcp4" => Ok(Network::Tcp4),
            "tcp6" => Ok(Network::Tcp6),
            other => Err(DialError::UnsupportedNetwork(other.to_owned())),
        }
    }
}

impl Display for Network {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Network::Tcp => "tcp",
            Network::Tcp4 => "tcp4",
            Network::Tcp6 => "tcp6",
        })
    }
}

/// Opens a plain TCP stream to `addr` (`host:port`).
///
/// The resolved addresses of the requested family are tried in resolver
/// order and the first that accepts wins; this is a single dial, not a retry
/// loop, and the error of the last address is returned when none accepts.
pub async fn connect(network: Network, addr: &str) -> io::Result<TcpStream> {
    let mut last_err = None;
    for target in tokio::net::lookup_host(addr).await? {
        if !network.admits(&target) {
            continue;
        }
        match TcpStream::connect(target).await {
            Ok(stream) => {
                debug!(%network, %target, "tcp connected");
                return Ok(stream);
            }
            Err(e) => {
                debug!(%network, %target, error = %e, "tcp connect failed");
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("no {} address found for {}", network, addr),
        )
    }))
}

#[cfg(test)]
mod test {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_parse_network() {
        assert_eq!("tcp".parse::<Network>().unwrap(), Network::Tcp);
        assert_eq!("tcp4".parse::<Network>().unwrap(), Network::Tcp4);
        assert_eq!("tcp6".parse::<Network>().unwrap(), Network::Tcp6);
        assert!(matches!(
            "udp".parse::<Network>(),
            Err(DialError::UnsupportedNetwork(n)) if n == "udp"
        ));
    }

    #[tokio::test]
    async fn test_connect_local() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let stream = connect(Network::Tcp4, &addr).await.unwrap();
        assert_eq!(stream.peer_addr().unwrap().to_string(), addr);
    }

    #[tokio::test]
    async fn test_family_filter() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let err = connect(Network::Tcp6, &addr).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AddrNotAvailable);
    }

    #[tokio::test]
    async fn test_missing_port() {
        assert!(connect(Network::Tcp, "localhost").await.is_err());
    }
}
