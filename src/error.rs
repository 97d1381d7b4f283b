use crate::builder::FailReason;
use std::io;

/// Broad failure category of a dial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The dialer or the dial arguments were unusable; nothing was opened.
    Config,
    /// The TCP connection could not be established.
    Transport,
    /// The TLS handshake failed; the transport has been closed.
    Handshake,
    /// The dial context was cancelled or its deadline passed.
    Cancellation,
}

#[derive(Debug, thiserror::Error)]
pub enum DialError {
    #[error("unsupported network {0:?}")]
    UnsupportedNetwork(String),
    #[error("invalid server name {0:?}")]
    InvalidServerName(String),
    #[error(transparent)]
    UnknownProfile(#[from] UnknownProfile),
    #[error("invalid fingerprint template: {0}")]
    Template(FailReason<'static>),
    #[error("certificate verifier: {0}")]
    Verifier(String),
    #[error("transport: {0}")]
    Transport(#[source] io::Error),
    #[error("tls handshake: {0}")]
    Handshake(#[source] io::Error),
    #[error("dial cancelled")]
    Cancelled,
    #[error("dial deadline exceeded")]
    DeadlineExceeded,
}

impl DialError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DialError::UnsupportedNetwork(_)
            | DialError::InvalidServerName(_)
            | DialError::UnknownProfile(_)
            | DialError::Template(_)
            | DialError::Verifier(_) => ErrorKind::Config,
            DialError::Transport(_) => ErrorKind::Transport,
            DialError::Handshake(_) => ErrorKind::Handshake,
            DialError::Cancelled | DialError::DeadlineExceeded => ErrorKind::Cancellation,
        }
    }
}

impl From<DialError> for io::Error {
    fn from(err: DialError) -> Self {
        let kind = match &err {
            DialError::Transport(e) | DialError::Handshake(e) => e.kind(),
            DialError::Cancelled => io::ErrorKind::Interrupted,
            DialError::DeadlineExceeded => io::ErrorKind::TimedOut,
            _ => io::ErrorKind::InvalidInput,
        };
        io::Error::new(kind, err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown fingerprint profile {0:?}")]
pub struct UnknownProfile(pub String);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_kind() {
        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert_eq!(DialError::Transport(refused).kind(), ErrorKind::Transport);
        let bad = io::Error::from(io::ErrorKind::InvalidData);
        assert_eq!(DialError::Handshake(bad).kind(), ErrorKind::Handshake);
        assert_eq!(DialError::Cancelled.kind(), ErrorKind::Cancellation);
        assert_eq!(DialError::DeadlineExceeded.kind(), ErrorKind::Cancellation);
        assert_eq!(
            DialError::UnsupportedNetwork("udp".into()).kind(),
            ErrorKind::Config
        );
    }

    #[test]
    fn test_io_conversion_keeps_kind() {
        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        let err: io::Error = DialError::Transport(refused).into();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);
        let err: io::Error = DialError::DeadlineExceeded.into();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }
}
