//! TLS dialing that reproduces the ClientHello of a real client.
//!
//! [`MimicDialer`] is the piece an HTTP client calls instead of its stock TLS
//! connect: it opens TCP, runs a rustls handshake whose ClientHello is
//! rewritten by the selected [`FingerprintProfile`], and returns a
//! [`MimicStream`] that reports its negotiated parameters through
//! [`ConnectionStateProvider`].

pub mod address;
pub mod builder;
pub mod context;
pub mod dial;
pub mod error;
pub mod extensions;
pub mod handshake;
mod hash;
pub mod profile;
pub mod state;
pub mod template;
pub mod transport;

pub use rustls as rustls_vendor;
pub use tokio_util::sync::CancellationToken;

pub use crate::address::Address;
pub use crate::context::DialContext;
pub use crate::dial::{DialTls, MimicDialer, MimicDialerBuilder};
pub use crate::error::{DialError, ErrorKind, UnknownProfile};
pub use crate::profile::FingerprintProfile;
pub use crate::state::{ConnectionState, ConnectionStateProvider, MimicStream};
pub use crate::template::HelloTemplate;
pub use crate::transport::Network;
