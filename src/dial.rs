use crate::address::Address;
use crate::context::DialContext;
use crate::error::DialError;
use crate::handshake::HandshakeEngine;
use crate::profile::FingerprintProfile;
use crate::state::MimicStream;
use crate::transport::{self, Network};
use async_trait::async_trait;
use rustls::RootCertStore;
use std::sync::Arc;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// The "open a secure connection" step of an HTTP client.
///
/// An implementation is installed once when the client is built and is then
/// asked for every TLS connection the client opens.
#[async_trait]
pub trait DialTls: Send + Sync {
    type Conn: Send;

    async fn dial_tls(
        &self,
        ctx: &DialContext,
        network: &str,
        addr: &str,
    ) -> Result<Self::Conn, DialError>;
}

/// Dials TCP and completes a TLS handshake that imitates one client profile.
///
/// Everything a dialer holds is immutable after [`MimicDialerBuilder::build`];
/// share it behind an `Arc` and dial from as many tasks as needed.
#[derive(Debug)]
pub struct MimicDialer {
    profile: FingerprintProfile,
    engine: HandshakeEngine,
    nodelay: bool,
}

impl MimicDialer {
    pub fn builder() -> MimicDialerBuilder {
        MimicDialerBuilder::default()
    }

    pub fn profile(&self) -> FingerprintProfile {
        self.profile
    }

    /// ALPN list offered on every connection.
    pub fn alpn(&self) -> &[Vec<u8>] {
        self.engine.alpn()
    }

    pub fn engine(&self) -> &HandshakeEngine {
        &self.engine
    }

    pub async fn dial(
        &self,
        ctx: &DialContext,
        network: &str,
        addr: &str,
    ) -> Result<MimicStream<TcpStream>, DialError> {
        let network: Network = network.parse()?;
        let address = Address::parse(addr);
        let server_name = address.server_name()?;

        debug!(%network, addr, profile = %self.profile, "dialing");
        let tcp = ctx
            .run(transport::connect(network, addr))
            .await?
            .map_err(|e| {
                warn!(%network, addr, error = %e, "transport connect failed");
                DialError::Transport(e)
            })?;
        if self.nodelay {
            tcp.set_nodelay(true).map_err(DialError::Transport)?;
        }
        self.engine.handshake(ctx, tcp, server_name).await
    }
}

#[async_trait]
impl DialTls for MimicDialer {
    type Conn = MimicStream<TcpStream>;

    async fn dial_tls(
        &self,
        ctx: &DialContext,
        network: &str,
        addr: &str,
    ) -> Result<Self::Conn, DialError> {
        self.dial(ctx, network, addr).await
    }
}

#[derive(Debug)]
pub struct MimicDialerBuilder {
    pub profile: FingerprintProfile,
    pub alpn: Vec<Vec<u8>>,
    pub roots: Option<RootCertStore>,
    pub nodelay: bool,
}

impl Default for MimicDialerBuilder {
    fn default() -> Self {
        Self {
            profile: FingerprintProfile::default(),
            alpn: Vec::new(),
            roots: None,
            nodelay: true,
        }
    }
}

impl MimicDialerBuilder {
    pub fn with_profile(&mut self, profile: FingerprintProfile) -> &mut Self {
        self.profile = profile;
        self
    }

    /// ALPN preferences of the owning HTTP client. Captured here once; an
    /// empty list means the profile's own default.
    pub fn with_alpn<I, P>(&mut self, alpn: I) -> &mut Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Vec<u8>>,
    {
        self.alpn = alpn.into_iter().map(Into::into).collect();
        self
    }

    /// Trust anchors for server certificates; defaults to the Mozilla set
    /// shipped in `webpki-roots`.
    pub fn with_root_store(&mut self, roots: RootCertStore) -> &mut Self {
        self.roots = Some(roots);
        self
    }

    pub fn with_nodelay(&mut self, nodelay: bool) -> &mut Self {
        self.nodelay = nodelay;
        self
    }

    pub fn build(&self) -> Result<MimicDialer, DialError> {
        let alpn = if self.alpn.is_empty() {
            self.profile.default_alpn()
        } else {
            self.alpn.clone()
        };
        let template = self.profile.template(&alpn)?;
        let roots = self.roots.clone().unwrap_or_else(|| {
            let mut root_store = RootCertStore::empty();
            root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            root_store
        });

        #[cfg(feature = "ja3")]
        let ja3 = Some(template.ja3_hash());
        #[cfg(not(feature = "ja3"))]
        let ja3: Option<String> = None;
        #[cfg(feature = "ja4")]
        let ja4 = Some(template.ja4_hash());
        #[cfg(not(feature = "ja4"))]
        let ja4: Option<String> = None;
        info!(
            profile = %self.profile,
            ja3 = ja3.as_deref(),
            ja4 = ja4.as_deref(),
            "fingerprint profile loaded"
        );

        let engine = HandshakeEngine::new(Arc::new(template), Arc::new(roots), alpn)?;
        Ok(MimicDialer {
            profile: self.profile,
            engine,
            nodelay: self.nodelay,
        })
    }
}
