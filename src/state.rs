use crate::handshake::PeerSlot;
use rustls::client::ClientConnection;
use rustls::pki_types::CertificateDer;
use rustls::{CipherSuite, ProtocolVersion};
use std::io::{self, IoSlice};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio_rustls::client::TlsStream;

/// Negotiated parameters of an established connection, in the shape callers
/// of a stock TLS client expect. Values the handshake engine does not expose
/// are left empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionState {
    pub version: Option<ProtocolVersion>,
    pub handshake_complete: bool,
    pub did_resume: bool,
    pub cipher_suite: Option<CipherSuite>,
    pub negotiated_protocol: Option<Vec<u8>>,
    pub server_name: String,
    pub peer_certificates: Vec<CertificateDer<'static>>,
    pub verified_chains: Vec<Vec<CertificateDer<'static>>>,
    pub signed_certificate_timestamps: Vec<Vec<u8>>,
    pub ocsp_response: Vec<u8>,
}

pub trait ConnectionStateProvider {
    fn connection_state(&self) -> ConnectionState;
}

/// A TLS stream established with a mimicked ClientHello.
pub struct MimicStream<IO> {
    inner: TlsStream<IO>,
    server_name: String,
    peer: PeerSlot,
}

impl<IO> MimicStream<IO> {
    pub(crate) fn new(inner: TlsStream<IO>, server_name: String, peer: PeerSlot) -> Self {
        Self {
            inner,
            server_name,
            peer,
        }
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn alpn_protocol(&self) -> Option<&[u8]> {
        self.session().alpn_protocol()
    }

    pub fn get_ref(&self) -> &IO {
        self.inner.get_ref().0
    }

    pub fn session(&self) -> &ClientConnection {
        self.inner.get_ref().1
    }

    pub fn into_inner(self) -> TlsStream<IO> {
        self.inner
    }
}

impl<IO> MimicStream<IO>
where
    IO: AsyncRead + AsyncWrite + Unpin,
{
    /// Sends close_notify and shuts the transport down. Consumes the stream,
    /// so a connection can only be closed once.
    pub async fn close(mut self) -> io::Result<()> {
        self.inner.shutdown().await
    }
}

impl<IO> ConnectionStateProvider for MimicStream<IO> {
    fn connection_state(&self) -> ConnectionState {
        let session = self.session();
        let handshake_complete = !session.is_handshaking();
        let peer = self.peer.get();
        ConnectionState {
            version: session.protocol_version(),
            handshake_complete,
            // a completed handshake that never verified a certificate resumed a session
            did_resume: handshake_complete && peer.is_none(),
            cipher_suite: session.negotiated_cipher_suite().map(|s| s.suite()),
            negotiated_protocol: session.alpn_protocol().map(<[u8]>::to_vec),
            server_name: self.server_name.clone(),
            peer_certificates: session
                .peer_certificates()
                .map(<[CertificateDer<'static>]>::to_vec)
                .unwrap_or_default(),
            verified_chains: peer.map(|p| vec![p.chain.clone()]).unwrap_or_default(),
            signed_certificate_timestamps: Vec::new(),
            ocsp_response: peer.map(|p| p.ocsp_response.clone()).unwrap_or_default(),
        }
    }
}

impl<IO> AsyncRead for MimicStream<IO>
where
    IO: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

impl<IO> AsyncWrite for MimicStream<IO>
where
    IO: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

impl<IO> std::fmt::Debug for MimicStream<IO> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MimicStream")
            .field("server_name", &self.server_name)
            .field("alpn", &self.alpn_protocol().map(String::from_utf8_lossy))
            .finish_non_exhaustive()
    }
}
