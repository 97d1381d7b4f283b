use crate::context::DialContext;
use crate::error::DialError;
use crate::state::MimicStream;
use crate::HelloTemplate;
use rustls::client::danger::{
    DangerousClientConfig, HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use rustls::client::{Resumption, WebPkiServerVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use std::sync::{Arc, OnceLock};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

/// What certificate verification saw, kept for the connection state.
#[derive(Debug)]
pub(crate) struct PeerRecord {
    pub(crate) chain: Vec<CertificateDer<'static>>,
    pub(crate) ocsp_response: Vec<u8>,
}

pub(crate) type PeerSlot = Arc<OnceLock<PeerRecord>>;

/// WebPKI verification that remembers the chain it accepted.
#[derive(Debug)]
struct RecordingVerifier {
    inner: Arc<WebPkiServerVerifier>,
    record: PeerSlot,
}

impl ServerCertVerifier for RecordingVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let verified = self.inner.verify_server_cert(
            end_entity,
            intermediates,
            server_name,
            ocsp_response,
            now,
        )?;
        let mut chain = Vec::with_capacity(intermediates.len() + 1);
        chain.push(end_entity.clone().into_owned());
        chain.extend(intermediates.iter().map(|cert| cert.clone().into_owned()));
        let _ = self.record.set(PeerRecord {
            chain,
            ocsp_response: ocsp_response.to_vec(),
        });
        Ok(verified)
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

/// Runs client handshakes whose ClientHello is rewritten by a shared
/// [`HelloTemplate`].
#[derive(Debug)]
pub struct HandshakeEngine {
    template: Arc<HelloTemplate>,
    verifier: Arc<WebPkiServerVerifier>,
    alpn: Vec<Vec<u8>>,
}

impl HandshakeEngine {
    /// `alpn` must be the list the template was compiled with, since rustls
    /// checks the server's pick against it.
    pub fn new(
        template: Arc<HelloTemplate>,
        roots: Arc<RootCertStore>,
        alpn: Vec<Vec<u8>>,
    ) -> Result<Self, DialError> {
        let verifier = WebPkiServerVerifier::builder(roots)
            .build()
            .map_err(|e| DialError::Verifier(e.to_string()))?;
        Ok(Self {
            template,
            verifier,
            alpn,
        })
    }

    pub fn template(&self) -> &HelloTemplate {
        &self.template
    }

    pub fn alpn(&self) -> &[Vec<u8>] {
        &self.alpn
    }

    fn client_config(&self, record: PeerSlot) -> ClientConfig {
        let verifier = RecordingVerifier {
            inner: self.verifier.clone(),
            record,
        };
        let mut config = ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(verifier))
            .with_no_client_auth();
        config.alpn_protocols = self.alpn.clone();
        // tickets and PSKs would change the ClientHello between connections
        config.resumption = Resumption::disabled();
        DangerousClientConfig { cfg: &mut config }.set_hello_override(self.template.clone());
        config
    }

    /// Handshakes over `io`. The stream is owned by the handshake future, so
    /// a failure, a cancellation or a deadline drops (and closes) it before
    /// the error is returned.
    pub async fn handshake<IO>(
        &self,
        ctx: &DialContext,
        io: IO,
        server_name: ServerName<'static>,
    ) -> Result<MimicStream<IO>, DialError>
    where
        IO: AsyncRead + AsyncWrite + Unpin,
    {
        let record: PeerSlot = Arc::new(OnceLock::new());
        let connector = TlsConnector::from(Arc::new(self.client_config(record.clone())));
        let sni = server_name.to_str().into_owned();

        match ctx.run(connector.connect(server_name, io)).await {
            Ok(Ok(stream)) => {
                let conn = MimicStream::new(stream, sni, record);
                debug!(
                    server_name = %conn.server_name(),
                    alpn = ?conn.alpn_protocol().map(String::from_utf8_lossy),
                    "tls handshake complete"
                );
                Ok(conn)
            }
            Ok(Err(e)) => {
                warn!(server_name = %sni, error = %e, "tls handshake failed");
                Err(DialError::Handshake(e))
            }
            Err(e) => {
                debug!(server_name = %sni, error = %e, "tls handshake abandoned");
                Err(e)
            }
        }
    }
}
