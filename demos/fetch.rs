//! Fetches a fingerprint echo service through a mimicked handshake and prints
//! what the server saw.
//!
//! cargo run --example fetch -- [profile] [host]
//!
//! With the default Android 11 OkHttp profile the reported JA3 hash is
//! cafe522b1f077145bca328ed52621259.

use std::time::Duration;

use mimic_dial::{ConnectionStateProvider, DialContext, DialTls, FingerprintProfile, MimicDialer};
use tokio::io::{stdout, AsyncReadExt, AsyncWriteExt};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let profile: FingerprintProfile = match args.next() {
        Some(name) => name.parse()?,
        None => FingerprintProfile::default(),
    };
    let host = args.next().unwrap_or_else(|| "tls.peet.ws".to_string());

    // http/1.1 only, since the request below is written by hand
    let dialer = MimicDialer::builder()
        .with_profile(profile)
        .with_alpn(["http/1.1"])
        .build()?;

    let ctx = DialContext::background().with_timeout(Duration::from_secs(10));
    let mut conn = dialer.dial_tls(&ctx, "tcp", &format!("{}:443", host)).await?;
    let state = conn.connection_state();
    eprintln!(
        "version: {:?}, ciphersuite: {:?}, alpn: {:?}",
        state.version,
        state.cipher_suite,
        state.negotiated_protocol.as_deref().map(String::from_utf8_lossy)
    );

    let request = format!(
        "GET /api/all HTTP/1.1\r\nHost: {}\r\nConnection: close\r\nAccept-Encoding: identity\r\n\r\n",
        host
    );
    conn.write_all(request.as_bytes()).await?;
    let mut plaintext = Vec::new();
    // servers often skip close_notify on Connection: close
    if let Err(e) = conn.read_to_end(&mut plaintext).await {
        if e.kind() != std::io::ErrorKind::UnexpectedEof {
            return Err(e.into());
        }
    }
    stdout().write_all(&plaintext).await?;
    Ok(())
}
