//! HTTPS for the dev server.
//!
//! A self-signed key pair is generated on first use and kept in the working
//! directory as `key.pem`/`cert.pem`, so browsers only need to trust it once.

use rustls::ServerConfig;
use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tokio_rustls::server::TlsStream;

use crate::error::{CliError, Result};

pub const KEY_FILE_NAME: &str = "key.pem";
pub const CERT_FILE_NAME: &str = "cert.pem";

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Make sure `dir` holds a key pair for `host`, generating one if
/// `key.pem` is missing.
///
/// Returns the key and certificate paths.
pub fn ensure_keypair(host: &str, dir: &Path) -> Result<(PathBuf, PathBuf)> {
    let key_path = dir.join(KEY_FILE_NAME);
    let cert_path = dir.join(CERT_FILE_NAME);

    if key_path.exists() {
        return Ok((key_path, cert_path));
    }

    tracing::info!(host, "generating self-signed certificate");
    let rcgen::CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec![host.to_string()])
            .map_err(|e| CliError::Tls(format!("certificate generation failed: {e}")))?;

    std::fs::write(&cert_path, cert.pem())?;
    std::fs::write(&key_path, key_pair.serialize_pem())?;

    Ok((key_path, cert_path))
}

/// Load a PEM key pair into a rustls server configuration.
pub fn load_server_config(key_path: &Path, cert_path: &Path) -> Result<Arc<ServerConfig>> {
    let certs = rustls_pemfile::certs(&mut BufReader::new(open(cert_path)?))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| CliError::Tls(format!("{}: {e}", cert_path.display())))?;
    if certs.is_empty() {
        return Err(CliError::Tls(format!(
            "no certificate in {}",
            cert_path.display()
        )));
    }

    let key = rustls_pemfile::private_key(&mut BufReader::new(open(key_path)?))
        .map_err(|e| CliError::Tls(format!("{}: {e}", key_path.display())))?
        .ok_or_else(|| CliError::Tls(format!("no private key in {}", key_path.display())))?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| CliError::Tls(e.to_string()))?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| CliError::Tls(e.to_string()))?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(Arc::new(config))
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| CliError::Tls(format!("{}: {e}", path.display())))
}

/// A TCP listener that completes a TLS handshake before handing out
/// connections. Failed handshakes are logged and skipped.
pub struct TlsListener {
    inner: TcpListener,
    acceptor: TlsAcceptor,
}

impl TlsListener {
    pub fn new(inner: TcpListener, config: Arc<ServerConfig>) -> Self {
        Self {
            inner,
            acceptor: TlsAcceptor::from(config),
        }
    }
}

impl axum::serve::Listener for TlsListener {
    type Io = TlsStream<TcpStream>;
    type Addr = SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        loop {
            let (stream, addr) = match self.inner.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    continue;
                }
            };

            match tokio::time::timeout(HANDSHAKE_TIMEOUT, self.acceptor.accept(stream)).await {
                Ok(Ok(tls)) => return (tls, addr),
                Ok(Err(e)) => tracing::debug!(%addr, error = %e, "TLS handshake failed"),
                Err(_) => tracing::debug!(%addr, "TLS handshake timed out"),
            }
        }
    }

    fn local_addr(&self) -> std::io::Result<Self::Addr> {
        self.inner.local_addr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_keypair_generates_once() {
        let temp = TempDir::new().unwrap();

        let (key, cert) = ensure_keypair("localhost", temp.path()).unwrap();
        assert!(key.exists());
        assert!(cert.exists());
        let first = std::fs::read_to_string(&key).unwrap();
        assert!(first.contains("PRIVATE KEY"));

        // Existing key is kept.
        ensure_keypair("localhost", temp.path()).unwrap();
        assert_eq!(std::fs::read_to_string(&key).unwrap(), first);
    }

    #[test]
    fn test_load_generated_pair() {
        let temp = TempDir::new().unwrap();
        let (key, cert) = ensure_keypair("localhost", temp.path()).unwrap();
        let config = load_server_config(&key, &cert).unwrap();
        assert_eq!(config.alpn_protocols, vec![b"http/1.1".to_vec()]);
    }

    #[test]
    fn test_load_missing_cert() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(KEY_FILE_NAME), "").unwrap();
        let err = load_server_config(
            &temp.path().join(KEY_FILE_NAME),
            &temp.path().join(CERT_FILE_NAME),
        )
        .unwrap_err();
        assert!(matches!(err, CliError::Tls(_)));
    }
}
