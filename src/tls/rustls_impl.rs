use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;
use std::sync::Arc;

use log::debug;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ServerConfig, ServerConnection, StreamOwned};

/// A server-side TLS session over a blocking socket.
pub type TlsStream<S> = StreamOwned<ServerConnection, S>;

#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("TLS I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TLS configuration error: {0}")]
    Configuration(String),
    #[error("TLS handshake failed: {0}")]
    Handshake(String),
    #[error("no certificates found in file")]
    NoCertificatesFound,
    #[error("no private key found in file")]
    NoPrivateKeyFound,
}

impl From<TlsError> for crate::Error {
    fn from(err: TlsError) -> Self {
        crate::Error::Tls(err.to_string())
    }
}

/// Build a server configuration from a certificate chain and its key.
pub fn server_config(
    cert_chain: Vec<CertificateDer<'static>>,
    private_key: PrivateKeyDer<'static>,
) -> Result<Arc<ServerConfig>, TlsError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| TlsError::Configuration(e.to_string()))?
        .with_no_client_auth()
        .with_single_cert(cert_chain, private_key)
        .map_err(|e| TlsError::Configuration(e.to_string()))?;

    Ok(Arc::new(config))
}

/// Accepts TLS sessions on already-connected sockets.
#[derive(Clone)]
pub struct TlsAcceptor {
    config: Arc<ServerConfig>,
}

impl TlsAcceptor {
    pub fn new(config: Arc<ServerConfig>) -> Self {
        Self { config }
    }

    /// Load the certificate chain and private key from a single PEM file.
    pub fn from_pem_file(path: &Path) -> Result<Self, TlsError> {
        Self::from_pem_files(path, path)
    }

    /// Load the certificate chain and private key from separate PEM files.
    pub fn from_pem_files(cert_path: &Path, key_path: &Path) -> Result<Self, TlsError> {
        let certs = load_certs_from_file(cert_path)?;
        let key = load_private_key_from_file(key_path)?;
        Ok(Self::new(server_config(certs, key)?))
    }

    /// Run the TLS handshake on `stream` and return the encrypted stream.
    pub fn accept<S: Read + Write>(&self, mut stream: S) -> Result<TlsStream<S>, TlsError> {
        let mut conn = ServerConnection::new(Arc::clone(&self.config))
            .map_err(|e| TlsError::Handshake(e.to_string()))?;

        while conn.is_handshaking() {
            conn.complete_io(&mut stream).map_err(|e| {
                debug!("TLS handshake failed: {}", e);
                TlsError::Handshake(e.to_string())
            })?;
        }

        Ok(StreamOwned::new(conn, stream))
    }
}

impl std::fmt::Debug for TlsAcceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsAcceptor").finish_non_exhaustive()
    }
}

pub fn load_certs_from_file(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let certs: Vec<CertificateDer<'static>> =
        rustls_pemfile::certs(&mut reader).collect::<Result<Vec<_>, _>>()?;

    if certs.is_empty() {
        return Err(TlsError::NoCertificatesFound);
    }

    Ok(certs)
}

pub fn load_private_key_from_file(path: &Path) -> Result<PrivateKeyDer<'static>, TlsError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    for item in rustls_pemfile::read_all(&mut reader) {
        match item? {
            rustls_pemfile::Item::Pkcs1Key(key) => return Ok(PrivateKeyDer::Pkcs1(key)),
            rustls_pemfile::Item::Pkcs8Key(key) => return Ok(PrivateKeyDer::Pkcs8(key)),
            rustls_pemfile::Item::Sec1Key(key) => return Ok(PrivateKeyDer::Sec1(key)),
            _ => continue,
        }
    }

    Err(TlsError::NoPrivateKeyFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use tempfile::NamedTempFile;

    fn self_signed_pem() -> String {
        let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        format!("{}{}", cert.cert.pem(), cert.key_pair.serialize_pem())
    }

    fn temp_file(contents: &[u8]) -> NamedTempFile {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(contents).unwrap();
        temp.flush().unwrap();
        temp
    }

    #[test]
    fn test_tls_error_display() {
        let config_err = TlsError::Configuration("bad config".to_string());
        assert!(config_err.to_string().contains("TLS configuration error"));
        assert!(config_err.to_string().contains("bad config"));

        assert!(
            TlsError::NoCertificatesFound
                .to_string()
                .contains("no certificates found")
        );
        assert!(
            TlsError::NoPrivateKeyFound
                .to_string()
                .contains("no private key found")
        );
    }

    #[test]
    fn test_tls_error_source() {
        let io_err = TlsError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "test"));
        assert!(io_err.source().is_some());
        assert!(TlsError::NoCertificatesFound.source().is_none());
    }

    #[test]
    fn test_tls_error_into_crate_error() {
        let err: crate::Error = TlsError::NoPrivateKeyFound.into();
        assert!(matches!(err, crate::Error::Tls(msg) if msg.contains("private key")));
    }

    #[test]
    fn test_load_certs_file_not_found() {
        let result = load_certs_from_file(Path::new("/nonexistent/path/cert.pem"));
        assert!(matches!(result, Err(TlsError::Io(_))));
    }

    #[test]
    fn test_load_certs_no_certs_in_file() {
        let temp = temp_file(b"not a certificate\njust some text\n");
        let result = load_certs_from_file(temp.path());
        assert!(matches!(result, Err(TlsError::NoCertificatesFound)));
    }

    #[test]
    fn test_load_private_key_empty_file() {
        let temp = temp_file(b"");
        let result = load_private_key_from_file(temp.path());
        assert!(matches!(result, Err(TlsError::NoPrivateKeyFound)));
    }

    #[test]
    fn test_acceptor_from_combined_pem_file() {
        let temp = temp_file(self_signed_pem().as_bytes());
        assert_eq!(load_certs_from_file(temp.path()).unwrap().len(), 1);
        assert!(TlsAcceptor::from_pem_file(temp.path()).is_ok());
    }

    #[test]
    fn test_acceptor_requires_key() {
        let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let temp = temp_file(cert.cert.pem().as_bytes());
        assert!(matches!(
            TlsAcceptor::from_pem_file(temp.path()),
            Err(TlsError::NoPrivateKeyFound)
        ));
    }
}
