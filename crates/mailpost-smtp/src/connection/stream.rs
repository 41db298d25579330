//! Low-level SMTP stream handling.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rustls::pki_types::ServerName;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::{
    TlsConnector,
    rustls::{ClientConfig, RootCertStore},
};

use crate::error::{Error, Result};

/// SMTP stream (TCP or TLS).
#[derive(Debug)]
pub enum SmtpStream {
    /// Plain TCP connection.
    Tcp(BufReader<TcpStream>),
    /// TLS-encrypted connection.
    Tls(Box<BufReader<tokio_rustls::client::TlsStream<TcpStream>>>),
}

impl SmtpStream {
    /// Reads a line from the stream, without its line ending.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the server closed the
    /// connection.
    pub async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = match self {
            Self::Tcp(reader) => reader.read_line(&mut line).await?,
            Self::Tls(reader) => reader.read_line(&mut line).await?,
        };
        if read == 0 {
            return Err(Error::Protocol("Connection closed by server".into()));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Writes data to the stream and flushes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        match self {
            Self::Tcp(reader) => {
                reader.get_mut().write_all(data).await?;
                reader.get_mut().flush().await?;
            }
            Self::Tls(reader) => {
                reader.get_mut().write_all(data).await?;
                reader.get_mut().flush().await?;
            }
        }
        Ok(())
    }

    /// Upgrades a TCP stream to TLS.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is already encrypted or the TLS
    /// handshake fails.
    pub async fn upgrade_to_tls(self, hostname: &str, connector: &TlsConnector) -> Result<Self> {
        let tcp_stream = match self {
            Self::Tcp(reader) => reader.into_inner(),
            Self::Tls(_) => return Err(Error::Protocol("Already using TLS".into())),
        };
        handshake(tcp_stream, hostname, connector).await
    }

    /// Returns the local socket address.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket is no longer connected.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        let addr = match self {
            Self::Tcp(reader) => reader.get_ref().local_addr()?,
            Self::Tls(reader) => reader.get_ref().get_ref().0.local_addr()?,
        };
        Ok(addr)
    }

    /// Returns true once the stream is encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }
}

/// Connects to an SMTP server over plain TCP.
///
/// # Errors
///
/// Returns an error if the connection fails or times out.
pub async fn connect(hostname: &str, port: u16, timeout: Duration) -> Result<SmtpStream> {
    let stream = dial(hostname, port, timeout).await?;
    Ok(SmtpStream::Tcp(BufReader::new(stream)))
}

/// Connects to an SMTP server over TLS (implicit TLS on port 465).
///
/// # Errors
///
/// Returns an error if the connection or TLS handshake fails.
pub async fn connect_tls(
    hostname: &str,
    port: u16,
    timeout: Duration,
    connector: &TlsConnector,
) -> Result<SmtpStream> {
    let stream = dial(hostname, port, timeout).await?;
    handshake(stream, hostname, connector).await
}

async fn dial(hostname: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    let addr = format!("{hostname}:{port}");
    tracing::debug!(%addr, "Connecting");
    let stream = tokio::time::timeout(timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| Error::Timeout(addr.clone()))??;
    Ok(stream)
}

async fn handshake(
    stream: TcpStream,
    hostname: &str,
    connector: &TlsConnector,
) -> Result<SmtpStream> {
    let server_name = ServerName::try_from(hostname.to_string())
        .map_err(|_| Error::Protocol(format!("Invalid hostname: {hostname}")))?;
    let tls_stream = connector.connect(server_name, stream).await?;
    tracing::debug!(hostname, "TLS established");
    Ok(SmtpStream::Tls(Box::new(BufReader::new(tls_stream))))
}

/// Creates a TLS connector.
///
/// With `root_ca`, only the certificates in that PEM file are trusted;
/// otherwise the bundled web PKI roots are used.
///
/// # Errors
///
/// Returns [`Error::Certificate`] if the PEM file cannot be read or holds
/// no usable certificate.
pub fn tls_connector(root_ca: Option<&Path>) -> Result<TlsConnector> {
    let root_store = match root_ca {
        Some(path) => load_root_ca(path)?,
        None => RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        },
    };

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Ok(TlsConnector::from(Arc::new(config)))
}

fn load_root_ca(path: &Path) -> Result<RootCertStore> {
    let cert_error = |reason: String| Error::Certificate {
        path: path.to_path_buf(),
        reason,
    };

    let file = std::fs::File::open(path).map_err(|e| cert_error(e.to_string()))?;
    let mut reader = std::io::BufReader::new(file);

    let mut store = RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut reader) {
        let cert = cert.map_err(|e| cert_error(e.to_string()))?;
        store.add(cert).map_err(|e| cert_error(e.to_string()))?;
    }

    if store.is_empty() {
        return Err(cert_error("no certificates found".into()));
    }
    tracing::debug!(path = %path.display(), count = store.len(), "Loaded root CA");
    Ok(store)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[test]
    fn test_missing_root_ca() {
        let Err(err) = tls_connector(Some(Path::new("/does/not/exist.pem"))) else {
            panic!("expected a certificate error");
        };
        assert!(matches!(err, Error::Certificate { .. }));
    }

    #[test]
    fn test_root_ca_without_certificates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.pem");
        std::fs::write(&path, "not a certificate\n").unwrap();

        let Err(err) = tls_connector(Some(&path)) else {
            panic!("expected a certificate error");
        };
        assert!(err.to_string().contains("no certificates found"));
    }

    #[tokio::test]
    async fn test_read_line_and_eof() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"220 ready\r\n").await.unwrap();
            let mut buf = [0u8; 6];
            socket.read_exact(&mut buf).await.unwrap();
            assert_eq!(&buf, b"NOOP\r\n");
        });

        let mut stream = connect("127.0.0.1", port, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(!stream.is_tls());
        assert_eq!(stream.local_addr().unwrap().ip().to_string(), "127.0.0.1");
        assert_eq!(stream.read_line().await.unwrap(), "220 ready");
        stream.write_all(b"NOOP\r\n").await.unwrap();
        server.await.unwrap();

        let err = stream.read_line().await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }
}
