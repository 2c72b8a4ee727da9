//! Channel transport endpoints
//!
//! Readers reach the daemon either through a serial-device server
//! exposing the port as a TCP socket (`tcp://host:port`) or through a
//! local device node already configured for raw line I/O. Both open
//! into boxed read/write halves so the dispatcher never cares which
//! transport a channel rides on.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Inbound byte stream of a channel
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
/// Outbound byte stream of a channel
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Where one reader channel's byte stream lives
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Endpoint {
    /// TCP connection to a serial-device server, `host:port`
    Tcp(String),
    /// Local device node, e.g. `/dev/ttyUSB0`
    Device(PathBuf),
}

impl Endpoint {
    /// Open the endpoint into read/write halves
    pub async fn open(&self) -> Result<(BoxedReader, BoxedWriter)> {
        match self {
            Endpoint::Tcp(addr) => {
                let stream = TcpStream::connect(addr)
                    .await
                    .map_err(|e| Error::PortOpen(format!("connect {}: {}", addr, e)))?;
                // Responses are single short lines; don't batch them
                let _ = stream.set_nodelay(true);
                let (reader, writer) = stream.into_split();
                Ok((Box::new(reader), Box::new(writer)))
            }
            Endpoint::Device(path) => {
                let reader = tokio::fs::OpenOptions::new()
                    .read(true)
                    .open(path)
                    .await
                    .map_err(|e| {
                        Error::PortOpen(format!("open {} for read: {}", path.display(), e))
                    })?;
                let writer = tokio::fs::OpenOptions::new()
                    .write(true)
                    .open(path)
                    .await
                    .map_err(|e| {
                        Error::PortOpen(format!("open {} for write: {}", path.display(), e))
                    })?;
                Ok((Box::new(reader), Box::new(writer)))
            }
        }
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::Config("endpoint must not be empty".to_string()));
        }
        if let Some(addr) = trimmed.strip_prefix("tcp://") {
            let valid = matches!(
                addr.rsplit_once(':'),
                Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok()
            );
            if !valid {
                return Err(Error::Config(format!(
                    "tcp endpoint needs host:port, got {:?}",
                    trimmed
                )));
            }
            return Ok(Endpoint::Tcp(addr.to_string()));
        }
        if trimmed.contains("://") {
            return Err(Error::Config(format!(
                "unsupported endpoint scheme: {:?}",
                trimmed
            )));
        }
        if !trimmed.starts_with('/') {
            return Err(Error::Config(format!(
                "endpoint must be tcp://host:port or an absolute device path, got {:?}",
                trimmed
            )));
        }
        Ok(Endpoint::Device(PathBuf::from(trimmed)))
    }
}

impl TryFrom<String> for Endpoint {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp(addr) => write!(f, "tcp://{}", addr),
            Endpoint::Device(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    #[test]
    fn test_parses_tcp_endpoint() {
        let endpoint: Endpoint = "tcp://10.0.8.21:4001".parse().unwrap();
        assert_eq!(endpoint, Endpoint::Tcp("10.0.8.21:4001".to_string()));
        assert_eq!(endpoint.to_string(), "tcp://10.0.8.21:4001");
    }

    #[test]
    fn test_parses_device_endpoint() {
        let endpoint: Endpoint = "/dev/ttyUSB0".parse().unwrap();
        assert_eq!(endpoint, Endpoint::Device(PathBuf::from("/dev/ttyUSB0")));
        assert_eq!(endpoint.to_string(), "/dev/ttyUSB0");
    }

    #[test]
    fn test_rejects_malformed_endpoints() {
        assert!("".parse::<Endpoint>().is_err());
        assert!("tcp://".parse::<Endpoint>().is_err());
        assert!("tcp://hostonly".parse::<Endpoint>().is_err());
        assert!("tcp://host:notaport".parse::<Endpoint>().is_err());
        assert!("serial:///dev/ttyUSB0".parse::<Endpoint>().is_err());
        assert!("dev/ttyUSB0".parse::<Endpoint>().is_err());
    }

    #[tokio::test]
    async fn test_opens_tcp_endpoint() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let accept = tokio::spawn(async move {
            let (mut peer, _) = listener.accept().await.unwrap();
            peer.write_all(b"1A2B3C4D\n").await.unwrap();
        });

        let endpoint = Endpoint::Tcp(addr.to_string());
        let (reader, _writer) = endpoint.open().await.unwrap();

        let mut line = String::new();
        BufReader::new(reader).read_line(&mut line).await.unwrap();
        assert_eq!(line, "1A2B3C4D\n");
        accept.await.unwrap();
    }

    #[tokio::test]
    async fn test_refused_connection_is_port_open_error() {
        // Bind then drop to find a port that is very likely closed
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let endpoint = Endpoint::Tcp(addr.to_string());
        let Err(err) = endpoint.open().await else {
            panic!("connect to a closed port succeeded");
        };
        assert!(matches!(err, Error::PortOpen(_)));
    }

    #[tokio::test]
    async fn test_opens_device_endpoint_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "DEADBEEF").unwrap();

        let endpoint = Endpoint::Device(file.path().to_path_buf());
        let (reader, _writer) = endpoint.open().await.unwrap();

        let mut line = String::new();
        BufReader::new(reader).read_line(&mut line).await.unwrap();
        assert_eq!(line, "DEADBEEF\n");
    }

    #[tokio::test]
    async fn test_missing_device_is_port_open_error() {
        let endpoint = Endpoint::Device(PathBuf::from("/nonexistent/ttyUSB9"));
        let Err(err) = endpoint.open().await else {
            panic!("open of a missing device succeeded");
        };
        assert!(matches!(err, Error::PortOpen(_)));
    }
}
