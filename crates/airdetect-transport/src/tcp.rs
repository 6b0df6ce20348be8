use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// Address sensors connect to when nothing else is configured.
pub const DEFAULT_DEVICE_ADDR: &str = "0.0.0.0:9000";

/// TCP listening endpoint for sensor devices.
///
/// Binding is the only fatal step of the transport; once bound, `accept`
/// failures are per-connection and callers decide whether to keep going.
pub struct TcpTransport {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TcpTransport {
    /// Bind and listen on `addr` (for example `0.0.0.0:9000` or `127.0.0.1:0`).
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| TransportError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        info!(%local_addr, "listening for sensor devices");

        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Accept an incoming connection.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr)> {
        let (stream, remote_addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::Accept)?;
        debug!(%remote_addr, "accepted connection");
        Ok((stream, remote_addr))
    }

    /// Connect to a listening transport, the way a device would.
    pub async fn connect(addr: SocketAddr) -> Result<TcpStream> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| TransportError::Connect { addr, source })?;
        debug!(%addr, "connected to device listener");
        Ok(stream)
    }

    /// The address this transport is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "tcp"
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    #[tokio::test]
    async fn test_bind_accept_connect() {
        let transport = TcpTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = transport.local_addr();
        assert_ne!(addr.port(), 0);

        let client = tokio::spawn(async move {
            let mut client = TcpTransport::connect(addr).await.unwrap();
            client.write_all(b"hello").await.unwrap();
            client.local_addr().unwrap()
        });

        let (mut server, remote_addr) = transport.accept().await.unwrap();
        let mut buf = [0u8; 5];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");

        let client_addr = client.await.unwrap();
        assert_eq!(remote_addr, client_addr);
    }

    #[tokio::test]
    async fn test_bind_invalid_address() {
        let result = TcpTransport::bind("not-an-address").await;
        assert!(matches!(result, Err(TransportError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_bind_address_in_use() {
        let first = TcpTransport::bind("127.0.0.1:0").await.unwrap();
        let taken = first.local_addr().to_string();

        let result = TcpTransport::bind(&taken).await;
        assert!(matches!(result, Err(TransportError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let addr = {
            let transport = TcpTransport::bind("127.0.0.1:0").await.unwrap();
            transport.local_addr()
        };

        let result = TcpTransport::connect(addr).await;
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }
}
