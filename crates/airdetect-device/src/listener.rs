use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use airdetect_transport::TcpTransport;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tracing::{info, info_span, warn, Instrument};

use crate::connection::{ConnectionConfig, DeviceConnection};
use crate::error::{DeviceError, Result};
use crate::stream::ReadingStream;

/// Pause after a failed accept, so a persistent failure such as descriptor
/// exhaustion does not spin the loop.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accepts sensor connections and runs one handler task per connection.
pub struct DeviceListener {
    transport: TcpTransport,
    config: ConnectionConfig,
    next_conn_id: AtomicU64,
}

impl DeviceListener {
    /// Bind the device port. This is the only fatal step.
    pub async fn bind(addr: &str) -> Result<Self> {
        let transport = TcpTransport::bind(addr).await?;
        Ok(Self {
            transport,
            config: ConnectionConfig::default(),
            next_conn_id: AtomicU64::new(1),
        })
    }

    /// Override per-connection config.
    pub fn with_config(mut self, config: ConnectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    /// Accept connections forever, publishing readings on `output`.
    ///
    /// Accept failures are logged, followed by [`ACCEPT_BACKOFF`], and do
    /// not stop the loop. There is no cap on concurrent connections.
    pub async fn run(self, output: ReadingStream) {
        loop {
            if let Err(err) = self.accept_one(&output).await {
                back_off(&err).await;
            }
        }
    }

    /// Run the accept loop on its own task.
    pub fn spawn(self, output: ReadingStream) -> JoinHandle<()> {
        tokio::spawn(self.run(output))
    }

    /// Accept one connection and spawn its handler.
    pub async fn accept_one(&self, output: &ReadingStream) -> Result<JoinHandle<()>> {
        let (stream, remote_addr) = self.transport.accept().await?;
        Ok(self.spawn_connection(stream, remote_addr, output.clone()))
    }

    fn spawn_connection(
        &self,
        stream: TcpStream,
        remote_addr: SocketAddr,
        output: ReadingStream,
    ) -> JoinHandle<()> {
        let id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let connection = DeviceConnection::with_config(stream, remote_addr, &self.config);
        let span = info_span!("connection", id, remote = %remote_addr);

        tokio::spawn(
            async move {
                info!("device connected");
                match connection.run(output).await {
                    Ok(()) => info!("device disconnected"),
                    Err(err) => warn!(error = %err, "connection closed"),
                }
            }
            .instrument(span),
        )
    }
}

async fn back_off(err: &DeviceError) {
    warn!(error = %err, backoff = ?ACCEPT_BACKOFF, "accept failed");
    tokio::time::sleep(ACCEPT_BACKOFF).await;
}
