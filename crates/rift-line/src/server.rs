//! TCP front end for the stub engine.
//!
//! Accepts connections on a tokio listener and serves each one with the
//! blocking dispatch loop on tokio's blocking pool. A semaphore bounds the
//! number of connections served at once; further connections wait in the
//! accept backlog until a permit frees up.

use crate::channel::{DelimitedReader, DEFAULT_MAX_REQUEST_BYTES};
use crate::engine::StubEngine;
use std::io::BufReader;
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, info};

pub struct StubServer {
    listener: TcpListener,
    engine: Arc<StubEngine>,
    delimiter: String,
    max_request_bytes: usize,
    permits: Arc<Semaphore>,
}

impl StubServer {
    pub async fn bind(
        addr: SocketAddr,
        engine: Arc<StubEngine>,
        delimiter: impl Into<String>,
        max_connections: usize,
    ) -> Result<Self, anyhow::Error> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            engine,
            delimiter: delimiter.into(),
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            permits: Arc::new(Semaphore::new(max_connections.max(1))),
        })
    }

    /// Requests longer than this close their connection
    pub fn with_max_request_bytes(mut self, max_request_bytes: usize) -> Self {
        self.max_request_bytes = max_request_bytes.max(1);
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr, anyhow::Error> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the task is dropped
    pub async fn run(self) -> Result<(), anyhow::Error> {
        info!("Rift Line stub listening on tcp://{}", self.local_addr()?);

        loop {
            let permit = Arc::clone(&self.permits).acquire_owned().await?;
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    debug!("Failed to accept connection: {}", e);
                    continue;
                }
            };
            debug!("Accepted connection from {}", peer);

            let stream = match stream.into_std() {
                Ok(stream) => stream,
                Err(e) => {
                    debug!("Failed to convert connection from {}: {}", peer, e);
                    continue;
                }
            };
            let engine = Arc::clone(&self.engine);
            let delimiter = self.delimiter.clone();
            let max_request_bytes = self.max_request_bytes;

            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                match serve_connection(&engine, stream, &delimiter, max_request_bytes) {
                    Ok(handled) => debug!("Connection from {} closed after {} request(s)", peer, handled),
                    Err(e) => debug!("Connection from {} failed: {}", peer, e),
                }
            });
        }
    }
}

fn serve_connection(
    engine: &StubEngine,
    stream: TcpStream,
    delimiter: &str,
    max_request_bytes: usize,
) -> std::io::Result<u64> {
    stream.set_nonblocking(false)?;
    let mut writer = stream.try_clone()?;
    let mut requests = DelimitedReader::new(BufReader::new(stream), delimiter)
        .with_max_request_bytes(max_request_bytes);
    engine.serve(&mut requests, &mut writer)
}
