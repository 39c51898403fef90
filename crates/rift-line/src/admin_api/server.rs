//! Admin API server.

use crate::admin_api::router::route_request;
use crate::engine::StubEngine;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info};

/// Lifecycle API for the orchestrator driving the stub
pub struct AdminApiServer {
    listener: TcpListener,
    engine: Arc<StubEngine>,
}

impl AdminApiServer {
    pub async fn bind(addr: SocketAddr, engine: Arc<StubEngine>) -> Result<Self, anyhow::Error> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, engine })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, anyhow::Error> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the admin API server
    pub async fn run(self) -> Result<(), anyhow::Error> {
        info!("Rift Line admin API listening on http://{}", self.local_addr()?);

        loop {
            let (stream, _) = self.listener.accept().await?;
            let io = TokioIo::new(stream);
            let engine = Arc::clone(&self.engine);

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let engine = Arc::clone(&engine);
                    async move { route_request(req, engine).await }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    debug!("Admin API connection error: {}", e);
                }
            });
        }
    }
}
