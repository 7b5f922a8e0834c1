//! HTTP/1 listener serving the domain table.

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::GracefulShutdown;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::ServerConfig;
use crate::metrics::{Metrics, UNKNOWN_DOMAIN};
use crate::predicate::IncomingRequest;
use crate::response::HttpResponse;
use crate::routing::DomainTable;

pub struct MockServer {
    state: ServerState,
    read_header_timeout: Duration,
    shutdown_timeout: Duration,
}

struct ServerState {
    domains: DomainTable,
    max_body_size: usize,
    metrics: Option<Arc<Metrics>>,
}

impl MockServer {
    pub fn new(domains: DomainTable, config: &ServerConfig) -> Self {
        Self {
            state: ServerState {
                domains,
                max_body_size: config.request.max_body_size.as_usize(),
                metrics: None,
            },
            read_header_timeout: config.read_header_timeout(),
            shutdown_timeout: config.shutdown_timeout(),
        }
    }

    /// Record request durations into `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.state.metrics = Some(metrics);
        self
    }

    /// Server with default limits and timeouts.
    pub fn with_domains(domains: DomainTable) -> Self {
        Self::new(domains, &ServerConfig::default())
    }

    /// Accept connections until `shutdown` resolves, then give open
    /// connections the shutdown timeout to finish.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        let local_addr = listener.local_addr()?;
        info!(address = %local_addr, domains = ?self.state.domains.hosts(), "listening");
        let shared = Arc::new(self.state);

        let mut builder = http1::Builder::new();
        builder
            .timer(TokioTimer::new())
            .header_read_timeout(self.read_header_timeout);

        let graceful = GracefulShutdown::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            let state = Arc::clone(&shared);
                            let service = service_fn(move |req| {
                                let state = Arc::clone(&state);
                                async move { Ok::<_, Infallible>(state.handle(req, peer).await) }
                            });
                            let connection = graceful.watch(
                                builder.serve_connection(TokioIo::new(stream), service),
                            );
                            tokio::spawn(async move {
                                if let Err(err) = connection.await {
                                    debug!(peer = %peer, error = %err, "connection error");
                                }
                            });
                        }
                        Err(err) => {
                            error!(error = %err, "accept error");
                        }
                    }
                }
                _ = &mut shutdown => {
                    info!("shutdown requested, draining connections");
                    break;
                }
            }
        }

        drop(listener);
        tokio::select! {
            _ = graceful.shutdown() => {
                info!("all connections closed");
            }
            _ = tokio::time::sleep(self.shutdown_timeout) => {
                warn!(timeout = ?self.shutdown_timeout, "shutdown timeout elapsed, dropping open connections");
            }
        }
        Ok(())
    }
}

impl ServerState {
    async fn handle(&self, req: Request<Incoming>, peer: SocketAddr) -> HttpResponse {
        let request = IncomingRequest::from_request(req, self.max_body_size);
        let span = info_span!(
            "request",
            method = %request.method(),
            host = %request.host(),
            path = %request.uri().path(),
            peer = %peer,
        );

        async {
            info!("request received");
            let started = Instant::now();
            let response = self.domains.dispatch(&request).await;
            let status = response.status().as_u16();
            debug!(status, "request completed");
            if let Some(metrics) = &self.metrics {
                let domain = if self.domains.get(request.host()).is_some() {
                    request.host()
                } else {
                    UNKNOWN_DOMAIN
                };
                metrics.record_request(domain, status, started.elapsed());
            }
            response
        }
        .instrument(span)
        .await
    }
}
