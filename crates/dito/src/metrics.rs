//! Prometheus metrics for dito.
//!
//! Tracks request latency per virtual host. Requests for hosts that are not
//! configured share the `unknown` label.

use bytes::Bytes;
use hyper::body::Incoming;
use hyper::header::HeaderValue;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, StatusCode};
use hyper_util::rt::TokioIo;
use prometheus::{Encoder, HistogramOpts, HistogramVec, Registry, TextEncoder};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::response::{HttpResponse, ResponseBuilder};

pub const UNKNOWN_DOMAIN: &str = "unknown";

pub struct Metrics {
    registry: Registry,
    request_duration: HistogramVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "dito_request_duration_seconds",
                "Time spent answering a request, by virtual host and status",
            ),
            &["domain", "status"],
        )?;
        registry.register(Box::new(request_duration.clone()))?;
        Ok(Self {
            registry,
            request_duration,
        })
    }

    pub fn record_request(&self, domain: &str, status: u16, elapsed: Duration) {
        self.request_duration
            .with_label_values(&[domain, &status.to_string()])
            .observe(elapsed.as_secs_f64());
    }

    /// All metrics in Prometheus text format
    pub fn collect(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
    }

    fn respond(&self, req: &Request<Incoming>) -> HttpResponse {
        if req.method() != Method::GET || req.uri().path() != "/metrics" {
            return ResponseBuilder::not_found().build();
        }
        match self.collect() {
            Ok(text) => ResponseBuilder::new(StatusCode::OK)
                .content_type(HeaderValue::from_static(prometheus::TEXT_FORMAT))
                .body(Bytes::from(text))
                .build(),
            Err(err) => {
                error!(error = %err, "failed to encode metrics");
                ResponseBuilder::error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).build()
            }
        }
    }
}

/// Serve `GET /metrics` until the task is dropped.
pub async fn serve(listener: TcpListener, metrics: Arc<Metrics>) {
    if let Ok(address) = listener.local_addr() {
        info!(address = %address, "metrics listening");
    }
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                error!(error = %err, "metrics accept error");
                continue;
            }
        };
        let metrics = Arc::clone(&metrics);
        tokio::spawn(async move {
            let service = service_fn(move |req: Request<Incoming>| {
                let response = metrics.respond(&req);
                async move { Ok::<_, Infallible>(response) }
            });
            if let Err(err) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                debug!(peer = %peer, error = %err, "metrics connection error");
            }
        });
    }
}
