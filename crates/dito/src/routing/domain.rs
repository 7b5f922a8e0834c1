use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::rules::RuleSet;
use crate::predicate::IncomingRequest;
use crate::response::{HttpResponse, ResponseBuilder};

/// Request handling supplied from outside the rule DSL, e.g. the OpenAPI
/// example server.
#[async_trait]
pub trait ExternalHandler: Send + Sync {
    async fn handle(&self, req: &IncomingRequest) -> HttpResponse;
}

pub enum DomainHandler {
    Rules(RuleSet),
    External(Arc<dyn ExternalHandler>),
}

impl DomainHandler {
    pub async fn handle(&self, req: &IncomingRequest) -> HttpResponse {
        match self {
            DomainHandler::Rules(rules) => match rules.handle(req).await {
                Some(response) => response,
                None => {
                    debug!(path = %req.path(), "no rule matched");
                    ResponseBuilder::not_found().build()
                }
            },
            DomainHandler::External(handler) => handler.handle(req).await,
        }
    }
}

/// Virtual host to handler. Hosts are compared as exact strings, port
/// included.
#[derive(Default)]
pub struct DomainTable {
    domains: HashMap<String, DomainHandler>,
}

impl DomainTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, host: impl Into<String>, handler: DomainHandler) -> Option<DomainHandler> {
        self.domains.insert(host.into(), handler)
    }

    pub fn with_domain(mut self, host: impl Into<String>, handler: DomainHandler) -> Self {
        self.insert(host, handler);
        self
    }

    pub fn get(&self, host: &str) -> Option<&DomainHandler> {
        self.domains.get(host)
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Configured hosts in sorted order.
    pub fn hosts(&self) -> Vec<&str> {
        let mut hosts: Vec<&str> = self.domains.keys().map(String::as_str).collect();
        hosts.sort_unstable();
        hosts
    }

    pub async fn dispatch(&self, req: &IncomingRequest) -> HttpResponse {
        match self.domains.get(req.host()) {
            Some(handler) => handler.handle(req).await,
            None => {
                debug!(host = %req.host(), "no domain configured for host");
                ResponseBuilder::not_found().build()
            }
        }
    }
}
