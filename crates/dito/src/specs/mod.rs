//! Domain specifications.
//!
//! Each configured virtual host carries a spec that is turned into a
//! [`DomainHandler`] once, at startup:
//!
//! - `plain` - DSL rules with the HTTP matchers
//! - `graphql` - DSL rules plus GraphQL query matchers backed by a schema
//! - `openapi` - example responses taken from an OpenAPI document

mod graphql;
mod openapi;
mod plain;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::error::CompileError;
use crate::predicate::{graphql_matchers, http_matchers, MatcherRegistry};
use crate::response::{response_providers, ResponseRegistry};
use crate::routing::{DomainHandler, DomainTable};
use crate::workdir::WorkDir;

pub use graphql::GraphQlSpec;
pub use openapi::{OpenApiExamples, OpenApiSpec};
pub use plain::PlainSpec;

/// Shared state for turning specs into handlers. The call registries are
/// built once and reused for every domain.
pub struct SpecContext {
    pub workdir: Arc<dyn WorkDir>,
    http_matchers: MatcherRegistry,
    graphql_matchers: MatcherRegistry,
    responses: ResponseRegistry,
}

impl SpecContext {
    pub fn new(workdir: Arc<dyn WorkDir>) -> Self {
        Self {
            workdir,
            http_matchers: http_matchers(),
            graphql_matchers: graphql_matchers(),
            responses: response_providers(),
        }
    }

    /// Read a text file relative to the working directory.
    pub fn read_text(&self, path: &str) -> Result<String, CompileError> {
        let contents = self
            .workdir
            .read_blocking(path)
            .map_err(|source| CompileError::ReadFile {
                path: path.to_owned(),
                source,
            })?;
        Ok(String::from_utf8_lossy(&contents).into_owned())
    }
}

pub trait SpecHandler {
    fn handler(&self, ctx: &SpecContext) -> Result<DomainHandler, CompileError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DomainSpec {
    Plain(PlainSpec),
    OpenApi(OpenApiSpec),
    GraphQl(GraphQlSpec),
}

impl DomainSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            DomainSpec::Plain(_) => "plain",
            DomainSpec::OpenApi(_) => "openapi",
            DomainSpec::GraphQl(_) => "graphql",
        }
    }
}

impl SpecHandler for DomainSpec {
    fn handler(&self, ctx: &SpecContext) -> Result<DomainHandler, CompileError> {
        match self {
            DomainSpec::Plain(spec) => spec.handler(ctx),
            DomainSpec::OpenApi(spec) => spec.handler(ctx),
            DomainSpec::GraphQl(spec) => spec.handler(ctx),
        }
    }
}

/// Compile every domain. The first failing domain aborts the whole table.
pub fn build_domain_table(
    domains: &BTreeMap<String, DomainSpec>,
    ctx: &SpecContext,
) -> Result<DomainTable, CompileError> {
    let mut table = DomainTable::new();
    for (host, spec) in domains {
        info!(domain = %host, kind = spec.kind(), "compiling domain");
        let handler = spec.handler(ctx).map_err(|err| err.in_domain(host))?;
        table.insert(host.clone(), handler);
    }
    Ok(table)
}
