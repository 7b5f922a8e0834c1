use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{SpecContext, SpecHandler};
use crate::error::CompileError;
use crate::graphql::GraphQlSchema;
use crate::predicate::MatcherContext;
use crate::response::ResponseContext;
use crate::routing::{DomainHandler, RuleCompiler};

/// Rules with GraphQL query matchers. All schema files are concatenated
/// into one schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphQlSpec {
    #[serde(default, alias = "schemes")]
    pub schemas: Vec<String>,
    #[serde(default)]
    pub rules: Vec<String>,
}

impl GraphQlSpec {
    fn load_schema(&self, ctx: &SpecContext) -> Result<GraphQlSchema, CompileError> {
        if self.schemas.is_empty() {
            return Err(CompileError::InvalidSchema(
                "no schema files configured".into(),
            ));
        }
        let sources = self
            .schemas
            .iter()
            .map(|path| ctx.read_text(path))
            .collect::<Result<Vec<_>, _>>()?;
        GraphQlSchema::from_sources(sources.iter().map(String::as_str))
    }
}

impl SpecHandler for GraphQlSpec {
    fn handler(&self, ctx: &SpecContext) -> Result<DomainHandler, CompileError> {
        let schema = Arc::new(self.load_schema(ctx)?);
        let matcher_ctx = MatcherContext::new(ctx.workdir.clone()).with_schema(schema);
        let response_ctx = ResponseContext {
            workdir: ctx.workdir.clone(),
        };
        let compiler = RuleCompiler {
            matchers: &ctx.graphql_matchers,
            matcher_ctx: &matcher_ctx,
            responses: &ctx.responses,
            response_ctx: &response_ctx,
        };
        compiler.compile_rules(self.rules.as_slice()).map(DomainHandler::Rules)
    }
}
