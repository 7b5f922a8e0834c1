use serde::{Deserialize, Serialize};

use super::{SpecContext, SpecHandler};
use crate::error::CompileError;
use crate::predicate::MatcherContext;
use crate::response::ResponseContext;
use crate::routing::{DomainHandler, RuleCompiler};

/// Rules using only the HTTP matchers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlainSpec {
    #[serde(default)]
    pub rules: Vec<String>,
}

impl SpecHandler for PlainSpec {
    fn handler(&self, ctx: &SpecContext) -> Result<DomainHandler, CompileError> {
        let matcher_ctx = MatcherContext::new(ctx.workdir.clone());
        let response_ctx = ResponseContext {
            workdir: ctx.workdir.clone(),
        };
        let compiler = RuleCompiler {
            matchers: &ctx.http_matchers,
            matcher_ctx: &matcher_ctx,
            responses: &ctx.responses,
            response_ctx: &response_ctx,
        };
        compiler.compile_rules(self.rules.as_slice()).map(DomainHandler::Rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workdir::MemoryWorkDir;
    use std::sync::Arc;

    fn ctx() -> SpecContext {
        SpecContext::new(Arc::new(MemoryWorkDir::new()))
    }

    #[test]
    fn test_plain_rules_compile() {
        let spec = PlainSpec {
            rules: vec![
                r#"Method("GET") -> Path("/health") => Status(200)"#.into(),
                "=> Status(404)".into(),
            ],
        };
        match spec.handler(&ctx()).unwrap() {
            DomainHandler::Rules(rules) => assert_eq!(rules.len(), 2),
            DomainHandler::External(_) => panic!("expected rule handler"),
        }
    }

    #[test]
    fn test_graphql_calls_rejected() {
        let spec = PlainSpec {
            rules: vec![r#"graphql.Query("{ a }") => Status(200)"#.into()],
        };
        let err = spec.handler(&ctx()).err().unwrap();
        assert!(matches!(err, CompileError::Rule { .. }));
    }
}
