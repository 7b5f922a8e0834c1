use tracing::{debug, info};

use crate::dsl::parse_rule;
use crate::error::CompileError;
use crate::predicate::{compile_filters, IncomingRequest, MatcherContext, MatcherRegistry, RequestMatcher};
use crate::response::{HttpResponse, ResponseContext, ResponseProvider, ResponseRegistry};

/// One rule, parsed and compiled.
#[derive(Debug)]
pub struct CompiledRule {
    pub rule: String,
    pub matcher: RequestMatcher,
    pub response: ResponseProvider,
}

/// Ordered rules of a domain. The first rule whose matcher accepts the
/// request answers it.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

/// Registries and contexts used to compile the rules of one domain.
pub struct RuleCompiler<'a> {
    pub matchers: &'a MatcherRegistry,
    pub matcher_ctx: &'a MatcherContext,
    pub responses: &'a ResponseRegistry,
    pub response_ctx: &'a ResponseContext,
}

impl RuleCompiler<'_> {
    pub fn compile_rule(&self, rule: &str) -> Result<CompiledRule, CompileError> {
        let compile = || -> Result<CompiledRule, CompileError> {
            let pipeline = parse_rule(rule)?;
            let matcher = compile_filters(self.matchers, self.matcher_ctx, &pipeline.filters)?;
            let response = self.responses.compile(self.response_ctx, &pipeline.response)?;
            Ok(CompiledRule {
                rule: rule.to_owned(),
                matcher,
                response,
            })
        };
        compile().map_err(|err| err.in_rule(rule))
    }

    pub fn compile_rules<S: AsRef<str>>(&self, rules: &[S]) -> Result<RuleSet, CompileError> {
        let rules = rules
            .iter()
            .map(|rule| {
                let compiled = self.compile_rule(rule.as_ref())?;
                info!(rule = %compiled.rule, "compiled rule");
                Ok(compiled)
            })
            .collect::<Result<Vec<_>, CompileError>>()?;
        Ok(RuleSet { rules })
    }
}

impl RuleSet {
    pub fn new(rules: Vec<CompiledRule>) -> Self {
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Answer with the first matching rule, `None` when no rule matches.
    pub async fn handle(&self, req: &IncomingRequest) -> Option<HttpResponse> {
        for compiled in &self.rules {
            if compiled.matcher.matches(req).await {
                debug!(rule = %compiled.rule, "rule matched");
                return Some(compiled.response.apply().await);
            }
        }
        None
    }
}
