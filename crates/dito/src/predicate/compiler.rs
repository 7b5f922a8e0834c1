//! DSL calls to [`RequestMatcher`]s.

use hyper::header::HeaderName;
use hyper::Method;
use regex::Regex;
use std::sync::Arc;

use super::json_path::JsonPathMatcher;
use super::matcher::RequestMatcher;
use crate::dsl::{Call, Param};
use crate::error::CompileError;
use crate::graphql::{GraphQlQueryMatcher, GraphQlSchema};
use crate::registry::{param, string_param, CallRegistry, DEFAULT_MODULE};
use crate::workdir::WorkDir;

/// Methods accepted by `Method(..)`, sorted for binary search.
pub const HTTP_METHODS: [&str; 9] = [
    "CONNECT", "DELETE", "GET", "HEAD", "OPTIONS", "PATCH", "POST", "PUT", "TRACE",
];

/// What matcher constructors may depend on.
#[derive(Clone)]
pub struct MatcherContext {
    pub schema: Option<Arc<GraphQlSchema>>,
    pub workdir: Arc<dyn WorkDir>,
}

impl MatcherContext {
    pub fn new(workdir: Arc<dyn WorkDir>) -> Self {
        Self {
            schema: None,
            workdir,
        }
    }

    pub fn with_schema(mut self, schema: Arc<GraphQlSchema>) -> Self {
        self.schema = Some(schema);
        self
    }
}

pub type MatcherRegistry = CallRegistry<RequestMatcher, MatcherContext>;

/// Matchers available in every domain.
pub fn http_matchers() -> MatcherRegistry {
    CallRegistry::new(DEFAULT_MODULE)
        .register("http.method(string)", method)
        .register("http.headerpresent(string)", header_present)
        .register("http.header(string,string)", header)
        .register("http.path(string)", path)
        .register("http.pathpattern(string)", path_pattern)
        .register("http.query(string,string)", query)
        .register("http.querypattern(string,string)", query_pattern)
        .register("http.jsonpath(string,string)", json_path)
        .register("http.jsonpath(string,int)", json_path)
        .register("http.jsonpath(string,float)", json_path)
}

/// HTTP matchers plus the GraphQL query matchers.
pub fn graphql_matchers() -> MatcherRegistry {
    http_matchers()
        .register("graphql.query(string)", graphql_query)
        .register("graphql.queryfromfile(string)", graphql_query_from_file)
}

/// Compile a rule's filters into one chain, preserving their order.
pub fn compile_filters(
    registry: &MatcherRegistry,
    ctx: &MatcherContext,
    filters: &[Call],
) -> Result<RequestMatcher, CompileError> {
    filters
        .iter()
        .map(|call| registry.compile(ctx, call))
        .collect::<Result<Vec<_>, _>>()
        .map(RequestMatcher::Chain)
}

fn method(_: &MatcherContext, params: &[Param]) -> Result<RequestMatcher, CompileError> {
    let literal = string_param(params, 0)?;
    if HTTP_METHODS.binary_search(&literal).is_err() {
        return Err(CompileError::InvalidMethod(literal.to_owned()));
    }
    Method::from_bytes(literal.as_bytes())
        .map(RequestMatcher::Method)
        .map_err(|_| CompileError::InvalidMethod(literal.to_owned()))
}

fn header_present(
    _: &MatcherContext,
    params: &[Param],
) -> Result<RequestMatcher, CompileError> {
    Ok(RequestMatcher::HeaderPresent(header_name(string_param(params, 0)?)?))
}

fn header(_: &MatcherContext, params: &[Param]) -> Result<RequestMatcher, CompileError> {
    Ok(RequestMatcher::Header {
        name: header_name(string_param(params, 0)?)?,
        value: string_param(params, 1)?.to_owned(),
    })
}

fn path(_: &MatcherContext, params: &[Param]) -> Result<RequestMatcher, CompileError> {
    Ok(RequestMatcher::Path(string_param(params, 0)?.to_owned()))
}

fn path_pattern(
    _: &MatcherContext,
    params: &[Param],
) -> Result<RequestMatcher, CompileError> {
    Ok(RequestMatcher::PathPattern(regex(string_param(params, 0)?)?))
}

fn query(_: &MatcherContext, params: &[Param]) -> Result<RequestMatcher, CompileError> {
    Ok(RequestMatcher::Query {
        key: string_param(params, 0)?.to_owned(),
        value: string_param(params, 1)?.to_owned(),
    })
}

fn query_pattern(
    _: &MatcherContext,
    params: &[Param],
) -> Result<RequestMatcher, CompileError> {
    Ok(RequestMatcher::QueryPattern {
        key: string_param(params, 0)?.to_owned(),
        pattern: regex(string_param(params, 1)?)?,
    })
}

fn json_path(
    _: &MatcherContext,
    params: &[Param],
) -> Result<RequestMatcher, CompileError> {
    let expression = string_param(params, 0)?;
    let expected = param(params, 1)?.to_json();
    Ok(RequestMatcher::JsonPath(JsonPathMatcher::compile(
        expression, expected,
    )?))
}

fn graphql_query(
    ctx: &MatcherContext,
    params: &[Param],
) -> Result<RequestMatcher, CompileError> {
    let matcher = GraphQlQueryMatcher::new(require_schema(ctx)?, string_param(params, 0)?)?;
    Ok(RequestMatcher::GraphQlInlineQuery(matcher))
}

fn graphql_query_from_file(
    ctx: &MatcherContext,
    params: &[Param],
) -> Result<RequestMatcher, CompileError> {
    let file = string_param(params, 0)?;
    let contents = ctx
        .workdir
        .read_blocking(file)
        .map_err(|source| CompileError::ReadFile {
            path: file.to_owned(),
            source,
        })?;
    let query = GraphQlQueryMatcher::new(require_schema(ctx)?, &String::from_utf8_lossy(&contents))?;
    Ok(RequestMatcher::GraphQlFileQuery {
        file: file.to_owned(),
        query,
    })
}

fn require_schema(ctx: &MatcherContext) -> Result<Arc<GraphQlSchema>, CompileError> {
    ctx.schema
        .clone()
        .ok_or_else(|| CompileError::InvalidSchema("no schema configured for this domain".into()))
}

fn header_name(name: &str) -> Result<HeaderName, CompileError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| CompileError::InvalidHeaderName(name.to_owned()))
}

fn regex(pattern: &str) -> Result<Regex, CompileError> {
    Regex::new(pattern).map_err(|source| CompileError::InvalidPattern {
        pattern: pattern.to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::parse_rule;
    use crate::workdir::MemoryWorkDir;

    const SDL: &str = "type Query { user: User } type User { id: ID name: String }";

    fn ctx() -> MatcherContext {
        let workdir = MemoryWorkDir::new().with_file("queries/user.graphql", "{ user { name id } }");
        MatcherContext::new(Arc::new(workdir))
            .with_schema(Arc::new(GraphQlSchema::parse(SDL).unwrap()))
    }

    fn compile(registry: &MatcherRegistry, rule: &str) -> Result<RequestMatcher, CompileError> {
        let pipeline = parse_rule(rule).unwrap();
        compile_filters(registry, &ctx(), &pipeline.filters)
    }

    #[test]
    fn test_methods_sorted() {
        let mut sorted = HTTP_METHODS;
        sorted.sort_unstable();
        assert_eq!(sorted, HTTP_METHODS);
    }

    #[test]
    fn test_compile_http_chain_in_order() {
        let matcher = compile(
            &http_matchers(),
            r#"Method("POST") -> Header("X-Env", "test") -> Path("/a") => Status(200)"#,
        )
        .unwrap();
        match matcher {
            RequestMatcher::Chain(chain) => {
                assert_eq!(chain.len(), 3);
                assert!(matches!(&chain[0], RequestMatcher::Method(m) if *m == Method::POST));
                assert!(matches!(&chain[1], RequestMatcher::Header { name, .. } if *name == "x-env"));
                assert!(matches!(&chain[2], RequestMatcher::Path(p) if p == "/a"));
            }
            other => panic!("expected chain, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_filters_compile_to_empty_chain() {
        let matcher = compile(&http_matchers(), "=> Status(204)").unwrap();
        assert!(matches!(matcher, RequestMatcher::Chain(ref c) if c.is_empty()));
    }

    #[test]
    fn test_invalid_method() {
        let err = compile(&http_matchers(), r#"Method("FETCH") => Status(200)"#).unwrap_err();
        assert!(matches!(err, CompileError::InvalidMethod(m) if m == "FETCH"));
    }

    #[test]
    fn test_method_literal_is_case_sensitive() {
        for literal in ["post", "Get", "delete"] {
            let rule = format!(r#"Method("{literal}") => Status(200)"#);
            let err = compile(&http_matchers(), &rule).unwrap_err();
            assert!(matches!(err, CompileError::InvalidMethod(ref m) if m == literal), "{literal}");
        }
    }

    #[test]
    fn test_method_signature_is_typed() {
        let err = compile(&http_matchers(), "Method(1) => Status(200)").unwrap_err();
        assert!(matches!(err, CompileError::UnknownCall { signature, .. } if signature == "http.method(int)"));
    }

    #[test]
    fn test_invalid_regex() {
        let err = compile(&http_matchers(), r#"PathPattern("(") => Status(200)"#).unwrap_err();
        assert!(matches!(err, CompileError::InvalidPattern { .. }));
    }

    #[test]
    fn test_json_path_literal_types() {
        for rule in [
            r#"JsonPath("$.a", "x") => Status(200)"#,
            r#"JsonPath("$.a", 1) => Status(200)"#,
            r#"JsonPath("$.a", 1.5) => Status(200)"#,
        ] {
            assert!(compile(&http_matchers(), rule).is_ok(), "{rule}");
        }
    }

    #[test]
    fn test_graphql_calls_unknown_in_http_registry() {
        let err = compile(&http_matchers(), r#"graphql.Query("{ user { id } }") => Status(200)"#)
            .unwrap_err();
        assert!(matches!(err, CompileError::UnknownCall { .. }));
    }

    #[test]
    fn test_graphql_matchers() {
        let registry = graphql_matchers();
        assert!(compile(&registry, r#"graphql.Query("{ user { id } }") => Status(200)"#).is_ok());
        let from_file = compile(
            &registry,
            r#"graphql.QueryFromFile("queries/user.graphql") => Status(200)"#,
        )
        .unwrap();
        match from_file {
            RequestMatcher::Chain(chain) => assert!(matches!(
                &chain[0],
                RequestMatcher::GraphQlFileQuery { file, .. } if file == "queries/user.graphql"
            )),
            other => panic!("expected chain, got {other:?}"),
        }
    }

    #[test]
    fn test_graphql_reference_errors() {
        let registry = graphql_matchers();
        assert!(matches!(
            compile(&registry, r#"graphql.Query("{ post { id } }") => Status(200)"#),
            Err(CompileError::InvalidQuery(_))
        ));
        assert!(matches!(
            compile(&registry, r#"graphql.QueryFromFile("missing.graphql") => Status(200)"#),
            Err(CompileError::ReadFile { .. })
        ));
    }
}
