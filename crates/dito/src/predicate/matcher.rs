//! Compiled request matchers.

use futures::future::{BoxFuture, FutureExt};
use hyper::header::HeaderName;
use hyper::Method;
use regex::Regex;

use super::json_path::JsonPathMatcher;
use super::request::IncomingRequest;
use crate::graphql::GraphQlQueryMatcher;

/// A compiled filter. Evaluation never fails: anything that goes wrong
/// while inspecting the request counts as a non-match.
#[derive(Debug, Clone)]
pub enum RequestMatcher {
    Method(Method),
    HeaderPresent(HeaderName),
    Header {
        name: HeaderName,
        value: String,
    },
    Path(String),
    PathPattern(Regex),
    Query {
        key: String,
        value: String,
    },
    QueryPattern {
        key: String,
        pattern: Regex,
    },
    JsonPath(JsonPathMatcher),
    GraphQlInlineQuery(GraphQlQueryMatcher),
    GraphQlFileQuery {
        file: String,
        query: GraphQlQueryMatcher,
    },
    /// Left-to-right AND that stops at the first failing matcher
    Chain(Vec<RequestMatcher>),
}

impl RequestMatcher {
    pub fn matches<'a>(&'a self, req: &'a IncomingRequest) -> BoxFuture<'a, bool> {
        async move {
            match self {
                RequestMatcher::Chain(matchers) => {
                    for matcher in matchers {
                        if !matcher.matches(req).await {
                            return false;
                        }
                    }
                    true
                }
                RequestMatcher::JsonPath(matcher) => matcher.matches(req).await,
                RequestMatcher::GraphQlInlineQuery(query)
                | RequestMatcher::GraphQlFileQuery { query, .. } => query.matches(req).await,
                head => head.matches_head(req),
            }
        }
        .boxed()
    }

    /// Matchers that only look at the request line and headers.
    fn matches_head(&self, req: &IncomingRequest) -> bool {
        match self {
            RequestMatcher::Method(method) => {
                req.method().as_str().eq_ignore_ascii_case(method.as_str())
            }
            RequestMatcher::HeaderPresent(name) => req
                .headers()
                .get(name)
                .is_some_and(|value| !value.is_empty()),
            RequestMatcher::Header { name, value } => req
                .headers()
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .any(|v| v.eq_ignore_ascii_case(value)),
            RequestMatcher::Path(path) => req.path() == path.as_str(),
            RequestMatcher::PathPattern(pattern) => pattern.is_match(&req.path()),
            RequestMatcher::Query { key, value } => {
                req.query_value(key).unwrap_or_default() == *value
            }
            RequestMatcher::QueryPattern { key, pattern } => {
                pattern.is_match(&req.query_value(key).unwrap_or_default())
            }
            RequestMatcher::JsonPath(_)
            | RequestMatcher::GraphQlInlineQuery(_)
            | RequestMatcher::GraphQlFileQuery { .. }
            | RequestMatcher::Chain(_) => false,
        }
    }
}
