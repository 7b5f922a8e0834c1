//! Compile-time errors.
//!
//! Every variant is fatal: a configuration that produces one of these is
//! rejected before the server starts listening.

use crate::dsl::{GrammarError, ParamTypeMismatch};
use crate::graphql::QueryError;

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error("unknown call '{call}' (signature '{signature}')")]
    UnknownCall { call: String, signature: String },

    #[error(transparent)]
    ParamType(#[from] ParamTypeMismatch),

    #[error("missing parameter at position {0}")]
    MissingParam(usize),

    #[error("method '{0}' is not a valid HTTP method")]
    InvalidMethod(String),

    #[error("invalid header name '{0}'")]
    InvalidHeaderName(String),

    #[error("invalid header value '{0}'")]
    InvalidHeaderValue(String),

    #[error("status code {0} is out of range")]
    InvalidStatus(i64),

    #[error("failed to compile pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid JSONPath expression '{path}': {source}")]
    InvalidJsonPath {
        path: String,
        #[source]
        source: serde_json_path::ParseError,
    },

    #[error("invalid GraphQL schema: {0}")]
    InvalidSchema(String),

    #[error("invalid GraphQL reference query: {0}")]
    InvalidQuery(#[from] QueryError),

    #[error("invalid OpenAPI document '{path}': {message}")]
    InvalidOpenApi { path: String, message: String },

    #[error("failed to read file {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to compile rule `{rule}`: {source}")]
    Rule {
        rule: String,
        #[source]
        source: Box<CompileError>,
    },

    #[error("domain '{domain}': {source}")]
    Domain {
        domain: String,
        #[source]
        source: Box<CompileError>,
    },
}

impl CompileError {
    /// Attach the rule text this error was raised for.
    pub fn in_rule(self, rule: &str) -> Self {
        CompileError::Rule {
            rule: rule.to_owned(),
            source: Box::new(self),
        }
    }

    /// Attach the virtual host this error was raised for.
    pub fn in_domain(self, domain: &str) -> Self {
        CompileError::Domain {
            domain: domain.to_owned(),
            source: Box::new(self),
        }
    }
}
