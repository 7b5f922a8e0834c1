//! Request matching.
//!
//! - `request` - the per-request view handed to matchers, with a read-once body
//! - `matcher` - the compiled [`RequestMatcher`] and chain evaluation
//! - `json_path` - JSONPath body matching
//! - `compiler` - DSL call signatures mapped to matcher constructors

mod compiler;
mod json_path;
mod matcher;
mod request;

pub use compiler::{
    compile_filters, graphql_matchers, http_matchers, MatcherContext, MatcherRegistry,
    HTTP_METHODS,
};
pub use json_path::JsonPathMatcher;
pub use matcher::RequestMatcher;
pub use request::{
    first_query_value, BodyError, BoxError, IncomingRequest, DEFAULT_MAX_BODY_SIZE,
};
