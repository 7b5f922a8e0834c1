//! Rule DSL: grammar, AST and call signatures.
//!
//! A rule is an optional chain of filter calls followed by a response call:
//!
//! ```text
//! Method("GET") -> PathPattern("/index.html") => File(200, "index.html", "text/html")
//! ```
//!
//! - `ast` - `ResponsePipeline`, `Call`, `Param` and signature rendering
//! - `grammar` - winnow parsers for the rule text
//! - `error` - `GrammarError` carrying the rule text and failing offset

mod ast;
mod error;
mod grammar;

pub use ast::{Call, Param, ParamTypeMismatch, ResponsePipeline};
pub use error::GrammarError;

/// Parse a single rule into a [`ResponsePipeline`].
///
/// # Errors
///
/// Returns [`GrammarError`] if the rule is not valid DSL syntax. Rules are
/// never partially accepted.
pub fn parse_rule(rule: &str) -> Result<ResponsePipeline, GrammarError> {
    use winnow::Parser;
    grammar::response_pipeline
        .parse(rule)
        .map_err(|e| GrammarError::new(rule, e.offset(), e.inner().to_string()))
}
