//! GraphQL query matching.
//!
//! - `schema`: schema index and query validation
//! - `normalize`: canonical, order-insensitive form of executable documents
//! - `matcher`: request matcher comparing a request's query to a reference

mod matcher;
mod normalize;
mod schema;

pub use matcher::GraphQlQueryMatcher;
pub use normalize::{
    NormalizedDirective, NormalizedOperation, NormalizedQuery, NormalizedSelection,
    OperationKind, VariableSignature, MAX_SELECTION_DEPTH,
};
pub use schema::{GraphQlSchema, QueryError};
