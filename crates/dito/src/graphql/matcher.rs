use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::normalize::NormalizedQuery;
use super::schema::{GraphQlSchema, QueryError};
use crate::predicate::IncomingRequest;

/// Matches requests whose GraphQL query is structurally equivalent to a
/// reference query.
#[derive(Debug, Clone)]
pub struct GraphQlQueryMatcher {
    schema: Arc<GraphQlSchema>,
    reference: NormalizedQuery,
}

#[derive(Debug, Deserialize)]
struct GraphQlRequest {
    query: String,
    #[serde(default)]
    variables: Option<serde_json::Value>,
}

impl GraphQlQueryMatcher {
    /// Validate and normalize the reference query against `schema`.
    pub fn new(schema: Arc<GraphQlSchema>, query: &str) -> Result<Self, QueryError> {
        let reference = schema.load_query(query)?;
        Ok(Self { schema, reference })
    }

    /// Any failure to read, decode or validate the request is a non-match.
    pub async fn matches(&self, req: &IncomingRequest) -> bool {
        let body = match req.body().await {
            Ok(body) => body,
            Err(err) => {
                warn!(error = %err, "failed to read GraphQL request body");
                return false;
            }
        };

        let request: GraphQlRequest = match serde_json::from_slice(body) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "request body is not a GraphQL JSON payload");
                return false;
            }
        };
        trace!(query = %request.query, variables = ?request.variables, "decoded GraphQL request");

        let runtime = match self.schema.load_query(&request.query) {
            Ok(runtime) => runtime,
            Err(err) => {
                debug!(error = %err, "GraphQL request query rejected");
                return false;
            }
        };

        self.reference.is_equivalent(&runtime)
    }
}
