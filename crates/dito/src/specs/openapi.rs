//! Example responses from OpenAPI 3 and Swagger 2 documents.
//!
//! Every operation answers with its first 2xx response. The body is the
//! documented `application/json` example, or `{}` when there is none.

use async_trait::async_trait;
use bytes::Bytes;
use hyper::header::HeaderValue;
use hyper::{Method, StatusCode};
use matchit::Router;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{SpecContext, SpecHandler};
use crate::error::CompileError;
use crate::predicate::IncomingRequest;
use crate::response::{HttpResponse, ResponseBuilder};
use crate::routing::{DomainHandler, ExternalHandler};

const APPLICATION_JSON: &str = "application/json";

const OPERATION_METHODS: [(&str, Method); 8] = [
    ("delete", Method::DELETE),
    ("get", Method::GET),
    ("head", Method::HEAD),
    ("options", Method::OPTIONS),
    ("patch", Method::PATCH),
    ("post", Method::POST),
    ("put", Method::PUT),
    ("trace", Method::TRACE),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiSpec {
    /// Path of the OpenAPI document, relative to the working directory
    pub schema: String,
}

impl SpecHandler for OpenApiSpec {
    fn handler(&self, ctx: &SpecContext) -> Result<DomainHandler, CompileError> {
        let raw = ctx.read_text(&self.schema)?;
        let examples = OpenApiExamples::from_document(&self.schema, &raw)?;
        Ok(DomainHandler::External(Arc::new(examples)))
    }
}

#[derive(Debug, Clone)]
struct Example {
    status: StatusCode,
    body: Bytes,
}

#[derive(Default)]
pub struct OpenApiExamples {
    routes: HashMap<Method, Router<Example>>,
    route_count: usize,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Dialect {
    Swagger2,
    OpenApi3,
}

impl OpenApiExamples {
    /// Build the routes of a JSON or YAML document. `name` is only used in
    /// error messages.
    pub fn from_document(name: &str, raw: &str) -> Result<Self, CompileError> {
        let invalid = |message: String| CompileError::InvalidOpenApi {
            path: name.to_owned(),
            message,
        };

        let document: Value = serde_yaml::from_str(raw).map_err(|e| invalid(e.to_string()))?;
        let version = document
            .get("openapi")
            .or_else(|| document.get("swagger"))
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("missing 'openapi' or 'swagger' version".into()))?;
        let dialect = if version.starts_with('3') {
            Dialect::OpenApi3
        } else if version.starts_with('2') {
            Dialect::Swagger2
        } else {
            return Err(invalid(format!("unsupported version {version}")));
        };

        let mut examples = Self::default();
        let Some(paths) = document.get("paths").and_then(Value::as_object) else {
            return Ok(examples);
        };

        for (template, item) in paths {
            let Some(item) = item.as_object() else {
                continue;
            };
            for (key, operation) in item {
                let Some(method) = operation_method(key) else {
                    continue;
                };
                let Some(example) = first_success(operation, dialect) else {
                    warn!(path = %template, method = %method, "no 2xx JSON response documented");
                    continue;
                };

                debug!(path = %template, method = %method, status = example.status.as_u16(), "configured example route");
                let router = examples.routes.entry(method).or_default();
                match router.insert(template.as_str(), example) {
                    Ok(()) => examples.route_count += 1,
                    Err(err) => {
                        warn!(path = %template, error = %err, "skipping unsupported path template")
                    }
                }
            }
        }

        Ok(examples)
    }

    pub fn route_count(&self) -> usize {
        self.route_count
    }

    fn lookup(&self, method: &Method, path: &str) -> Option<&Example> {
        let router = self.routes.get(method)?;
        router.at(path).ok().map(|matched| matched.value)
    }
}

#[async_trait]
impl ExternalHandler for OpenApiExamples {
    async fn handle(&self, req: &IncomingRequest) -> HttpResponse {
        match self.lookup(req.method(), req.uri().path()) {
            Some(example) => ResponseBuilder::new(example.status)
                .content_type(HeaderValue::from_static(APPLICATION_JSON))
                .body(example.body.clone())
                .build(),
            None => ResponseBuilder::not_found().build(),
        }
    }
}

fn operation_method(key: &str) -> Option<Method> {
    OPERATION_METHODS
        .iter()
        .find(|(name, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, method)| method.clone())
}

/// Lowest documented 2xx response that can be served as JSON.
fn first_success(operation: &Value, dialect: Dialect) -> Option<Example> {
    let responses = operation.get("responses")?.as_object()?;
    let mut codes: Vec<(u16, &Value)> = responses
        .iter()
        .filter_map(|(code, response)| {
            let code = code.parse::<u16>().ok()?;
            (200..300).contains(&code).then_some((code, response))
        })
        .collect();
    codes.sort_by_key(|(code, _)| *code);

    codes.into_iter().find_map(|(code, response)| {
        let example = match dialect {
            Dialect::OpenApi3 => {
                // 3.x responses without a JSON media type are not served
                let media = response.get("content")?.get(APPLICATION_JSON)?;
                media.get("example").cloned().or_else(|| {
                    media
                        .get("examples")?
                        .as_object()?
                        .values()
                        .next()?
                        .get("value")
                        .cloned()
                })
            }
            Dialect::Swagger2 => response
                .get("examples")
                .and_then(|examples| examples.get(APPLICATION_JSON))
                .cloned(),
        };

        let body = example.unwrap_or_else(|| Value::Object(Default::default()));
        let status = StatusCode::from_u16(code).ok()?;
        let body = serde_json::to_vec(&body).ok()?;
        Some(Example {
            status,
            body: Bytes::from(body),
        })
    })
}
