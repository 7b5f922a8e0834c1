//! Incoming request view shared by all matchers of a request.
//!
//! The body is read from the transport at most once: the first matcher that
//! needs it materializes the bytes (or the read error) into a
//! [`tokio::sync::OnceCell`], every later reader gets the cached result.

use bytes::Bytes;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::header::HOST;
use hyper::{HeaderMap, Method, Request, Uri};
use parking_lot::Mutex;
use std::borrow::Cow;
use tokio::sync::OnceCell;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

type BodySource = UnsyncBoxBody<Bytes, BoxError>;

/// Default body limit when none is configured (10 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Why the request body could not be materialized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BodyError {
    #[error("request body exceeds the limit of {0} bytes")]
    TooLarge(usize),
    #[error("failed to read request body: {0}")]
    Read(String),
}

pub struct IncomingRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    host: String,
    body: RequestBody,
}

struct RequestBody {
    source: Mutex<Option<BodySource>>,
    cached: OnceCell<Result<Bytes, BodyError>>,
    limit: usize,
}

impl IncomingRequest {
    /// Wrap a request whose body will be read lazily, capped at `max_body_size` bytes.
    pub fn from_request<B>(req: Request<B>, max_body_size: usize) -> Self
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();
        let host = parts
            .uri
            .authority()
            .map(|authority| authority.as_str().to_owned())
            .or_else(|| {
                parts
                    .headers
                    .get(HOST)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned)
            })
            .unwrap_or_default();

        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            host,
            body: RequestBody {
                source: Mutex::new(Some(body.map_err(|err| err.into()).boxed_unsync())),
                cached: OnceCell::new(),
                limit: max_body_size,
            },
        }
    }

    /// Convenience constructor for fully buffered requests.
    pub fn from_full(req: Request<Full<Bytes>>) -> Self {
        Self::from_request(req, DEFAULT_MAX_BODY_SIZE)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Virtual host as sent by the client, port included when present.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Percent-decoded request path.
    pub fn path(&self) -> Cow<'_, str> {
        let raw = self.uri.path();
        urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw))
    }

    /// First value of query parameter `key`, decoded.
    pub fn query_value(&self, key: &str) -> Option<String> {
        first_query_value(self.uri.query()?, key)
    }

    /// The request body, read from the transport on first access.
    pub async fn body(&self) -> Result<&Bytes, BodyError> {
        self.body
            .cached
            .get_or_init(|| self.body.materialize())
            .await
            .as_ref()
            .map_err(|err| err.clone())
    }

    /// Whether any matcher has asked for the body yet.
    pub fn body_materialized(&self) -> bool {
        self.body.cached.initialized()
    }
}

impl RequestBody {
    async fn materialize(&self) -> Result<Bytes, BodyError> {
        let source = self.source.lock().take();
        let Some(source) = source else {
            return Ok(Bytes::new());
        };

        let limit = self.limit;
        match Limited::new(source, limit).boxed_unsync().collect().await {
            Ok(collected) => Ok(collected.to_bytes()),
            Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
                Err(BodyError::TooLarge(limit))
            }
            Err(err) => Err(BodyError::Read(err.to_string())),
        }
    }
}

/// Look up the first value of `key` in a raw query string.
///
/// `+` decodes to a space, matching form encoding.
pub fn first_query_value(query: &str, key: &str) -> Option<String> {
    query
        .split('&')
        .filter(|s| !s.is_empty())
        .find_map(|pair| {
            let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(raw_key) == key).then(|| decode_component(raw_value))
        })
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}
