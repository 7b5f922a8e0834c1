use bytes::Bytes;
use http_body_util::Full;
use hyper::header::CONTENT_TYPE;
use hyper::http::HeaderValue;
use hyper::{HeaderMap, Response, StatusCode};

use super::HttpResponse;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

pub struct ResponseBuilder {
    status: StatusCode,
    body: Bytes,
    headers: HeaderMap,
}

impl ResponseBuilder {
    pub fn new(status: StatusCode) -> Self {
        ResponseBuilder {
            status,
            body: Bytes::new(),
            headers: HeaderMap::new(),
        }
    }

    /// Plain-text error response.
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::new(status)
            .content_type(HeaderValue::from_static(TEXT_PLAIN))
            .body(message)
    }

    pub fn not_found() -> Self {
        Self::error(StatusCode::NOT_FOUND, "404 page not found\n")
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn content_type(mut self, value: HeaderValue) -> Self {
        self.headers.insert(CONTENT_TYPE, value);
        self
    }

    pub fn build(self) -> HttpResponse {
        let mut response = Response::new(Full::new(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_builder_with_status() {
        let response = ResponseBuilder::new(StatusCode::NO_CONTENT).build();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().is_empty());
    }

    #[test]
    fn test_builder_with_content_type() {
        let response = ResponseBuilder::new(StatusCode::OK)
            .content_type(HeaderValue::from_static("text/plain"))
            .content_type(HeaderValue::from_static("application/json"))
            .build();

        assert_eq!(
            response.headers().get(CONTENT_TYPE),
            Some(&HeaderValue::from_static("application/json"))
        );
        assert_eq!(response.headers().len(), 1);
    }

    #[tokio::test]
    async fn test_error_response() {
        let response = ResponseBuilder::error(StatusCode::INTERNAL_SERVER_ERROR, "boom").build();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), TEXT_PLAIN);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, "boom");
    }

    #[test]
    fn test_not_found() {
        assert_eq!(ResponseBuilder::not_found().build().status(), StatusCode::NOT_FOUND);
    }
}
