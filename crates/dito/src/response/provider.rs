use bytes::Bytes;
use hyper::header::HeaderValue;
use hyper::StatusCode;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use super::builder::ResponseBuilder;
use super::sniff::detect_content_type;
use super::HttpResponse;
use crate::workdir::WorkDir;

const APPLICATION_JSON: &str = "application/json";

/// A compiled response. Applying it never fails; file errors become 500s.
#[derive(Debug, Clone)]
pub enum ResponseProvider {
    StatusCode(StatusCode),
    Json { status: StatusCode, body: Bytes },
    File(FileResponse),
}

#[derive(Clone)]
pub struct FileResponse {
    pub status: StatusCode,
    pub path: String,
    /// Sniffed from the file contents when absent
    pub content_type: Option<HeaderValue>,
    pub workdir: Arc<dyn WorkDir>,
}

impl fmt::Debug for FileResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileResponse")
            .field("status", &self.status)
            .field("path", &self.path)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

impl ResponseProvider {
    pub async fn apply(&self) -> HttpResponse {
        match self {
            ResponseProvider::StatusCode(status) => ResponseBuilder::new(*status).build(),
            ResponseProvider::Json { status, body } => ResponseBuilder::new(*status)
                .content_type(HeaderValue::from_static(APPLICATION_JSON))
                .body(body.clone())
                .build(),
            ResponseProvider::File(file) => file.apply().await,
        }
    }
}

impl FileResponse {
    async fn apply(&self) -> HttpResponse {
        let contents = match self.workdir.read(&self.path).await {
            Ok(contents) => contents,
            Err(err) => {
                warn!(path = %self.path, error = %err, "failed to read response file");
                return ResponseBuilder::error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
                    .build();
            }
        };

        let content_type = match &self.content_type {
            Some(content_type) => content_type.clone(),
            None => HeaderValue::from_static(detect_content_type(&contents)),
        };

        ResponseBuilder::new(self.status)
            .content_type(content_type)
            .body(contents)
            .build()
    }
}
