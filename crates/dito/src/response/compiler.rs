//! DSL calls to [`ResponseProvider`]s.

use bytes::Bytes;
use hyper::header::HeaderValue;
use hyper::StatusCode;
use std::sync::Arc;

use super::provider::{FileResponse, ResponseProvider};
use crate::dsl::Param;
use crate::error::CompileError;
use crate::registry::{int_param, string_param, CallRegistry, DEFAULT_MODULE};
use crate::workdir::WorkDir;

#[derive(Clone)]
pub struct ResponseContext {
    pub workdir: Arc<dyn WorkDir>,
}

pub type ResponseRegistry = CallRegistry<ResponseProvider, ResponseContext>;

pub fn response_providers() -> ResponseRegistry {
    CallRegistry::new(DEFAULT_MODULE)
        .register("http.status(int)", status)
        .register("http.statuscode(int)", status)
        .register("http.json(string)", json)
        .register("http.json(int,string)", json_with_status)
        .register("http.file(string)", file)
        .register("http.file(string,string)", file_with_type)
        .register("http.file(int,string)", file_with_status)
        .register("http.file(int,string,string)", file_with_status_and_type)
}

fn status(_: &ResponseContext, params: &[Param]) -> Result<ResponseProvider, CompileError> {
    Ok(ResponseProvider::StatusCode(status_code(int_param(params, 0)?)?))
}

fn json(_: &ResponseContext, params: &[Param]) -> Result<ResponseProvider, CompileError> {
    Ok(ResponseProvider::Json {
        status: StatusCode::OK,
        body: Bytes::from(string_param(params, 0)?.to_owned()),
    })
}

fn json_with_status(_: &ResponseContext, params: &[Param]) -> Result<ResponseProvider, CompileError> {
    Ok(ResponseProvider::Json {
        status: status_code(int_param(params, 0)?)?,
        body: Bytes::from(string_param(params, 1)?.to_owned()),
    })
}

fn file(ctx: &ResponseContext, params: &[Param]) -> Result<ResponseProvider, CompileError> {
    file_response(ctx, StatusCode::OK, string_param(params, 0)?, None)
}

fn file_with_type(ctx: &ResponseContext, params: &[Param]) -> Result<ResponseProvider, CompileError> {
    file_response(
        ctx,
        StatusCode::OK,
        string_param(params, 0)?,
        Some(string_param(params, 1)?),
    )
}

fn file_with_status(ctx: &ResponseContext, params: &[Param]) -> Result<ResponseProvider, CompileError> {
    file_response(
        ctx,
        status_code(int_param(params, 0)?)?,
        string_param(params, 1)?,
        None,
    )
}

fn file_with_status_and_type(
    ctx: &ResponseContext,
    params: &[Param],
) -> Result<ResponseProvider, CompileError> {
    file_response(
        ctx,
        status_code(int_param(params, 0)?)?,
        string_param(params, 1)?,
        Some(string_param(params, 2)?),
    )
}

fn file_response(
    ctx: &ResponseContext,
    status: StatusCode,
    path: &str,
    content_type: Option<&str>,
) -> Result<ResponseProvider, CompileError> {
    let content_type = content_type
        .map(|value| {
            HeaderValue::from_str(value)
                .map_err(|_| CompileError::InvalidHeaderValue(value.to_owned()))
        })
        .transpose()?;

    Ok(ResponseProvider::File(FileResponse {
        status,
        path: path.to_owned(),
        content_type,
        workdir: ctx.workdir.clone(),
    }))
}

/// Status literals must be three-digit codes (100..=999).
fn status_code(code: i64) -> Result<StatusCode, CompileError> {
    u16::try_from(code)
        .ok()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .ok_or(CompileError::InvalidStatus(code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::parse_rule;
    use crate::workdir::MemoryWorkDir;

    fn compile(rule: &str) -> Result<ResponseProvider, CompileError> {
        let ctx = ResponseContext {
            workdir: Arc::new(MemoryWorkDir::new()),
        };
        let pipeline = parse_rule(rule).unwrap();
        response_providers().compile(&ctx, &pipeline.response)
    }

    #[test]
    fn test_status_aliases() {
        for rule in ["=> Status(204)", "=> StatusCode(204)", "=> http.STATUS(204)"] {
            assert!(matches!(
                compile(rule).unwrap(),
                ResponseProvider::StatusCode(StatusCode::NO_CONTENT)
            ));
        }
    }

    #[test]
    fn test_status_range() {
        assert!(matches!(
            compile("=> Status(99)"),
            Err(CompileError::InvalidStatus(99))
        ));
        assert!(matches!(
            compile("=> Status(1000)"),
            Err(CompileError::InvalidStatus(1000))
        ));
        assert!(matches!(
            compile("=> Status(-1)"),
            Err(CompileError::InvalidStatus(-1))
        ));
        assert!(compile("=> Status(999)").is_ok());
    }

    #[test]
    fn test_json_default_status() {
        match compile(r#"=> Json("{}")"#).unwrap() {
            ResponseProvider::Json { status, body } => {
                assert_eq!(status, StatusCode::OK);
                assert_eq!(body, "{}");
            }
            other => panic!("unexpected provider {other:?}"),
        }
    }

    #[test]
    fn test_file_arities() {
        let cases = [
            (r#"=> File("a.png")"#, StatusCode::OK, None),
            (r#"=> File("a.png", "image/png")"#, StatusCode::OK, Some("image/png")),
            (r#"=> File(404, "a.png")"#, StatusCode::NOT_FOUND, None),
            (
                r#"=> File(201, "a.png", "image/png")"#,
                StatusCode::CREATED,
                Some("image/png"),
            ),
        ];
        for (rule, expected_status, expected_type) in cases {
            match compile(rule).unwrap() {
                ResponseProvider::File(file) => {
                    assert_eq!(file.status, expected_status, "{rule}");
                    assert_eq!(file.path, "a.png");
                    assert_eq!(
                        file.content_type.as_ref().and_then(|v| v.to_str().ok()),
                        expected_type
                    );
                }
                other => panic!("unexpected provider {other:?}"),
            }
        }
    }

    #[test]
    fn test_invalid_content_type() {
        assert!(matches!(
            compile("=> File(\"a\", \"bad\\nvalue\")"),
            Err(CompileError::InvalidHeaderValue(_))
        ));
    }

    #[test]
    fn test_unknown_response() {
        assert!(matches!(
            compile(r#"=> Json(200, 1)"#),
            Err(CompileError::UnknownCall { .. })
        ));
    }
}
