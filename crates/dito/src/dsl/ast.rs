//! Parsed rule representation.

use std::fmt;

/// A parsed rule: an ordered filter chain and the terminal response call.
///
/// A rule without filters matches every request.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponsePipeline {
    pub filters: Vec<Call>,
    pub response: Call,
}

/// A single DSL invocation such as `Method("GET")` or `graphql.Query("{ a }")`.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Optional namespace, e.g. `graphql` in `graphql.Query(..)`
    pub module: Option<String>,
    pub name: String,
    pub params: Vec<Param>,
}

/// A literal call parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    String(String),
    Int(i64),
    Float(f64),
}

/// Returned by the typed [`Param`] accessors when the parameter holds a
/// different variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("param has a different type: expected {expected}, got {actual}")]
pub struct ParamTypeMismatch {
    pub expected: &'static str,
    pub actual: &'static str,
}

impl Param {
    /// Type tag used when rendering signatures.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Param::String(_) => "string",
            Param::Int(_) => "int",
            Param::Float(_) => "float",
        }
    }

    pub fn as_str(&self) -> Result<&str, ParamTypeMismatch> {
        match self {
            Param::String(s) => Ok(s),
            other => Err(other.mismatch("string")),
        }
    }

    pub fn as_int(&self) -> Result<i64, ParamTypeMismatch> {
        match self {
            Param::Int(i) => Ok(*i),
            other => Err(other.mismatch("int")),
        }
    }

    /// The literal as a JSON value, used for body comparisons.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Param::String(s) => serde_json::Value::String(s.clone()),
            Param::Int(i) => serde_json::Value::from(*i),
            Param::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
        }
    }

    fn mismatch(&self, expected: &'static str) -> ParamTypeMismatch {
        ParamTypeMismatch {
            expected,
            actual: self.type_tag(),
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::String(s) => write!(f, "{s:?}"),
            Param::Int(i) => write!(f, "{i}"),
            Param::Float(v) => write!(f, "{v:?}"),
        }
    }
}

impl Call {
    /// Canonical dispatch key: lower-cased `module.name(type1,type2,...)`.
    ///
    /// The module prefix is omitted when the call has none.
    pub fn signature(&self) -> String {
        self.render_signature(self.module.as_deref().unwrap_or(""))
    }

    /// Signature with `default_module` applied when the call names no module.
    pub fn signature_in(&self, default_module: &str) -> String {
        self.render_signature(self.module.as_deref().unwrap_or(default_module))
    }

    fn render_signature(&self, module: &str) -> String {
        let types = self
            .params
            .iter()
            .map(Param::type_tag)
            .collect::<Vec<_>>()
            .join(",");

        let signature = if module.is_empty() {
            format!("{}({types})", self.name)
        } else {
            format!("{module}.{}({types})", self.name)
        };
        signature.to_lowercase()
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(module) = &self.module {
            write!(f, "{module}.")?;
        }
        write!(f, "{}(", self.name)?;
        for (idx, param) in self.params.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{param}")?;
        }
        f.write_str(")")
    }
}
