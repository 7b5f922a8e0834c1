//! Signature-keyed dispatch tables for DSL calls.
//!
//! A registry maps a normalized call signature such as
//! `http.header(string,string)` to a constructor that turns the call's
//! parameters into a compiled value. Matchers and response providers each
//! get their own registry; both are built once before any rule is compiled.

use std::collections::BTreeMap;

use crate::dsl::{Call, Param};
use crate::error::CompileError;

/// Builds a `T` from the parameters of a resolved call.
///
/// The parameter types are guaranteed to match the registered signature.
pub type Constructor<T, C> = fn(&C, &[Param]) -> Result<T, CompileError>;

/// Namespace applied to calls written without a module prefix.
pub const DEFAULT_MODULE: &str = "http";

pub struct CallRegistry<T, C> {
    default_module: &'static str,
    constructors: BTreeMap<String, Constructor<T, C>>,
}

impl<T, C> CallRegistry<T, C> {
    pub fn new(default_module: &'static str) -> Self {
        Self {
            default_module,
            constructors: BTreeMap::new(),
        }
    }

    /// Register `constructor` under `signature`. Signatures are lower-cased
    /// so lookups are case-insensitive.
    pub fn register(mut self, signature: &str, constructor: Constructor<T, C>) -> Self {
        self.constructors
            .insert(signature.to_lowercase(), constructor);
        self
    }

    /// Find the constructor for `call`.
    pub fn resolve(&self, call: &Call) -> Result<Constructor<T, C>, CompileError> {
        let signature = call.signature_in(self.default_module);
        self.constructors
            .get(&signature)
            .copied()
            .ok_or_else(|| CompileError::UnknownCall {
                call: call.to_string(),
                signature,
            })
    }

    /// Resolve `call` and run its constructor.
    pub fn compile(&self, ctx: &C, call: &Call) -> Result<T, CompileError> {
        let constructor = self.resolve(call)?;
        constructor(ctx, &call.params)
    }

    pub fn contains(&self, signature: &str) -> bool {
        self.constructors.contains_key(&signature.to_lowercase())
    }

    /// Registered signatures in sorted order.
    pub fn signatures(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }
}

/// Positional parameter lookup that never panics.
pub fn param(params: &[Param], idx: usize) -> Result<&Param, CompileError> {
    params.get(idx).ok_or(CompileError::MissingParam(idx))
}

pub fn string_param(params: &[Param], idx: usize) -> Result<&str, CompileError> {
    Ok(param(params, idx)?.as_str()?)
}

pub fn int_param(params: &[Param], idx: usize) -> Result<i64, CompileError> {
    Ok(param(params, idx)?.as_int()?)
}
