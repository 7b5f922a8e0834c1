//! Request dispatch.
//!
//! - `rules` - compiled rule lists with first-match-wins evaluation
//! - `domain` - virtual host table and per-domain handlers

mod domain;
mod rules;

pub use domain::{DomainHandler, DomainTable, ExternalHandler};
pub use rules::{CompiledRule, RuleCompiler, RuleSet};
