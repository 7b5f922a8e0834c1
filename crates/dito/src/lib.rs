// Library exports for the binary, benchmarks and integration tests

// ===== Rule language =====
pub mod dsl;
pub mod error;
pub mod registry;

// ===== Matching and responses =====
pub mod graphql;
pub mod predicate;
pub mod response;

// ===== Serving =====
pub mod config;
pub mod metrics;
pub mod routing;
pub mod server;
pub mod specs;
pub mod workdir;

pub use config::AppConfig;
pub use error::CompileError;
pub use routing::DomainTable;
pub use server::MockServer;
