//! Response providers.
//!
//! - `provider` - the compiled [`ResponseProvider`] and how it is applied
//! - `compiler` - DSL response calls mapped to provider constructors
//! - `sniff` - content-type detection for file responses
//! - `builder` - small helper for assembling hyper responses

mod builder;
mod compiler;
mod provider;
mod sniff;

use bytes::Bytes;
use http_body_util::Full;
use hyper::Response;

pub use builder::ResponseBuilder;
pub use compiler::{response_providers, ResponseContext, ResponseRegistry};
pub use provider::{FileResponse, ResponseProvider};
pub use sniff::{detect_content_type, SNIFF_LEN};

/// Response type produced by every handler.
pub type HttpResponse = Response<Full<Bytes>>;
