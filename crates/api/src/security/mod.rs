//! Response hardening: security headers and CORS

mod cors;
mod headers;

pub use cors::{cors_layer, options_ok};
pub use headers::security_headers_middleware;
