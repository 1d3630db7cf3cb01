//! Wire transports: stdio NDJSON and axum HTTP/SSE.

mod http;
mod stdio;

pub use http::{build_router, serve_http};
pub use stdio::run_stdio;
