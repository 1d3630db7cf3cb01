//! MCP server for the scratch notebook service.
//!
//! Wires the catalog store, validation pipeline, and search service behind
//! the MCP tool surface, with stdio/HTTP/SSE transports, bearer-token
//! tenancy, a drain-on-shutdown gate, and the preemptive eviction sweeper.

pub mod auth;
pub mod handlers;
pub mod metrics;
pub mod protocol;
pub mod server;
pub mod shutdown;
pub mod sweeper;
pub mod tools;
pub mod transport;

pub use handlers::Handlers;
pub use server::{AppState, ScratchServer};
