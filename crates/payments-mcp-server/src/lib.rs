//! Streamable HTTP transport for the payments MCP server.
//!
//! Many clients share one listener; each conversation is a session keyed by
//! the `mcp-session-id` header and served by its own handler instance.
//! Without a port the binary serves a single session over stdio instead.

pub mod config;
pub mod cors;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod router;
pub mod routes;
pub mod session;
pub mod state;
pub mod stdio;
pub mod stream;

pub use config::ServerConfig;
pub use error::TransportError;
pub use registry::{CloseOutcome, SessionRegistry};
pub use router::{PostOutcome, SessionRouter};
pub use session::{Session, SessionState};
pub use state::AppState;
