//! MCP protocol core for the payments integration server.
//!
//! Exposes Pagar.me (Core API v5) and Woovi/OpenPix operations as MCP tools
//! behind a per-session protocol handler. The HTTP transport that multiplexes
//! sessions lives in the `payments-mcp-server` crate; this crate only knows
//! about one session at a time.
//!
//! # Layers
//!
//! - [`jsonrpc`]: JSON-RPC 2.0 envelope, stable error codes, initialize detection
//! - [`handler`]: the [`SessionHandler`] / [`HandlerFactory`] boundary the transport drives
//! - [`server`]: [`PaymentsMcpServer`], the per-session MCP handler
//! - [`tools`]: tool definitions, validation and dispatch ([`ToolRegistry`])
//! - [`providers`]: HTTP clients for the upstream payment APIs

pub mod config;
pub mod error;
pub mod handler;
pub mod hmac;
pub mod jsonrpc;
pub mod providers;
pub mod security;
pub mod server;
pub mod tools;
pub mod validation;

pub use config::ProviderConfig;
pub use error::ToolError;
pub use handler::{HandlerError, HandlerFactory, MessageStream, SessionHandler};
pub use server::{PaymentsHandlerFactory, PaymentsMcpServer};
pub use tools::{ToolDefinition, ToolOutput, ToolRegistry};

/// Name reported in `serverInfo` during `initialize`.
pub const SERVER_NAME: &str = "payments-integration-mcp";

/// Version reported in `serverInfo` during `initialize`.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
