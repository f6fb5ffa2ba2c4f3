//! Web API module for the vault.
//!
//! JSON upload, binary download and listing endpoints over the file core.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::create_router;
pub use server::WebServer;
