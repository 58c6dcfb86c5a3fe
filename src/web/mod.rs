//! Web API module for filevault.
//!
//! This module exposes the file service as a JSON/HTTP API. Callers are
//! identified by a bearer JWT whose subject is their owner ID.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::{create_app, create_router};
pub use server::WebServer;
