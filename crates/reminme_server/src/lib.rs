//! HTTP transport for ReminMe.
//!
//! # Responsibility
//! - Expose the core services as an authenticated JSON API.
//! - Bridge the core to the AI and vector integrations.
//!
//! # Invariants
//! - Every route except `/api/health` requires a bearer token.
//! - Responses use the `{ "success": bool, ... }` envelope.

pub mod auth;
pub mod config;
pub mod error;
pub mod rest;
pub mod state;

pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ApiResult};
pub use rest::{create_router, create_router_with_cors};
pub use state::AppState;
