//! # HTTP Server Module
//!
//! Combines the user, post, cache, proxy and service routers into one
//! Axum server. Every failure leaves through [`crate::failure::Failure`].
//!
//! # Endpoints
//!
//! - `/signup`, `/users`, `/user/:id/drafts` - users
//! - `/post/*`, `/publish/:id`, `/feed` - posts
//! - `/redis/*` - key-value cache
//! - `/external-api/redis/*` - cache reads through the companion API
//! - `/postgres/time`, `/alive`, `/methods` - service endpoints
//! - `/docs` - API explorer

pub mod cache_routes;
pub mod companion;
pub mod config;
pub mod extract;
pub mod gate;
pub mod openapi;
pub mod post_routes;
pub mod server;
pub mod service_routes;
pub mod state;
pub mod user_routes;

pub use companion::{companion_router, run_companion};
pub use config::{ConfigError, LogFormat, ServerConfig};
pub use server::{build_router, HttpServer, ServerError};
pub use state::AppState;
