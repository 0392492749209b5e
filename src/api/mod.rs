//! API Module
//!
//! HTTP handlers and routing for the caching sidecar.
//!
//! # Endpoints
//! - `GET /api/*path` - Read-through fetch of `api/{path}`
//! - `PUT /cache/*key` - Direct, versioned write
//! - `DELETE /cache/*key` - Invalidate one key
//! - `DELETE /groups/:name` - Invalidate a named group
//! - `POST /events` - Enqueue a change event for the reconciler
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
