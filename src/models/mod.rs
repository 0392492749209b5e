//! Request and Response models for the sidecar API
//!
//! DTOs used for serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

pub use requests::SetRequest;
pub use responses::{
    DeleteResponse, ErrorResponse, EventAccepted, GetResponse, GroupInvalidateResponse,
    HealthResponse, SetResponse, StatsResponse,
};
