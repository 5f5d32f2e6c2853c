//! API route handlers

pub mod control;
pub mod positions;

use serde::Serialize;

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Plain acknowledgement body
#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}
