//! HTTP control surface
//!
//! Liveness, a manual discovery trigger and a read-only view of open positions.

pub mod routes;
pub mod server;

pub use server::{create_app, AppState};
