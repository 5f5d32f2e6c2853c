//! Trading rules: entry screening and exit evaluation

pub mod exit;
pub mod screening;

pub use exit::{evaluate_exit, ExitDecision};
pub use screening::{RejectReason, ScreeningDecision, ScreeningPolicy};
