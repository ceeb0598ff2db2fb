//! State module for tracking run progress
//!
//! # Components
//!
//! - `OriginState`: per-origin request pacing and robots.txt policy
//! - `RunStatus` / `RunWarning`: how a run ended and which branches degraded

mod origin_state;
mod run_state;

pub use origin_state::OriginState;
pub use run_state::{RunStage, RunStatus, RunWarning};
