//! Engine state tracking
//!
//! # Components
//!
//! - `EngineState`: lifecycle of one traversal engine instance
//! - `Heartbeat`: last-activity timestamp shared between engine and watchdog

mod engine_state;
mod heartbeat;

pub use engine_state::EngineState;
pub use heartbeat::Heartbeat;
