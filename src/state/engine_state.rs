//! Engine lifecycle states
//!
//! One traversal engine instance moves through these states exactly once:
//!
//! ```text
//! Idle -> Running -> (Stalled ->) Draining -> Terminated
//! ```
use std::fmt;

/// Lifecycle state of a traversal engine instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    /// Stores loaded, shard opened, frontier seeded
    Idle,

    /// Dispatching fetches and processing completions
    Running,

    /// The watchdog saw no heartbeat within its timeout
    Stalled,

    /// No new fetches; waiting out in-flight ones and closing the shard
    Draining,

    /// Finished; the supervisor builds a new engine
    Terminated,
}

impl EngineState {
    /// Returns true if `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: EngineState) -> bool {
        use EngineState::*;
        matches!(
            (self, next),
            (Idle, Running)
                | (Running, Stalled)
                | (Running, Draining)
                | (Stalled, Draining)
                | (Draining, Terminated)
        )
    }

    /// Returns true while new fetches may still be dispatched
    pub fn accepts_fetches(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stalled => "stalled",
            Self::Draining => "draining",
            Self::Terminated => "terminated",
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
