use std::time::Duration;

/// Error type shared by all modules
pub mod error;

/// Recurrence day parsing ("first Monday") and its API renderings
pub mod recurrence;

/// JSON config files for events and meetings
pub mod config;

/// The Events Calendar REST client
pub mod wordpress;

/// Event payloads and the event creation runs
pub mod events;

/// Zoom REST client and meeting payloads
pub mod zoom;

/// The meeting creation run and its CSV output
pub mod meetings;

/// Zoom config to events config conversion
pub mod convert;

/// How a creation run talks to the remote API.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// Print payloads instead of sending them.
    pub dry_run: bool,
    /// Verify each meeting host before creating its meeting. The event runs
    /// print their extra detail through the debug log level instead.
    pub verbose: bool,
    /// Pause between consecutive requests.
    pub delay: Duration,
}

/// Success and failure counts of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    pub succeeded: usize,
    pub failed: usize,
}

impl Summary {
    pub fn print(&self) {
        println!("Summary:");
        println!("  Successfully processed: {}", self.succeeded);
        println!("  Failed: {}", self.failed);
    }
}
