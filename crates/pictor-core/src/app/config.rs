//! Engine configuration.

use std::time::Duration;

/// Tuning knobs for the dispatcher.
///
/// `workers` bounds concurrent external-processor invocations: tasks beyond
/// the bound wait in the queue instead of piling onto the provider
/// (backpressure). `process_timeout` caps a single processor call; past it
/// the task fails with a timeout message, so no worker blocks indefinitely.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Number of worker tasks pulling from the work queue.
    pub workers: usize,

    /// Upper bound for one external-processor call.
    pub process_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            process_timeout: Duration::from_secs(120),
        }
    }
}
