//! Progress reporting for long-running orchestrations
//!
//! Library code never prints. Orchestrators report human-readable progress
//! through [`ProgressCallback`]; the CLI renders it, tests ignore it.

use async_trait::async_trait;

/// Receives progress messages from an orchestrator
#[async_trait]
pub trait ProgressCallback: Send + Sync {
    /// A step started or finished
    async fn on_message(&self, message: &str);

    /// A recoverable problem that did not stop the run
    async fn on_warning(&self, message: &str) {
        self.on_message(message).await;
    }
}

/// Discards all progress
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

#[async_trait]
impl ProgressCallback for NoProgress {
    async fn on_message(&self, _message: &str) {}
}
