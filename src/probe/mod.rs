pub mod http;
pub mod mock;

use anyhow::Result;
use async_trait::async_trait;

/// Asks whether a transformed image is ready to be served.
///
/// The answer is a hint, not ground truth: a miss or an error only means
/// "not yet", and the runner keeps polling.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn check(&self, locator: &str) -> Result<bool>;
}
