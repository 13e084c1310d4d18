//! Browser page seam
//!
//! Every validator component talks to the rendered page through [`Page`].
//! Methods take `&mut self`, so only one action is ever in flight against a
//! page. Element actions apply to the first element matching the selector;
//! `all_texts` and `count` see every match.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::E2eResult;

#[async_trait]
pub trait Page: Send {
    /// Navigate to an absolute URL or a path relative to the app base URL
    async fn goto(&mut self, url: &str) -> E2eResult<()>;

    async fn click(&mut self, selector: &str, timeout: Duration) -> E2eResult<()>;

    /// Replace the value of an input
    async fn fill(&mut self, selector: &str, value: &str, timeout: Duration) -> E2eResult<()>;

    /// Choose a native `<select>` option by its visible label
    async fn select_option(
        &mut self,
        selector: &str,
        label: &str,
        timeout: Duration,
    ) -> E2eResult<()>;

    async fn inner_text(&mut self, selector: &str, timeout: Duration) -> E2eResult<String>;

    async fn all_texts(&mut self, selector: &str) -> E2eResult<Vec<String>>;

    async fn count(&mut self, selector: &str) -> E2eResult<u64>;

    /// Immediate visibility probe; never waits
    async fn is_visible(&mut self, selector: &str) -> E2eResult<bool>;

    async fn wait_visible(&mut self, selector: &str, timeout: Duration) -> E2eResult<()>;

    async fn wait_for_network_idle(&mut self, timeout: Duration) -> E2eResult<()>;

    /// Fixed pause for UI transitions that have no observable completion
    async fn pause(&mut self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
