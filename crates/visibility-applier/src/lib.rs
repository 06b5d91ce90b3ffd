//! Visibility application.
//!
//! Hiding an element means both making it invisible and taking it out of
//! pointer interaction; an element that still intercepts clicks is not
//! hidden. Restoring reverts both. Re-applying a hide on a fresh page load
//! runs through a bounded retry so elements mounted asynchronously after
//! first render still get caught.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

use dom_adapter::{DomError, PageHandle};

/// Retry budget for re-hiding elements that have not mounted yet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetryCfg {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl RetryCfg {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for RetryCfg {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay_ms: 1_000,
        }
    }
}

/// Terminal result of a retried re-hide.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryOutcome {
    Applied { matched: usize },
    Exhausted,
}

/// Handle to one scheduled re-hide task. The task is owned through this
/// handle: dropping it detaches the timer, `abort` cancels it.
pub struct RetryHandle {
    css_locator: String,
    task: JoinHandle<RetryOutcome>,
}

impl RetryHandle {
    pub fn css_locator(&self) -> &str {
        &self.css_locator
    }

    pub fn abort(&self) {
        self.task.abort();
    }

    /// Wait for the terminal outcome; `None` when the task was aborted.
    pub async fn outcome(self) -> Option<RetryOutcome> {
        self.task.await.ok()
    }
}

/// Applies and reverts the hidden flag against the live document.
#[derive(Clone)]
pub struct VisibilityApplier {
    page: PageHandle,
    retry: RetryCfg,
}

impl VisibilityApplier {
    pub fn new(page: PageHandle) -> Self {
        Self {
            page,
            retry: RetryCfg::default(),
        }
    }

    pub fn with_retry_cfg(page: PageHandle, retry: RetryCfg) -> Self {
        Self { page, retry }
    }

    /// Hide or restore every element matching `css_locator`, returning the
    /// match count. Zero matches is not an error; the target may simply not
    /// have rendered yet. Unresolvable selectors log and count zero.
    pub async fn apply(&self, css_locator: &str, hidden: bool) -> usize {
        apply_once(&self.page, css_locator, hidden).await
    }

    /// Schedule a re-hide for a stored locator on a freshly loaded page.
    /// Attempts immediately, then keeps retrying on a fixed delay until the
    /// element appears or the budget runs out; exhaustion is logged and
    /// otherwise silent. Best-effort reconciliation, not a guarantee.
    pub fn apply_with_retry(&self, css_locator: String) -> RetryHandle {
        let page = self.page.clone();
        let retry = self.retry.clone();
        let css = css_locator.clone();

        let task = tokio::spawn(async move {
            for attempt in 0..retry.max_attempts {
                if attempt > 0 {
                    sleep(retry.delay()).await;
                }
                let matched = apply_once(&page, &css, true).await;
                if matched > 0 {
                    debug!(selector = %css, attempt, matched, "re-hide applied");
                    return RetryOutcome::Applied { matched };
                }
            }
            warn!(
                selector = %css,
                attempts = retry.max_attempts,
                "element never appeared; giving up on re-hide"
            );
            RetryOutcome::Exhausted
        });

        RetryHandle { css_locator, task }
    }
}

fn style_props(hidden: bool) -> Vec<(String, String)> {
    let (visibility, pointer_events) = if hidden {
        ("hidden", "none")
    } else {
        ("visible", "auto")
    };
    vec![
        ("visibility".to_string(), visibility.to_string()),
        ("pointer-events".to_string(), pointer_events.to_string()),
    ]
}

async fn apply_once(page: &PageHandle, css_locator: &str, hidden: bool) -> usize {
    match page.apply_styles(css_locator, style_props(hidden)).await {
        Ok(matched) => matched,
        Err(DomError::InvalidSelector { selector, reason }) => {
            warn!(selector = %selector, reason = %reason, "cannot apply visibility: bad selector");
            0
        }
        Err(err) => {
            warn!(selector = %css_locator, error = %err, "cannot apply visibility");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom_adapter::PageHost;

    const DOC: &str = r#"<html><body>
        <div id="ad" class="banner">ad</div>
        <div class="banner">another</div>
    </body></html>"#;

    #[tokio::test]
    async fn hide_sets_both_visibility_and_pointer_blocking() {
        let page = PageHost::launch(DOC).unwrap();
        let applier = VisibilityApplier::new(page.clone());

        assert_eq!(applier.apply("#ad", true).await, 1);
        assert_eq!(
            page.style_of("#ad", "visibility").await.unwrap().as_deref(),
            Some("hidden")
        );
        assert_eq!(
            page.style_of("#ad", "pointer-events").await.unwrap().as_deref(),
            Some("none")
        );
    }

    #[tokio::test]
    async fn hide_is_idempotent() {
        let page = PageHost::launch(DOC).unwrap();
        let applier = VisibilityApplier::new(page.clone());

        assert_eq!(applier.apply("#ad", true).await, 1);
        assert_eq!(applier.apply("#ad", true).await, 1);
        assert_eq!(
            page.style_of("#ad", "visibility").await.unwrap().as_deref(),
            Some("hidden")
        );
    }

    #[tokio::test]
    async fn restore_reverts_both_properties() {
        let page = PageHost::launch(DOC).unwrap();
        let applier = VisibilityApplier::new(page.clone());

        applier.apply("#ad", true).await;
        assert_eq!(applier.apply("#ad", false).await, 1);
        assert_eq!(
            page.style_of("#ad", "visibility").await.unwrap().as_deref(),
            Some("visible")
        );
        assert_eq!(
            page.style_of("#ad", "pointer-events").await.unwrap().as_deref(),
            Some("auto")
        );
    }

    #[tokio::test]
    async fn apply_touches_every_match_and_tolerates_misses() {
        let page = PageHost::launch(DOC).unwrap();
        let applier = VisibilityApplier::new(page.clone());

        assert_eq!(applier.apply(".banner", true).await, 2);
        assert_eq!(applier.apply("#missing", true).await, 0);
        assert_eq!(applier.apply("div..", true).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_catches_an_element_mounted_late() {
        let page = PageHost::launch(DOC).unwrap();
        let applier = VisibilityApplier::with_retry_cfg(
            page.clone(),
            RetryCfg {
                max_attempts: 10,
                delay_ms: 1_000,
            },
        );

        let mounter = {
            let page = page.clone();
            tokio::spawn(async move {
                // mounts a few retry intervals after "load"
                sleep(Duration::from_millis(3_500)).await;
                page.mount_fragment_at("body", r#"<div id="late-ad">late</div>"#)
                    .await
                    .unwrap();
            })
        };

        let handle = applier.apply_with_retry("#late-ad".to_string());
        let outcome = handle.outcome().await.unwrap();
        assert_eq!(outcome, RetryOutcome::Applied { matched: 1 });
        mounter.await.unwrap();

        assert_eq!(
            page.style_of("#late-ad", "visibility").await.unwrap().as_deref(),
            Some("hidden")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn retry_gives_up_after_the_budget() {
        let page = PageHost::launch(DOC).unwrap();
        let applier = VisibilityApplier::with_retry_cfg(
            page,
            RetryCfg {
                max_attempts: 3,
                delay_ms: 100,
            },
        );

        let handle = applier.apply_with_retry("#never".to_string());
        let outcome = handle.outcome().await.unwrap();
        assert_eq!(outcome, RetryOutcome::Exhausted);
    }

    #[tokio::test]
    async fn retry_handle_abort_cancels_the_task() {
        let page = PageHost::launch(DOC).unwrap();
        let applier = VisibilityApplier::with_retry_cfg(
            page,
            RetryCfg {
                max_attempts: 1_000,
                delay_ms: 60_000,
            },
        );

        let handle = applier.apply_with_retry("#never".to_string());
        assert_eq!(handle.css_locator(), "#never");
        handle.abort();
    }
}
