//! Guarded steps
//!
//! A guarded step runs one fallible UI or API interaction under a time limit
//! and turns its outcome into a [`StepResult`]. Callers decide what a failed
//! step means for the rest of the run; nothing unwinds past the guard.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::{E2eError, E2eResult};

/// Result of executing a guarded step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub step_name: String,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl StepResult {
    pub fn passed(step_name: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: true,
            step_name: step_name.into(),
            duration_ms,
            error: None,
        }
    }

    pub fn failed(
        step_name: impl Into<String>,
        duration_ms: u64,
        error: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            step_name: step_name.into(),
            duration_ms,
            error: Some(error.into()),
        }
    }
}

/// Run `fut` as the step `step_name`, bounded by `limit`
pub async fn guarded<T, F>(
    step_name: impl Into<String>,
    limit: Duration,
    fut: F,
) -> (StepResult, Option<T>)
where
    F: Future<Output = E2eResult<T>>,
{
    let step_name = step_name.into();
    let start = Instant::now();

    let outcome = match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(E2eError::Timeout(format!("{} ({} ms)", step_name, limit.as_millis()))),
    };
    let duration_ms = start.elapsed().as_millis() as u64;

    match outcome {
        Ok(value) => {
            debug!("✓ {} ({} ms)", step_name, duration_ms);
            (StepResult::passed(step_name, duration_ms), Some(value))
        }
        Err(e) => {
            warn!("✗ {} - {}", step_name, e);
            (StepResult::failed(step_name, duration_ms, e.to_string()), None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_guarded_success_carries_value() {
        let (result, value) =
            guarded("read summary", Duration::from_secs(1), async { Ok(42u64) }).await;
        assert!(result.success);
        assert_eq!(result.step_name, "read summary");
        assert_eq!(value, Some(42));
    }

    #[tokio::test]
    async fn test_guarded_failure_is_captured() {
        let (result, value) = guarded::<(), _>("click search", Duration::from_secs(1), async {
            Err(E2eError::step("click", "element detached"))
        })
        .await;
        assert!(!result.success);
        assert!(value.is_none());
        assert!(result.error.unwrap().contains("element detached"));
    }

    #[tokio::test]
    async fn test_guarded_timeout() {
        let (result, value) = guarded("slow", Duration::from_millis(20), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(!result.success);
        assert!(value.is_none());
        assert!(result.error.unwrap().contains("Timeout"));
    }
}
