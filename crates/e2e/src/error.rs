//! Error types for the Connections validation harness

use aerialink_common::Failure;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Scenario parse error: {0}")]
    ScenarioParse(String),

    #[error("Missing locator: {0}")]
    MissingLocator(String),

    #[error("Step failed: {step} - {reason}")]
    StepFailed { step: String, reason: String },

    #[error("Unexpected data shape from {source_name}: {detail}")]
    DataShape { source_name: String, detail: String },

    #[error("Setup failed: {0}")]
    Setup(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Connections validation failed with {} failure(s)", failures.len())]
    ValidationFailed { failures: Vec<Failure> },

    #[error(transparent)]
    Common(#[from] aerialink_common::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    pub fn step(step: impl Into<String>, reason: impl Into<String>) -> Self {
        E2eError::StepFailed {
            step: step.into(),
            reason: reason.into(),
        }
    }

    pub fn data_shape(source_name: impl Into<String>, detail: impl Into<String>) -> Self {
        E2eError::DataShape {
            source_name: source_name.into(),
            detail: detail.into(),
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
