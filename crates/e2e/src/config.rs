//! Validator configuration

use aerialink_common::{
    ConnectionSelectionPolicy, SortDirection, SortField, SortOption, DEFAULT_PAGE_SIZES,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::E2eResult;

/// Settings for one Connections page validation run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Base URL of the connections API
    pub api_base_url: String,

    /// Options of the "Sort By" select, in the order they are exercised
    pub sort_options: Vec<SortOption>,

    /// Options of the "Show entries" select
    pub page_sizes: Vec<u64>,

    /// How many more account IDs the dropdown may list than the API
    pub dropdown_tolerance: u64,

    /// How specific connections are picked per account
    pub connection_selection: ConnectionSelectionPolicy,

    /// Run the Connection GUID filter check
    pub check_connection_guid: bool,

    /// Run the reset-to-default check
    pub check_reset: bool,

    pub timeouts: Timeouts,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:3000".to_string(),
            sort_options: default_sort_options(),
            page_sizes: DEFAULT_PAGE_SIZES.to_vec(),
            dropdown_tolerance: 2,
            connection_selection: ConnectionSelectionPolicy::Prefix,
            check_connection_guid: true,
            check_reset: true,
            timeouts: Timeouts::default(),
        }
    }
}

/// The Sort By select as rendered today, including its "Desending" option
fn default_sort_options() -> Vec<SortOption> {
    SortOption::defaults()
        .into_iter()
        .map(|option| {
            if option.field == SortField::ConnectionId
                && option.direction == SortDirection::Descending
            {
                option.with_label("Connection ID Desending")
            } else {
                option
            }
        })
        .collect()
}

impl ValidatorConfig {
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}

/// Timeouts in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Single click/fill/read
    pub interaction_ms: u64,

    /// Per-account search result marker after Search
    pub search_result_ms: u64,

    pub network_idle_ms: u64,

    /// Pause after changing the page size
    pub settle_ms: u64,

    /// Pause after each pagination click
    pub page_settle_ms: u64,

    /// Pause between dropdown interactions
    pub dropdown_settle_ms: u64,

    /// Whole verify step
    pub step_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            interaction_ms: 10_000,
            search_result_ms: 60_000,
            network_idle_ms: 30_000,
            settle_ms: 1_500,
            page_settle_ms: 400,
            dropdown_settle_ms: 300,
            step_ms: 12_000_000,
        }
    }
}

impl Timeouts {
    pub fn interaction(&self) -> Duration {
        Duration::from_millis(self.interaction_ms)
    }

    pub fn search_result(&self) -> Duration {
        Duration::from_millis(self.search_result_ms)
    }

    pub fn network_idle(&self) -> Duration {
        Duration::from_millis(self.network_idle_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn page_settle(&self) -> Duration {
        Duration::from_millis(self.page_settle_ms)
    }

    pub fn dropdown_settle(&self) -> Duration {
        Duration::from_millis(self.dropdown_settle_ms)
    }

    pub fn step(&self) -> Duration {
        Duration::from_millis(self.step_ms)
    }

    /// Budget for a guarded step made of a handful of interactions
    pub fn guard(&self) -> Duration {
        Duration::from_millis(self.interaction_ms.saturating_mul(6).max(self.search_result_ms))
    }
}
