//! AeriaLink Connections page validation
//!
//! Reconciles what the Connections page renders against the connections API:
//! - samples parent accounts by connection volume and plans the pairs to check
//! - drives the page through Playwright (or any [`Page`])
//! - checks totals, visible rows, sorting and pagination per pair
//! - reports every outcome in per-phase tables with one overall verdict
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Scenario Runner (Rust)                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── PlaywrightSession (Page)      one per scenario       │
//! │    ├── HttpConnectionsApi (ConnectionsApi)                  │
//! │    └── run_scenario(scenario) -> ScenarioResult             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ConnectionsValidator::run(factor) -> RunReport             │
//! │    ├── category counts ─► select_accounts ─► build_plan     │
//! │    ├── checks::check_account_dropdown                       │
//! │    ├── ReconciliationDriver::reconcile_entry                │
//! │    ├── SortPagingVerifier::verify_sort_and_paging           │
//! │    ├── checks::check_connection_guid                        │
//! │    ├── checks::check_reset_to_default                       │
//! │    └── Reporter::finish                                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenario (YAML)                                            │
//! │    ├── navigate { url, wait_for_selector? }                 │
//! │    └── verify_connections { exhaustive_factor }             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod checks;
pub mod config;
pub mod driver;
pub mod error;
pub mod locators;
pub mod page;
pub mod playwright;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod screen;
pub mod step;
pub mod validator;
pub mod verifier;

pub use api::{ConnectionsApi, HttpConnectionsApi, ResponseCache};
pub use config::{Timeouts, ValidatorConfig};
pub use error::{E2eError, E2eResult};
pub use locators::{ElementId, LocatorMap};
pub use page::Page;
pub use report::{Reporter, RunReport};
pub use runner::TestRunner;
pub use scenario::{Scenario, ScenarioStep};
pub use validator::ConnectionsValidator;
