//! Scenario runner: one browser session per scenario, one validation run
//! per `verify_connections` step

use aerialink_common::Failure;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::api::{ConnectionsApi, HttpConnectionsApi};
use crate::config::ValidatorConfig;
use crate::error::{E2eError, E2eResult};
use crate::locators::LocatorMap;
use crate::page::Page;
use crate::playwright::{PlaywrightConfig, PlaywrightSession};
use crate::report::RunReport;
use crate::scenario::{Scenario, ScenarioStep};
use crate::step::{guarded, StepResult};
use crate::validator::ConnectionsValidator;

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub reports: Vec<RunReport>,
    pub failures: Vec<Failure>,
    pub error: Option<String>,
}

impl ScenarioResult {
    fn errored(name: &str, error: &E2eError) -> Self {
        Self {
            name: name.to_string(),
            success: false,
            duration_ms: 0,
            steps: vec![],
            reports: vec![],
            failures: vec![],
            error: Some(error.to_string()),
        }
    }

    /// True when a step could not start, as opposed to a validation mismatch
    pub fn is_setup_error(&self) -> bool {
        !self.success && self.failures.is_empty()
    }
}

/// Result of running all scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl SuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Configuration for the scenario runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub playwright: PlaywrightConfig,
    pub validator: ValidatorConfig,
    pub locators_path: PathBuf,
    pub scenarios_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            playwright: PlaywrightConfig::default(),
            validator: ValidatorConfig::default(),
            locators_path: PathBuf::from("locators/connections.yaml"),
            scenarios_dir: PathBuf::from("scenarios"),
            output_dir: PathBuf::from("test-results"),
        }
    }
}

pub struct TestRunner {
    config: RunnerConfig,
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRunner {
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default())
    }

    pub fn with_config(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Run every scenario in the scenarios directory
    pub async fn run_all(&self) -> E2eResult<SuiteResult> {
        let scenarios = Scenario::load_all(&self.config.scenarios_dir)?;
        self.run_scenarios(&scenarios).await
    }

    /// Run scenarios carrying `tag`
    pub async fn run_tagged(&self, tag: &str) -> E2eResult<SuiteResult> {
        let scenarios = Scenario::load_all(&self.config.scenarios_dir)?;
        let filtered: Vec<Scenario> = Scenario::filter_by_tag(&scenarios, tag)
            .into_iter()
            .cloned()
            .collect();
        self.run_scenarios(&filtered).await
    }

    /// Run one scenario by name
    pub async fn run_test(&self, name: &str) -> E2eResult<SuiteResult> {
        let scenarios = Scenario::load_all(&self.config.scenarios_dir)?;
        let scenario = Scenario::find(&scenarios, name)
            .cloned()
            .ok_or_else(|| E2eError::ScenarioParse(format!("Scenario not found: {}", name)))?;
        self.run_scenarios(&[scenario]).await
    }

    pub async fn run_scenarios(&self, scenarios: &[Scenario]) -> E2eResult<SuiteResult> {
        let start = Instant::now();
        let locators = LocatorMap::from_file(&self.config.locators_path)?;
        let api = HttpConnectionsApi::new(
            self.config.validator.api_base_url.clone(),
            self.config.validator.timeouts.network_idle(),
        )?;

        info!("Running {} scenario(s)...", scenarios.len());

        let mut results = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            let result = match PlaywrightSession::launch(&self.config.playwright).await {
                Ok(mut session) => {
                    let result = run_scenario(
                        scenario,
                        &mut session,
                        &api,
                        &locators,
                        &self.config.validator,
                    )
                    .await;
                    if let Err(e) = session.close().await {
                        debug!("Closing browser session failed: {}", e);
                    }
                    result
                }
                Err(e) => ScenarioResult::errored(&scenario.name, &e),
            };

            if result.success {
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        Ok(summarize(results, start.elapsed()))
    }

    /// Write the suite result as pretty JSON
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

/// Tally scenario results into a suite result
pub fn summarize(results: Vec<ScenarioResult>, elapsed: Duration) -> SuiteResult {
    let passed = results.iter().filter(|r| r.success).count();
    let failed = results.len() - passed;
    let duration_ms = elapsed.as_millis() as u64;

    info!("");
    info!("Scenario results: {} passed, {} failed ({} ms)", passed, failed, duration_ms);

    SuiteResult {
        total: results.len(),
        passed,
        failed,
        duration_ms,
        results,
    }
}

/// Execute `scenario`'s steps on `page`, stopping at the first failed step
pub async fn run_scenario<P, A>(
    scenario: &Scenario,
    page: &mut P,
    api: &A,
    locators: &LocatorMap,
    config: &ValidatorConfig,
) -> ScenarioResult
where
    P: Page + ?Sized,
    A: ConnectionsApi + ?Sized,
{
    let start = Instant::now();
    debug!("Running scenario: {}", scenario.name);

    let mut steps = Vec::new();
    let mut reports = Vec::new();
    let mut failures = Vec::new();
    let mut scenario_error = None;

    for step in &scenario.steps {
        match step {
            ScenarioStep::Navigate { url, wait_for_selector } => {
                let timeout = config.timeouts.search_result();
                let (result, _) = guarded(step.describe(), timeout, async {
                    page.goto(url).await?;
                    if let Some(selector) = wait_for_selector {
                        page.wait_visible(selector, timeout).await?;
                    }
                    Ok(())
                })
                .await;
                scenario_error = result.error.clone();
                steps.push(result);
            }
            ScenarioStep::VerifyConnections { exhaustive_factor } => {
                let step_start = Instant::now();
                let outcome = ConnectionsValidator::new(&mut *page, api, locators, config)
                    .run(*exhaustive_factor)
                    .await;
                let duration_ms = step_start.elapsed().as_millis() as u64;

                match outcome.and_then(|report| {
                    reports.push(report.clone());
                    report.into_result()
                }) {
                    Ok(_) => steps.push(StepResult::passed(step.describe(), duration_ms)),
                    Err(e) => {
                        if let E2eError::ValidationFailed { failures: found } = &e {
                            failures.extend(found.iter().cloned());
                        }
                        steps.push(StepResult::failed(step.describe(), duration_ms, e.to_string()));
                        scenario_error = Some(e.to_string());
                    }
                }
            }
        }

        if scenario_error.is_some() {
            break;
        }
    }

    ScenarioResult {
        name: scenario.name.clone(),
        success: scenario_error.is_none(),
        duration_ms: start.elapsed().as_millis() as u64,
        steps,
        reports,
        failures,
        error: scenario_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, success: bool) -> ScenarioResult {
        ScenarioResult {
            name: name.to_string(),
            success,
            duration_ms: 5,
            steps: vec![],
            reports: vec![],
            failures: if success {
                vec![]
            } else {
                vec![Failure::new("2.1.1 All Accounts + All Connections", "total mismatch")]
            },
            error: None,
        }
    }

    #[test]
    fn test_summarize_counts() {
        let suite = summarize(
            vec![result("a", true), result("b", false)],
            Duration::from_millis(30),
        );
        assert_eq!(suite.total, 2);
        assert_eq!(suite.passed, 1);
        assert_eq!(suite.failed, 1);
        assert!(!suite.success());
        assert!(!suite.results[1].is_setup_error());
    }

    #[test]
    fn test_errored_scenario_is_setup_error() {
        let scenario = ScenarioResult::errored("smoke", &E2eError::PlaywrightNotFound);
        assert!(scenario.is_setup_error());
        assert!(scenario.error.unwrap().contains("npx playwright install"));
    }

    #[test]
    fn test_write_results() {
        let dir = tempfile::tempdir().unwrap();
        let runner = TestRunner::with_config(RunnerConfig {
            output_dir: dir.path().join("out"),
            ..RunnerConfig::default()
        });
        let suite = summarize(vec![result("a", true)], Duration::from_millis(1));
        let path = runner.write_results(&suite).unwrap();

        let written: SuiteResult =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written.passed, 1);
        assert_eq!(written.results[0].name, "a");
    }
}
