//! Declarative YAML scenarios

use aerialink_common::ExhaustiveFactor;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{E2eError, E2eResult};

/// A scenario parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name for this scenario
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    /// Steps to execute in order
    pub steps: Vec<ScenarioStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScenarioStep {
    /// Open a URL (relative to the app base URL)
    Navigate {
        url: String,
        #[serde(default)]
        wait_for_selector: Option<String>,
    },

    /// Reconcile the Connections page against the API
    VerifyConnections {
        #[serde(default = "default_factor")]
        exhaustive_factor: ExhaustiveFactor,
    },
}

fn default_factor() -> ExhaustiveFactor {
    ExhaustiveFactor::FULL
}

impl ScenarioStep {
    pub fn describe(&self) -> String {
        match self {
            ScenarioStep::Navigate { url, .. } => format!("Navigate to {}", url),
            ScenarioStep::VerifyConnections { exhaustive_factor } => {
                format!("Verify connections at {}", exhaustive_factor)
            }
        }
    }
}

impl Scenario {
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let scenario: Self = serde_yaml::from_str(yaml)?;
        if scenario.steps.is_empty() {
            return Err(E2eError::ScenarioParse(format!(
                "scenario '{}' has no steps",
                scenario.name
            )));
        }
        Ok(scenario)
    }

    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::ScenarioParse(format!("{}: {}", path.display(), e)))
    }

    /// Load every `.yaml`/`.yml` scenario under `dir`, ordered by file name
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut scenarios = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            scenarios.push(Self::from_file(entry.path())?);
        }

        Ok(scenarios)
    }

    pub fn filter_by_tag<'a>(scenarios: &'a [Self], tag: &str) -> Vec<&'a Self> {
        scenarios.iter().filter(|s| s.tags.iter().any(|t| t == tag)).collect()
    }

    pub fn find<'a>(scenarios: &'a [Self], name: &str) -> Option<&'a Self> {
        scenarios.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_connections_scenario() {
        let yaml = r#"
name: connections-smoke
description: Reconcile the Connections page at 5%
tags:
  - connections
  - smoke
steps:
  - action: navigate
    url: /connections
    wait_for_selector: '[data-testid="connections-table"]'
  - action: verify_connections
    exhaustive_factor: 5
"#;
        let scenario = Scenario::from_yaml(yaml).unwrap();
        assert_eq!(scenario.name, "connections-smoke");
        assert_eq!(scenario.steps.len(), 2);
        match &scenario.steps[1] {
            ScenarioStep::VerifyConnections { exhaustive_factor } => {
                assert_eq!(exhaustive_factor.percent(), 5)
            }
            other => panic!("unexpected step: {:?}", other),
        }
    }

    #[test]
    fn test_factor_defaults_and_bounds() {
        let yaml = "name: d\nsteps:\n  - action: verify_connections\n";
        let scenario = Scenario::from_yaml(yaml).unwrap();
        assert_eq!(scenario.steps[0].describe(), "Verify connections at 100%");

        let yaml =
            "name: bad\nsteps:\n  - action: verify_connections\n    exhaustive_factor: 150\n";
        assert!(Scenario::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_empty_scenario_rejected() {
        assert!(matches!(
            Scenario::from_yaml("name: empty\nsteps: []\n"),
            Err(E2eError::ScenarioParse(_))
        ));
    }

    #[test]
    fn test_load_and_filter() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("b.yaml"),
            concat!(
                "name: full\ntags: [nightly]\nsteps:\n",
                "  - action: verify_connections\n    exhaustive_factor: 100\n",
            ),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a.yml"),
            "name: smoke\ntags: [smoke]\nsteps:\n  - action: navigate\n    url: /connections\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let scenarios = Scenario::load_all(dir.path()).unwrap();
        let names: Vec<&str> = scenarios.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["smoke", "full"]);
        assert_eq!(Scenario::filter_by_tag(&scenarios, "nightly").len(), 1);
        assert!(Scenario::find(&scenarios, "smoke").is_some());
    }
}
