//! UI reconciliation driver
//!
//! Walks the coverage plan through the rendered table. Every (account,
//! connection) pair yields exactly one [`ValidationRow`]; a failing pair never
//! stops the pairs after it.

use aerialink_common::{
    Account, Connection, ConnectionSelector, CoveragePlan, PaginationSummary, Phase, PlanEntry,
    ValidationRow, Verdict,
};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::api::{account_url, category_counts_url, count_for_connection};
use crate::page::Page;
use crate::screen::{ConnectionsScreen, RowCount};
use crate::step::{guarded, StepResult};

/// What the API says a pair should show
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expectation {
    pub api_url: String,
    pub count: u64,
}

/// API-side expectations for every planned pair
#[derive(Debug, Clone)]
pub struct Expectations {
    base_url: String,
    connections_by_account: HashMap<u64, Vec<Connection>>,
}

impl Expectations {
    pub fn new(
        base_url: impl Into<String>,
        connections_by_account: HashMap<u64, Vec<Connection>>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            connections_by_account,
        }
    }

    pub fn connections_by_account(&self) -> &HashMap<u64, Vec<Connection>> {
        &self.connections_by_account
    }

    pub fn for_pair(&self, account: &Account, selector: &ConnectionSelector) -> Expectation {
        let Some(account_id) = account.account_id else {
            return Expectation {
                api_url: category_counts_url(&self.base_url),
                count: account.connection_count,
            };
        };

        let count = match selector {
            ConnectionSelector::AllConnections => account.connection_count,
            ConnectionSelector::Specific(connection) => self
                .connections_by_account
                .get(&account_id)
                .map(|list| count_for_connection(list, &connection.connection_id))
                .unwrap_or(0),
        };
        Expectation {
            api_url: account_url(&self.base_url, account_id),
            count,
        }
    }
}

/// What the table showed for a pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub summary: PaginationSummary,
    pub rows: RowCount,
}

/// Build the row for one pair from what was expected and what was observed
pub fn reconciliation_row(
    validation_id: String,
    account: &Account,
    selector: &ConnectionSelector,
    expectation: &Expectation,
    observed: Result<Observation, String>,
) -> ValidationRow {
    let mut row = ValidationRow {
        validation_id,
        phase: Phase::Reconciliation,
        account_label: account.display_label.clone(),
        connection_label: selector.label(),
        api_url: expectation.api_url.clone(),
        api_count: Some(expectation.count),
        ui_count: None,
        row_count_match: false,
        sort_match: None,
        no_records_flag_match: false,
        result: Verdict::Fail,
        detail: String::new(),
    };

    let observation = match observed {
        Ok(observation) => observation,
        Err(error) => {
            row.detail = error;
            return row;
        }
    };

    let expected_rows = observation.summary.expected_visible_rows();
    let total_match = observation.summary.total == expectation.count;
    row.ui_count = Some(observation.summary.total);
    row.row_count_match = observation.rows.rows == expected_rows;
    row.no_records_flag_match = observation.rows.no_matching_records == (expectation.count == 0);

    let mut problems = Vec::new();
    if !total_match {
        problems.push(format!(
            "total mismatch (UI {}, API {})",
            observation.summary.total, expectation.count
        ));
    }
    if !row.row_count_match {
        problems.push(format!(
            "visible rows mismatch (expected {}, found {})",
            expected_rows, observation.rows.rows
        ));
    }
    if !row.no_records_flag_match {
        problems.push(if observation.rows.no_matching_records {
            "\"No matching records\" shown for a non-empty result".to_string()
        } else {
            "\"No matching records\" missing for an empty result".to_string()
        });
    }

    row.result = Verdict::from_passed(problems.is_empty());
    row.detail = if problems.is_empty() {
        format!("{} entries, {} rows visible", observation.summary.total, observation.rows.rows)
    } else {
        problems.join("; ")
    };
    row
}

pub struct ReconciliationDriver<'s, 'a, P: Page + ?Sized> {
    screen: &'s mut ConnectionsScreen<'a, P>,
    expectations: &'s Expectations,
    steps: Vec<StepResult>,
}

impl<'s, 'a, P: Page + ?Sized> ReconciliationDriver<'s, 'a, P> {
    pub fn new(screen: &'s mut ConnectionsScreen<'a, P>, expectations: &'s Expectations) -> Self {
        Self {
            screen,
            expectations,
            steps: Vec::new(),
        }
    }

    /// Guarded steps executed so far, drained
    pub fn take_steps(&mut self) -> Vec<StepResult> {
        std::mem::take(&mut self.steps)
    }

    /// Reconcile every pair of `plan`
    pub async fn reconcile(&mut self, plan: &CoveragePlan) -> Vec<ValidationRow> {
        let mut rows = Vec::with_capacity(plan.pair_count());
        for (index, entry) in plan.entries().iter().enumerate() {
            rows.extend(self.reconcile_entry(index, entry).await);
        }
        rows
    }

    /// Reconcile the pairs of the `index`-th plan entry
    pub async fn reconcile_entry(&mut self, index: usize, entry: &PlanEntry) -> Vec<ValidationRow> {
        info!(
            "Validation 2.{}: {} (connectionCount={}, {} connection filter(s))",
            index + 1,
            entry.account.display_label,
            entry.account.connection_count,
            entry.connections.len()
        );

        let mut rows = Vec::with_capacity(entry.connections.len());
        for (position, selector) in entry.connections.iter().enumerate() {
            let validation_id = format!("2.{}.{}", index + 1, position + 1);
            let row = self.reconcile_pair(validation_id, &entry.account, selector).await;
            if row.passed() {
                info!("✓ {} {}", row.validation_id, row.scenario());
            } else {
                warn!("✗ {} {} - {}", row.validation_id, row.scenario(), row.detail);
            }
            rows.push(row);
        }
        rows
    }

    async fn reconcile_pair(
        &mut self,
        validation_id: String,
        account: &Account,
        selector: &ConnectionSelector,
    ) -> ValidationRow {
        let expectation = self.expectations.for_pair(account, selector);
        let limit = self.screen.timeouts().guard();
        let scenario = format!("{} + {}", account.display_label, selector.label());

        // Recorded but never blocks the pair
        let (step, _) = guarded("Close open dropdowns", limit, self.screen.close_dropdowns()).await;
        self.steps.push(step);

        let label = account.display_label.clone();
        let (step, selected) = guarded(
            format!("Select account {}", label),
            limit,
            self.screen.select_account(&label),
        )
        .await;
        let mut failure = step.error.clone();
        self.steps.push(step);

        if selected.is_some() {
            let token = selector.token();
            let (step, _) = guarded(
                format!("Select connection {}", token),
                limit,
                self.screen.select_connection(&token),
            )
            .await;
            failure = step.error.clone();
            self.steps.push(step);
        }

        if failure.is_none() {
            let (step, _) = guarded(
                format!("Search {}", scenario),
                limit,
                self.screen.search(account.account_id),
            )
            .await;
            failure = step.error.clone();
            self.steps.push(step);
        }

        let observed = match failure {
            Some(error) => Err(format!("not reached: {}", error)),
            None => {
                let screen = &mut *self.screen;
                let (step, observation) = guarded(
                    format!("Validate record counts {}", scenario),
                    limit,
                    async {
                        let summary = screen.read_summary().await?;
                        let rows = screen.count_rows().await?;
                        Ok(Observation { summary, rows })
                    },
                )
                .await;
                let error = step.error.clone();
                self.steps.push(step);
                observation.ok_or_else(|| error.unwrap_or_default())
            }
        };

        reconciliation_row(validation_id, account, selector, &expectation, observed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(id: &str) -> Connection {
        Connection {
            connection_id: id.to_string(),
            display_label: format!("Conn {}", id),
            owner_account_id: 12,
            connection_guid: None,
        }
    }

    fn observation(start: u64, end: u64, total: u64, rows: u64, nmr: bool) -> Observation {
        Observation {
            summary: PaginationSummary { start, end, total },
            rows: RowCount {
                rows,
                no_matching_records: nmr,
            },
        }
    }

    fn expectations() -> Expectations {
        let mut by_account = HashMap::new();
        by_account.insert(12, vec![connection("538"), connection("539"), connection("538")]);
        Expectations::new("http://api.test", by_account)
    }

    #[test]
    fn test_expectations_per_selector() {
        let expectations = expectations();
        let aggregate = Account::all_accounts(172);
        let all = expectations.for_pair(&aggregate, &ConnectionSelector::AllConnections);
        assert_eq!(all.count, 172);
        assert!(all.api_url.ends_with("/api/connections/category-counts"));

        let parent = Account::parent(12, 3);
        let parent_all = expectations.for_pair(&parent, &ConnectionSelector::AllConnections);
        assert_eq!(parent_all.count, 3);
        assert_eq!(parent_all.api_url, "http://api.test/api/connections/account/12");

        let specific =
            expectations.for_pair(&parent, &ConnectionSelector::Specific(connection("538")));
        assert_eq!(specific.count, 2);
    }

    #[test]
    fn test_row_passes_when_everything_matches() {
        let account = Account::parent(12, 150);
        let expectation = Expectation {
            api_url: "u".to_string(),
            count: 150,
        };
        let row = reconciliation_row(
            "2.2.1".to_string(),
            &account,
            &ConnectionSelector::AllConnections,
            &expectation,
            Ok(observation(1, 100, 150, 100, false)),
        );
        assert!(row.passed(), "{}", row.detail);
        assert_eq!(row.ui_count, Some(150));
        assert_eq!(row.scenario(), "[12] + All Connections");
    }

    #[test]
    fn test_row_reports_each_mismatch() {
        let account = Account::parent(12, 150);
        let expectation = Expectation {
            api_url: "u".to_string(),
            count: 150,
        };
        let row = reconciliation_row(
            "2.2.1".to_string(),
            &account,
            &ConnectionSelector::AllConnections,
            &expectation,
            Ok(observation(1, 100, 149, 99, false)),
        );
        assert!(!row.passed());
        assert!(row.detail.contains("UI 149, API 150"));
        assert!(row.detail.contains("expected 100, found 99"));
        assert!(row.no_records_flag_match);
    }

    #[test]
    fn test_empty_result_needs_no_records_indicator() {
        let account = Account::parent(40, 0);
        let expectation = Expectation {
            api_url: "u".to_string(),
            count: 0,
        };
        let ok = reconciliation_row(
            "2.5.1".to_string(),
            &account,
            &ConnectionSelector::AllConnections,
            &expectation,
            Ok(observation(0, 0, 0, 0, true)),
        );
        assert!(ok.passed(), "{}", ok.detail);

        let missing = reconciliation_row(
            "2.5.1".to_string(),
            &account,
            &ConnectionSelector::AllConnections,
            &expectation,
            Ok(observation(0, 0, 0, 0, false)),
        );
        assert!(!missing.passed());
        assert!(!missing.no_records_flag_match);
    }

    #[test]
    fn test_unreached_pair_is_na() {
        let account = Account::parent(12, 150);
        let expectation = Expectation {
            api_url: "u".to_string(),
            count: 150,
        };
        let row = reconciliation_row(
            "2.2.2".to_string(),
            &account,
            &ConnectionSelector::Specific(connection("538")),
            &expectation,
            Err("not reached: no matching options".to_string()),
        );
        assert!(!row.passed());
        assert_eq!(row.ui_count, None);
        assert_eq!(row.connection_label, "Conn 538 [538]");
    }
}
