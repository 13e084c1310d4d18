//! Reconciliation reporter
//!
//! Collects rows, page checks and step results as they are produced and
//! turns them into per-phase tables plus the overall verdict.

use aerialink_common::pagination::page_label;
use aerialink_common::{Failure, PageCheck, Phase, ValidationRow, Verdict};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use crate::error::{E2eError, E2eResult};
use crate::step::StepResult;

const ROW_HEADERS: [&str; 8] = [
    "ID",
    "Scenario",
    "API",
    "API Count",
    "UI Count",
    "Rows",
    "NMR",
    "Result",
];
const MATRIX_HEADERS: [&str; 7] = [
    "Sort Option",
    "Entries",
    "Pages Nav.",
    "Page 1st",
    "Page 3rd",
    "Page Last",
    "Sort",
];

/// Rendered table of one phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportTable {
    pub phase: Phase,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn render(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(self.headers.clone());
        for row in &self.rows {
            table.add_row(row.clone());
        }
        format!("{}\n{}", self.phase.title(), table)
    }
}

fn optional(value: Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "N/A".to_string())
}

fn flag(matched: bool) -> &'static str {
    if matched {
        "✓"
    } else {
        "✗"
    }
}

fn row_cells(row: &ValidationRow) -> Vec<String> {
    vec![
        row.validation_id.clone(),
        row.scenario(),
        row.api_url.clone(),
        optional(row.api_count),
        optional(row.ui_count),
        flag(row.row_count_match).to_string(),
        flag(row.no_records_flag_match).to_string(),
        row.result.to_string(),
    ]
}

/// Matrix cell for one validated page
pub fn page_cell(check: Option<&PageCheck>) -> String {
    let Some(check) = check else {
        return "N/A".to_string();
    };
    if check.error.is_some() || check.page_number.is_none() {
        return "N/A".to_string();
    }
    if check.no_matching_records && check.actual_rows == 0 {
        return "NMR".to_string();
    }
    let verdict = if check.rows_match() { "PASS" } else { "FAIL" };
    format!("{} e:{} a:{}", verdict, check.expected_rows, check.actual_rows)
}

#[derive(Clone, Copy)]
enum PageColumn {
    First,
    Third,
    Last,
}

/// A single-page combination fills both the 1st and Last cells
fn fills(check: &PageCheck, column: PageColumn) -> bool {
    let (Some(page), Some(total)) = (check.page_number, check.total_pages) else {
        return false;
    };
    match column {
        PageColumn::First => page == 1,
        PageColumn::Third => page == 3 && page != total,
        PageColumn::Last => page == total,
    }
}

/// One row per sort option × page size, in first-seen order
fn matrix_rows(checks: &[PageCheck]) -> Vec<Vec<String>> {
    let mut combos: Vec<(&str, u64)> = Vec::new();
    for check in checks {
        let combo = (check.sort_option.as_str(), check.page_size);
        if !combos.contains(&combo) {
            combos.push(combo);
        }
    }

    combos
        .into_iter()
        .map(|(sort, size)| {
            let group: Vec<&PageCheck> = checks
                .iter()
                .filter(|c| c.sort_option == sort && c.page_size == size)
                .collect();

            let pick = |column| group.iter().copied().find(|c| fills(c, column));

            let navigated: Vec<String> = group
                .iter()
                .filter_map(|c| Some(page_label(c.page_number?, c.total_pages?)))
                .collect();
            let pages = if navigated.is_empty() {
                "N/A".to_string()
            } else {
                navigated.join(", ")
            };

            let reached: Vec<&&PageCheck> = group.iter().filter(|c| c.error.is_none()).collect();
            let sort_cell = if reached.is_empty() {
                "N/A".to_string()
            } else {
                Verdict::from_passed(reached.iter().all(|c| c.sort_in_order)).to_string()
            };

            vec![
                sort.to_string(),
                size.to_string(),
                pages,
                page_cell(pick(PageColumn::First)),
                page_cell(pick(PageColumn::Third)),
                page_cell(pick(PageColumn::Last)),
                sort_cell,
            ]
        })
        .collect()
}

/// Accumulates outcomes in the order they are produced
#[derive(Debug, Default)]
pub struct Reporter {
    rows: Vec<ValidationRow>,
    page_checks: Vec<PageCheck>,
    steps: Vec<StepResult>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_row(&mut self, row: ValidationRow) {
        self.rows.push(row);
    }

    pub fn append_page_check(&mut self, check: PageCheck) {
        self.page_checks.push(check);
    }

    pub fn record_step(&mut self, step: StepResult) {
        self.steps.push(step);
    }

    pub fn extend_rows(&mut self, rows: impl IntoIterator<Item = ValidationRow>) {
        rows.into_iter().for_each(|row| self.append_row(row));
    }

    pub fn extend_page_checks(&mut self, checks: impl IntoIterator<Item = PageCheck>) {
        checks.into_iter().for_each(|check| self.append_page_check(check));
    }

    pub fn extend_steps(&mut self, steps: impl IntoIterator<Item = StepResult>) {
        steps.into_iter().for_each(|step| self.record_step(step));
    }

    pub fn finish(self) -> RunReport {
        let mut failures: Vec<Failure> = self
            .steps
            .iter()
            .filter(|s| !s.success)
            .map(|s| Failure::new(&s.step_name, s.error.clone().unwrap_or_default()))
            .collect();

        failures.extend(
            self.rows
                .iter()
                .filter(|r| !r.passed())
                .map(|r| Failure::new(format!("{} {}", r.validation_id, r.scenario()), &r.detail)),
        );

        failures.extend(self.page_checks.iter().filter(|c| !c.passed()).map(|c| {
            let page = c
                .page_number
                .map(|p| format!("page {}", p))
                .unwrap_or_else(|| "not reached".to_string());
            Failure::new(
                format!("Show {} entries, {} ({})", c.page_size, page, c.sort_option),
                c.failure_reason().unwrap_or_default(),
            )
        }));

        let mut tables = Vec::new();
        for phase in Phase::ALL {
            if phase == Phase::SortPaging {
                if !self.page_checks.is_empty() {
                    tables.push(ReportTable {
                        phase,
                        headers: MATRIX_HEADERS.iter().map(|h| h.to_string()).collect(),
                        rows: matrix_rows(&self.page_checks),
                    });
                }
                continue;
            }
            let rows: Vec<Vec<String>> = self
                .rows
                .iter()
                .filter(|r| r.phase == phase)
                .map(row_cells)
                .collect();
            if !rows.is_empty() {
                tables.push(ReportTable {
                    phase,
                    headers: ROW_HEADERS.iter().map(|h| h.to_string()).collect(),
                    rows,
                });
            }
        }

        RunReport {
            overall: Verdict::from_passed(failures.is_empty()),
            tables,
            rows: self.rows,
            page_checks: self.page_checks,
            steps: self.steps,
            failures,
        }
    }
}

/// Final outcome of one validation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub overall: Verdict,
    pub tables: Vec<ReportTable>,
    pub rows: Vec<ValidationRow>,
    pub page_checks: Vec<PageCheck>,
    pub steps: Vec<StepResult>,
    pub failures: Vec<Failure>,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        self.overall.is_pass()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for table in &self.tables {
            out.push_str(&table.render());
            out.push_str("\n\n");
        }
        out.push_str(&self.headline());
        for failure in &self.failures {
            out.push_str(&format!("\n  - {}", failure));
        }
        out
    }

    /// One-line verdict, colored for terminals
    pub fn headline(&self) -> String {
        let total_ms: u64 = self.steps.iter().map(|s| s.duration_ms).sum();
        let verdict = match self.overall {
            Verdict::Pass => "✓ PASS".green().bold(),
            Verdict::Fail => "✗ FAIL".red().bold(),
        };
        format!(
            "{} {} row(s), {} page check(s), {} step(s) in {} ms, {} failure(s)",
            verdict,
            self.rows.len(),
            self.page_checks.len(),
            self.steps.len(),
            total_ms,
            self.failures.len()
        )
    }

    pub fn log(&self) {
        for line in self.render().lines() {
            info!("{}", line);
        }
    }

    /// `Err(ValidationFailed)` carrying every failure when the run failed
    pub fn into_result(self) -> E2eResult<RunReport> {
        if self.passed() {
            Ok(self)
        } else {
            Err(E2eError::ValidationFailed {
                failures: self.failures,
            })
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
