//! Checks around the reconciliation: account dropdown integrity, the
//! Connection GUID filter, and reset-to-default.

use aerialink_common::{Phase, ValidationRow, Verdict, ALL_ACCOUNTS};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::error::E2eResult;
use crate::page::Page;
use crate::screen::ConnectionsScreen;

static ACCOUNT_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(\d+)\]").expect("account id pattern is valid"));

/// Account IDs on either side of the dropdown comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropdownComparison {
    pub ui_ids: Vec<u64>,
    pub api_ids: Vec<u64>,
    pub missing_in_ui: Vec<u64>,
    pub missing_in_api: Vec<u64>,
    /// UI count minus API count
    pub difference: i64,
    pub passed: bool,
}

/// Compare dropdown option texts with the API's parent IDs
pub fn compare_account_ids(
    ui_texts: &[String],
    api_ids: &[u64],
    tolerance: u64,
) -> DropdownComparison {
    let ui_ids: Vec<u64> = ui_texts
        .iter()
        .filter(|text| text.trim() != ALL_ACCOUNTS)
        .filter_map(|text| ACCOUNT_ID_RE.captures(text))
        .filter_map(|caps| caps[1].parse().ok())
        .collect();

    let ui_set: BTreeSet<u64> = ui_ids.iter().copied().collect();
    let api_set: BTreeSet<u64> = api_ids.iter().copied().collect();
    let missing_in_ui = api_set.difference(&ui_set).copied().collect();
    let missing_in_api = ui_set.difference(&api_set).copied().collect();

    let difference = ui_ids.len() as i64 - api_ids.len() as i64;
    DropdownComparison {
        passed: difference <= tolerance as i64,
        ui_ids,
        api_ids: api_ids.to_vec(),
        missing_in_ui,
        missing_in_api,
        difference,
    }
}

impl DropdownComparison {
    pub fn into_row(self, api_url: &str, tolerance: u64) -> ValidationRow {
        let mut detail = if self.passed {
            format!(
                "API={}, UI={}, difference {} within tolerance {}",
                self.api_ids.len(),
                self.ui_ids.len(),
                self.difference,
                tolerance
            )
        } else {
            format!(
                "UI lists {} more account IDs than the API (tolerance {})",
                self.difference, tolerance
            )
        };
        if !self.missing_in_ui.is_empty() {
            detail.push_str(&format!("; missing in UI: {:?}", self.missing_in_ui));
        }
        if !self.missing_in_api.is_empty() {
            detail.push_str(&format!("; missing in API: {:?}", self.missing_in_api));
        }

        ValidationRow {
            validation_id: "1".to_string(),
            phase: Phase::DropdownIntegrity,
            account_label: "Account dropdown".to_string(),
            connection_label: String::new(),
            api_url: api_url.to_string(),
            api_count: Some(self.api_ids.len() as u64),
            ui_count: Some(self.ui_ids.len() as u64),
            row_count_match: self.passed,
            sort_match: None,
            no_records_flag_match: true,
            result: Verdict::from_passed(self.passed),
            detail,
        }
    }
}

/// Open the account dropdown and compare its IDs with the API's parents
pub async fn check_account_dropdown<P: Page + ?Sized>(
    screen: &mut ConnectionsScreen<'_, P>,
    api_parent_ids: &[u64],
    api_url: &str,
    tolerance: u64,
) -> E2eResult<ValidationRow> {
    let texts = screen.account_options().await?;
    let comparison = compare_account_ids(&texts, api_parent_ids, tolerance);

    info!(
        "Validation 1: API parents {}, UI accounts {}, difference {}",
        comparison.api_ids.len(),
        comparison.ui_ids.len(),
        comparison.difference
    );
    if !comparison.missing_in_ui.is_empty() {
        info!("IDs in API but missing in UI: {:?}", comparison.missing_in_ui);
    }
    if !comparison.missing_in_api.is_empty() {
        info!("IDs in UI but missing in API: {:?}", comparison.missing_in_api);
    }

    screen.close_dropdowns().await?;
    Ok(comparison.into_row(api_url, tolerance))
}

/// Filter by a connection GUID and expect exactly one entry
pub async fn check_connection_guid<P: Page + ?Sized>(
    screen: &mut ConnectionsScreen<'_, P>,
    scenario: &str,
    guid: &str,
    api_url: &str,
) -> E2eResult<ValidationRow> {
    screen.reset().await?;
    screen.fill_connection_guid(guid).await?;
    screen.search(None).await?;

    let summary = screen.read_summary().await?;
    let rows = screen.count_rows().await?;

    // Leave the GUID filter empty for the checks that follow
    screen.fill_connection_guid("").await?;

    let passed = summary.total == 1 && rows.rows == 1;
    if !passed {
        warn!(
            "Connection GUID {} matched {} entries ({} rows)",
            guid, summary.total, rows.rows
        );
    }

    Ok(ValidationRow {
        validation_id: "3".to_string(),
        phase: Phase::AuxiliaryFields,
        account_label: scenario.to_string(),
        connection_label: format!("GUID {}", guid),
        api_url: api_url.to_string(),
        api_count: Some(1),
        ui_count: Some(summary.total),
        row_count_match: rows.rows == summary.expected_visible_rows(),
        sort_match: None,
        no_records_flag_match: !rows.no_matching_records,
        result: Verdict::from_passed(passed),
        detail: format!("{} entries, {} rows visible", summary.total, rows.rows),
    })
}

/// Reset the filters and expect the unfiltered table
pub async fn check_reset_to_default<P: Page + ?Sized>(
    screen: &mut ConnectionsScreen<'_, P>,
    grand_total: u64,
    api_url: &str,
) -> E2eResult<ValidationRow> {
    screen.reset().await?;

    let filter_text = screen.account_filter_text().await?;
    let summary = screen.read_summary().await?;
    let rows = screen.count_rows().await?;

    let filter_reset = filter_text.contains(ALL_ACCOUNTS);
    let total_match = summary.total == grand_total;

    let mut problems = Vec::new();
    if !filter_reset {
        problems.push(format!("account filter shows \"{}\"", filter_text.trim()));
    }
    if !total_match {
        problems.push(format!("total {} after reset, expected {}", summary.total, grand_total));
    }

    Ok(ValidationRow {
        validation_id: "4".to_string(),
        phase: Phase::ResetToDefault,
        account_label: ALL_ACCOUNTS.to_string(),
        connection_label: "Reset".to_string(),
        api_url: api_url.to_string(),
        api_count: Some(grand_total),
        ui_count: Some(summary.total),
        row_count_match: rows.rows == summary.expected_visible_rows(),
        sort_match: None,
        no_records_flag_match: rows.no_matching_records == (grand_total == 0),
        result: Verdict::from_passed(problems.is_empty()),
        detail: if problems.is_empty() {
            "filters restored".to_string()
        } else {
            problems.join("; ")
        },
    })
}
