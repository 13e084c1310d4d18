//! Core types for the Connections page validator

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Label of the synthetic aggregate account in the account filter
pub const ALL_ACCOUNTS: &str = "All Accounts";

/// Label of the "every connection" option in the connection filter
pub const ALL_CONNECTIONS: &str = "All Connections";

/// `max(1, ceil(total * percent / 100))`
///
/// Defined for a zero total as well, where it yields 1.
pub fn percent_count(total: usize, percent: u32) -> usize {
    let scaled = (total as u64) * u64::from(percent);
    (scaled.div_ceil(100) as usize).max(1)
}

/// How much of the account/connection population a run samples, in percent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ExhaustiveFactor(u32);

impl ExhaustiveFactor {
    /// Factor levels the suite's scenarios are written against
    pub const CANONICAL: [u32; 6] = [5, 10, 25, 50, 75, 100];

    /// Full coverage
    pub const FULL: ExhaustiveFactor = ExhaustiveFactor(100);

    pub fn new(percent: u32) -> Result<Self> {
        if percent == 0 || percent > 100 {
            return Err(Error::InvalidExhaustiveFactor(percent));
        }
        Ok(Self(percent))
    }

    pub fn percent(self) -> u32 {
        self.0
    }

    pub fn is_canonical(self) -> bool {
        Self::CANONICAL.contains(&self.0)
    }

    /// Number of items to take out of `total` at this factor
    pub fn percent_count(self, total: usize) -> usize {
        percent_count(total, self.0)
    }
}

impl TryFrom<u32> for ExhaustiveFactor {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ExhaustiveFactor> for u32 {
    fn from(factor: ExhaustiveFactor) -> Self {
        factor.0
    }
}

impl fmt::Display for ExhaustiveFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Snapshot of an account as reported by the category-counts API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// `None` for the synthetic "All Accounts" aggregate
    pub account_id: Option<u64>,

    /// Text typed into the account filter search to find this account
    pub display_label: String,

    pub connection_count: u64,

    pub is_parent: bool,
}

impl Account {
    /// A parent account, labelled the way the account filter renders its ID
    pub fn parent(account_id: u64, connection_count: u64) -> Self {
        Self {
            account_id: Some(account_id),
            display_label: format!("[{}]", account_id),
            connection_count,
            is_parent: true,
        }
    }

    /// The "All Accounts" aggregate carrying the grand total
    pub fn all_accounts(grand_total: u64) -> Self {
        Self {
            account_id: None,
            display_label: ALL_ACCOUNTS.to_string(),
            connection_count: grand_total,
            is_parent: false,
        }
    }

    pub fn is_aggregate(&self) -> bool {
        self.account_id.is_none()
    }

    /// Identity used for de-duplication
    pub fn key(&self) -> AccountKey<'_> {
        match self.account_id {
            Some(id) => AccountKey::Id(id),
            None => AccountKey::Aggregate(&self.display_label),
        }
    }
}

/// Identity of an account within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountKey<'a> {
    Id(u64),
    Aggregate(&'a str),
}

/// A child connection scoped under a parent account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub connection_id: String,
    pub display_label: String,
    pub owner_account_id: u64,
    #[serde(default)]
    pub connection_guid: Option<String>,
}

impl Connection {
    /// Search token that identifies the connection in the connection filter
    pub fn token(&self) -> String {
        format!("[{}]", self.connection_id)
    }
}

/// What to pick in the connection filter for one reconciliation step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConnectionSelector {
    AllConnections,
    Specific(Connection),
}

impl ConnectionSelector {
    /// Text typed into the connection search input
    pub fn token(&self) -> String {
        match self {
            ConnectionSelector::AllConnections => ALL_CONNECTIONS.to_string(),
            ConnectionSelector::Specific(connection) => connection.token(),
        }
    }

    pub fn label(&self) -> String {
        match self {
            ConnectionSelector::AllConnections => ALL_CONNECTIONS.to_string(),
            ConnectionSelector::Specific(connection) => {
                if connection.display_label.is_empty() {
                    connection.token()
                } else {
                    format!("{} {}", connection.display_label, connection.token())
                }
            }
        }
    }
}

/// Column the table can be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    LastUpdated,
    ConnectionId,
    ConnectionName,
}

impl SortField {
    pub fn label(self) -> &'static str {
        match self {
            SortField::LastUpdated => "Last Updated",
            SortField::ConnectionId => "Connection ID",
            SortField::ConnectionName => "Connection Name",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn is_ascending(self) -> bool {
        matches!(self, SortDirection::Ascending)
    }

    pub fn label(self) -> &'static str {
        match self {
            SortDirection::Ascending => "Ascending",
            SortDirection::Descending => "Descending",
        }
    }
}

/// One entry of the "Sort By" select
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOption {
    pub field: SortField,
    pub direction: SortDirection,

    /// Option text when the UI renders something other than "<field> <direction>"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl SortOption {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self {
            field,
            direction,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Text of the option in the select
    pub fn label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("{} {}", self.field.label(), self.direction.label()))
    }

    pub fn is_ascending(&self) -> bool {
        self.direction.is_ascending()
    }

    /// The six sort options in the order the select lists them
    pub fn defaults() -> Vec<SortOption> {
        use SortDirection::*;
        use SortField::*;

        vec![
            SortOption::new(LastUpdated, Ascending),
            SortOption::new(ConnectionId, Ascending),
            SortOption::new(ConnectionName, Ascending),
            SortOption::new(LastUpdated, Descending),
            SortOption::new(ConnectionId, Descending),
            SortOption::new(ConnectionName, Descending),
        ]
    }
}

/// Page sizes offered by the "Show entries" select
pub const DEFAULT_PAGE_SIZES: [u64; 4] = [100, 300, 500, 1000];

/// Outcome of one check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn from_passed(passed: bool) -> Self {
        if passed {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }

    pub fn is_pass(self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "PASS"),
            Verdict::Fail => write!(f, "FAIL"),
        }
    }
}

/// Validation phase a row belongs to, in report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    DropdownIntegrity,
    Reconciliation,
    SortPaging,
    AuxiliaryFields,
    ResetToDefault,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::DropdownIntegrity,
        Phase::Reconciliation,
        Phase::SortPaging,
        Phase::AuxiliaryFields,
        Phase::ResetToDefault,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Phase::DropdownIntegrity => "Account dropdown integrity",
            Phase::Reconciliation => "Account/connection reconciliation",
            Phase::SortPaging => "Show entries & sort matrix",
            Phase::AuxiliaryFields => "Auxiliary field checks",
            Phase::ResetToDefault => "Reset to default",
        }
    }
}

/// One reconciliation outcome. Created once, never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRow {
    pub validation_id: String,
    pub phase: Phase,
    pub account_label: String,
    pub connection_label: String,
    pub api_url: String,
    pub api_count: Option<u64>,
    pub ui_count: Option<u64>,
    pub row_count_match: bool,
    /// Only set where ordering was checked
    pub sort_match: Option<bool>,
    pub no_records_flag_match: bool,
    pub result: Verdict,
    pub detail: String,
}

impl ValidationRow {
    pub fn passed(&self) -> bool {
        self.result.is_pass()
    }

    /// "<account> + <connection>"
    pub fn scenario(&self) -> String {
        if self.connection_label.is_empty() {
            self.account_label.clone()
        } else {
            format!("{} + {}", self.account_label, self.connection_label)
        }
    }
}

/// Row-count and ordering check of one table page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageCheck {
    pub sort_option: String,
    pub page_size: u64,
    /// `None` when applying the sort or page size failed before any page was reached
    pub page_number: Option<u64>,
    pub total_pages: Option<u64>,
    pub expected_rows: u64,
    pub actual_rows: u64,
    pub sort_ascending: bool,
    pub sample_values: Vec<String>,
    pub sort_in_order: bool,
    pub no_matching_records: bool,
    pub error: Option<String>,
}

impl PageCheck {
    /// A combination that failed before reaching any page
    pub fn unreached(sort: &SortOption, page_size: u64, error: impl Into<String>) -> Self {
        Self {
            sort_option: sort.label(),
            page_size,
            page_number: None,
            total_pages: None,
            expected_rows: 0,
            actual_rows: 0,
            sort_ascending: sort.is_ascending(),
            sample_values: Vec::new(),
            sort_in_order: false,
            no_matching_records: false,
            error: Some(error.into()),
        }
    }

    pub fn rows_match(&self) -> bool {
        self.actual_rows == self.expected_rows
    }

    pub fn passed(&self) -> bool {
        self.error.is_none() && self.rows_match() && self.sort_in_order
    }

    /// Human readable reason for a failed check
    pub fn failure_reason(&self) -> Option<String> {
        if let Some(error) = &self.error {
            return Some(error.clone());
        }
        let mut reasons = Vec::new();
        if !self.rows_match() {
            reasons.push(format!(
                "row count mismatch (expected {}, found {})",
                self.expected_rows, self.actual_rows
            ));
        }
        if !self.sort_in_order {
            reasons.push(format!(
                "values not {}",
                if self.sort_ascending { "ascending" } else { "descending" }
            ));
        }
        if reasons.is_empty() {
            None
        } else {
            Some(reasons.join("; "))
        }
    }
}

/// One enumerated failure, kept for triage without a re-run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub step: String,
    pub error: String,
}

impl Failure {
    pub fn new(step: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            error: error.into(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.step, self.error)
    }
}
