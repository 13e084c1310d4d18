//! In-memory Connections page and connections API
//!
//! `FakePage` renders the table the way the real page does: dropdown filters
//! apply on Search, the page size applies immediately, and an empty result
//! shows a single "no matching records" row. Faults are opt-in per test.

#![allow(dead_code)]

use aerialink_common::pagination::compare_sort_values;
use aerialink_common::{SortField, SortOption, ALL_ACCOUNTS, ALL_CONNECTIONS};
use aerialink_e2e::api::{account_url, category_counts_url, connection_url};
use aerialink_e2e::{
    ConnectionsApi, E2eError, E2eResult, ElementId, LocatorMap, Page, ValidatorConfig,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

pub const API_BASE: &str = "http://api.test";

#[derive(Debug, Clone)]
pub struct Row {
    pub account_id: u64,
    pub connection_id: u64,
    pub name: String,
    pub guid: String,
    pub last_updated: String,
}

impl Row {
    fn new(account_id: u64, connection_id: u64) -> Self {
        Self {
            account_id,
            connection_id,
            name: format!("Gateway {:05}", connection_id),
            guid: format!("guid-{}-{}", account_id, connection_id),
            last_updated: format!(
                "2024-{:02}-{:02}T{:02}:{:02}:00Z",
                1 + connection_id % 12,
                1 + connection_id % 28,
                connection_id % 24,
                connection_id % 60
            ),
        }
    }

    fn cell(&self, field: SortField) -> String {
        match field {
            SortField::LastUpdated => self.last_updated.clone(),
            SortField::ConnectionId => self.connection_id.to_string(),
            SortField::ConnectionName => self.name.clone(),
        }
    }

    fn option(&self) -> String {
        format!("{} [{}]", self.name, self.connection_id)
    }
}

#[derive(Debug, Clone)]
pub struct Dataset {
    /// Parent accounts and their connections, in API order
    pub parents: Vec<(u64, Vec<Row>)>,
    /// Child accounts (ID, count); listed by the API, never by the dropdown
    pub children: Vec<(u64, u64)>,
}

impl Dataset {
    /// Parents 10, 11, ... with `counts` connections each
    pub fn with_counts(counts: &[u64]) -> Self {
        let mut next_connection = 500;
        let parents = counts
            .iter()
            .enumerate()
            .map(|(i, count)| {
                let account_id = 10 + i as u64;
                let rows: Vec<Row> = (0..*count)
                    .map(|_| {
                        next_connection += 1;
                        Row::new(account_id, next_connection)
                    })
                    .collect();
                (account_id, rows)
            })
            .collect();
        Self {
            parents,
            children: vec![(90, 7)],
        }
    }

    pub fn grand_total(&self) -> u64 {
        self.rows().count() as u64
    }

    pub fn account_ids(&self) -> Vec<u64> {
        self.parents.iter().map(|(id, _)| *id).collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.parents.iter().flat_map(|(_, rows)| rows.iter())
    }
}

/// Serves the three connections endpoints from a [`Dataset`]
pub struct FakeApi {
    dataset: Dataset,
    overrides: HashMap<String, Value>,
    calls: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset,
            overrides: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer `url` with `body` instead of the dataset
    pub fn with_body(mut self, url: String, body: Value) -> Self {
        self.overrides.insert(url, body);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn category_counts(&self) -> Value {
        let mut by_account: Vec<Value> = self
            .dataset
            .parents
            .iter()
            .map(|(id, rows)| {
                json!({"accountID": id, "parent": true, "connectionCount": rows.len()})
            })
            .collect();
        by_account.extend(
            self.dataset
                .children
                .iter()
                .map(|(id, count)| {
                    json!({"accountID": id, "parent": false, "connectionCount": count})
                }),
        );
        json!({"data": {"byAccount": by_account, "grandTotal": self.dataset.grand_total()}})
    }
}

fn record(row: &Row) -> Value {
    json!({
        "connectionID": row.connection_id,
        "connectionName": row.name,
        "connectionGUID": row.guid,
    })
}

#[async_trait]
impl ConnectionsApi for FakeApi {
    fn base_url(&self) -> &str {
        API_BASE
    }

    async fn fetch(&self, url: &str) -> E2eResult<Value> {
        self.calls.lock().push(url.to_string());

        if let Some(body) = self.overrides.get(url) {
            return Ok(body.clone());
        }
        if url == category_counts_url(API_BASE) {
            return Ok(self.category_counts());
        }
        for (account_id, rows) in &self.dataset.parents {
            if url == account_url(API_BASE, *account_id) {
                let connections: Vec<Value> = rows.iter().map(record).collect();
                return Ok(json!({"data": {
                    "accountID": account_id,
                    "connectionCount": rows.len(),
                    "connections": connections,
                }}));
            }
            for row in rows {
                if url == connection_url(API_BASE, *account_id, &row.connection_id.to_string()) {
                    return Ok(json!({ "data": record(row) }));
                }
            }
        }
        Err(E2eError::step("GET", format!("404 {}", url)))
    }
}

/// Locator entries whose selectors name the element they resolve
pub fn locator_entries(with_page_link: bool) -> HashMap<String, String> {
    ElementId::ALL
        .iter()
        .filter(|id| with_page_link || **id != ElementId::PageLink)
        .map(|id| {
            let selector = match id {
                ElementId::SearchResultsAccountId => "SearchResultsAccountId:$^$".to_string(),
                ElementId::PageLink => "PageLink:$^$".to_string(),
                other => format!("{:?}", other),
            };
            (id.primary_key().to_string(), selector)
        })
        .collect()
}

pub fn locators() -> LocatorMap {
    LocatorMap::from_entries(&locator_entries(true)).unwrap()
}

/// Validator settings pointing at [`FakeApi`]
pub fn config() -> ValidatorConfig {
    ValidatorConfig {
        api_base_url: API_BASE.to_string(),
        ..ValidatorConfig::default()
    }
}

fn bracketed_id(text: &str) -> Option<u64> {
    let start = text.rfind('[')?;
    let end = text[start..].find(']')? + start;
    text[start + 1..end].parse().ok()
}

fn grouped(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[derive(Debug, Clone, Default)]
struct Filters {
    account: Option<u64>,
    connection: Option<u64>,
    guid: String,
}

pub struct FakePage {
    dataset: Dataset,
    sort_options: Vec<SortOption>,

    /// Accounts whose dropdown search finds nothing
    pub broken_accounts: HashSet<u64>,
    /// Sort By labels the select rejects
    pub broken_sort_labels: HashSet<String>,
    /// Accounts whose summary reports one entry too many
    pub miscounted_accounts: HashSet<u64>,
    /// Fields whose column renders in the wrong direction
    pub unsorted_fields: Vec<SortField>,
    /// Account IDs listed by the dropdown but unknown to the API
    pub extra_dropdown_ids: Vec<u64>,
    /// Accounts listed twice by the dropdown under different names
    pub duplicate_account_options: HashSet<u64>,
    /// Connections whose search puts a retired option without the ID first
    pub decoy_connection_options: HashSet<u64>,
    /// Selectors whose next click times out
    pub failing_clicks: HashSet<String>,

    account_search: String,
    connection_search: String,
    guid_input: String,
    pending: Filters,
    applied: Filters,
    pending_sort: Option<SortOption>,
    applied_sort: Option<SortOption>,
    page_size: u64,
    page: u64,

    pub clicks: Vec<String>,
    pub navigations: Vec<String>,
}

impl FakePage {
    pub fn new(dataset: Dataset, sort_options: &[SortOption]) -> Self {
        Self {
            dataset,
            sort_options: sort_options.to_vec(),
            broken_accounts: HashSet::new(),
            broken_sort_labels: HashSet::new(),
            miscounted_accounts: HashSet::new(),
            unsorted_fields: Vec::new(),
            extra_dropdown_ids: Vec::new(),
            duplicate_account_options: HashSet::new(),
            decoy_connection_options: HashSet::new(),
            failing_clicks: HashSet::new(),
            account_search: String::new(),
            connection_search: String::new(),
            guid_input: String::new(),
            pending: Filters::default(),
            applied: Filters::default(),
            pending_sort: None,
            applied_sort: None,
            page_size: 100,
            page: 1,
            clicks: Vec::new(),
            navigations: Vec::new(),
        }
    }

    pub fn current_page(&self) -> u64 {
        self.page
    }

    pub fn clicks_on(&self, selector: &str) -> usize {
        self.clicks.iter().filter(|c| c.as_str() == selector).count()
    }

    fn account_label(id: u64) -> String {
        format!("Account {} [{}]", id, id)
    }

    fn account_options(&self) -> Vec<String> {
        let mut options = vec![ALL_ACCOUNTS.to_string()];
        options.extend(self.dataset.account_ids().into_iter().map(Self::account_label));
        options.extend(
            self.extra_dropdown_ids
                .iter()
                .map(|id| format!("Archived {} [{}]", id, id)),
        );
        let mut duplicates: Vec<u64> = self.duplicate_account_options.iter().copied().collect();
        duplicates.sort_unstable();
        options.extend(duplicates.into_iter().map(|id| format!("Account {} Archive [{}]", id, id)));
        options
    }

    fn matching_accounts(&self) -> Vec<String> {
        self.account_options()
            .into_iter()
            .filter(|option| option.contains(self.account_search.trim()))
            .filter(|option| {
                bracketed_id(option)
                    .map(|id| !self.broken_accounts.contains(&id))
                    .unwrap_or(true)
            })
            .collect()
    }

    fn matching_connections(&self) -> Vec<String> {
        let mut options = vec![ALL_CONNECTIONS.to_string()];
        options.extend(
            self.dataset
                .rows()
                .filter(|row| self.pending.account.map(|id| row.account_id == id).unwrap_or(true))
                .map(Row::option),
        );
        let search = self.connection_search.trim();
        let mut matching: Vec<String> = options
            .into_iter()
            .filter(|option| option.contains(search))
            .collect();
        if let Some(id) = self
            .decoy_connection_options
            .iter()
            .find(|id| search == format!("[{}]", id))
        {
            matching.insert(0, format!("Retired gateway {}", id));
        }
        matching
    }

    fn results(&self) -> Vec<&Row> {
        let filters = &self.applied;
        let mut rows: Vec<&Row> = self
            .dataset
            .rows()
            .filter(|row| filters.account.map(|id| row.account_id == id).unwrap_or(true))
            .filter(|row| filters.connection.map(|id| row.connection_id == id).unwrap_or(true))
            .filter(|row| filters.guid.is_empty() || row.guid == filters.guid)
            .collect();

        if let Some(sort) = &self.applied_sort {
            rows.sort_by(|a, b| {
                let ord = compare_sort_values(sort.field, &a.cell(sort.field), &b.cell(sort.field));
                if sort.is_ascending() {
                    ord
                } else {
                    ord.reverse()
                }
            });
        }
        rows
    }

    fn total_pages(&self) -> u64 {
        let total = self.results().len() as u64;
        total.div_ceil(self.page_size).max(1)
    }

    fn page_rows(&self) -> Vec<&Row> {
        let skip = ((self.page - 1) * self.page_size) as usize;
        self.results()
            .into_iter()
            .skip(skip)
            .take(self.page_size as usize)
            .collect()
    }

    fn summary(&self) -> String {
        let total = self.results().len() as u64;
        let reported = match self.applied.account {
            Some(id) if self.miscounted_accounts.contains(&id) => total + 1,
            _ => total,
        };
        let (start, end) = if total == 0 {
            (0, 0)
        } else {
            let start = (self.page - 1) * self.page_size + 1;
            (start, (self.page * self.page_size).min(total))
        };
        format!(
            "Showing {} to {} of {} entries",
            grouped(start),
            grouped(end),
            grouped(reported)
        )
    }

    fn column(&self, field: SortField) -> Vec<String> {
        let mut cells: Vec<String> = self.page_rows().iter().map(|row| row.cell(field)).collect();
        if self.unsorted_fields.contains(&field) {
            cells.reverse();
        }
        cells
    }

    fn missing(selector: &str) -> E2eError {
        E2eError::Playwright(format!("no element matches {}", selector))
    }
}

#[async_trait]
impl Page for FakePage {
    async fn goto(&mut self, url: &str) -> E2eResult<()> {
        self.navigations.push(url.to_string());
        Ok(())
    }

    async fn click(&mut self, selector: &str, _timeout: Duration) -> E2eResult<()> {
        if self.failing_clicks.remove(selector) {
            return Err(E2eError::Timeout(format!("click {}", selector)));
        }
        self.clicks.push(selector.to_string());

        match selector {
            "ConnectionGuidInput" => {}
            "AccountDropdown" => self.account_search.clear(),
            "FirstAccountOption" => {
                let first = self
                    .matching_accounts()
                    .into_iter()
                    .next()
                    .ok_or_else(|| Self::missing(selector))?;
                self.pending.account = bracketed_id(&first);
                self.pending.connection = None;
            }
            "ConnectionDropdown" => self.connection_search.clear(),
            "FirstConnectionOption" => {
                let first = self
                    .matching_connections()
                    .into_iter()
                    .next()
                    .ok_or_else(|| Self::missing(selector))?;
                self.pending.connection = bracketed_id(&first);
            }
            "SearchButton" => {
                self.applied = Filters {
                    guid: self.guid_input.trim().to_string(),
                    ..self.pending.clone()
                };
                self.applied_sort = self.pending_sort.clone();
                self.page = 1;
            }
            "ResetButton" => {
                self.pending = Filters::default();
                self.applied = Filters::default();
                self.guid_input.clear();
                self.pending_sort = None;
                self.applied_sort = None;
                self.page_size = 100;
                self.page = 1;
            }
            "FirstPage" => self.page = 1,
            "NextPage" => {
                if self.page >= self.total_pages() {
                    return Err(Self::missing(selector));
                }
                self.page += 1;
            }
            "LastPage" => self.page = self.total_pages(),
            link if link.starts_with("PageLink:") => {
                let page: u64 = link["PageLink:".len()..]
                    .parse()
                    .map_err(|_| Self::missing(selector))?;
                if page == 0 || page > self.total_pages() {
                    return Err(Self::missing(selector));
                }
                self.page = page;
            }
            other => return Err(Self::missing(other)),
        }
        Ok(())
    }

    async fn fill(&mut self, selector: &str, value: &str, _timeout: Duration) -> E2eResult<()> {
        match selector {
            "AccountSearch" => self.account_search = value.to_string(),
            "ConnectionSearch" => self.connection_search = value.to_string(),
            "ConnectionGuidInput" => self.guid_input = value.to_string(),
            other => return Err(Self::missing(other)),
        }
        Ok(())
    }

    async fn select_option(
        &mut self,
        selector: &str,
        label: &str,
        _timeout: Duration,
    ) -> E2eResult<()> {
        match selector {
            "SortBy" => {
                if self.broken_sort_labels.contains(label) {
                    return Err(E2eError::Timeout(format!("select \"{}\" in {}", label, selector)));
                }
                let option = self
                    .sort_options
                    .iter()
                    .find(|option| option.label() == label)
                    .cloned()
                    .ok_or_else(|| E2eError::Playwright(format!("no option \"{}\"", label)))?;
                self.pending_sort = Some(option);
            }
            "PageSize" => {
                self.page_size = label
                    .parse()
                    .map_err(|_| E2eError::Playwright(format!("no option \"{}\"", label)))?;
                self.page = 1;
            }
            other => return Err(Self::missing(other)),
        }
        Ok(())
    }

    async fn inner_text(&mut self, selector: &str, _timeout: Duration) -> E2eResult<String> {
        match selector {
            "TotalEntries" => Ok(self.summary()),
            "AccountDropdown" => Ok(self
                .pending
                .account
                .map(Self::account_label)
                .unwrap_or_else(|| ALL_ACCOUNTS.to_string())),
            other => Err(Self::missing(other)),
        }
    }

    async fn all_texts(&mut self, selector: &str) -> E2eResult<Vec<String>> {
        match selector {
            "AccountOptions" => Ok(self.account_options()),
            "FirstAccountOption" => Ok(self.matching_accounts()),
            "FirstConnectionOption" => Ok(self.matching_connections()),
            "LastUpdatedColumn" => Ok(self.column(SortField::LastUpdated)),
            "ConnectionIdColumn" => Ok(self.column(SortField::ConnectionId)),
            "ConnectionNameColumn" => Ok(self.column(SortField::ConnectionName)),
            other => Err(Self::missing(other)),
        }
    }

    async fn count(&mut self, selector: &str) -> E2eResult<u64> {
        match selector {
            "TableRows" => {
                let rows = self.page_rows().len() as u64;
                Ok(if rows == 0 { 1 } else { rows })
            }
            other => Err(Self::missing(other)),
        }
    }

    async fn is_visible(&mut self, selector: &str) -> E2eResult<bool> {
        Ok(match selector {
            "NoMatchingRecords" => self.results().is_empty(),
            marker if marker.starts_with("SearchResultsAccountId:") => {
                self.applied.account.map(|id| id.to_string()).as_deref()
                    == Some(&marker["SearchResultsAccountId:".len()..])
            }
            _ => false,
        })
    }

    async fn wait_visible(&mut self, selector: &str, timeout: Duration) -> E2eResult<()> {
        if self.is_visible(selector).await? || !selector.starts_with("SearchResultsAccountId:") {
            Ok(())
        } else {
            Err(E2eError::Timeout(format!("{} ({} ms)", selector, timeout.as_millis())))
        }
    }

    async fn wait_for_network_idle(&mut self, _timeout: Duration) -> E2eResult<()> {
        Ok(())
    }

    async fn pause(&mut self, _duration: Duration) {}
}

