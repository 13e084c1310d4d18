//! Interactions with the rendered Connections page
//!
//! [`ConnectionsScreen`] binds a [`Page`] to the locator map and timeouts and
//! exposes the handful of composite actions the validator performs: filter
//! selection, search, summary and row reads, sorting, page size and
//! pagination.

use aerialink_common::{PaginationSummary, SortField};
use tracing::debug;

use crate::config::Timeouts;
use crate::error::{E2eError, E2eResult};
use crate::locators::{ElementId, LocatorMap};
use crate::page::Page;

/// Rendered rows on the current page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowCount {
    /// Data rows; a visible "no matching records" row counts as zero
    pub rows: u64,
    pub no_matching_records: bool,
}

pub struct ConnectionsScreen<'a, P: Page + ?Sized> {
    page: &'a mut P,
    locators: &'a LocatorMap,
    timeouts: Timeouts,
}

fn non_empty(texts: Vec<String>) -> Vec<String> {
    texts
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

impl<'a, P: Page + ?Sized> ConnectionsScreen<'a, P> {
    pub fn new(page: &'a mut P, locators: &'a LocatorMap, timeouts: Timeouts) -> Self {
        Self { page, locators, timeouts }
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    pub fn locators(&self) -> &LocatorMap {
        self.locators
    }

    async fn click(&mut self, id: ElementId) -> E2eResult<()> {
        let selector = self.locators.get(id)?;
        debug!("CLICK {:?} | {}", id, selector);
        self.page.click(selector, self.timeouts.interaction()).await
    }

    async fn fill(&mut self, id: ElementId, value: &str) -> E2eResult<()> {
        let selector = self.locators.get(id)?;
        debug!("FILL {:?} | {} | {}", id, selector, value);
        self.page.fill(selector, value, self.timeouts.interaction()).await
    }

    async fn texts(&mut self, id: ElementId) -> E2eResult<Vec<String>> {
        let selector = self.locators.get(id)?;
        Ok(non_empty(self.page.all_texts(selector).await?))
    }

    /// Clicking the Connection GUID input closes any open dropdown
    pub async fn close_dropdowns(&mut self) -> E2eResult<()> {
        self.click(ElementId::ConnectionGuidInput).await
    }

    /// Option texts of the full account dropdown
    pub async fn account_options(&mut self) -> E2eResult<Vec<String>> {
        self.click(ElementId::AccountDropdown).await?;
        self.page.pause(self.timeouts.dropdown_settle()).await;
        self.texts(ElementId::AccountOptions).await
    }

    /// Pick `label` in the account filter; the search must narrow to exactly one option
    pub async fn select_account(&mut self, label: &str) -> E2eResult<()> {
        self.click(ElementId::AccountDropdown).await?;
        self.fill(ElementId::AccountSearch, label).await?;
        self.page.pause(self.timeouts.dropdown_settle()).await;

        let options = self.texts(ElementId::FirstAccountOption).await?;
        if options.len() != 1 {
            return Err(E2eError::step(
                format!("Select account {}", label),
                format!(
                    "expected exactly one matching option, found {}: {:?}",
                    options.len(),
                    options
                ),
            ));
        }
        self.click(ElementId::FirstAccountOption).await
    }

    /// Pick the connection identified by `token`; the first option must contain it
    pub async fn select_connection(&mut self, token: &str) -> E2eResult<()> {
        self.click(ElementId::ConnectionDropdown).await?;
        self.page.pause(self.timeouts.dropdown_settle()).await;
        self.fill(ElementId::ConnectionSearch, token).await?;
        self.page.pause(self.timeouts.dropdown_settle()).await;

        let options = self.texts(ElementId::FirstConnectionOption).await?;
        match options.first() {
            Some(first) if first.contains(token) => {}
            Some(first) => {
                return Err(E2eError::step(
                    format!("Select connection {}", token),
                    format!("first option \"{}\" does not contain the token", first),
                ))
            }
            None => {
                return Err(E2eError::step(
                    format!("Select connection {}", token),
                    "no matching options",
                ))
            }
        }
        self.click(ElementId::FirstConnectionOption).await
    }

    /// Click Search and wait for the results of `account_id` (or network idle)
    pub async fn search(&mut self, account_id: Option<u64>) -> E2eResult<()> {
        self.click(ElementId::SearchButton).await?;

        let marker = account_id
            .and_then(|id| self.locators.with_param(ElementId::SearchResultsAccountId, id));
        match marker {
            Some(selector) => {
                debug!("WAIT {}", selector);
                self.page
                    .wait_visible(&selector, self.timeouts.search_result())
                    .await
            }
            None => self.page.wait_for_network_idle(self.timeouts.network_idle()).await,
        }
    }

    pub async fn read_summary(&mut self) -> E2eResult<PaginationSummary> {
        let selector = self.locators.get(ElementId::TotalEntries)?;
        let text = self.page.inner_text(selector, self.timeouts.interaction()).await?;
        debug!("READ summary \"{}\"", text.trim());
        PaginationSummary::parse(&text)
            .map_err(|e| E2eError::data_shape("pagination summary", e.to_string()))
    }

    pub async fn count_rows(&mut self) -> E2eResult<RowCount> {
        let selector = self.locators.get(ElementId::TableRows)?;
        let raw = self.page.count(selector).await?;

        let no_matching_records = match self.locators.optional(ElementId::NoMatchingRecords) {
            Some(selector) => self.page.is_visible(selector).await?,
            None => false,
        };

        let rows = if no_matching_records && raw <= 1 { 0 } else { raw };
        Ok(RowCount { rows, no_matching_records })
    }

    /// Non-blank cells of the column `field` sorts by
    pub async fn column_values(&mut self, field: SortField) -> E2eResult<Vec<String>> {
        let id = match field {
            SortField::LastUpdated => ElementId::LastUpdatedColumn,
            SortField::ConnectionId => ElementId::ConnectionIdColumn,
            SortField::ConnectionName => ElementId::ConnectionNameColumn,
        };
        self.texts(id).await
    }

    /// Choose a Sort By option and re-run the search
    pub async fn apply_sort(&mut self, label: &str) -> E2eResult<()> {
        let selector = self.locators.get(ElementId::SortBy)?;
        self.page
            .select_option(selector, label, self.timeouts.interaction())
            .await?;
        self.click(ElementId::SearchButton).await?;
        self.page.wait_for_network_idle(self.timeouts.network_idle()).await
    }

    pub async fn apply_page_size(&mut self, size: u64) -> E2eResult<()> {
        let selector = self.locators.get(ElementId::PageSize)?;
        self.page
            .select_option(selector, &size.to_string(), self.timeouts.interaction())
            .await?;
        self.page.pause(self.timeouts.settle()).await;
        Ok(())
    }

    /// Navigate to `page` of `total_pages`
    pub async fn go_to_page(&mut self, page: u64, total_pages: u64) -> E2eResult<()> {
        if page == 1 {
            self.click(ElementId::FirstPage).await?;
        } else if page == total_pages {
            self.click(ElementId::LastPage).await?;
        } else {
            let linked = match self.locators.with_param(ElementId::PageLink, page) {
                Some(link) => self.page.click(&link, self.timeouts.interaction()).await.is_ok(),
                None => false,
            };
            if !linked {
                self.click(ElementId::FirstPage).await?;
                self.page.pause(self.timeouts.page_settle()).await;
                for _ in 1..page {
                    self.click(ElementId::NextPage).await?;
                    self.page.pause(self.timeouts.page_settle()).await;
                }
                debug!("Reached page {} via First + Next x{}", page, page - 1);
            }
        }
        self.page.wait_for_network_idle(self.timeouts.network_idle()).await?;
        self.page.pause(self.timeouts.page_settle()).await;
        Ok(())
    }

    /// Whether the page has a Reset button configured
    pub fn can_reset(&self) -> bool {
        self.locators.optional(ElementId::ResetButton).is_some()
    }

    pub async fn reset(&mut self) -> E2eResult<()> {
        self.click(ElementId::ResetButton).await?;
        self.page.wait_for_network_idle(self.timeouts.network_idle()).await
    }

    /// Text currently shown by the account filter
    pub async fn account_filter_text(&mut self) -> E2eResult<String> {
        let selector = self.locators.get(ElementId::AccountDropdown)?;
        self.page.inner_text(selector, self.timeouts.interaction()).await
    }

    pub async fn fill_connection_guid(&mut self, guid: &str) -> E2eResult<()> {
        self.fill(ElementId::ConnectionGuidInput, guid).await
    }
}
