//! Typed locator map for the Connections page
//!
//! Locators are stored externally as `"<KEY>.<Page>.<variant>"` → selector
//! entries. Each [`ElementId`] lists the keys it may be stored under, most
//! specific first. Required elements are resolved when the map is loaded so a
//! missing key fails the run before any browser interaction.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{E2eError, E2eResult};

/// Placeholder substituted with a runtime value (account ID, page number)
pub const PARAM_PLACEHOLDER: &str = "$^$";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementId {
    AccountDropdown,
    AccountOptions,
    AccountSearch,
    FirstAccountOption,
    ConnectionDropdown,
    ConnectionSearch,
    FirstConnectionOption,
    ConnectionGuidInput,
    SearchButton,
    ResetButton,
    SearchResultsAccountId,
    TotalEntries,
    TableRows,
    NoMatchingRecords,
    SortBy,
    PageSize,
    FirstPage,
    NextPage,
    LastPage,
    PageLink,
    LastUpdatedColumn,
    ConnectionIdColumn,
    ConnectionNameColumn,
}

impl ElementId {
    pub const ALL: [ElementId; 23] = [
        ElementId::AccountDropdown,
        ElementId::AccountOptions,
        ElementId::AccountSearch,
        ElementId::FirstAccountOption,
        ElementId::ConnectionDropdown,
        ElementId::ConnectionSearch,
        ElementId::FirstConnectionOption,
        ElementId::ConnectionGuidInput,
        ElementId::SearchButton,
        ElementId::ResetButton,
        ElementId::SearchResultsAccountId,
        ElementId::TotalEntries,
        ElementId::TableRows,
        ElementId::NoMatchingRecords,
        ElementId::SortBy,
        ElementId::PageSize,
        ElementId::FirstPage,
        ElementId::NextPage,
        ElementId::LastPage,
        ElementId::PageLink,
        ElementId::LastUpdatedColumn,
        ElementId::ConnectionIdColumn,
        ElementId::ConnectionNameColumn,
    ];

    /// Keys this element may be stored under, in lookup order
    pub fn keys(self) -> &'static [&'static str] {
        match self {
            ElementId::AccountDropdown => &["DDN-Account.Connections.default"],
            ElementId::AccountOptions => &["DDI-AllAccounts.Connections.default"],
            ElementId::AccountSearch => &["INP-AccountSearchText.Connections.default"],
            ElementId::FirstAccountOption => &["DDI-1stAccount.Connections.default"],
            ElementId::ConnectionDropdown => &["DDN-Connection.Connections.default"],
            ElementId::ConnectionSearch => &["INP-ConnectionSearchText.Connections.default"],
            ElementId::FirstConnectionOption => &["DDI-1stConnection.Connections.default"],
            ElementId::ConnectionGuidInput => &["INP-ConnectionGUID.Connections.default"],
            ElementId::SearchButton => &["BTN-Search.Connections.default"],
            ElementId::ResetButton => &["BTN-Reset.Connections.default"],
            ElementId::SearchResultsAccountId => {
                &["TXT-SearchResultsAccountID.Connections.default"]
            }
            ElementId::TotalEntries => &[
                "TXT-TotalEntries.Connections.default",
                "TXT-TotalEntries.CommonPagination.default",
            ],
            ElementId::TableRows => &["TRW-AllRows.Connections.default"],
            ElementId::NoMatchingRecords => &[
                "TCL-NoMatchingRecods.Connections.default",
                "TXT-NoMatchingRecords.CommonTable.NoRecords",
            ],
            ElementId::SortBy => &["DDN-SortBy.Connections.default"],
            ElementId::PageSize => &[
                "DDN-ShowNumberOfEntries.Connections.default",
                "DDN-ShowNumberOfEntries",
            ],
            ElementId::FirstPage => &[
                "BTN-FirstPage.Connections.default",
                "BTN-FirstPage.CommonPagination.default",
            ],
            ElementId::NextPage => &[
                "BTN-NextPage.Connections.default",
                "BTN-NextPage.CommonPagination.default",
            ],
            ElementId::LastPage => &[
                "BTN-LastPage.Connections.default",
                "BTN-LastPage.CommonPagination.default",
            ],
            ElementId::PageLink => &[
                "LNK-PageNumber.Connections.default",
                "LNK-PageNumber.CommonPagination.default",
            ],
            ElementId::LastUpdatedColumn => &["TCL-LastUpdatedColumn.Connections.default"],
            ElementId::ConnectionIdColumn => &["TCL-ConnectionIDColumn.Connections.default"],
            ElementId::ConnectionNameColumn => &["TCL-ConnectionNameColumn.Connections.default"],
        }
    }

    /// Selector used when no key is present
    fn fallback(self) -> Option<&'static str> {
        match self {
            ElementId::LastUpdatedColumn => Some("//tbody/tr/td[8]"),
            ElementId::ConnectionIdColumn => Some("//tbody/tr/td[4]"),
            ElementId::ConnectionNameColumn => Some("//tbody/tr/td[6]"),
            _ => None,
        }
    }

    pub fn is_required(self) -> bool {
        !matches!(
            self,
            ElementId::ResetButton
                | ElementId::SearchResultsAccountId
                | ElementId::NoMatchingRecords
                | ElementId::PageLink
                | ElementId::LastUpdatedColumn
                | ElementId::ConnectionIdColumn
                | ElementId::ConnectionNameColumn
        )
    }

    pub fn primary_key(self) -> &'static str {
        self.keys()[0]
    }
}

/// Resolved selectors for every element the validator touches
#[derive(Debug, Clone)]
pub struct LocatorMap {
    resolved: HashMap<ElementId, String>,
}

#[derive(Deserialize)]
#[serde(transparent)]
struct RawLocators(HashMap<String, String>);

impl LocatorMap {
    /// Resolve `entries`, failing on the first required element without a key
    pub fn from_entries(entries: &HashMap<String, String>) -> E2eResult<Self> {
        let mut resolved = HashMap::new();

        for id in ElementId::ALL {
            let selector = id
                .keys()
                .iter()
                .find_map(|key| entries.get(*key).filter(|s| !s.trim().is_empty()))
                .cloned()
                .or_else(|| id.fallback().map(String::from));

            match selector {
                Some(selector) => {
                    resolved.insert(id, selector);
                }
                None if id.is_required() => {
                    return Err(E2eError::MissingLocator(format!(
                        "{:?} ({})",
                        id,
                        id.primary_key()
                    )));
                }
                None => {}
            }
        }

        Ok(Self { resolved })
    }

    /// Parse a YAML (or JSON) object of locator entries
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let raw: RawLocators = serde_yaml::from_str(yaml)?;
        Self::from_entries(&raw.0)
    }

    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn get(&self, id: ElementId) -> E2eResult<&str> {
        self.optional(id)
            .ok_or_else(|| E2eError::MissingLocator(format!("{:?} ({})", id, id.primary_key())))
    }

    pub fn optional(&self, id: ElementId) -> Option<&str> {
        self.resolved.get(&id).map(String::as_str)
    }

    /// Selector with the runtime placeholder substituted, if the element is configured
    pub fn with_param(&self, id: ElementId, value: impl ToString) -> Option<String> {
        self.optional(id)
            .map(|selector| selector.replace(PARAM_PLACEHOLDER, &value.to_string()))
    }
}
