//! Authoritative connections API
//!
//! [`ConnectionsApi`] is the transport seam: it turns a URL into a JSON body.
//! The typed fetches on top of it decode the payloads and memoise them per URL
//! in a [`ResponseCache`] owned by the current run.

use aerialink_common::{Account, Connection};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::error::{E2eError, E2eResult};

#[async_trait]
pub trait ConnectionsApi: Send + Sync {
    fn base_url(&self) -> &str;

    /// GET `url` and return the decoded JSON body
    async fn fetch(&self, url: &str) -> E2eResult<serde_json::Value>;
}

/// reqwest-backed API client
pub struct HttpConnectionsApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpConnectionsApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> E2eResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ConnectionsApi for HttpConnectionsApi {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch(&self, url: &str) -> E2eResult<serde_json::Value> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

pub fn category_counts_url(base_url: &str) -> String {
    format!("{}/api/connections/category-counts", base_url)
}

pub fn account_url(base_url: &str, account_id: u64) -> String {
    format!("{}/api/connections/account/{}", base_url, account_id)
}

pub fn connection_url(base_url: &str, account_id: u64, connection_id: &str) -> String {
    format!(
        "{}/api/connections/account/{}/connection/{}",
        base_url, account_id, connection_id
    )
}

/// Responses fetched during one run, keyed by URL
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: HashMap<String, serde_json::Value>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    async fn get_or_fetch<A>(&mut self, api: &A, url: &str) -> E2eResult<serde_json::Value>
    where
        A: ConnectionsApi + ?Sized,
    {
        if let Some(value) = self.entries.get(url) {
            return Ok(value.clone());
        }
        let value = api.fetch(url).await?;
        self.entries.insert(url.to_string(), value.clone());
        Ok(value)
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

async fn fetch_data<A, T>(api: &A, cache: &mut ResponseCache, url: &str) -> E2eResult<T>
where
    A: ConnectionsApi + ?Sized,
    T: DeserializeOwned,
{
    let value = cache.get_or_fetch(api, url).await?;
    serde_json::from_value::<Envelope<T>>(value)
        .map(|envelope| envelope.data)
        .map_err(|e| E2eError::data_shape(url, e.to_string()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdValue {
    Number(u64),
    Text(String),
}

fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match IdValue::deserialize(deserializer)? {
        IdValue::Number(n) => n.to_string(),
        IdValue::Text(s) => s,
    })
}

/// One entry of `byAccount`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountCount {
    #[serde(rename = "accountID")]
    pub account_id: u64,
    #[serde(default)]
    pub parent: bool,
    #[serde(rename = "connectionCount", default)]
    pub connection_count: u64,
}

/// Payload of the category-counts endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCounts {
    pub by_account: Vec<AccountCount>,
    #[serde(default)]
    pub grand_total: Option<u64>,
}

impl CategoryCounts {
    /// Parent accounts, highest connection count first (stable)
    pub fn parents(&self) -> Vec<Account> {
        let mut parents: Vec<Account> = self
            .by_account
            .iter()
            .filter(|a| a.parent)
            .map(|a| Account::parent(a.account_id, a.connection_count))
            .collect();
        parents.sort_by(|a, b| b.connection_count.cmp(&a.connection_count));
        parents
    }

    /// `grandTotal`, or the sum of parent counts when absent
    pub fn grand_total(&self) -> u64 {
        self.grand_total.unwrap_or_else(|| {
            self.by_account
                .iter()
                .filter(|a| a.parent)
                .map(|a| a.connection_count)
                .sum()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionRecord {
    #[serde(rename = "connectionID", deserialize_with = "id_string")]
    pub connection_id: String,
    #[serde(rename = "connectionName", default)]
    pub connection_name: Option<String>,
    #[serde(rename = "connectionGUID", default)]
    pub connection_guid: Option<String>,
}

/// Payload of the per-account endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct AccountConnections {
    #[serde(rename = "accountID", default)]
    pub account_id: Option<u64>,
    #[serde(rename = "connectionCount", default)]
    pub connection_count: Option<u64>,
    #[serde(default)]
    pub connections: Vec<ConnectionRecord>,
}

impl AccountConnections {
    /// Connections in API order, owned by `owner_account_id`
    pub fn to_connections(&self, owner_account_id: u64) -> Vec<Connection> {
        self.connections
            .iter()
            .map(|record| Connection {
                connection_id: record.connection_id.clone(),
                display_label: record.connection_name.clone().unwrap_or_default(),
                owner_account_id,
                connection_guid: record.connection_guid.clone(),
            })
            .collect()
    }
}

/// Entries of `connections` carrying `connection_id`
pub fn count_for_connection(connections: &[Connection], connection_id: &str) -> u64 {
    connections
        .iter()
        .filter(|c| c.connection_id == connection_id)
        .count() as u64
}

pub async fn category_counts<A>(api: &A, cache: &mut ResponseCache) -> E2eResult<CategoryCounts>
where
    A: ConnectionsApi + ?Sized,
{
    let url = category_counts_url(api.base_url());
    fetch_data(api, cache, &url).await
}

pub async fn account_connections<A>(
    api: &A,
    cache: &mut ResponseCache,
    account_id: u64,
) -> E2eResult<AccountConnections>
where
    A: ConnectionsApi + ?Sized,
{
    let url = account_url(api.base_url(), account_id);
    fetch_data(api, cache, &url).await
}

pub async fn connection_detail<A>(
    api: &A,
    cache: &mut ResponseCache,
    account_id: u64,
    connection_id: &str,
) -> E2eResult<ConnectionRecord>
where
    A: ConnectionsApi + ?Sized,
{
    let url = connection_url(api.base_url(), account_id, connection_id);
    fetch_data(api, cache, &url).await
}
