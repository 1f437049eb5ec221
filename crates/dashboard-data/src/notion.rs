//! Notion database loader.
//!
//! Queries a database page by page (`has_more` / `next_cursor`) and maps each
//! item's type-tagged `properties` onto a [`RawRecord`].

use std::collections::BTreeSet;
use std::time::Duration;

use dashboard_core::error::{DashboardError, Result};
use dashboard_core::models::{Column, RawRecord, RawTable, SourceLocator};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::aliases::AliasTable;

const NOTION_API_URL: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";
const PAGE_SIZE: u32 = 100;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ── Query pages ───────────────────────────────────────────────────────────────

/// One page of a database query response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryPage {
    #[serde(default)]
    pub results: Vec<Value>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Anything that can return one page of a database query.
pub trait PageFetcher {
    /// Fetch the page starting at `cursor` (`None` for the first page).
    fn query_page(&self, cursor: Option<&str>) -> Result<QueryPage>;

    /// Locator used in error messages.
    fn locator(&self) -> SourceLocator;
}

/// Fetch every page, appending results in received order.
pub fn fetch_all_items<F: PageFetcher + ?Sized>(fetcher: &F) -> Result<Vec<Value>> {
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = fetcher.query_page(cursor.as_deref())?;
        pages += 1;
        items.extend(page.results);

        if !page.has_more {
            break;
        }
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => {
                warn!("Notion reported more pages without a cursor; stopping");
                break;
            }
        }
    }

    debug!("Fetched {} items in {} pages", items.len(), pages);
    Ok(items)
}

/// Fetch all items and map them to a [`RawTable`].
///
/// The schema is the union of columns resolved across items. When no alias
/// matches the name column, the database's `title` property is used.
pub fn load_notion<F: PageFetcher + ?Sized>(fetcher: &F, aliases: &AliasTable) -> Result<RawTable> {
    let items = fetch_all_items(fetcher)?;

    let mut columns = BTreeSet::new();
    let mut rows = Vec::with_capacity(items.len());
    for item in &items {
        let (raw, resolved) = item_to_raw(item, aliases);
        columns.extend(resolved);
        rows.push(raw);
    }

    if !rows.is_empty() && !columns.contains(&Column::Name) {
        let available = items
            .first()
            .and_then(|i| i.get("properties"))
            .and_then(Value::as_object)
            .map(|props| props.keys().cloned().collect())
            .unwrap_or_default();
        return Err(DashboardError::SchemaMismatch {
            column: Column::Name,
            available,
        });
    }

    Ok(RawTable { columns, rows })
}

// ── Property mapping ──────────────────────────────────────────────────────────

/// Map one query result to a [`RawRecord`], returning the columns it provided.
fn item_to_raw(item: &Value, aliases: &AliasTable) -> (RawRecord, BTreeSet<Column>) {
    let mut raw = RawRecord::default();
    let mut resolved = BTreeSet::new();

    let Some(props) = item.get("properties").and_then(Value::as_object) else {
        return (raw, resolved);
    };
    let names: Vec<String> = props.keys().cloned().collect();

    for column in Column::SOURCE {
        let name = aliases.resolve(column, &names).or_else(|| {
            if column == Column::Name {
                props
                    .iter()
                    .find(|(_, p)| property_type(p) == Some("title"))
                    .map(|(k, _)| k.as_str())
            } else {
                None
            }
        });

        if let Some(prop) = name.and_then(|n| props.get(n)) {
            resolved.insert(column);
            raw.set(column, property_value(prop, column));
        }
    }

    (raw, resolved)
}

fn property_type(prop: &Value) -> Option<&str> {
    prop.get("type").and_then(Value::as_str)
}

/// Read a property's value according to its `type` tag.
fn property_value(prop: &Value, column: Column) -> Option<String> {
    let kind = property_type(prop)?;
    let body = prop.get(kind)?;

    match kind {
        "title" | "rich_text" => plain_text(body),
        "select" | "status" => body.get("name").and_then(Value::as_str).map(str::to_string),
        "multi_select" => join_names(body.as_array()?.iter().filter_map(|o| o.get("name"))),
        "people" => join_names(body.as_array()?.iter().filter_map(|p| p.get("name"))),
        "date" => {
            let start = body.get("start").and_then(Value::as_str);
            let end = body.get("end").and_then(Value::as_str);
            let picked = if column == Column::EndDate {
                end.or(start)
            } else {
                start
            };
            picked.map(str::to_string)
        }
        _ => None,
    }
}

/// Concatenate the `plain_text` of a rich-text array.
fn plain_text(body: &Value) -> Option<String> {
    let text: String = body
        .as_array()?
        .iter()
        .filter_map(|t| t.get("plain_text").and_then(Value::as_str))
        .collect();
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn join_names<'a>(names: impl Iterator<Item = &'a Value>) -> Option<String> {
    let parts: Vec<&str> = names
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .collect();
    (!parts.is_empty()).then(|| parts.join(", "))
}

// ── NotionClient ──────────────────────────────────────────────────────────────

/// Blocking HTTP client for one Notion database.
pub struct NotionClient {
    client: reqwest::blocking::Client,
    token: String,
    database_id: String,
    base_url: String,
}

impl NotionClient {
    /// Every request gives up after 30 seconds.
    pub fn new(token: &str, database_id: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DashboardError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            token: token.to_string(),
            database_id: database_id.to_string(),
            base_url: NOTION_API_URL.to_string(),
        })
    }

    /// Point the client at another API root (used by tests and proxies).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Check that the token is accepted and the database is shared with the
    /// integration.
    pub fn validate(&self) -> Result<()> {
        self.get(&format!("{}/users/me", self.base_url))
            .map_err(|e| self.unavailable(format!("token rejected: {}", e)))?;

        self.get(&format!("{}/databases/{}", self.base_url, self.database_id))
            .map_err(|e| {
                self.unavailable(format!(
                    "database not accessible (is it shared with the integration?): {}",
                    e
                ))
            })?;

        Ok(())
    }

    fn get(&self, url: &str) -> std::result::Result<Value, String> {
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .send()
            .map_err(|e| format!("request failed: {}", e))?;
        Self::read_json(resp)
    }

    fn read_json<T: serde::de::DeserializeOwned>(
        resp: reqwest::blocking::Response,
    ) -> std::result::Result<T, String> {
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().unwrap_or_default();
            return Err(format!("Notion API error {}: {}", status, text));
        }
        resp.json()
            .map_err(|e| format!("failed to parse Notion response: {}", e))
    }

    fn unavailable(&self, reason: String) -> DashboardError {
        DashboardError::source_unavailable(self.locator(), reason)
    }
}

impl PageFetcher for NotionClient {
    fn query_page(&self, cursor: Option<&str>) -> Result<QueryPage> {
        let mut body = serde_json::json!({ "page_size": PAGE_SIZE });
        if let Some(c) = cursor {
            body["start_cursor"] = Value::String(c.to_string());
        }

        let url = format!("{}/databases/{}/query", self.base_url, self.database_id);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .json(&body)
            .send()
            .map_err(|e| self.unavailable(format!("request failed: {}", e)))?;

        Self::read_json(resp).map_err(|e| self.unavailable(e))
    }

    fn locator(&self) -> SourceLocator {
        SourceLocator::Notion {
            database_id: self.database_id.clone(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
