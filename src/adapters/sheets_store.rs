//! Google Sheets backed store, talking to the Sheets v4 values API.
//!
//! Two worksheets are used: one append-only transaction log and one category
//! catalog. The caller supplies an already-issued OAuth bearer token.

use async_trait::async_trait;
use bigdecimal::ToPrimitive;
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use url::Url;

use crate::domain::{StoredRow, TransactionRecord};
use crate::ports::{CategorySource, StoreError, StoreResult, TransactionStore};

use super::DEFAULT_CATEGORIES;

pub const TRANSACTION_HEADERS: [&str; 6] = ["Ngày giờ", "Loại", "Số tiền", "Danh mục", "Ghi chú", "User ID"];
pub const CATEGORY_HEADERS: [&str; 3] = ["Tên danh mục", "Loại", "Mô tả"];

const TRANSACTION_COLUMNS: &str = "A:F";
const CATEGORY_COLUMNS: &str = "A:C";

#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub api_base: String,
    pub spreadsheet_id: String,
    pub access_token: String,
    pub transactions_sheet: String,
    pub categories_sheet: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

/// HTTP client for one spreadsheet.
#[derive(Clone)]
pub struct SheetsStore {
    client: Client,
    config: SheetsConfig,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl SheetsStore {
    pub fn new(config: SheetsConfig) -> Self {
        Self::with_circuit_breaker(config, 3, 60)
    }

    pub fn with_circuit_breaker(
        config: SheetsConfig,
        failure_threshold: u32,
        reset_timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(
            Duration::from_secs(reset_timeout_secs),
            Duration::from_secs(reset_timeout_secs * 2),
        );
        let policy = failure_policy::consecutive_failures(failure_threshold, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        Self {
            client,
            config,
            circuit_breaker,
        }
    }

    pub fn circuit_state(&self) -> String {
        if self.circuit_breaker.is_call_permitted() {
            "closed".to_string()
        } else {
            "open".to_string()
        }
    }

    /// Creates missing worksheets with their header row; a new category sheet
    /// is seeded with the default catalog. Returns the titles it created.
    pub async fn ensure_layout(&self) -> StoreResult<Vec<String>> {
        let existing = self.sheet_titles().await?;
        let mut created = Vec::new();

        if !existing.contains(&self.config.transactions_sheet) {
            self.add_sheet(&self.config.transactions_sheet, 1000, 10).await?;
            let header: Vec<Value> = TRANSACTION_HEADERS.iter().map(|h| json!(h)).collect();
            self.append_rows(&self.transactions_range(), vec![header]).await?;
            created.push(self.config.transactions_sheet.clone());
        }

        if !existing.contains(&self.config.categories_sheet) {
            self.add_sheet(&self.config.categories_sheet, 100, 3).await?;
            let mut rows: Vec<Vec<Value>> = vec![CATEGORY_HEADERS.iter().map(|h| json!(h)).collect()];
            rows.extend(
                DEFAULT_CATEGORIES
                    .iter()
                    .map(|(name, kind)| vec![json!(name), json!(kind), json!("")]),
            );
            self.append_rows(&self.categories_range(), rows).await?;
            created.push(self.config.categories_sheet.clone());
        }

        if !created.is_empty() {
            tracing::info!(sheets = ?created, "Created missing worksheets");
        }
        Ok(created)
    }

    fn transactions_range(&self) -> String {
        a1_range(&self.config.transactions_sheet, TRANSACTION_COLUMNS)
    }

    fn categories_range(&self) -> String {
        a1_range(&self.config.categories_sheet, CATEGORY_COLUMNS)
    }

    fn endpoint(&self, segments: &[&str]) -> StoreResult<Url> {
        let mut url = Url::parse(&self.config.api_base)?;
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidUrl(self.config.api_base.clone()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets"])
            .extend(segments);
        Ok(url)
    }

    async fn guarded<T, F>(&self, call: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match self.circuit_breaker.call(call).await {
            Ok(value) => Ok(value),
            Err(FailsafeError::Rejected) => Err(StoreError::CircuitBreakerOpen(
                "Sheets API circuit breaker is open".to_string(),
            )),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }

    async fn read_values(&self, range: &str) -> StoreResult<Vec<Vec<Value>>> {
        let url = self.endpoint(&[&self.config.spreadsheet_id, "values", range])?;
        let request = self
            .client
            .get(url)
            .bearer_auth(&self.config.access_token)
            .query(&[
                ("valueRenderOption", "UNFORMATTED_VALUE"),
                ("dateTimeRenderOption", "FORMATTED_STRING"),
            ]);

        self.guarded(async move {
            let response = check_status(request.send().await?).await?;
            let range = response
                .json::<ValueRange>()
                .await
                .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;
            Ok(range.values)
        })
        .await
    }

    async fn append_rows(&self, range: &str, rows: Vec<Vec<Value>>) -> StoreResult<()> {
        let append = format!("{}:append", range);
        let url = self.endpoint(&[&self.config.spreadsheet_id, "values", &append])?;
        let request = self
            .client
            .post(url)
            .bearer_auth(&self.config.access_token)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&json!({ "values": rows }));

        self.guarded(async move {
            check_status(request.send().await?).await?;
            Ok(())
        })
        .await
    }

    async fn sheet_titles(&self) -> StoreResult<Vec<String>> {
        let url = self.endpoint(&[&self.config.spreadsheet_id])?;
        let request = self
            .client
            .get(url)
            .bearer_auth(&self.config.access_token)
            .query(&[("fields", "sheets.properties.title")]);

        self.guarded(async move {
            let response = check_status(request.send().await?).await?;
            let meta = response
                .json::<SpreadsheetMeta>()
                .await
                .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;
            Ok(meta.sheets.into_iter().map(|s| s.properties.title).collect())
        })
        .await
    }

    async fn add_sheet(&self, title: &str, rows: u32, columns: u32) -> StoreResult<()> {
        let batch = format!("{}:batchUpdate", self.config.spreadsheet_id);
        let url = self.endpoint(&[&batch])?;
        let body = json!({
            "requests": [{
                "addSheet": {
                    "properties": {
                        "title": title,
                        "gridProperties": { "rowCount": rows, "columnCount": columns }
                    }
                }
            }]
        });
        let request = self
            .client
            .post(url)
            .bearer_auth(&self.config.access_token)
            .json(&body);

        self.guarded(async move {
            check_status(request.send().await?).await?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl CategorySource for SheetsStore {
    async fn categories(&self) -> StoreResult<Vec<String>> {
        let values = self.read_values(&self.categories_range()).await?;
        let rows = keyed_rows(values);

        Ok(rows
            .into_iter()
            .filter_map(|row| row.get(CATEGORY_HEADERS[0]).cloned())
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect())
    }
}

#[async_trait]
impl TransactionStore for SheetsStore {
    async fn append(&self, record: &TransactionRecord) -> StoreResult<()> {
        let row = vec![
            json!(record.formatted_timestamp()),
            json!(record.kind.label()),
            amount_cell(record),
            json!(record.category),
            json!(record.note),
            json!(record.owner_id),
        ];
        self.append_rows(&self.transactions_range(), vec![row]).await?;

        tracing::debug!(owner_id = %record.owner_id, category = %record.category, "Appended transaction row");
        Ok(())
    }

    async fn list(&self, owner_id: &str, limit: usize) -> StoreResult<Vec<StoredRow>> {
        let values = self.read_values(&self.transactions_range()).await?;

        let mut rows: Vec<StoredRow> = keyed_rows(values)
            .into_iter()
            .map(|cells| {
                let field = |name: &str| cells.get(name).cloned().unwrap_or_default();
                StoredRow {
                    timestamp: field(TRANSACTION_HEADERS[0]),
                    kind: field(TRANSACTION_HEADERS[1]),
                    amount: field(TRANSACTION_HEADERS[2]),
                    category: field(TRANSACTION_HEADERS[3]),
                    note: field(TRANSACTION_HEADERS[4]),
                    owner_id: field(TRANSACTION_HEADERS[5]),
                }
            })
            .filter(|row| row.owner_id == owner_id)
            .collect();

        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        rows.truncate(limit);
        Ok(rows)
    }
}

fn a1_range(sheet: &str, columns: &str) -> String {
    format!("'{}'!{}", sheet.replace('\'', "''"), columns)
}

fn amount_cell(record: &TransactionRecord) -> Value {
    if record.amount.is_integer() {
        if let Some(whole) = record.amount.to_i64() {
            return json!(whole);
        }
    }
    record
        .amount
        .to_f64()
        .map(|value| json!(value))
        .unwrap_or_else(|| json!(record.amount.to_string()))
}

async fn check_status(response: Response) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Api {
        status: status.as_u16(),
        body: body.chars().take(500).collect(),
    })
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Turns a header-first grid into one map per data row, keyed by header.
fn keyed_rows(values: Vec<Vec<Value>>) -> Vec<HashMap<String, String>> {
    let mut iter = values.into_iter();
    let Some(header) = iter.next() else {
        return Vec::new();
    };
    let header: Vec<String> = header.iter().map(cell_text).collect();

    iter.map(|row| {
        header
            .iter()
            .zip(row.iter().map(cell_text).chain(std::iter::repeat(String::new())))
            .map(|(key, value)| (key.clone(), value))
            .collect::<HashMap<_, _>>()
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a1_range_quotes_sheet_names() {
        assert_eq!(a1_range("Giao dịch", "A:F"), "'Giao dịch'!A:F");
        assert_eq!(a1_range("Bob's", "A:C"), "'Bob''s'!A:C");
    }

    #[test]
    fn test_keyed_rows_pads_short_rows() {
        let values = vec![
            vec![json!("Ngày giờ"), json!("Số tiền"), json!("Ghi chú")],
            vec![json!("2024-03-01 08:00:00"), json!(50000)],
        ];
        let rows = keyed_rows(values);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Số tiền"], "50000");
        assert_eq!(rows[0]["Ghi chú"], "");
    }

    #[test]
    fn test_keyed_rows_empty_sheet() {
        assert!(keyed_rows(Vec::new()).is_empty());
    }

    #[test]
    fn test_circuit_starts_closed() {
        let store = SheetsStore::new(SheetsConfig {
            api_base: "https://sheets.googleapis.com".to_string(),
            spreadsheet_id: "sheet-1".to_string(),
            access_token: "token".to_string(),
            transactions_sheet: "Giao dịch".to_string(),
            categories_sheet: "Danh mục".to_string(),
        });
        assert_eq!(store.circuit_state(), "closed");
    }
}
