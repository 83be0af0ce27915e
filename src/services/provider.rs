//! Data provider capability
//!
//! A provider returns raw tabular rows for one symbol. Column names, time formats and the
//! requested window are not trusted: the fetcher normalizes everything.

use crate::error::Result;
use crate::models::Resolution;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

/// Column-oriented raw rows as returned by a provider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFrame {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RawFrame {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a frame from JSON objects; columns are the union of keys in first-seen order
    pub fn from_records(records: &[serde_json::Map<String, Value>]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|col| record.get(col).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn push_row(&mut self, row: Vec<Value>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Upper-case provider name used in logs and errors (e.g. `TCBS`)
    fn name(&self) -> &str;

    async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        resolution: Resolution,
    ) -> Result<RawFrame>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_records_unions_columns() {
        let records: Vec<serde_json::Map<String, Value>> = vec![
            json!({"time": 1, "close": 10.0}).as_object().unwrap().clone(),
            json!({"time": 2, "volume": 5}).as_object().unwrap().clone(),
        ];
        let frame = RawFrame::from_records(&records);

        assert_eq!(frame.len(), 2);
        assert_eq!(frame.columns.len(), 3);
        let volume_idx = frame.columns.iter().position(|c| c == "volume").unwrap();
        assert_eq!(frame.rows[0][volume_idx], Value::Null);
        assert_eq!(frame.rows[1][volume_idx], json!(5));
    }
}
