//! Transaction domain entities.
//! Framework-agnostic representation of an income/expense entry.

use bigdecimal::BigDecimal;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp layout used when a record is written to the store.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Income or expense classification of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    Income,
    Expense,
}

impl Kind {
    /// Label stored in the spreadsheet and shown to users.
    pub fn label(self) -> &'static str {
        match self {
            Kind::Income => "Thu",
            Kind::Expense => "Chi",
        }
    }

    /// Parses a stored kind label. Accepts the Vietnamese labels and the English names.
    pub fn from_label(raw: &str) -> Option<Kind> {
        match raw.trim().to_lowercase().as_str() {
            "thu" | "income" => Some(Kind::Income),
            "chi" | "expense" => Some(Kind::Expense),
            _ => None,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Extractor output before validation and persistence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionDraft {
    pub kind: Option<Kind>,
    pub amount: Option<BigDecimal>,
    pub category: Option<String>,
    pub note: String,
    pub is_valid: bool,
    pub raw_message: String,
}

impl TransactionDraft {
    /// Human-readable names of the fields the extractor could not fill.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.kind.is_none() {
            missing.push("loại giao dịch (Thu/Chi)");
        }
        if self.amount.is_none() {
            missing.push("số tiền");
        }
        if self.category.is_none() {
            missing.push("danh mục");
        }
        missing
    }
}

/// A complete transaction, ready to be appended to the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    pub timestamp: DateTime<FixedOffset>,
    pub kind: Kind,
    pub amount: BigDecimal,
    pub category: String,
    pub note: String,
    pub owner_id: String,
}

impl TransactionRecord {
    /// Builds a record from a valid draft. Returns `None` when kind, amount or category is absent.
    pub fn from_draft(
        draft: &TransactionDraft,
        owner_id: impl Into<String>,
        timestamp: DateTime<FixedOffset>,
    ) -> Option<Self> {
        Some(Self {
            timestamp,
            kind: draft.kind?,
            amount: draft.amount.clone()?,
            category: draft.category.clone()?,
            note: draft.note.clone(),
            owner_id: owner_id.into(),
        })
    }

    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Loosely-typed form, as the record reads back from a store.
    pub fn to_row(&self) -> StoredRow {
        StoredRow {
            timestamp: self.formatted_timestamp(),
            kind: self.kind.label().to_string(),
            amount: self.amount.to_string(),
            category: self.category.clone(),
            note: self.note.clone(),
            owner_id: self.owner_id.clone(),
        }
    }
}

/// A row as read back from the store. Every field is kept as text; the
/// aggregator decides what it can parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRow {
    pub timestamp: String,
    pub kind: String,
    pub amount: String,
    pub category: String,
    pub note: String,
    pub owner_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(7 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 15, 12, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(Kind::from_label("Thu"), Some(Kind::Income));
        assert_eq!(Kind::from_label(" chi "), Some(Kind::Expense));
        assert_eq!(Kind::from_label("expense"), Some(Kind::Expense));
        assert_eq!(Kind::from_label("Cả hai"), None);
        assert_eq!(Kind::Income.to_string(), "Thu");
    }

    #[test]
    fn test_record_from_incomplete_draft() {
        let draft = TransactionDraft {
            kind: Some(Kind::Expense),
            amount: None,
            category: Some("Ăn uống".to_string()),
            note: String::new(),
            is_valid: false,
            raw_message: "chi ăn uống".to_string(),
        };
        assert!(TransactionRecord::from_draft(&draft, "u1", ts()).is_none());
        assert_eq!(draft.missing_fields(), vec!["số tiền"]);
    }

    #[test]
    fn test_record_to_row() {
        let draft = TransactionDraft {
            kind: Some(Kind::Income),
            amount: Some(BigDecimal::from(5_000_000)),
            category: Some("Lương".to_string()),
            note: "tháng 3".to_string(),
            is_valid: true,
            raw_message: "Thu 5 triệu lương tháng 3".to_string(),
        };
        let record = TransactionRecord::from_draft(&draft, "42", ts()).unwrap();
        let row = record.to_row();

        assert_eq!(row.timestamp, "2024-03-15 12:30:00");
        assert_eq!(row.kind, "Thu");
        assert_eq!(row.amount, "5000000");
        assert_eq!(row.category, "Lương");
        assert_eq!(row.owner_id, "42");
    }
}
