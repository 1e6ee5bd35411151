//! Income/expense statistics over stored rows.

use bigdecimal::BigDecimal;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::domain::{Kind, StoredRow};

/// Bucket for rows without a category.
pub const OTHER_CATEGORY: &str = "Khác";

/// Number of rows echoed back as the recent-activity preview.
pub const RECENT_PREVIEW_LEN: usize = 10;

/// Optional month/year restriction. `None` on an axis means no constraint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Period {
    pub month: Option<u32>,
    pub year: Option<i32>,
}

impl Period {
    pub fn new(month: Option<u32>, year: Option<i32>) -> Self {
        Self { month, year }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.month.map_or(true, |month| date.month() == month)
            && self.year.map_or(true, |year| date.year() == year)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryTotals {
    pub income: BigDecimal,
    pub expense: BigDecimal,
    pub count: usize,
}

impl CategoryTotals {
    pub fn volume(&self) -> BigDecimal {
        &self.income + &self.expense
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub total_income: BigDecimal,
    pub total_expense: BigDecimal,
    pub count: usize,
    pub by_category: BTreeMap<String, CategoryTotals>,
    /// First rows of the filtered set, in store order.
    pub recent: Vec<StoredRow>,
}

impl Statistics {
    pub fn balance(&self) -> BigDecimal {
        &self.total_income - &self.total_expense
    }

    /// Categories by income + expense, largest first, skipping all-zero buckets.
    pub fn top_categories(&self, limit: usize) -> Vec<(&str, &CategoryTotals)> {
        let zero = BigDecimal::from(0);
        let mut ranked: Vec<(&str, &CategoryTotals)> = self
            .by_category
            .iter()
            .filter(|(_, totals)| totals.income > zero || totals.expense > zero)
            .map(|(name, totals)| (name.as_str(), totals))
            .collect();

        ranked.sort_by(|a, b| b.1.volume().cmp(&a.1.volume()));
        ranked.truncate(limit);
        ranked
    }
}

/// A row the aggregator could make sense of.
struct ParsedRow<'a> {
    date: NaiveDate,
    kind: Option<Kind>,
    amount: BigDecimal,
    category: &'a str,
}

fn parse_row(row: &StoredRow) -> Option<ParsedRow<'_>> {
    let date = parse_date(&row.timestamp)?;
    let amount = parse_amount(&row.amount)?;
    let category = match row.category.trim() {
        "" => OTHER_CATEGORY,
        name => name,
    };

    Some(ParsedRow {
        date,
        kind: Kind::from_label(&row.kind),
        amount,
        category,
    })
}

/// Date part of a stored timestamp (`YYYY-MM-DD[ HH:MM:SS]`).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.split_whitespace().next()?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn parse_amount(raw: &str) -> Option<BigDecimal> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    BigDecimal::from_str(&cleaned).ok()
}

/// Reduces rows to totals and per-category sums. Rows with an unreadable
/// timestamp or amount are skipped; rows of unknown kind are counted but add
/// to neither side.
pub fn aggregate(rows: &[StoredRow], period: Period) -> Statistics {
    let mut stats = Statistics::default();

    for row in rows {
        let Some(parsed) = parse_row(row) else {
            continue;
        };
        if !period.contains(parsed.date) {
            continue;
        }

        let bucket = stats
            .by_category
            .entry(parsed.category.to_string())
            .or_default();
        bucket.count += 1;

        match parsed.kind {
            Some(Kind::Income) => {
                stats.total_income += &parsed.amount;
                bucket.income += &parsed.amount;
            }
            Some(Kind::Expense) => {
                stats.total_expense += &parsed.amount;
                bucket.expense += &parsed.amount;
            }
            None => {}
        }

        stats.count += 1;
        if stats.recent.len() < RECENT_PREVIEW_LEN {
            stats.recent.push(row.clone());
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(timestamp: &str, kind: &str, amount: &str, category: &str) -> StoredRow {
        StoredRow {
            timestamp: timestamp.to_string(),
            kind: kind.to_string(),
            amount: amount.to_string(),
            category: category.to_string(),
            note: String::new(),
            owner_id: "u1".to_string(),
        }
    }

    #[test]
    fn test_empty_rows() {
        let stats = aggregate(&[], Period::default());

        assert_eq!(stats.total_income, BigDecimal::from(0));
        assert_eq!(stats.total_expense, BigDecimal::from(0));
        assert_eq!(stats.count, 0);
        assert!(stats.by_category.is_empty());
        assert!(stats.recent.is_empty());
    }

    #[test]
    fn test_income_and_expense_in_one_category() {
        let rows = vec![
            row("2024-03-01 08:00:00", "Thu", "100", "A"),
            row("2024-03-02 09:00:00", "Chi", "40", "A"),
        ];
        let stats = aggregate(&rows, Period::default());

        assert_eq!(stats.total_income, BigDecimal::from(100));
        assert_eq!(stats.total_expense, BigDecimal::from(40));
        assert_eq!(stats.count, 2);
        assert_eq!(stats.balance(), BigDecimal::from(60));

        let a = &stats.by_category["A"];
        assert_eq!(a.income, BigDecimal::from(100));
        assert_eq!(a.expense, BigDecimal::from(40));
        assert_eq!(a.count, 2);
        assert_eq!(stats.by_category.len(), 1);
    }

    #[test]
    fn test_month_and_year_filter() {
        let rows = vec![
            row("2024-04-01 10:00:00", "Chi", "500", "A"),
            row("2024-03-15 10:00:00", "Chi", "200", "A"),
            row("2023-03-15 10:00:00", "Chi", "300", "A"),
        ];
        let stats = aggregate(&rows, Period::new(Some(3), Some(2024)));

        assert_eq!(stats.count, 1);
        assert_eq!(stats.total_expense, BigDecimal::from(200));
        assert_eq!(stats.recent[0].timestamp, "2024-03-15 10:00:00");
    }

    #[test]
    fn test_single_axis_filters() {
        let rows = vec![
            row("2024-03-15", "Chi", "1", "A"),
            row("2023-03-15", "Chi", "2", "A"),
            row("2024-05-15", "Chi", "4", "A"),
        ];

        let march = aggregate(&rows, Period::new(Some(3), None));
        assert_eq!(march.total_expense, BigDecimal::from(3));

        let year = aggregate(&rows, Period::new(None, Some(2024)));
        assert_eq!(year.total_expense, BigDecimal::from(5));
    }

    #[test]
    fn test_bad_rows_are_dropped() {
        let rows = vec![
            row("not a date", "Thu", "100", "A"),
            row("", "Thu", "100", "A"),
            row("2024-03-01 08:00:00", "Thu", "abc", "A"),
        ];
        let stats = aggregate(&rows, Period::default());

        assert_eq!(stats.count, 0);
        assert_eq!(stats.total_income, BigDecimal::from(0));
        assert!(stats.by_category.is_empty());
    }

    #[test]
    fn test_missing_category_goes_to_other() {
        let rows = vec![row("2024-03-01 08:00:00", "Chi", "1,500", "")];
        let stats = aggregate(&rows, Period::default());

        assert_eq!(stats.by_category[OTHER_CATEGORY].expense, BigDecimal::from(1500));
    }

    #[test]
    fn test_unknown_kind_counts_without_sums() {
        let rows = vec![row("2024-03-01 08:00:00", "Cả hai", "900", "B")];
        let stats = aggregate(&rows, Period::default());

        assert_eq!(stats.count, 1);
        assert_eq!(stats.total_income, BigDecimal::from(0));
        assert_eq!(stats.total_expense, BigDecimal::from(0));
        assert_eq!(stats.by_category["B"].count, 1);
        assert!(stats.top_categories(5).is_empty());
    }

    #[test]
    fn test_recent_preview_keeps_store_order() {
        let rows: Vec<StoredRow> = (1..=12)
            .map(|day| row(&format!("2024-01-{:02} 00:00:00", 13 - day), "Chi", "1", "A"))
            .collect();
        let stats = aggregate(&rows, Period::default());

        assert_eq!(stats.count, 12);
        assert_eq!(stats.recent.len(), RECENT_PREVIEW_LEN);
        assert_eq!(stats.recent[0].timestamp, "2024-01-12 00:00:00");
        assert_eq!(stats.recent[9].timestamp, "2024-01-03 00:00:00");
    }

    #[test]
    fn test_top_categories_ranked_by_volume() {
        let rows = vec![
            row("2024-03-01", "Chi", "10", "Small"),
            row("2024-03-01", "Thu", "300", "Big"),
            row("2024-03-01", "Chi", "50", "Mid"),
            row("2024-03-01", "Thu", "60", "Mid"),
        ];
        let stats = aggregate(&rows, Period::default());
        let top: Vec<&str> = stats.top_categories(2).into_iter().map(|(name, _)| name).collect();

        assert_eq!(top, vec!["Big", "Mid"]);
    }
}
