//! Statistics intent and reporting-period parsing.

use regex::Regex;
use thiserror::Error;

use super::statistics::Period;

/// Any of these in the lower-cased text routes the message to statistics.
pub const STATISTICS_KEYWORDS: &[&str] = &["thống kê", "thong ke", "tk", "stat"];

pub fn is_statistics_request(message: &str) -> bool {
    let text = message.to_lowercase();
    STATISTICS_KEYWORDS.iter().any(|keyword| text.contains(keyword))
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeriodError {
    #[error("month must be between 1 and 12, got {0}")]
    InvalidMonth(String),
}

/// Reads "3/2024", "tháng 3" and "năm 2024" out of a statistics command.
#[derive(Debug, Clone)]
pub struct PeriodParser {
    month_year: Regex,
    month: Regex,
    year: Regex,
}

impl PeriodParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            month_year: Regex::new(r"([0-9]{1,2})/([0-9]{4})")?,
            month: Regex::new(r"(?i)th[áa]ng\s*([0-9]+)")?,
            year: Regex::new(r"(?i)n[ăa]m\s*([0-9]{4})")?,
        })
    }

    /// `m/yyyy` sets both axes; otherwise `tháng m` sets the month. `năm yyyy`
    /// always wins for the year. A month outside 1..=12 is an error.
    pub fn parse(&self, message: &str) -> Result<Period, PeriodError> {
        let mut period = Period::default();

        let raw_month = if let Some(caps) = self.month_year.captures(message) {
            period.year = caps[2].parse().ok();
            Some(caps[1].to_string())
        } else {
            self.month.captures(message).map(|caps| caps[1].to_string())
        };

        if let Some(raw) = raw_month {
            match raw.parse::<u32>() {
                Ok(month) if (1..=12).contains(&month) => period.month = Some(month),
                _ => return Err(PeriodError::InvalidMonth(raw)),
            }
        }

        if let Some(caps) = self.year.captures(message) {
            period.year = caps[1].parse().ok();
        }

        Ok(period)
    }
}
