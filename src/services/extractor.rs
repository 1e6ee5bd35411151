//! Free-text transaction extraction.
//!
//! Turns a colloquial Vietnamese message such as `"Chi 50k ăn uống"` into a
//! [`TransactionDraft`]. Matching is a fixed cascade of keyword scans and
//! named regex rules; the first rule that matches wins, and the rule order is
//! the disambiguation policy:
//!
//! * income keywords are checked before expense keywords,
//! * `k` suffix before `triệu`, `tr`, `nghìn`, before bare digit runs,
//! * the longest catalog entry found in the text wins.
//!
//! Nothing here fails: a field that cannot be found is left empty and the
//! draft is marked invalid.

use bigdecimal::BigDecimal;
use regex::Regex;
use std::str::FromStr;

use crate::domain::{Kind, TransactionDraft};

/// Income signals, checked first.
pub const INCOME_KEYWORDS: &[&str] = &["thu", "nhận", "nhận được", "lương", "tiền lương", "được", "có"];

/// Expense signals.
pub const EXPENSE_KEYWORDS: &[&str] = &["chi", "chi tiêu", "mua", "trả", "thanh toán", "tốn", "hết"];

/// Leading words dropped from a note.
pub const FILLER_WORDS: &[&str] = &["cho", "để", "với", "về", "hôm", "nay", "qua"];

/// Amount rules in priority order: (name, pattern, multiplier).
const AMOUNT_RULES: &[(&str, &str, u32)] = &[
    ("thousand_k", r"([0-9]+(?:\.[0-9]+)?)\s*k\b", 1_000),
    ("million_word", r"([0-9]+(?:\.[0-9]+)?)\s*tr(?:iệ|ie|i)u\b", 1_000_000),
    ("million_abbrev", r"([0-9]+(?:\.[0-9]+)?)\s*tr\b", 1_000_000),
    ("thousand_word", r"([0-9]+(?:\.[0-9]+)?)\s*ngh[ìi]n\b", 1_000),
    ("bare_digits", r"\b([0-9]{4,})\b", 1),
];

const DIGITS_STRIP_PATTERN: &str = r"\b[0-9]{4,}\b";

/// One named amount idiom.
#[derive(Debug, Clone)]
pub struct AmountRule {
    pub name: &'static str,
    pub multiplier: u32,
    regex: Regex,
}

/// The amount found by a rule, with the text it consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct AmountMatch {
    pub rule: &'static str,
    pub value: BigDecimal,
    pub matched: String,
}

impl AmountRule {
    fn new(name: &'static str, pattern: &str, multiplier: u32) -> Result<Self, regex::Error> {
        Ok(Self {
            name,
            multiplier,
            regex: Regex::new(pattern)?,
        })
    }

    /// Applies this rule alone to an already lower-cased message.
    pub fn apply(&self, message: &str) -> Option<AmountMatch> {
        let caps = self.regex.captures(message)?;
        let number = BigDecimal::from_str(caps.get(1)?.as_str()).ok()?;

        Some(AmountMatch {
            rule: self.name,
            value: number * BigDecimal::from(self.multiplier),
            matched: caps.get(0)?.as_str().to_string(),
        })
    }
}

/// Compiled extraction rules. Build once and share; `extract` keeps no state.
#[derive(Debug, Clone)]
pub struct TransactionExtractor {
    amount_rules: Vec<AmountRule>,
    digits_strip: Regex,
    keyword_strips: Vec<Regex>,
    whitespace: Regex,
    leading_filler: Regex,
}

impl TransactionExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        let amount_rules = AMOUNT_RULES
            .iter()
            .map(|(name, pattern, multiplier)| AmountRule::new(*name, pattern, *multiplier))
            .collect::<Result<Vec<_>, _>>()?;

        let keyword_strips = INCOME_KEYWORDS
            .iter()
            .chain(EXPENSE_KEYWORDS)
            .map(|keyword| Regex::new(&format!(r"(?i)\b{}\b", regex::escape(keyword))))
            .collect::<Result<Vec<_>, _>>()?;

        let leading_filler = Regex::new(&format!(r"(?i)^({})\s+", FILLER_WORDS.join("|")))?;

        Ok(Self {
            amount_rules,
            digits_strip: Regex::new(DIGITS_STRIP_PATTERN)?,
            keyword_strips,
            whitespace: Regex::new(r"\s+")?,
            leading_filler,
        })
    }

    /// Amount rules in the order they are tried.
    pub fn amount_rules(&self) -> &[AmountRule] {
        &self.amount_rules
    }

    pub fn amount_rule(&self, name: &str) -> Option<&AmountRule> {
        self.amount_rules.iter().find(|rule| rule.name == name)
    }

    /// Extracts a draft from `message` against the category catalog.
    pub fn extract(&self, message: &str, categories: &[String]) -> TransactionDraft {
        let text = message.trim().to_lowercase();

        let kind = detect_kind(&text);
        let amount = self.detect_amount(&text);
        let category = match_category(&text, categories);
        let note = self.extract_note(&text, amount.as_ref(), category.as_deref());

        let is_valid = kind.is_some() && amount.is_some() && category.is_some();

        TransactionDraft {
            kind,
            amount: amount.map(|found| found.value),
            category,
            note,
            is_valid,
            raw_message: message.to_string(),
        }
    }

    /// First amount rule, in priority order, that matches anywhere in the text.
    pub fn detect_amount(&self, text: &str) -> Option<AmountMatch> {
        self.amount_rules.iter().find_map(|rule| rule.apply(text))
    }

    /// Whatever is left once the winning amount, keywords and category are
    /// removed. Other amount-like text stays in the note.
    pub fn extract_note(&self, text: &str, amount: Option<&AmountMatch>, category: Option<&str>) -> String {
        let mut note = text.to_string();

        if let Some(found) = amount {
            note = note.replacen(&found.matched, "", 1);
            note = self.digits_strip.replace_all(&note, "").into_owned();
        }

        for keyword in &self.keyword_strips {
            note = keyword.replace_all(&note, "").into_owned();
        }

        if let Some(category) = category {
            // Category text is a literal; a build failure only means nothing to strip.
            if let Ok(category_re) = Regex::new(&format!("(?i){}", regex::escape(&category.to_lowercase()))) {
                note = category_re.replace_all(&note, "").into_owned();
            }
        }

        let collapsed = self.whitespace.replace_all(&note, " ");
        let trimmed = collapsed.trim();
        self.leading_filler.replace(trimmed, "").into_owned()
    }
}

/// Income keywords win over expense keywords when both occur.
pub fn detect_kind(text: &str) -> Option<Kind> {
    if INCOME_KEYWORDS.iter().any(|keyword| text.contains(keyword)) {
        return Some(Kind::Income);
    }
    if EXPENSE_KEYWORDS.iter().any(|keyword| text.contains(keyword)) {
        return Some(Kind::Expense);
    }
    None
}

/// Longest catalog entry contained in the text, in its original casing.
pub fn match_category(text: &str, categories: &[String]) -> Option<String> {
    if categories.is_empty() {
        return None;
    }

    let text = text.to_lowercase();
    let mut by_length: Vec<&String> = categories.iter().collect();
    by_length.sort_by_key(|category| std::cmp::Reverse(category.chars().count()));

    by_length
        .into_iter()
        .find(|category| text.contains(&category.to_lowercase()))
        .cloned()
}
