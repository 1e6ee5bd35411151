//! Message dispatch: statistics command or transaction entry.

use chrono::{FixedOffset, Utc};
use std::sync::Arc;

use super::extractor::TransactionExtractor;
use super::period::{is_statistics_request, PeriodError, PeriodParser};
use super::reply;
use super::statistics::{aggregate, Period, Statistics};
use crate::domain::{TransactionDraft, TransactionRecord};
use crate::ports::{CategorySource, Notifier, TransactionStore};

/// Upper bound on rows pulled for one statistics request.
pub const STATISTICS_ROW_LIMIT: usize = 10_000;

/// What the router did with a message.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Recorded(TransactionRecord),
    Rejected(TransactionDraft),
    SaveFailed(TransactionRecord),
    Statistics { period: Period, stats: Statistics },
    StatisticsUnavailable { period: Period },
    InvalidPeriod { month: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutedMessage {
    pub outcome: Outcome,
    pub reply: String,
    pub delivered: bool,
}

pub struct MessageRouter {
    extractor: TransactionExtractor,
    periods: PeriodParser,
    categories: Arc<dyn CategorySource>,
    store: Arc<dyn TransactionStore>,
    notifier: Arc<dyn Notifier>,
    utc_offset: FixedOffset,
}

impl MessageRouter {
    pub fn new(
        categories: Arc<dyn CategorySource>,
        store: Arc<dyn TransactionStore>,
        notifier: Arc<dyn Notifier>,
        utc_offset: FixedOffset,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            extractor: TransactionExtractor::new()?,
            periods: PeriodParser::new()?,
            categories,
            store,
            notifier,
            utc_offset,
        })
    }

    pub fn extractor(&self) -> &TransactionExtractor {
        &self.extractor
    }

    /// Routes the message, then sends the reply to the owner. A failed send
    /// is logged and reported through `delivered`.
    pub async fn handle(&self, owner_id: &str, message: &str) -> RoutedMessage {
        let (outcome, reply) = self.dispatch(owner_id, message).await;

        let delivered = match self.notifier.send_text(owner_id, &reply).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(owner_id = %owner_id, error = %e, "Failed to send reply");
                false
            }
        };

        RoutedMessage {
            outcome,
            reply,
            delivered,
        }
    }

    /// Works out the outcome and reply text without sending anything.
    pub async fn dispatch(&self, owner_id: &str, message: &str) -> (Outcome, String) {
        if is_statistics_request(message) {
            tracing::info!(owner_id = %owner_id, "Processing statistics command");
            self.statistics(owner_id, message).await
        } else {
            tracing::info!(owner_id = %owner_id, "Processing transaction");
            self.transaction(owner_id, message).await
        }
    }

    async fn statistics(&self, owner_id: &str, message: &str) -> (Outcome, String) {
        let period = match self.periods.parse(message) {
            Ok(period) => period,
            Err(PeriodError::InvalidMonth(month)) => {
                tracing::info!(owner_id = %owner_id, month = %month, "Statistics request with invalid month");
                let text = reply::invalid_period(&month);
                return (Outcome::InvalidPeriod { month }, text);
            }
        };

        match self.store.list(owner_id, STATISTICS_ROW_LIMIT).await {
            Ok(rows) => {
                let stats = aggregate(&rows, period);
                let text = reply::statistics(&stats, period);
                (Outcome::Statistics { period, stats }, text)
            }
            Err(e) => {
                tracing::error!(owner_id = %owner_id, error = %e, "Failed to load transactions for statistics");
                (Outcome::StatisticsUnavailable { period }, reply::statistics_failed())
            }
        }
    }

    async fn transaction(&self, owner_id: &str, message: &str) -> (Outcome, String) {
        let categories = match self.categories.categories().await {
            Ok(categories) => categories,
            Err(e) => {
                tracing::warn!(error = %e, "Category catalog unavailable, matching against an empty catalog");
                Vec::new()
            }
        };

        let draft = self.extractor.extract(message, &categories);
        let now = Utc::now().with_timezone(&self.utc_offset);

        let Some(record) = TransactionRecord::from_draft(&draft, owner_id, now) else {
            tracing::info!(
                owner_id = %owner_id,
                missing = ?draft.missing_fields(),
                "Message did not yield a complete transaction"
            );
            let text = reply::invalid_transaction(&draft, &categories);
            return (Outcome::Rejected(draft), text);
        };

        match self.store.append(&record).await {
            Ok(()) => {
                tracing::info!(
                    owner_id = %owner_id,
                    kind = %record.kind,
                    amount = %record.amount,
                    category = %record.category,
                    "Transaction recorded"
                );
                let text = reply::transaction_saved(&record);
                (Outcome::Recorded(record), text)
            }
            Err(e) => {
                tracing::error!(owner_id = %owner_id, error = %e, "Failed to append transaction");
                (Outcome::SaveFailed(record), reply::save_failed())
            }
        }
    }
}
