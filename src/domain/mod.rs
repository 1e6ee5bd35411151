pub mod transaction;

pub use transaction::{Kind, StoredRow, TransactionDraft, TransactionRecord, TIMESTAMP_FORMAT};
