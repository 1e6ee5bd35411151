pub mod extractor;
pub mod period;
pub mod reply;
pub mod router;
pub mod statistics;

pub use extractor::TransactionExtractor;
pub use period::{PeriodError, PeriodParser};
pub use router::{MessageRouter, Outcome, RoutedMessage};
pub use statistics::{aggregate, Period, Statistics};
