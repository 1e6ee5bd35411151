pub mod memory_store;
pub mod sheets_store;

pub use memory_store::MemoryStore;
pub use sheets_store::{SheetsConfig, SheetsStore};

/// Catalog written to a fresh category sheet: (name, kind label).
pub const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("Ăn uống", "Chi"),
    ("Lương", "Thu"),
    ("Mua sắm", "Chi"),
    ("Giao thông", "Chi"),
    ("Giải trí", "Chi"),
    ("Khác", "Cả hai"),
];
