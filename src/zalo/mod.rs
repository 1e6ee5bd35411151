pub mod client;

pub use client::{ZaloApi, ZaloClient};
