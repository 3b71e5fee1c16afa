// src/fetch/mod.rs

/// The RCEm web page: download (or cached copy) and table extraction.
pub mod page;
/// The hourly RCE reporting API.
pub mod rce;

pub use page::{extract_tables, PageSource};
pub use rce::{fetch_points, PricePoint};
