// src/fetch/page.rs

use anyhow::{Context, Result};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::{path::PathBuf, time::Duration};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::config::HttpSettings;
use crate::process::RawTable;

/// Where the RCEm page comes from.
#[derive(Debug, Clone)]
pub enum PageSource {
    Remote(Url),
    /// A previously saved copy of the page.
    Cached(PathBuf),
}

impl PageSource {
    pub fn remote(url: &str) -> Result<Self> {
        Ok(PageSource::Remote(
            Url::parse(url).with_context(|| format!("parsing page URL {}", url))?,
        ))
    }

    /// Fetch the page body. Non-success status and connection failures are errors.
    #[instrument(level = "info", skip(client, http))]
    pub async fn load(&self, client: &Client, http: &HttpSettings) -> Result<String> {
        match self {
            PageSource::Remote(url) => {
                get_text_with_retry(client, url, http.max_retries, http.initial_backoff_ms).await
            }
            PageSource::Cached(path) => {
                info!(path = %path.display(), "reading cached page");
                tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("reading cached page {}", path.display()))
            }
        }
    }
}

async fn get_text_core(client: &Client, url: &Url) -> Result<String> {
    debug!("Fetching text from {}", url);
    client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("GET {} failed", url))?
        .error_for_status()
        .with_context(|| format!("Non-success status {}", url))?
        .text()
        .await
        .with_context(|| format!("Reading text from {}", url))
}

/// Delay before retry number `attempt` (1-based): doubles each time, saturating.
pub fn backoff_delay_ms(initial_backoff_ms: u64, attempt: u32) -> u64 {
    2u64.saturating_pow(attempt.saturating_sub(1))
        .saturating_mul(initial_backoff_ms)
}

pub async fn get_text_with_retry(
    client: &Client,
    url: &Url,
    max_retries: u32,
    initial_backoff_ms: u64,
) -> Result<String> {
    let mut attempts = 0;
    loop {
        match get_text_core(client, url).await {
            Ok(t) => return Ok(t),
            Err(e) if attempts < max_retries => {
                attempts += 1;
                let backoff = backoff_delay_ms(initial_backoff_ms, attempts);
                warn!(%url, attempt = attempts, delay_ms = backoff, error = %e, "Retrying");
                sleep(Duration::from_millis(backoff)).await;
            }
            Err(e) => {
                error!(%url, error = %e, "Exhausted retries");
                return Err(e);
            }
        }
    }
}

/// Decompose `html` into tables → rows → cell text.
///
/// Cells are `th` and `td`; a cell's text is its text nodes, each trimmed, joined
/// without separators. Rows of nested tables also count toward the outer table.
pub fn extract_tables(html: &str) -> Vec<RawTable> {
    let doc = Html::parse_document(html);
    let table_sel = Selector::parse("table").expect("table selector should parse");
    let row_sel = Selector::parse("tr").expect("row selector should parse");
    let cell_sel = Selector::parse("th, td").expect("cell selector should parse");

    doc.select(&table_sel)
        .map(|table| {
            let rows = table
                .select(&row_sel)
                .map(|tr| tr.select(&cell_sel).map(cell_text).collect())
                .collect();
            RawTable::new(rows)
        })
        .collect()
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}
