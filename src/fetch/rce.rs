// src/fetch/rce.rs
//! Client for the PSE reporting API serving 15-minute RCE prices.

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use futures::{stream::FuturesUnordered, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::HttpSettings;
use crate::fetch::page::backoff_delay_ms;

/// Days covered by one API request.
pub const CHUNK_DAYS: i64 = 30;
const MAX_CONCURRENCY: usize = 3;

/// One row of the `rce-pln` report.
#[derive(Debug, Clone, Deserialize)]
pub struct RceItem {
    pub dtime: String,
    #[serde(default)]
    pub rce_pln: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RcePage {
    #[serde(default)]
    value: Option<Vec<RceItem>>,
    #[serde(rename = "nextLink", default)]
    next_link: Option<String>,
}

/// A single market price point in PLN/kWh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub at: NaiveDateTime,
    pub pln_per_kwh: f64,
}

/// `GET {base}?$filter=business_date ge 'START' and business_date lt 'END'`.
pub fn range_url(api_base: &str, start: NaiveDate, end: NaiveDate) -> Result<Url> {
    let raw = format!(
        "{}?$filter=business_date ge '{}' and business_date lt '{}'",
        api_base,
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d")
    );
    Url::parse(&raw).with_context(|| format!("building RCE URL from {}", api_base))
}

/// Split `[start, end)` into consecutive windows of at most `chunk_days`.
pub fn date_chunks(start: NaiveDate, end: NaiveDate, chunk_days: i64) -> Vec<(NaiveDate, NaiveDate)> {
    let mut out = Vec::new();
    let mut cur = start;
    while cur < end {
        let next = (cur + Duration::days(chunk_days)).min(end);
        out.push((cur, next));
        cur = next;
    }
    out
}

/// Parse an API timestamp. DST repeat markers (`02a:00`, `02b:15`) are dropped.
pub fn parse_dtime(raw: &str) -> Option<NaiveDateTime> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != 'a' && *c != 'b').collect();
    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&cleaned, fmt).ok())
}

impl RceItem {
    /// Price point with zł/MWh converted to zł/kWh and negative prices clamped to 0.
    pub fn to_point(&self) -> Option<PricePoint> {
        let at = parse_dtime(&self.dtime)?;
        let pln_per_kwh = (self.rce_pln.unwrap_or(0.0) / 1000.0).max(0.0);
        Some(PricePoint { at, pln_per_kwh })
    }
}

/// Fetch every item for `[start, end)`, following `nextLink` pages.
#[instrument(level = "debug", skip(client, api_base))]
pub async fn fetch_range(
    client: &Client,
    api_base: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<RceItem>> {
    let mut items = Vec::new();
    let mut next = Some(range_url(api_base, start, end)?);
    while let Some(url) = next.take() {
        let page: RcePage = client
            .get(url.clone())
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?
            .error_for_status()
            .with_context(|| format!("Non-success status {}", url))?
            .json()
            .await
            .with_context(|| format!("decoding RCE page {}", url))?;
        let got = page.value.unwrap_or_default();
        debug!(%url, items = got.len(), "RCE page");
        items.extend(got);
        next = match page.next_link {
            Some(link) if !link.is_empty() => Some(
                Url::parse(&link).with_context(|| format!("parsing nextLink {}", link))?,
            ),
            _ => None,
        };
    }
    Ok(items)
}

/// Fetch `[start, end)` in 30-day chunks, a few at a time.
///
/// A chunk that fails is logged and left out; the rest still come back.
#[instrument(level = "info", skip(client, http, api_base))]
pub async fn fetch_points(
    client: &Client,
    http: &HttpSettings,
    api_base: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<PricePoint> {
    let mut tasks = FuturesUnordered::new();
    let mut points = Vec::new();

    for (s, e) in date_chunks(start, end, CHUNK_DAYS) {
        tasks.push(async move { (s, e, fetch_chunk(client, http, api_base, s, e).await) });

        if tasks.len() >= MAX_CONCURRENCY {
            if let Some(done) = tasks.next().await {
                collect_chunk(done, &mut points);
            }
        }
    }
    while let Some(done) = tasks.next().await {
        collect_chunk(done, &mut points);
    }

    points.sort_by_key(|p| p.at);
    info!(points = points.len(), "fetched RCE prices");
    points
}

async fn fetch_chunk(
    client: &Client,
    http: &HttpSettings,
    api_base: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<RceItem>> {
    let mut attempts = 0;
    loop {
        match fetch_range(client, api_base, start, end).await {
            Ok(items) => return Ok(items),
            Err(e) if attempts < http.max_retries => {
                attempts += 1;
                let backoff = backoff_delay_ms(http.initial_backoff_ms, attempts);
                warn!(%start, %end, attempt = attempts, delay_ms = backoff, error = %e, "Retrying");
                tokio::time::sleep(std::time::Duration::from_millis(backoff)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

fn collect_chunk(
    (start, end, res): (NaiveDate, NaiveDate, Result<Vec<RceItem>>),
    points: &mut Vec<PricePoint>,
) {
    match res {
        Ok(items) => {
            let before = points.len();
            points.extend(items.iter().filter_map(RceItem::to_point));
            let skipped = items.len() - (points.len() - before);
            if skipped > 0 {
                warn!(%start, %end, skipped, "unparsable RCE timestamps");
            }
        }
        Err(e) => warn!(%start, %end, error = %e, "skipping RCE chunk"),
    }
}
