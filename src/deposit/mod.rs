// src/deposit/mod.rs
//! Value of energy fed into the grid under the net-billing deposit rules.
//!
//! Two ways of pricing the same readings: hour by hour with RCE market prices,
//! or in bulk with the month's RCEm.

pub mod meter;
pub mod report;

use anyhow::{bail, Result};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use reqwest::Client;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::config::Settings;
use crate::fetch::rce::{fetch_points, PricePoint};
use crate::history::RceStore;
use crate::process::OutputTable;

pub use meter::{read_meter_csv, Reading};
pub use report::{FileReport, MethodOutcome};

/// Deposit rules that change over time.
#[derive(Debug, Clone, PartialEq)]
pub struct DepositConfig {
    /// Factor applied to the whole value once any exported energy falls on or after `multiplier_from`.
    pub multiplier: f64,
    pub multiplier_from: NaiveDateTime,
}

impl Default for DepositConfig {
    fn default() -> Self {
        Self {
            multiplier: 1.23,
            multiplier_from: NaiveDate::from_ymd_opt(2025, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .expect("static date is valid"),
        }
    }
}

impl DepositConfig {
    fn applies_to(&self, readings: &[Reading]) -> bool {
        readings
            .iter()
            .any(|r| r.energy_kwh > 0.0 && r.at >= self.multiplier_from)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepositResult {
    pub total_energy_kwh: f64,
    pub total_value_pln: f64,
    pub multiplier_applied: bool,
    /// Flat price used by the monthly method, PLN/kWh.
    pub monthly_price: Option<f64>,
}

fn hour_of(at: NaiveDateTime) -> NaiveDateTime {
    at.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}

/// Mean price per hour from 15-minute (or hourly) points.
pub fn hourly_average(points: &[PricePoint]) -> BTreeMap<NaiveDateTime, f64> {
    let mut sums: BTreeMap<NaiveDateTime, (f64, usize)> = BTreeMap::new();
    for p in points {
        let slot = sums.entry(hour_of(p.at)).or_insert((0.0, 0));
        slot.0 += p.pln_per_kwh;
        slot.1 += 1;
    }
    sums.into_iter()
        .map(|(hour, (sum, n))| (hour, sum / n as f64))
        .collect()
}

/// Exported energy per hour; consumption readings are ignored.
fn exported_per_hour(readings: &[Reading]) -> BTreeMap<NaiveDateTime, f64> {
    let mut per_hour = BTreeMap::new();
    for r in readings.iter().filter(|r| r.energy_kwh > 0.0) {
        *per_hour.entry(hour_of(r.at)).or_insert(0.0) += r.energy_kwh;
    }
    per_hour
}

/// Price every exported hour at that hour's average RCE.
/// Hours without a known price are left out of both totals.
pub fn hourly_deposit(
    readings: &[Reading],
    hourly_prices: &BTreeMap<NaiveDateTime, f64>,
    cfg: &DepositConfig,
) -> DepositResult {
    let mut total_value = 0.0;
    let mut total_energy = 0.0;
    let mut unpriced = 0usize;
    for (hour, energy) in exported_per_hour(readings) {
        match hourly_prices.get(&hour) {
            Some(price) => {
                total_value += energy * price;
                total_energy += energy;
            }
            None => unpriced += 1,
        }
    }
    if unpriced > 0 {
        debug!(unpriced, "exported hours without a market price");
    }
    let multiplier_applied = cfg.applies_to(readings);
    if multiplier_applied {
        total_value *= cfg.multiplier;
    }
    DepositResult {
        total_energy_kwh: total_energy,
        total_value_pln: total_value,
        multiplier_applied,
        monthly_price: None,
    }
}

/// Price all exported energy at a single monthly price (PLN/kWh).
pub fn monthly_deposit(readings: &[Reading], price_pln_kwh: f64, cfg: &DepositConfig) -> DepositResult {
    let total_energy: f64 = readings
        .iter()
        .filter(|r| r.energy_kwh > 0.0)
        .map(|r| r.energy_kwh)
        .sum();
    let mut total_value = total_energy * price_pln_kwh;
    let multiplier_applied = cfg.applies_to(readings);
    if multiplier_applied {
        total_value *= cfg.multiplier;
    }
    DepositResult {
        total_energy_kwh: total_energy,
        total_value_pln: total_value,
        multiplier_applied,
        monthly_price: Some(price_pln_kwh),
    }
}

/// RCEm for a month converted from zł/MWh to zł/kWh.
pub fn monthly_price(rcem: &OutputTable, year: i32, month: u32) -> Option<f64> {
    rcem.get(&year.to_string())
        .and_then(|months| months.get(&month.to_string()))
        .map(|mwh| mwh / 1000.0)
}

/// Market prices covering the reading span.
///
/// The local store is used when it has anything in range; otherwise the API is
/// asked for `[first day, last day + 1)`.
pub async fn market_prices(
    client: &Client,
    settings: &Settings,
    store: &RceStore,
    first: NaiveDateTime,
    last: NaiveDateTime,
) -> Result<Vec<PricePoint>> {
    let from = first.date().and_time(NaiveTime::MIN);
    let to = last.date().and_time(NaiveTime::MIN) + Duration::days(1) - Duration::seconds(1);
    let local = store.points_between(from, to);
    if !local.is_empty() {
        info!(points = local.len(), "using stored RCE prices");
        return Ok(local);
    }

    let end = last.date() + Duration::days(1);
    let points = fetch_points(client, &settings.http, &settings.rce_api_base, first.date(), end).await;
    if points.is_empty() {
        bail!("no RCE prices returned for {} .. {}", first.date(), end);
    }
    Ok(points)
}

/// Year and month the monthly method prices a file at: that of its earliest reading.
pub fn billing_month(first: NaiveDateTime) -> (i32, u32) {
    (first.year(), first.month())
}
