//! # Tide Source Adapter
//!
//! Produces the day's [`TideTable`] from one of three backend variants:
//!
//! 1. **API**: a JSON array of `{time, height, kind}` extremum records.
//! 2. **Scrape**: the harbour tide-table page, an HTML table of the same
//!    fields (the Porto do Recife table publishes kinds in Portuguese, so the
//!    parser accepts both vocabularies).
//! 3. **Simulated**: a deterministic semidiurnal generator keyed to the
//!    day of year, with a spring-neap height envelope on the 29.5-day lunar
//!    cycle.
//!
//! Whatever the backend, output passes through one normalization step that
//! enforces the table invariants: ascending timestamps, no duplicates,
//! non-negative heights. The downstream tide state calculator is
//! backend-agnostic.
//!
//! Every backend (including the generator) emits a short lookahead past
//! midnight so "next extremum" stays answerable late in the evening.

use chrono::{DateTime, Datelike, Duration, NaiveDateTime, Utc};
use scraper::{Html, Selector};
use serde::Deserialize;
use std::time::Duration as StdDuration;

use crate::config::{Backend, Config};
use crate::{FetchError, TideExtremum, TideKind, TideTable};

/// Timestamp format in API records ("2026-08-25T04:30")
const API_TIME_FMT: &str = "%Y-%m-%dT%H:%M";
/// Timestamp format in the scraped table ("2026-08-25 04:30")
const PAGE_TIME_FMT: &str = "%Y-%m-%d %H:%M";

/// Days in the synodic month, driving the simulated spring-neap envelope
const LUNAR_CYCLE_DAYS: f64 = 29.5;

/// Multi-backend tide table fetcher for one location.
pub struct TideSource {
    client: reqwest::Client,
    location: String,
    backends: Vec<Backend>,
    api_url: String,
    page_url: String,
}

impl TideSource {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(config.fetch.timeout_seconds))
            .build()?;
        Ok(TideSource {
            client,
            location: config.location.name.clone(),
            backends: config.effective_priority(),
            api_url: config.endpoints.tide_api.clone(),
            page_url: config.endpoints.tide_page.clone(),
        })
    }

    /// Fetch the day's extremum table, walking the backend priority list.
    pub async fn fetch(&self, now: DateTime<Utc>) -> Result<TideTable, FetchError> {
        for backend in &self.backends {
            let attempt = match backend {
                Backend::Api => self.fetch_api().await,
                Backend::Scrape => self.fetch_page().await,
                Backend::Simulated => Ok(simulated(now)),
            };
            match attempt {
                Ok(table) => return Ok(table),
                Err(e) => eprintln!("tide backend {:?} failed: {}", backend, e),
            }
        }
        Err(FetchError::ExhaustedBackends)
    }

    async fn fetch_api(&self) -> Result<TideTable, FetchError> {
        let url = format!("{}?location={}", self.api_url, self.location);
        let records: Vec<TideRecord> = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(wrap_http)?
            .error_for_status()
            .map_err(wrap_http)?
            .json()
            .await
            .map_err(wrap_http)?;
        parse_records(&records)
    }

    async fn fetch_page(&self) -> Result<TideTable, FetchError> {
        let html = self
            .client
            .get(&self.page_url)
            .send()
            .await
            .map_err(wrap_http)?
            .error_for_status()
            .map_err(wrap_http)?
            .text()
            .await
            .map_err(wrap_http)?;
        parse_tide_page(&html)
    }
}

fn wrap_http(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Http(e)
    }
}

// -- API backend ------------------------------------------------------------

/// One raw extremum record as the API serves it.
#[derive(Deserialize)]
struct TideRecord {
    time: String,
    height: f32,
    kind: TideKind,
}

/// Pure transform from raw records to a normalized table.
fn parse_records(records: &[TideRecord]) -> Result<TideTable, FetchError> {
    let mut extrema = Vec::with_capacity(records.len());
    for record in records {
        let time = NaiveDateTime::parse_from_str(&record.time, API_TIME_FMT)
            .or_else(|_| NaiveDateTime::parse_from_str(&record.time, PAGE_TIME_FMT))
            .map_err(|_| FetchError::Malformed("unparseable tide record time"))?
            .and_utc();
        extrema.push(TideExtremum {
            time,
            height_m: record.height,
            kind: record.kind,
        });
    }
    normalize(extrema)
}

// -- Scrape backend ---------------------------------------------------------

/// Parse the harbour tide table: `table#tide_table` rows of
/// time | height | kind.
fn parse_tide_page(html: &str) -> Result<TideTable, FetchError> {
    let doc = Html::parse_document(html);
    let sel = Selector::parse("table#tide_table tbody tr").expect("CSS selector should be valid");

    let mut extrema = Vec::new();
    for row in doc.select(&sel) {
        let cells: Vec<&str> = row
            .text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        if cells.len() < 3 {
            return Err(FetchError::Malformed("short tide table row"));
        }

        let time = NaiveDateTime::parse_from_str(cells[0], PAGE_TIME_FMT)
            .map_err(|_| FetchError::Malformed("unparseable tide row time"))?
            .and_utc();
        let height_m: f32 = cells[1]
            .parse()
            .map_err(|_| FetchError::Malformed("unparseable tide height cell"))?;
        let kind =
            parse_kind(cells[2]).ok_or(FetchError::Malformed("unrecognized tide kind cell"))?;

        extrema.push(TideExtremum {
            time,
            height_m,
            kind,
        });
    }
    normalize(extrema)
}

/// Kind labels in English and in the harbour page's Portuguese.
fn parse_kind(cell: &str) -> Option<TideKind> {
    match cell.to_ascii_lowercase().as_str() {
        "high" | "alta" => Some(TideKind::High),
        "low" | "baixa" => Some(TideKind::Low),
        _ => None,
    }
}

// -- Simulated backend ------------------------------------------------------

/// Deterministic semidiurnal generator.
///
/// First extremum at `day_of_year % 12` hours, one every six hours after
/// that, heights around 2.0 m (high) and 0.5 m (low) modulated by the
/// spring-neap envelope. Everything is a pure function of the date, so the
/// same day always yields the same table. Five entries are produced so at
/// least one lands past midnight as lookahead.
pub fn simulated(now: DateTime<Utc>) -> TideTable {
    const MEAN_HIGH_M: f32 = 2.0;
    const MEAN_LOW_M: f32 = 0.5;
    const HIGH_SWING_M: f32 = 0.3;
    const LOW_SWING_M: f32 = 0.15;

    let today = now.date_naive();
    let doy = today.ordinal() as f64;
    let envelope = (doy * std::f64::consts::TAU / LUNAR_CYCLE_DAYS).sin() as f32;

    let high = (MEAN_HIGH_M + HIGH_SWING_M * envelope).max(0.1);
    let low = (MEAN_LOW_M + LOW_SWING_M * envelope).max(0.1);

    let base_hour = (doy as i64) % 12;
    let minute = (doy as i64 * 17) % 60;
    let first = today
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always valid")
        .and_utc()
        + Duration::hours(base_hour)
        + Duration::minutes(minute);

    let extrema = (0..5)
        .map(|i| TideExtremum {
            time: first + Duration::hours(6 * i),
            height_m: if i % 2 == 0 { high } else { low },
            kind: if i % 2 == 0 {
                TideKind::High
            } else {
                TideKind::Low
            },
        })
        .collect();
    TideTable { extrema }
}

// -- Normalization ----------------------------------------------------------

/// Enforce the table invariants on any backend's output: sorted ascending,
/// duplicate timestamps dropped (first record wins), heights non-negative,
/// at least two entries.
fn normalize(mut extrema: Vec<TideExtremum>) -> Result<TideTable, FetchError> {
    if extrema.iter().any(|e| e.height_m < 0.0) {
        return Err(FetchError::Malformed("negative tide height"));
    }
    extrema.sort_by_key(|e| e.time);
    extrema.dedup_by_key(|e| e.time);
    if extrema.len() < 2 {
        return Err(FetchError::Malformed("short tide table"));
    }
    Ok(TideTable { extrema })
}
