//! # Flood Watch Core Library
//!
//! Core data model and logic for a single-location coastal flood-risk
//! monitor. The binary fuses two independent data kinds, a weather forecast
//! window and a tide extremum table, into one deterministic risk
//! classification per refresh cycle.
//!
//! ## Data Flow
//!
//! 1. **Acquire**: each source adapter ([`weather_data`], [`tide_data`])
//!    walks its backend priority list (structured API → page scrape →
//!    simulated generator) until one succeeds.
//! 2. **Cache**: adapter output is memoized per data kind with a TTL and
//!    single-flight de-duplication ([`cache`]).
//! 3. **Derive**: the tide state calculator ([`tide_state`]) interpolates the
//!    current height and finds the next extremum.
//! 4. **Score**: the rule engine ([`risk`]) maps the fused inputs to a risk
//!    level and its contributing factors.
//! 5. **Present / alert**: [`renderer`] and [`alert`] consume read-only
//!    snapshots; neither feeds back into the pipeline.
//!
//! ## Degradation Policy
//!
//! Every stage accepts missing upstream data: adapters fall through to the
//! next backend on any failure, the tide calculator yields an indeterminate
//! state instead of erroring, and the scorer skips unknown inputs. The only
//! hard error a caller sees is [`FetchError::ExhaustedBackends`], and only
//! when the configured chain contains no simulated backend of last resort.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod alert;
pub mod cache;
pub mod config;
pub mod renderer;
pub mod risk;
pub mod tide_data;
pub mod tide_state;
pub mod weather_data;

/// Errors raised by backend fetch attempts.
///
/// Individual backend failures are absorbed by the adapters' fallthrough
/// loop; callers of `fetch` only ever observe [`FetchError::ExhaustedBackends`].
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request failed (connection, TLS, or status error)
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend did not answer within the request timeout
    #[error("request timed out")]
    Timeout,

    /// Payload arrived but could not be turned into the normalized shape
    #[error("malformed payload: {0}")]
    Malformed(&'static str),

    /// Every backend in the configured priority list failed
    #[error("all configured backends exhausted")]
    ExhaustedBackends,
}

/// One hourly weather observation or forecast value, normalized across
/// backends.
///
/// Pressure and humidity are optional: the scrape backend's table does not
/// carry pressure, and the risk engine must skip the corresponding term
/// rather than fail when it is absent.
#[derive(Clone, Debug, Serialize)]
pub struct WeatherReading {
    /// Instant this reading is valid for
    pub time: DateTime<Utc>,
    /// Air temperature in °C
    pub temperature_c: f32,
    /// Precipitation over the hour in millimetres
    pub precipitation_mm: f32,
    /// Surface pressure in hPa, when the backend reports it
    pub pressure_hpa: Option<f32>,
    /// Relative humidity in percent, when the backend reports it
    pub humidity_pct: Option<f32>,
    /// Wind speed in km/h
    pub wind_speed_kph: f32,
    /// Eight-point compass label ("N", "NE", ...) derived from degrees
    pub wind_direction: Option<&'static str>,
    /// Human-readable condition label ("Clear", "Rain", ...)
    pub condition: String,
}

/// Hourly readings spanning the past and next 24 hours, with the two
/// precipitation aggregates the risk engine scores on.
///
/// The aggregates are fixed at construction time so they always agree with
/// the readings they were computed from.
#[derive(Clone, Debug, Serialize)]
pub struct ForecastWindow {
    /// Hourly readings in ascending time order
    pub hours: Vec<WeatherReading>,
    /// Sum of precipitation over readings in `[now - 24h, now]`
    pub precip_last_24h: f32,
    /// Sum of precipitation over readings in `[now, now + 24h]`
    pub precip_next_24h: f32,
}

impl ForecastWindow {
    /// Build a window from hourly readings, computing both 24-hour sums
    /// relative to `now`.
    ///
    /// A reading exactly at `now` counts toward both sums; readings outside
    /// either window contribute to neither.
    pub fn from_hours(hours: Vec<WeatherReading>, now: DateTime<Utc>) -> Self {
        let day = Duration::hours(24);
        let mut precip_last_24h = 0.0;
        let mut precip_next_24h = 0.0;
        for reading in &hours {
            if reading.time >= now - day && reading.time <= now {
                precip_last_24h += reading.precipitation_mm;
            }
            if reading.time >= now && reading.time <= now + day {
                precip_next_24h += reading.precipitation_mm;
            }
        }
        ForecastWindow {
            hours,
            precip_last_24h,
            precip_next_24h,
        }
    }

    /// Reading nearest in time to `now`, used as the "current" observation.
    pub fn nearest(&self, now: DateTime<Utc>) -> Option<&WeatherReading> {
        self.hours
            .iter()
            .min_by_key(|r| (r.time - now).num_seconds().abs())
    }
}

/// Whether a tide extremum is a local maximum or minimum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TideKind {
    High,
    Low,
}

/// A single high or low water mark at a specific instant.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use flood_watch_lib::{TideExtremum, TideKind};
///
/// let high = TideExtremum {
///     time: Utc.with_ymd_and_hms(2026, 8, 25, 4, 30, 0).unwrap(),
///     height_m: 2.1,
///     kind: TideKind::High,
/// };
/// assert_eq!(high.kind, TideKind::High);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TideExtremum {
    /// Predicted instant of slack water
    pub time: DateTime<Utc>,
    /// Height above chart datum in metres, never negative
    pub height_m: f32,
    pub kind: TideKind,
}

/// The day's tide extremum table, sorted ascending by time with no duplicate
/// timestamps (enforced by the adapters' normalization step).
#[derive(Clone, Debug, Serialize)]
pub struct TideTable {
    pub extrema: Vec<TideExtremum>,
}

impl TideTable {
    /// Highest extremum falling on the given UTC date, if any.
    ///
    /// The adapters append a lookahead entry past midnight; filtering by date
    /// keeps it out of "today's maximum".
    pub fn max_height_on(&self, date: chrono::NaiveDate) -> Option<f32> {
        self.extrema
            .iter()
            .filter(|e| e.time.date_naive() == date)
            .map(|e| e.height_m)
            .fold(None, |acc, h| Some(acc.map_or(h, |m: f32| m.max(h))))
    }
}
