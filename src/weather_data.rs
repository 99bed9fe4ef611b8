//! # Weather Source Adapter
//!
//! Normalizes one of three backend variants into a [`WeatherBundle`]:
//!
//! 1. **API**: an Open-Meteo-style endpoint returning parallel hourly arrays
//!    (time / temperature / precipitation / humidity / pressure / wind),
//!    spanning the past day and the next two.
//! 2. **Scrape**: an hourly forecast page carrying the same fields in an
//!    HTML table.
//! 3. **Simulated**: a deterministic diurnal model that never fails, the
//!    availability guarantee of last resort.
//!
//! Backends are tried strictly in the configured priority order. A timeout,
//! network failure, or malformed payload logs to stderr and falls through to
//! the next backend; the caller only ever sees
//! [`FetchError::ExhaustedBackends`]. Parsing is a pure transform from raw
//! payload to the normalized shape, kept separate from the I/O so it can be
//! exercised against fixtures.

use chrono::{DateTime, Duration, NaiveDateTime, Timelike, Utc};
use scraper::{Html, Selector};
use serde::Deserialize;
use std::time::Duration as StdDuration;

use crate::config::{Backend, Config};
use crate::{FetchError, ForecastWindow, WeatherReading};

/// Timestamp format in Open-Meteo hourly arrays ("2026-08-25T14:00")
const API_TIME_FMT: &str = "%Y-%m-%dT%H:%M";
/// Timestamp format in forecast page table cells ("2026-08-25 14:00")
const PAGE_TIME_FMT: &str = "%Y-%m-%d %H:%M";

/// Minimum rows for a usable scraped forecast (one full trailing day)
const MIN_PAGE_ROWS: usize = 24;

const COMPASS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

/// Current observation plus the surrounding forecast window, the adapter's
/// normalized output.
#[derive(Clone, Debug)]
pub struct WeatherBundle {
    /// Reading nearest to the fetch instant
    pub current: WeatherReading,
    pub forecast: ForecastWindow,
}

/// Multi-backend weather fetcher for one location.
pub struct WeatherSource {
    client: reqwest::Client,
    latitude: f64,
    longitude: f64,
    backends: Vec<Backend>,
    api_url: String,
    page_url: String,
}

impl WeatherSource {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(config.fetch.timeout_seconds))
            .build()?;
        Ok(WeatherSource {
            client,
            latitude: config.location.latitude,
            longitude: config.location.longitude,
            backends: config.effective_priority(),
            api_url: config.endpoints.weather_api.clone(),
            page_url: config.endpoints.weather_page.clone(),
        })
    }

    /// Fetch the current weather and forecast window, walking the backend
    /// priority list.
    ///
    /// Backend failures never propagate mid-chain; each one is logged and the
    /// next variant is tried.
    pub async fn fetch(&self, now: DateTime<Utc>) -> Result<WeatherBundle, FetchError> {
        for backend in &self.backends {
            let attempt = match backend {
                Backend::Api => self.fetch_api(now).await,
                Backend::Scrape => self.fetch_page(now).await,
                Backend::Simulated => Ok(simulated(now)),
            };
            match attempt {
                Ok(bundle) => return Ok(bundle),
                Err(e) => eprintln!("weather backend {:?} failed: {}", backend, e),
            }
        }
        Err(FetchError::ExhaustedBackends)
    }

    async fn fetch_api(&self, now: DateTime<Utc>) -> Result<WeatherBundle, FetchError> {
        let url = format!(
            "{}?latitude={}&longitude={}\
             &hourly=temperature_2m,precipitation,relative_humidity_2m,\
             surface_pressure,wind_speed_10m,wind_direction_10m\
             &past_days=1&forecast_days=2&timezone=UTC",
            self.api_url, self.latitude, self.longitude
        );
        let payload: HourlyResponse = self
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
        parse_hourly(&payload, now)
    }

    async fn fetch_page(&self, now: DateTime<Utc>) -> Result<WeatherBundle, FetchError> {
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
        parse_forecast_page(&html, now)
    }
}

/// Map reqwest's timeout errors onto the dedicated variant so the fallthrough
/// log distinguishes a slow backend from a broken one.
fn wrap_http(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Http(e)
    }
}

// -- API backend ------------------------------------------------------------

#[derive(Deserialize)]
struct HourlyResponse {
    hourly: HourlyBlock,
}

/// Parallel hourly arrays as Open-Meteo returns them; optional blocks are
/// simply absent from readings when the deployment's endpoint omits them.
#[derive(Deserialize)]
struct HourlyBlock {
    time: Vec<String>,
    temperature_2m: Vec<f32>,
    precipitation: Vec<f32>,
    relative_humidity_2m: Option<Vec<f32>>,
    surface_pressure: Option<Vec<f32>>,
    wind_speed_10m: Vec<f32>,
    wind_direction_10m: Option<Vec<f32>>,
}

/// Pure transform from the raw hourly arrays to the normalized bundle.
fn parse_hourly(payload: &HourlyResponse, now: DateTime<Utc>) -> Result<WeatherBundle, FetchError> {
    let h = &payload.hourly;
    if h.time.is_empty() {
        return Err(FetchError::Malformed("empty hourly block"));
    }
    if h.temperature_2m.len() != h.time.len()
        || h.precipitation.len() != h.time.len()
        || h.wind_speed_10m.len() != h.time.len()
    {
        return Err(FetchError::Malformed("hourly array lengths disagree"));
    }

    let mut hours = Vec::with_capacity(h.time.len());
    for (i, stamp) in h.time.iter().enumerate() {
        let time = NaiveDateTime::parse_from_str(stamp, API_TIME_FMT)
            .map_err(|_| FetchError::Malformed("unparseable hourly timestamp"))?
            .and_utc();
        let humidity = h.relative_humidity_2m.as_ref().and_then(|v| v.get(i)).copied();
        let precipitation_mm = h.precipitation[i];
        hours.push(WeatherReading {
            time,
            temperature_c: h.temperature_2m[i],
            precipitation_mm,
            pressure_hpa: h.surface_pressure.as_ref().and_then(|v| v.get(i)).copied(),
            humidity_pct: humidity,
            wind_speed_kph: h.wind_speed_10m[i],
            wind_direction: h
                .wind_direction_10m
                .as_ref()
                .and_then(|v| v.get(i))
                .map(|&deg| compass(deg)),
            condition: condition_label(precipitation_mm, humidity).to_string(),
        });
    }
    bundle_from_hours(hours, now)
}

// -- Scrape backend ---------------------------------------------------------

/// Parse an hourly forecast page: `table#hourly-forecast` rows of
/// time | temperature | precipitation | humidity | wind speed.
fn parse_forecast_page(html: &str, now: DateTime<Utc>) -> Result<WeatherBundle, FetchError> {
    let doc = Html::parse_document(html);
    let sel = Selector::parse("table#hourly-forecast tbody tr")
        .expect("CSS selector should be valid");

    let mut hours = Vec::new();
    for row in doc.select(&sel) {
        let cells: Vec<&str> = row
            .text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        if cells.len() < 5 {
            return Err(FetchError::Malformed("short forecast table row"));
        }

        let time = NaiveDateTime::parse_from_str(cells[0], PAGE_TIME_FMT)
            .map_err(|_| FetchError::Malformed("unparseable forecast row time"))?
            .and_utc();
        let temperature_c: f32 = cells[1]
            .parse()
            .map_err(|_| FetchError::Malformed("unparseable temperature cell"))?;
        let precipitation_mm: f32 = cells[2]
            .parse()
            .map_err(|_| FetchError::Malformed("unparseable precipitation cell"))?;
        let humidity: f32 = cells[3]
            .parse()
            .map_err(|_| FetchError::Malformed("unparseable humidity cell"))?;
        let wind_speed_kph: f32 = cells[4]
            .parse()
            .map_err(|_| FetchError::Malformed("unparseable wind cell"))?;

        hours.push(WeatherReading {
            time,
            temperature_c,
            precipitation_mm,
            // The page table does not publish pressure; the scorer skips it
            pressure_hpa: None,
            humidity_pct: Some(humidity),
            wind_speed_kph,
            wind_direction: None,
            condition: condition_label(precipitation_mm, Some(humidity)).to_string(),
        });
    }

    if hours.len() < MIN_PAGE_ROWS {
        return Err(FetchError::Malformed("short forecast table"));
    }
    bundle_from_hours(hours, now)
}

// -- Simulated backend ------------------------------------------------------

/// Deterministic diurnal generator: 48 hourly readings centered on `now`.
///
/// Temperature follows a tropical diurnal curve (28 °C mean, ±4 °C peaking
/// mid-afternoon); precipitation follows a fixed 9-hour pattern keyed to the
/// absolute hour, so the same instant always reproduces the same bundle.
/// Values stay inside plausible coastal ranges.
pub fn simulated(now: DateTime<Utc>) -> WeatherBundle {
    const MEAN_TEMP_C: f32 = 28.0;
    const DIURNAL_SWING_C: f32 = 4.0;
    const MEAN_PRESSURE_HPA: f32 = 1012.0;

    let start = (now - Duration::hours(24))
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now - Duration::hours(24));

    let mut hours = Vec::with_capacity(48);
    for i in 0..48 {
        let time = start + Duration::hours(i);
        let hour = time.hour() as f32;
        let phase = (hour - 6.0) * std::f32::consts::PI / 12.0;

        let precipitation_mm = synth_precip(time);
        let humidity = 82.0 + 8.0 * (hour * std::f32::consts::PI / 12.0).cos();
        hours.push(WeatherReading {
            time,
            temperature_c: MEAN_TEMP_C + DIURNAL_SWING_C * phase.sin(),
            precipitation_mm,
            pressure_hpa: Some(MEAN_PRESSURE_HPA + 3.0 * phase.cos()),
            humidity_pct: Some(humidity),
            wind_speed_kph: 14.0 + 6.0 * phase.sin().abs(),
            // Prevailing south-easterly trades on the Pernambuco coast
            wind_direction: Some("SE"),
            condition: condition_label(precipitation_mm, Some(humidity)).to_string(),
        });
    }

    // Generated hours always bracket `now`, so nearest() cannot fail
    let forecast = ForecastWindow::from_hours(hours, now);
    let current = forecast
        .nearest(now)
        .cloned()
        .expect("simulated window is never empty");
    WeatherBundle { current, forecast }
}

/// Fixed precipitation pattern keyed to the absolute hour: a couple of wet
/// hours out of every nine, totalling a plausible few millimetres a day.
fn synth_precip(time: DateTime<Utc>) -> f32 {
    let hour_index = time.timestamp().div_euclid(3600);
    match hour_index.rem_euclid(9) {
        0 => 1.6,
        1 => 0.8,
        4 => 0.2,
        _ => 0.0,
    }
}

// -- Shared helpers ---------------------------------------------------------

fn bundle_from_hours(
    hours: Vec<WeatherReading>,
    now: DateTime<Utc>,
) -> Result<WeatherBundle, FetchError> {
    let forecast = ForecastWindow::from_hours(hours, now);
    let current = forecast
        .nearest(now)
        .cloned()
        .ok_or(FetchError::Malformed("no reading near current time"))?;
    Ok(WeatherBundle { current, forecast })
}

/// Eight-point compass label from meteorological degrees.
fn compass(degrees: f32) -> &'static str {
    let sector = (degrees.rem_euclid(360.0) / 45.0).round() as usize % 8;
    COMPASS[sector]
}

fn condition_label(precip_mm: f32, humidity_pct: Option<f32>) -> &'static str {
    if precip_mm >= 5.0 {
        "Heavy rain"
    } else if precip_mm > 0.0 {
        "Rain"
    } else if humidity_pct.is_some_and(|h| h >= 85.0) {
        "Overcast"
    } else {
        "Clear"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixture_response(len: usize) -> HourlyResponse {
        let base = Utc.with_ymd_and_hms(2026, 8, 24, 0, 0, 0).unwrap();
        HourlyResponse {
            hourly: HourlyBlock {
                time: (0..len)
                    .map(|i| (base + Duration::hours(i as i64)).format(API_TIME_FMT).to_string())
                    .collect(),
                temperature_2m: vec![27.0; len],
                precipitation: vec![0.5; len],
                relative_humidity_2m: Some(vec![80.0; len]),
                surface_pressure: Some(vec![1011.0; len]),
                wind_speed_10m: vec![15.0; len],
                wind_direction_10m: Some(vec![135.0; len]),
            },
        }
    }

    #[test]
    fn parse_hourly_resamples_to_nearest_index() {
        let now = Utc.with_ymd_and_hms(2026, 8, 24, 13, 40, 0).unwrap();
        let bundle = parse_hourly(&fixture_response(72), now).unwrap();
        // 13:40 rounds to the 14:00 slot
        assert_eq!(
            bundle.current.time,
            Utc.with_ymd_and_hms(2026, 8, 24, 14, 0, 0).unwrap()
        );
        assert_eq!(bundle.current.pressure_hpa, Some(1011.0));
        assert_eq!(bundle.current.wind_direction, Some("SE"));
        // 0.5 mm/h over the trailing 24 inclusive hours
        assert!((bundle.forecast.precip_last_24h - 7.0).abs() < 1e-3);
    }

    #[test]
    fn parse_hourly_rejects_mismatched_arrays() {
        let mut payload = fixture_response(10);
        payload.hourly.precipitation.pop();
        let now = Utc.with_ymd_and_hms(2026, 8, 24, 3, 0, 0).unwrap();
        assert!(matches!(
            parse_hourly(&payload, now),
            Err(FetchError::Malformed("hourly array lengths disagree"))
        ));
    }

    #[test]
    fn parse_hourly_rejects_empty_block() {
        let now = Utc.with_ymd_and_hms(2026, 8, 24, 3, 0, 0).unwrap();
        assert!(matches!(
            parse_hourly(&fixture_response(0), now),
            Err(FetchError::Malformed("empty hourly block"))
        ));
    }

    fn fixture_page(rows: usize) -> String {
        let base = Utc.with_ymd_and_hms(2026, 8, 24, 0, 0, 0).unwrap();
        let mut body = String::from("<html><table id=\"hourly-forecast\"><tbody>");
        for i in 0..rows {
            let t = base + Duration::hours(i as i64);
            body.push_str(&format!(
                "<tr><td>{}</td><td>26.5</td><td>1.0</td><td>88</td><td>18.0</td></tr>",
                t.format(PAGE_TIME_FMT)
            ));
        }
        body.push_str("</tbody></table></html>");
        body
    }

    #[test]
    fn parse_forecast_page_normalizes_rows() {
        let now = Utc.with_ymd_and_hms(2026, 8, 24, 12, 0, 0).unwrap();
        let bundle = parse_forecast_page(&fixture_page(30), now).unwrap();
        assert_eq!(bundle.forecast.hours.len(), 30);
        assert_eq!(bundle.current.pressure_hpa, None);
        assert_eq!(bundle.current.humidity_pct, Some(88.0));
        assert_eq!(bundle.current.condition, "Rain");
    }

    #[test]
    fn parse_forecast_page_rejects_short_table() {
        let now = Utc.with_ymd_and_hms(2026, 8, 24, 12, 0, 0).unwrap();
        assert!(matches!(
            parse_forecast_page(&fixture_page(5), now),
            Err(FetchError::Malformed("short forecast table"))
        ));
    }

    #[test]
    fn parse_forecast_page_rejects_garbled_cells() {
        let now = Utc.with_ymd_and_hms(2026, 8, 24, 12, 0, 0).unwrap();
        let html = "<table id=\"hourly-forecast\"><tbody>\
                    <tr><td>not a date</td><td>x</td><td>y</td><td>z</td><td>w</td></tr>\
                    </tbody></table>";
        assert!(matches!(
            parse_forecast_page(html, now),
            Err(FetchError::Malformed(_))
        ));
    }

    #[test]
    fn simulated_is_deterministic_and_plausible() {
        let now = Utc.with_ymd_and_hms(2026, 8, 25, 9, 30, 0).unwrap();
        let a = simulated(now);
        let b = simulated(now);
        assert_eq!(a.forecast.hours.len(), 48);
        assert_eq!(a.current.time, b.current.time);
        assert_eq!(a.current.temperature_c, b.current.temperature_c);
        assert_eq!(a.forecast.precip_last_24h, b.forecast.precip_last_24h);

        for reading in &a.forecast.hours {
            assert!((20.0..=36.0).contains(&reading.temperature_c));
            assert!((0.0..=10.0).contains(&reading.precipitation_mm));
            let p = reading.pressure_hpa.unwrap();
            assert!((1000.0..=1025.0).contains(&p));
        }
        // Hourly, ascending
        for pair in a.forecast.hours.windows(2) {
            assert_eq!(pair[1].time - pair[0].time, Duration::hours(1));
        }
    }

    #[test]
    fn compass_maps_degrees_to_sectors() {
        assert_eq!(compass(0.0), "N");
        assert_eq!(compass(44.0), "NE");
        assert_eq!(compass(135.0), "SE");
        assert_eq!(compass(359.0), "N");
        assert_eq!(compass(-90.0), "W");
    }

    #[test]
    fn condition_labels_follow_precip_then_humidity() {
        assert_eq!(condition_label(6.0, Some(50.0)), "Heavy rain");
        assert_eq!(condition_label(0.3, None), "Rain");
        assert_eq!(condition_label(0.0, Some(90.0)), "Overcast");
        assert_eq!(condition_label(0.0, Some(60.0)), "Clear");
    }
}
