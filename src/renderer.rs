//! # ASCII Cycle Report
//!
//! Plain-text presentation of one refresh cycle, written to any `io::Write`.
//! This is the monitor's development and terminal surface; richer rendering
//! lives outside the core. Any missing piece of the cycle prints as
//! "unavailable" instead of aborting the report.

use chrono::{DateTime, Utc};
use std::io::{self, Write};

use crate::risk::RiskAssessment;
use crate::tide_state::{NextTide, TideState, TideTrend};
use crate::weather_data::WeatherBundle;
use crate::TideTable;

/// Glyphs for the hourly precipitation strip, light to heavy.
const RAIN_GLYPHS: [char; 5] = ['.', ':', '+', '*', '#'];

/// Write the cycle report.
#[allow(clippy::too_many_arguments)]
pub fn draw_ascii(
    out: &mut impl Write,
    location: &str,
    now: DateTime<Utc>,
    weather: Option<&WeatherBundle>,
    tide: Option<&TideTable>,
    state: Option<&TideState>,
    risk: Option<&RiskAssessment>,
) -> io::Result<()> {
    writeln!(
        out,
        "flood-watch  {}  {}",
        location,
        now.format("%Y-%m-%d %H:%M UTC")
    )?;

    match weather {
        Some(bundle) => {
            let w = &bundle.current;
            let pressure = w
                .pressure_hpa
                .map_or("pressure n/a".to_string(), |p| format!("{:.0} hPa", p));
            let wind = match w.wind_direction {
                Some(dir) => format!("wind {:.0} km/h {}", w.wind_speed_kph, dir),
                None => format!("wind {:.0} km/h", w.wind_speed_kph),
            };
            writeln!(
                out,
                "weather : {:.1} C  {}  {}  {}",
                w.temperature_c, w.condition, wind, pressure
            )?;
            writeln!(
                out,
                "rain    : {:.1} mm last 24h | {:.1} mm next 24h",
                bundle.forecast.precip_last_24h, bundle.forecast.precip_next_24h
            )?;
            writeln!(out, "next 24h: [{}]", rain_strip(bundle, now))?;
        }
        None => writeln!(out, "weather : unavailable")?,
    }

    match state {
        Some(s) => {
            match s.height_m {
                Some(h) => writeln!(out, "tide    : {:.2} m  {}", h, trend_label(s.trend))?,
                None => writeln!(out, "tide    : unavailable (insufficient data)")?,
            }
            match s.next {
                NextTide::At(e) => writeln!(
                    out,
                    "next    : {} {:.2} m at {}",
                    match e.kind {
                        crate::TideKind::High => "high",
                        crate::TideKind::Low => "low",
                    },
                    e.height_m,
                    e.time.format("%H:%M UTC")
                )?,
                NextTide::Pending => writeln!(out, "next    : pending (need tomorrow's table)")?,
            }
        }
        None => writeln!(out, "tide    : unavailable")?,
    }

    if let (Some(t), Some(_)) = (tide, state) {
        if let Some(max) = t.max_height_on(now.date_naive()) {
            writeln!(out, "max tide: {:.2} m today", max)?;
        }
    }

    match risk {
        Some(r) => writeln!(
            out,
            "risk    : {} (score {}) - {}",
            r.level.label().to_uppercase(),
            r.score,
            r.description()
        )?,
        None => writeln!(out, "risk    : unavailable")?,
    }
    Ok(())
}

/// One glyph per forecast hour for the next 24 hours; a space means dry.
fn rain_strip(bundle: &WeatherBundle, now: DateTime<Utc>) -> String {
    bundle
        .forecast
        .hours
        .iter()
        .filter(|r| r.time >= now && r.time < now + chrono::Duration::hours(24))
        .map(|r| rain_glyph(r.precipitation_mm))
        .collect()
}

fn rain_glyph(mm: f32) -> char {
    if mm <= 0.0 {
        ' '
    } else {
        // 0-1, 1-2, 2-4, 4-8, 8+ mm/h
        let idx = match mm {
            m if m < 1.0 => 0,
            m if m < 2.0 => 1,
            m if m < 4.0 => 2,
            m if m < 8.0 => 3,
            _ => 4,
        };
        RAIN_GLYPHS[idx]
    }
}

fn trend_label(trend: TideTrend) -> &'static str {
    match trend {
        TideTrend::Rising => "rising",
        TideTrend::Falling => "falling",
        TideTrend::Unknown => "trend unknown",
    }
}
