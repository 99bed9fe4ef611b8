//! # Alert Dispatch Contract
//!
//! The monitor hands a finished cycle to an [`AlertDispatcher`] when the risk
//! level warrants it. Transport (SMTP and friends) is an external concern;
//! this module defines the contract plus a console implementation that
//! renders the alert body to stderr, which doubles as the development mode.
//!
//! Dispatch outcomes are reported back to the caller and never block the rest
//! of the cycle.

use chrono::{DateTime, Utc};

use crate::risk::RiskAssessment;
use crate::tide_state::{NextTide, TideState, TideTrend};
use crate::{ForecastWindow, WeatherReading};

/// Read-only snapshots of one cycle, everything an alert body needs.
pub struct AlertContext<'a> {
    pub location: &'a str,
    pub recipient: &'a str,
    pub weather: &'a WeatherReading,
    pub forecast: &'a ForecastWindow,
    pub tide: &'a TideState,
    pub risk: &'a RiskAssessment,
    pub now: DateTime<Utc>,
}

/// What became of a dispatch attempt.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub delivered: bool,
    pub message: String,
}

pub trait AlertDispatcher {
    fn dispatch(&self, ctx: &AlertContext<'_>) -> DispatchOutcome;
}

/// Writes the alert body to stderr instead of a mail transport.
pub struct ConsoleDispatcher;

impl AlertDispatcher for ConsoleDispatcher {
    fn dispatch(&self, ctx: &AlertContext<'_>) -> DispatchOutcome {
        eprintln!("{}", render_body(ctx));
        DispatchOutcome {
            delivered: true,
            message: format!("alert for {} written to stderr", ctx.recipient),
        }
    }
}

/// Render the alert body: risk headline, contributing factors, and the
/// conditions snapshot.
pub fn render_body(ctx: &AlertContext<'_>) -> String {
    let mut body = String::new();
    body.push_str(&format!(
        "FLOOD ALERT - {} - risk level {}\n",
        ctx.location,
        ctx.risk.level.label()
    ));
    body.push_str(&format!(
        "issued {} (score {}, {})\n\n",
        ctx.now.format("%Y-%m-%d %H:%M UTC"),
        ctx.risk.score,
        ctx.risk.description()
    ));
    body.push_str(&format!(
        "conditions: {}, {:.1} C, wind {:.0} km/h\n",
        ctx.weather.condition, ctx.weather.temperature_c, ctx.weather.wind_speed_kph
    ));
    body.push_str(&format!(
        "rain: {:.1} mm last 24h, {:.1} mm forecast next 24h\n",
        ctx.forecast.precip_last_24h, ctx.forecast.precip_next_24h
    ));

    match ctx.tide.height_m {
        Some(h) => body.push_str(&format!("tide: {:.2} m, {}\n", h, trend_label(ctx.tide.trend))),
        None => body.push_str("tide: unavailable\n"),
    }
    match ctx.tide.next {
        NextTide::At(e) => body.push_str(&format!(
            "next tide: {:.2} m at {}\n",
            e.height_m,
            e.time.format("%H:%M UTC")
        )),
        NextTide::Pending => body.push_str("next tide: pending tomorrow's table\n"),
    }
    body
}

fn trend_label(trend: TideTrend) -> &'static str {
    match trend {
        TideTrend::Rising => "rising",
        TideTrend::Falling => "falling",
        TideTrend::Unknown => "trend unknown",
    }
}
