//! # Flood Watch Entry Point
//!
//! One refresh cycle per invocation (run it from cron or a systemd timer):
//! fetch weather and tide concurrently through the TTL caches, derive the
//! tide state, score the flood risk, write the report to stdout, and dispatch
//! an alert when the risk is High. A failed source degrades the report to
//! "unavailable" rather than aborting the cycle.

// Test modules
#[cfg(test)]
mod tests;

use std::time::Duration;

use anyhow::Result;
use chrono::Utc;

use flood_watch_lib::alert::{AlertContext, AlertDispatcher, ConsoleDispatcher};
use flood_watch_lib::cache::SingleFlight;
use flood_watch_lib::config::Config;
use flood_watch_lib::risk::{self, RiskInputs, RiskLevel};
use flood_watch_lib::tide_data::TideSource;
use flood_watch_lib::tide_state::{self, NextTide};
use flood_watch_lib::weather_data::{WeatherBundle, WeatherSource};
use flood_watch_lib::{renderer, TideTable};

fn main() -> Result<()> {
    let config = Config::load();
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(&config))
}

async fn run(config: &Config) -> Result<()> {
    let now = Utc::now();

    let weather_source = WeatherSource::new(config)?;
    let tide_source = TideSource::new(config)?;

    let ttl = Duration::from_secs(config.fetch.cache_ttl_seconds);
    let weather_cache: SingleFlight<WeatherBundle> = SingleFlight::new(ttl);
    let tide_cache: SingleFlight<TideTable> = SingleFlight::new(ttl);

    // The two data kinds are independent; fetch them concurrently and join
    // before scoring.
    let key = config.location.name.as_str();
    let (weather, tide) = tokio::join!(
        weather_cache.get_or_fetch(key, || weather_source.fetch(now)),
        tide_cache.get_or_fetch(key, || tide_source.fetch(now)),
    );

    let weather = match weather {
        Ok(bundle) => Some(bundle),
        Err(e) => {
            eprintln!("weather data unavailable: {}", e);
            None
        }
    };
    let tide = match tide {
        Ok(table) => Some(table),
        Err(e) => {
            eprintln!("tide data unavailable: {}", e);
            None
        }
    };

    let state = tide
        .as_ref()
        .map(|table| tide_state::current_state(&table.extrema, now));
    if let Some(state) = &state {
        if state.next == NextTide::Pending {
            eprintln!("tide table exhausted; next extremum awaits tomorrow's data");
        }
    }

    let risk = match (&weather, &state, &tide) {
        (Some(w), Some(s), Some(t)) => Some(risk::assess(&RiskInputs::gather(
            &w.forecast,
            &w.current,
            s,
            t,
            now,
        ))),
        _ => None,
    };

    let mut stdout = std::io::stdout().lock();
    renderer::draw_ascii(
        &mut stdout,
        &config.location.name,
        now,
        weather.as_ref(),
        tide.as_ref(),
        state.as_ref(),
        risk.as_ref(),
    )?;

    if config.alert.enabled {
        if let (Some(risk), Some(weather), Some(state)) = (&risk, &weather, &state) {
            if risk.level == RiskLevel::High {
                let ctx = AlertContext {
                    location: &config.location.name,
                    recipient: &config.alert.recipient,
                    weather: &weather.current,
                    forecast: &weather.forecast,
                    tide: state,
                    risk,
                    now,
                };
                let outcome = ConsoleDispatcher.dispatch(&ctx);
                if outcome.delivered {
                    eprintln!("{}", outcome.message);
                } else {
                    // Failed dispatch is reported, never fatal
                    eprintln!("alert dispatch failed: {}", outcome.message);
                }
            }
        }
    }

    Ok(())
}
