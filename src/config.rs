//! # Configuration Management
//!
//! Loads runtime settings from `flood-config.toml`: the monitored location,
//! backend priorities, cache TTL, endpoint URLs, and alert recipient. A
//! missing or invalid file falls back to the built-in defaults (Recife, PE)
//! so the monitor always starts.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One variant source of data for a given kind, in the order it may be tried.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Primary structured API
    Api,
    /// Secondary HTML page scrape
    Scrape,
    /// Deterministic simulated generator, the availability guarantee of last
    /// resort
    Simulated,
}

/// Application configuration loaded from flood-config.toml
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Monitored coastal location
    pub location: LocationConfig,
    /// Fetch behavior: backend order, TTL, timeout
    pub fetch: FetchConfig,
    /// Backend endpoint URLs
    pub endpoints: EndpointsConfig,
    /// Alert dispatch settings
    pub alert: AlertConfig,
}

/// Monitored location (single fixed site; multi-location is out of scope)
#[derive(Debug, Deserialize, Serialize)]
pub struct LocationConfig {
    /// Human-readable name used in reports and cache keys
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Data acquisition settings
#[derive(Debug, Deserialize, Serialize)]
pub struct FetchConfig {
    /// When true, skip live backends entirely and use the simulated
    /// generators (development / demo mode)
    pub use_simulated: bool,
    /// Seconds a fetched value stays fresh in the cache
    pub cache_ttl_seconds: u64,
    /// Backends tried strictly in this order
    pub backend_priority: Vec<Backend>,
    /// Per-request timeout for live backends, in seconds
    pub timeout_seconds: u64,
}

/// Backend endpoint URLs, overridable per deployment
#[derive(Debug, Deserialize, Serialize)]
pub struct EndpointsConfig {
    /// Hourly forecast API (Open-Meteo shape)
    pub weather_api: String,
    /// Hourly forecast page for the scrape fallback
    pub weather_page: String,
    /// Tide table API returning a JSON extremum array
    pub tide_api: String,
    /// Harbour tide table page for the scrape fallback
    pub tide_page: String,
}

/// Alert dispatch settings (transport itself is external)
#[derive(Debug, Deserialize, Serialize)]
pub struct AlertConfig {
    /// Dispatch an alert when the cycle's risk level is High
    pub enabled: bool,
    /// Recipient identifier handed to the dispatcher
    pub recipient: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            location: LocationConfig {
                name: "Recife".to_string(),
                latitude: -8.05,
                longitude: -34.88,
            },
            fetch: FetchConfig {
                use_simulated: false,
                cache_ttl_seconds: 1800,
                backend_priority: vec![Backend::Api, Backend::Scrape, Backend::Simulated],
                timeout_seconds: 12,
            },
            endpoints: EndpointsConfig {
                weather_api: "https://api.open-meteo.com/v1/forecast".to_string(),
                weather_page: "https://forecast.example.org/recife/hourly".to_string(),
                tide_api: "https://tides.example.org/api/v1/extrema".to_string(),
                tide_page: "https://www.portodorecife.pe.gov.br/maretabua.php".to_string(),
            },
            alert: AlertConfig {
                enabled: true,
                recipient: "defesa-civil@example.org".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from flood-config.toml in the working directory.
    /// Falls back to default configuration if the file doesn't exist or is
    /// invalid.
    pub fn load() -> Self {
        Self::load_from_path("flood-config.toml")
    }

    /// Load configuration from the specified path, defaulting on any failure.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: invalid config file format: {}", e);
                    eprintln!("Using default configuration (Recife)");
                    Self::default()
                }
            },
            Err(_) => {
                eprintln!("Info: no config file found, using default configuration (Recife)");
                Self::default()
            }
        }
    }

    /// Backend order for this run.
    ///
    /// `use_simulated` short-circuits to the generator alone rather than
    /// appending it: simulated mode means no network traffic at all.
    pub fn effective_priority(&self) -> Vec<Backend> {
        if self.fetch.use_simulated {
            vec![Backend::Simulated]
        } else {
            self.fetch.backend_priority.clone()
        }
    }
}
