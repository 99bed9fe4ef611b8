//! # Flood Risk Scoring Engine
//!
//! A pure rule table mapping the fused weather and tide inputs to a score,
//! a level, and the list of contributing factors. No I/O, no randomness, no
//! clock access: the same inputs always produce the same assessment.
//!
//! Unknown inputs (indeterminate tide height, missing pressure, empty tide
//! table) contribute zero and skip their factor; they never cause a failure.
//! Factors are recorded in evaluation order, which is part of the contract:
//! consumers display them as evaluated, never sorted.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::tide_state::TideState;
use crate::{ForecastWindow, TideTable, WeatherReading};

// Rule thresholds. Millimetres for rain, metres for tide, hPa for pressure.
const HEAVY_RAIN_MM: f32 = 30.0;
const NOTABLE_RAIN_MM: f32 = 10.0;
const HIGH_CURRENT_TIDE_M: f32 = 2.0;
const NOTABLE_CURRENT_TIDE_M: f32 = 1.5;
const HIGH_MAX_TIDE_M: f32 = 2.2;
const NOTABLE_MAX_TIDE_M: f32 = 1.8;
const LOW_PRESSURE_HPA: f32 = 1000.0;
const COMPOUND_RAIN_MM: f32 = 20.0;
const COMPOUND_TIDE_M: f32 = 2.0;

const HIGH_SCORE: u32 = 5;
const MODERATE_SCORE: u32 = 2;

/// Overall flood-risk classification, a fixed function of the score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    fn from_score(score: u32) -> Self {
        if score >= HIGH_SCORE {
            RiskLevel::High
        } else if score >= MODERATE_SCORE {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::High => "High",
        }
    }
}

/// Result of one scoring pass.
#[derive(Clone, Debug, Serialize)]
pub struct RiskAssessment {
    pub score: u32,
    pub level: RiskLevel,
    /// Contributing factors in evaluation order
    pub factors: Vec<&'static str>,
}

impl RiskAssessment {
    /// One-line description for reports and alert bodies.
    pub fn description(&self) -> String {
        if self.factors.is_empty() {
            "no significant factors".to_string()
        } else {
            format!("factors: {}", self.factors.join(", "))
        }
    }
}

/// Scoring inputs with unknowns made explicit.
#[derive(Clone, Copy, Debug, Default)]
pub struct RiskInputs {
    pub precip_last_24h: f32,
    pub precip_next_24h: f32,
    pub current_tide_m: Option<f32>,
    pub max_tide_today_m: Option<f32>,
    pub pressure_hpa: Option<f32>,
}

impl RiskInputs {
    /// Bridge from the domain types to the scalar inputs the rule table
    /// scores on. Max tide is the highest extremum on `now`'s UTC date so
    /// the adapters' lookahead entries don't inflate today's figure.
    pub fn gather(
        forecast: &ForecastWindow,
        current: &WeatherReading,
        state: &TideState,
        table: &TideTable,
        now: DateTime<Utc>,
    ) -> Self {
        RiskInputs {
            precip_last_24h: forecast.precip_last_24h,
            precip_next_24h: forecast.precip_next_24h,
            current_tide_m: state.height_m,
            max_tide_today_m: table.max_height_on(now.date_naive()),
            pressure_hpa: current.pressure_hpa,
        }
    }
}

/// Score the inputs against the rule table.
pub fn assess(inputs: &RiskInputs) -> RiskAssessment {
    let mut score = 0;
    let mut factors = Vec::new();

    if inputs.precip_last_24h >= HEAVY_RAIN_MM {
        score += 3;
        factors.push("heavy rain last 24h");
    } else if inputs.precip_last_24h >= NOTABLE_RAIN_MM {
        score += 1;
    }

    if inputs.precip_next_24h >= HEAVY_RAIN_MM {
        score += 3;
        factors.push("heavy rain forecast");
    } else if inputs.precip_next_24h >= NOTABLE_RAIN_MM {
        score += 1;
    }

    if let Some(height) = inputs.current_tide_m {
        if height >= HIGH_CURRENT_TIDE_M {
            score += 2;
            factors.push("high current tide");
        } else if height >= NOTABLE_CURRENT_TIDE_M {
            score += 1;
        }
    }

    if let Some(max_tide) = inputs.max_tide_today_m {
        if max_tide >= HIGH_MAX_TIDE_M {
            score += 2;
            factors.push("high max tide");
        } else if max_tide >= NOTABLE_MAX_TIDE_M {
            score += 1;
        }
    }

    if let Some(pressure) = inputs.pressure_hpa {
        if pressure < LOW_PRESSURE_HPA {
            score += 1;
            factors.push("low pressure");
        }
    }

    if inputs.precip_last_24h >= COMPOUND_RAIN_MM
        && inputs.max_tide_today_m.is_some_and(|m| m >= COMPOUND_TIDE_M)
    {
        score += 2;
        factors.push("compound rain+tide");
    }

    RiskAssessment {
        score,
        level: RiskLevel::from_score(score),
        factors,
    }
}
