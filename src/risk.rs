//! Composite index computation, banding and trend.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use crate::error::{Result, ScoreError};
use crate::models::{Band, ClassifiedEvent, CompositeRecord, Driver, IndexKind, Trend};

/// Category weight mass at which theme pressure reaches ~63 points.
pub const THEME_SATURATION: f64 = 8.0;

pub const DEFAULT_TREND_EPSILON: f64 = 0.5;

pub const TOP_DRIVERS: usize = 3;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Composite weights; the one place they are defined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub regional_base: f64,
    pub theme_pressure: f64,
    pub asset_transmission: f64,
    pub contagion: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        ScoreWeights {
            regional_base: 0.45,
            theme_pressure: 0.25,
            asset_transmission: 0.20,
            contagion: 0.10,
        }
    }
}

impl ScoreWeights {
    pub fn validate(&self) -> Result<()> {
        let parts = [
            self.regional_base,
            self.theme_pressure,
            self.asset_transmission,
            self.contagion,
        ];
        if parts.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ScoreError::Configuration(
                "composite weights must be finite and non-negative".to_string(),
            ));
        }
        let sum: f64 = parts.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ScoreError::Configuration(format!(
                "composite weights sum to {sum}, expected 1.0"
            )));
        }
        Ok(())
    }

    fn combine(&self, base: f64, theme: f64, asset: f64, contagion: f64) -> f64 {
        self.regional_base * base
            + self.theme_pressure * theme
            + self.asset_transmission * asset
            + self.contagion * contagion
    }
}

/// Everything needed to score one (index, region, date).
#[derive(Debug, Clone)]
pub struct ScoringInput {
    pub index: IndexKind,
    pub region: String,
    pub date: NaiveDate,
    pub regional_base: f64,
    pub events: Vec<ClassifiedEvent>,
    pub asset_transmission: f64,
    pub contagion: f64,
    /// Composite of the prior day's record, if one exists.
    pub previous_composite: Option<f64>,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Aggregator {
    weights: ScoreWeights,
    trend_epsilon: f64,
    fallback_weight: f64,
}

impl Aggregator {
    pub fn new(weights: ScoreWeights, trend_epsilon: f64, fallback_weight: f64) -> Result<Self> {
        weights.validate()?;
        if !trend_epsilon.is_finite() || trend_epsilon < 0.0 {
            return Err(ScoreError::Configuration(format!(
                "trend epsilon {trend_epsilon} must be finite and non-negative"
            )));
        }
        Ok(Aggregator {
            weights,
            trend_epsilon,
            fallback_weight,
        })
    }

    pub fn compute(&self, input: &ScoringInput) -> Result<CompositeRecord> {
        let regional_base = sub_score("regional_base", input.regional_base)?;
        let asset_transmission = sub_score("asset_transmission", input.asset_transmission)?;
        let contagion = sub_score("contagion", input.contagion)?;
        if let Some(previous) = input.previous_composite {
            sub_score("previous_composite", previous)?;
        }
        if input.region.trim().is_empty() {
            return Err(ScoreError::invalid("region", "must not be empty"));
        }

        let theme_pressure = theme_pressure(
            input.events.iter().map(ClassifiedEvent::weight),
            self.fallback_weight,
        );
        let composite = self
            .weights
            .combine(regional_base, theme_pressure, asset_transmission, contagion)
            .clamp(0.0, 100.0);

        let level = to_level(composite);
        let band = band_for_level(level);
        let trend = trend(composite, input.previous_composite, self.trend_epsilon);

        let ranked = rank_events(&input.events);
        let drivers: Vec<Driver> = ranked
            .iter()
            .take(TOP_DRIVERS)
            .map(|event| Driver {
                headline: event.category.headline(),
                title: event.event.text.trim().to_string(),
            })
            .collect();
        let affected_assets = affected_assets(&ranked);
        let interpretation = interpret(band, trend, &ranked);

        debug!(
            index = input.index.as_str(),
            region = %input.region,
            date = %input.date,
            regional_base,
            theme_pressure,
            asset_transmission,
            contagion,
            composite,
            "computed composite"
        );

        Ok(CompositeRecord {
            index: input.index,
            region: input.region.clone(),
            date: input.date,
            regional_base,
            theme_pressure,
            asset_transmission,
            contagion,
            composite,
            level,
            band,
            trend,
            interpretation,
            drivers,
            affected_assets,
            computed_at: input.computed_at,
        })
    }
}

fn sub_score(field: &'static str, value: f64) -> Result<f64> {
    if value.is_nan() {
        return Err(ScoreError::invalid(field, "value is NaN"));
    }
    if !(0.0..=100.0).contains(&value) {
        return Err(ScoreError::invalid(
            field,
            format!("{value} outside [0, 100]"),
        ));
    }
    Ok(value)
}

/// Saturating sum of category weights scaled to [0, 100). An empty day
/// counts as one fallback-weight event.
pub fn theme_pressure(weights: impl Iterator<Item = f64>, fallback_weight: f64) -> f64 {
    let mut count = 0usize;
    let mut mass = 0.0;
    for weight in weights {
        count += 1;
        mass += weight.max(0.0);
    }
    if count == 0 {
        mass = fallback_weight;
    }
    (100.0 * (1.0 - (-mass / THEME_SATURATION).exp())).clamp(0.0, 100.0)
}

/// Integer level, rounding half up.
pub fn to_level(score: f64) -> u8 {
    score.clamp(0.0, 100.0).round() as u8
}

pub fn band(score: f64) -> Band {
    band_for_level(to_level(score))
}

pub fn band_for_level(level: u8) -> Band {
    match level {
        0..=25 => Band::Low,
        26..=50 => Band::Moderate,
        51..=75 => Band::Elevated,
        _ => Band::Critical,
    }
}

pub fn trend(current: f64, previous: Option<f64>, epsilon: f64) -> Trend {
    let Some(previous) = previous else {
        return Trend::Stable;
    };
    let delta = current - previous;
    if delta.abs() < epsilon {
        Trend::Stable
    } else if delta > 0.0 {
        Trend::Rising
    } else {
        Trend::Falling
    }
}

/// Heaviest first, most recent first among equal weights.
fn rank_events(events: &[ClassifiedEvent]) -> Vec<&ClassifiedEvent> {
    let mut ranked: Vec<&ClassifiedEvent> = events.iter().collect();
    ranked.sort_by(|a, b| {
        b.weight()
            .partial_cmp(&a.weight())
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.event.occurred_at.cmp(&a.event.occurred_at))
    });
    ranked
}

fn affected_assets(ranked: &[&ClassifiedEvent]) -> Vec<String> {
    let mut assets: Vec<String> = Vec::new();
    for event in ranked {
        for asset in event.category.assets.iter() {
            if !assets.contains(asset) {
                assets.push(asset.clone());
            }
        }
    }
    assets
}

fn interpret(band: Band, trend: Trend, ranked: &[&ClassifiedEvent]) -> String {
    let level = match band {
        Band::Low => "calm",
        Band::Moderate => "moderate",
        Band::Elevated => "elevated",
        Band::Critical => "critical",
    };
    let direction = match trend {
        Trend::Rising => "rising",
        Trend::Falling => "easing",
        Trend::Stable => "broadly stable",
    };

    let mut themes: Vec<String> = Vec::new();
    for event in ranked {
        let theme = event.category.name.replace('_', " ");
        if !themes.contains(&theme) {
            themes.push(theme);
        }
        if themes.len() == TOP_DRIVERS {
            break;
        }
    }

    let drivers = match themes.as_slice() {
        [] => "with no dominant theme in the day's events".to_string(),
        [only] => format!("driven mainly by {only} developments"),
        [rest @ .., last] => format!(
            "driven mainly by {} and {last} developments",
            rest.join(", ")
        ),
    };

    format!("Risk conditions are {level} and {direction}, {drivers}.")
}
