use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Raw event as handed over by ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: Uuid,
    pub region: String,
    pub text: String,
    pub occurred_at: DateTime<Utc>,
}

/// One entry of the keyword vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub struct ThematicCategory {
    pub name: String,
    pub weight: f64,
    pub keywords: Vec<String>,
    /// Asset classes this theme transmits into.
    pub assets: Vec<String>,
}

impl ThematicCategory {
    pub fn new(name: &str, weight: f64, keywords: &[&str], assets: &[&str]) -> Self {
        ThematicCategory {
            name: name.to_string(),
            weight,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            assets: assets.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Case-insensitive substring match against any keyword.
    pub fn matches(&self, lowered_text: &str) -> bool {
        self.keywords
            .iter()
            .any(|keyword| lowered_text.contains(keyword.as_str()))
    }

    pub fn headline(&self) -> String {
        let mut chars = self.name.replace('_', " ").chars().collect::<Vec<_>>();
        if let Some(first) = chars.first_mut() {
            *first = first.to_ascii_uppercase();
        }
        chars.into_iter().collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedEvent {
    pub event: Event,
    pub category: ThematicCategory,
}

impl ClassifiedEvent {
    pub fn weight(&self) -> f64 {
        self.category.weight
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// European Escalation Risk Index
    Eeri,
    /// Global Escalation Risk Index
    Geri,
    /// Regional Escalation Risk Index
    Reri,
}

impl IndexKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Eeri => "eeri",
            IndexKind::Geri => "geri",
            IndexKind::Reri => "reri",
        }
    }
}

impl FromStr for IndexKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "eeri" => Ok(IndexKind::Eeri),
            "geri" => Ok(IndexKind::Geri),
            "reri" => Ok(IndexKind::Reri),
            other => Err(format!("unknown index `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Band {
    Low,
    Moderate,
    Elevated,
    Critical,
}

impl Band {
    pub fn as_str(&self) -> &'static str {
        match self {
            Band::Low => "LOW",
            Band::Moderate => "MODERATE",
            Band::Elevated => "ELEVATED",
            Band::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Band {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "LOW" => Ok(Band::Low),
            "MODERATE" => Ok(Band::Moderate),
            "ELEVATED" => Ok(Band::Elevated),
            "CRITICAL" => Ok(Band::Critical),
            other => Err(format!("unknown band `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Trend {
    Rising,
    Falling,
    Stable,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Rising => "RISING",
            Trend::Falling => "FALLING",
            Trend::Stable => "STABLE",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Trend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "RISING" => Ok(Trend::Rising),
            "FALLING" => Ok(Trend::Falling),
            "STABLE" => Ok(Trend::Stable),
            other => Err(format!("unknown trend `{other}`")),
        }
    }
}

/// Headline (category) and title (event text) of a top driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    pub headline: String,
    pub title: String,
}

/// Internal record for one (index, region, date). Holds proprietary
/// sub-scores; only `PublicView` leaves the process.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeRecord {
    pub index: IndexKind,
    pub region: String,
    pub date: NaiveDate,
    pub regional_base: f64,
    pub theme_pressure: f64,
    pub asset_transmission: f64,
    pub contagion: f64,
    pub composite: f64,
    pub level: u8,
    pub band: Band,
    pub trend: Trend,
    pub interpretation: String,
    pub drivers: Vec<Driver>,
    pub affected_assets: Vec<String>,
    pub computed_at: DateTime<Utc>,
}

/// Redacted projection served to the outside world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicView {
    pub level: u8,
    pub band: Band,
    pub trend: Trend,
    pub interpretation: String,
    pub top_drivers: Vec<Driver>,
    pub affected_assets: Vec<String>,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandDistribution {
    pub low: usize,
    pub moderate: usize,
    pub elevated: usize,
    pub critical: usize,
}

impl BandDistribution {
    pub fn record(&mut self, band: Band) {
        match band {
            Band::Low => self.low += 1,
            Band::Moderate => self.moderate += 1,
            Band::Elevated => self.elevated += 1,
            Band::Critical => self.critical += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.low + self.moderate + self.elevated + self.critical
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyStats {
    pub year: i32,
    pub month: u32,
    pub days: usize,
    pub average: Option<f64>,
    pub min: Option<u8>,
    pub max: Option<u8>,
    pub bands: BandDistribution,
}

impl MonthlyStats {
    pub fn empty(year: i32, month: u32) -> Self {
        MonthlyStats {
            year,
            month,
            days: 0,
            average: None,
            min: None,
            max: None,
            bands: BandDistribution::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.days == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverSummary {
    pub headline: String,
    pub count: usize,
}
