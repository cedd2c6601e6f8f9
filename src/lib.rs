//! Composite geopolitical risk indices (EERI, GERI, RERI).

pub mod classify;
pub mod config;
pub mod db;
pub mod disclosure;
pub mod error;
pub mod history;
pub mod models;
pub mod report;
pub mod risk;

use chrono::{DateTime, NaiveDate, Utc};

use crate::classify::Classifier;
use crate::config::Config;
use crate::disclosure::DisclosureFilter;
use crate::error::Result;
use crate::history::HistoryService;
use crate::models::{CompositeRecord, Event, IndexKind};
use crate::risk::{Aggregator, ScoreWeights, ScoringInput};

pub use crate::disclosure::Disclosure;
pub use crate::error::ScoreError;

/// External sub-scores for one scoring cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubScores {
    pub regional_base: f64,
    pub asset_transmission: f64,
    pub contagion: f64,
}

/// Validated set of pipeline components.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub classifier: Classifier,
    pub aggregator: Aggregator,
    pub filter: DisclosureFilter,
    pub history: HistoryService,
}

impl Pipeline {
    /// Fails on a broken weight table or vocabulary before anything is scored.
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_parts(Classifier::standard()?, ScoreWeights::default(), config)
    }

    pub fn with_parts(
        classifier: Classifier,
        weights: ScoreWeights,
        config: &Config,
    ) -> Result<Self> {
        let aggregator = Aggregator::new(
            weights,
            config.trend_epsilon,
            classifier.fallback().weight,
        )?;
        let filter = DisclosureFilter::default();
        Ok(Pipeline {
            classifier,
            aggregator,
            filter,
            history: HistoryService::new(filter),
        })
    }

    pub fn score(
        &self,
        index: IndexKind,
        region: &str,
        date: NaiveDate,
        events: Vec<Event>,
        scores: SubScores,
        previous: Option<&CompositeRecord>,
        computed_at: DateTime<Utc>,
    ) -> Result<CompositeRecord> {
        let events = events
            .into_iter()
            .map(|event| self.classifier.classify_event(event))
            .collect();
        let input = ScoringInput {
            index,
            region: region.to_string(),
            date,
            regional_base: scores.regional_base,
            events,
            asset_transmission: scores.asset_transmission,
            contagion: scores.contagion,
            previous_composite: previous.map(|record| record.composite),
            computed_at,
        };
        self.aggregator.compute(&input)
    }
}
