//! Delay-gated, allow-listed projection of records for public callers.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::models::{CompositeRecord, IndexKind, PublicView};
use crate::risk::TOP_DRIVERS;

pub const DELAY_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq)]
pub enum Disclosure {
    Available(PublicView),
    Unavailable,
}

impl Disclosure {
    pub fn is_available(&self) -> bool {
        matches!(self, Disclosure::Available(_))
    }

    pub fn into_option(self) -> Option<PublicView> {
        match self {
            Disclosure::Available(view) => Some(view),
            Disclosure::Unavailable => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DisclosureFilter {
    delay: Duration,
}

impl Default for DisclosureFilter {
    fn default() -> Self {
        DisclosureFilter {
            delay: Duration::hours(DELAY_WINDOW_HOURS),
        }
    }
}

impl DisclosureFilter {
    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn eligible_at(&self, record: &CompositeRecord) -> DateTime<Utc> {
        record.computed_at + self.delay
    }

    pub fn is_eligible(&self, record: &CompositeRecord, now: DateTime<Utc>) -> bool {
        now >= self.eligible_at(record)
    }

    /// View of exactly this record, or `Unavailable` while it is too recent.
    pub fn to_public_view(&self, record: &CompositeRecord, now: DateTime<Utc>) -> Disclosure {
        if !self.is_eligible(record, now) {
            debug!(
                region = %record.region,
                date = %record.date,
                eligible_at = %self.eligible_at(record),
                "record withheld by delay window"
            );
            return Disclosure::Unavailable;
        }
        Disclosure::Available(project(record))
    }

    /// View of `requested`, degrading to the newest earlier eligible record
    /// of the same index and region from `history`.
    pub fn resolve(
        &self,
        requested: &CompositeRecord,
        history: &[CompositeRecord],
        now: DateTime<Utc>,
    ) -> Disclosure {
        if self.is_eligible(requested, now) {
            return Disclosure::Available(project(requested));
        }

        let prior = history
            .iter()
            .filter(|record| {
                record.index == requested.index
                    && record.region == requested.region
                    && record.date < requested.date
            })
            .filter(|record| self.is_eligible(record, now))
            .max_by_key(|record| (record.date, record.computed_at));

        match prior {
            Some(record) => Disclosure::Available(project(record)),
            None => Disclosure::Unavailable,
        }
    }

    /// Newest eligible record for a scope.
    pub fn latest(
        &self,
        history: &[CompositeRecord],
        index: IndexKind,
        region: &str,
        now: DateTime<Utc>,
    ) -> Disclosure {
        history
            .iter()
            .filter(|record| record.index == index && record.region == region)
            .filter(|record| self.is_eligible(record, now))
            .max_by_key(|record| (record.date, record.computed_at))
            .map(|record| Disclosure::Available(project(record)))
            .unwrap_or(Disclosure::Unavailable)
    }

    /// Public views of every eligible record, in input order.
    pub fn public_views(&self, records: &[CompositeRecord], now: DateTime<Utc>) -> Vec<PublicView> {
        records
            .iter()
            .filter_map(|record| self.to_public_view(record, now).into_option())
            .collect()
    }
}

fn project(record: &CompositeRecord) -> PublicView {
    PublicView {
        level: record.level,
        band: record.band,
        trend: record.trend,
        interpretation: record.interpretation.clone(),
        top_drivers: record.drivers.iter().take(TOP_DRIVERS).cloned().collect(),
        affected_assets: record.affected_assets.clone(),
        computed_at: record.computed_at,
    }
}
