use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::disclosure::DisclosureFilter;
use crate::error::{Result, ScoreError};
use crate::models::{BandDistribution, CompositeRecord, IndexKind, MonthlyStats, PublicView};

#[derive(Debug, Clone, Default)]
pub struct HistoryService {
    filter: DisclosureFilter,
}

impl HistoryService {
    pub fn new(filter: DisclosureFilter) -> Self {
        HistoryService { filter }
    }

    /// Stats for one calendar month of one (index, region) scope. Records of
    /// other scopes, and records still inside the delay window, are skipped.
    pub fn monthly(
        &self,
        records: &[CompositeRecord],
        index: IndexKind,
        region: &str,
        year: i32,
        month: u32,
        now: DateTime<Utc>,
    ) -> Result<MonthlyStats> {
        let (start, end) = month_bounds(year, month)?;
        let in_month: Vec<CompositeRecord> = records
            .iter()
            .filter(|record| record.index == index && record.region == region)
            .filter(|record| record.date >= start && record.date < end)
            .cloned()
            .collect();
        let views = self.filter.public_views(&in_month, now);
        Ok(monthly_stats(year, month, &views))
    }

    /// Months holding at least one eligible record, newest first.
    pub fn available_months(
        &self,
        records: &[CompositeRecord],
        now: DateTime<Utc>,
    ) -> Vec<(i32, u32)> {
        let months: BTreeSet<(i32, u32)> = records
            .iter()
            .filter(|record| self.filter.is_eligible(record, now))
            .map(|record| (record.date.year(), record.date.month()))
            .collect();
        months.into_iter().rev().collect()
    }
}

pub fn monthly_stats(year: i32, month: u32, views: &[PublicView]) -> MonthlyStats {
    if views.is_empty() {
        return MonthlyStats::empty(year, month);
    }

    let mut bands = BandDistribution::default();
    let mut total = 0u32;
    let mut min = u8::MAX;
    let mut max = u8::MIN;
    for view in views {
        bands.record(view.band);
        total += u32::from(view.level);
        min = min.min(view.level);
        max = max.max(view.level);
    }

    MonthlyStats {
        year,
        month,
        days: views.len(),
        average: Some(total as f64 / views.len() as f64),
        min: Some(min),
        max: Some(max),
        bands,
    }
}

/// First day of the month and first day of the next one.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
        ScoreError::invalid("month", format!("{year}-{month} is not a calendar month"))
    })?;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .ok_or_else(|| ScoreError::invalid("month", format!("{year}-{month} has no successor")))?;
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Band, Trend};
    use crate::risk::band_for_level;
    use chrono::{Duration, TimeZone};

    fn record(month: u32, day: u32, level: u8) -> CompositeRecord {
        CompositeRecord {
            index: IndexKind::Reri,
            region: "middle-east".to_string(),
            date: NaiveDate::from_ymd_opt(2026, month, day).unwrap(),
            regional_base: 50.0,
            theme_pressure: 50.0,
            asset_transmission: 50.0,
            contagion: 50.0,
            composite: level as f64,
            level,
            band: band_for_level(level),
            trend: Trend::Stable,
            interpretation: String::new(),
            drivers: Vec::new(),
            affected_assets: Vec::new(),
            computed_at: Utc.with_ymd_and_hms(2026, month, day, 22, 0, 0).unwrap(),
        }
    }

    #[test]
    fn empty_input_is_no_data() {
        let stats = monthly_stats(2026, 4, &[]);
        assert!(stats.is_empty());
        assert_eq!(stats.average, None);
        assert_eq!(stats.bands.total(), 0);

        let service = HistoryService::default();
        let stats = service
            .monthly(&[], IndexKind::Reri, "middle-east", 2026, 4, Utc::now())
            .unwrap();
        assert_eq!(stats, MonthlyStats::empty(2026, 4));
    }

    #[test]
    fn summarizes_levels_and_bands() {
        let records = vec![record(4, 1, 10), record(4, 2, 30), record(4, 3, 60), record(4, 4, 80)];
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        let stats = HistoryService::default()
            .monthly(&records, IndexKind::Reri, "middle-east", 2026, 4, now)
            .unwrap();

        assert_eq!(stats.days, 4);
        assert_eq!(stats.average, Some(45.0));
        assert_eq!(stats.min, Some(10));
        assert_eq!(stats.max, Some(80));
        assert_eq!(
            stats.bands,
            BandDistribution {
                low: 1,
                moderate: 1,
                elevated: 1,
                critical: 1
            }
        );
    }

    #[test]
    fn partial_month_counts_only_eligible_days() {
        let records: Vec<CompositeRecord> = (1..=30).map(|day| record(4, day, 40)).collect();
        // day 20 computed 22:00 becomes eligible at day 21 22:00
        let now = Utc.with_ymd_and_hms(2026, 4, 21, 22, 0, 0).unwrap();
        let stats = HistoryService::default()
            .monthly(&records, IndexKind::Reri, "middle-east", 2026, 4, now)
            .unwrap();
        assert_eq!(stats.days, 20);
        assert_eq!(stats.bands.moderate, 20);

        let just_before = now - Duration::seconds(1);
        let stats = HistoryService::default()
            .monthly(&records, IndexKind::Reri, "middle-east", 2026, 4, just_before)
            .unwrap();
        assert_eq!(stats.days, 19);
    }

    #[test]
    fn ignores_other_months() {
        let records = vec![record(3, 31, 90), record(4, 1, 20), record(5, 1, 90)];
        let now = Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap();
        let stats = HistoryService::default()
            .monthly(&records, IndexKind::Reri, "middle-east", 2026, 4, now)
            .unwrap();
        assert_eq!(stats.days, 1);
        assert_eq!(stats.max, Some(20));
        assert_eq!(stats.bands.low, 1);
        assert_eq!(band_for_level(20), Band::Low);
    }

    #[test]
    fn skips_records_of_other_scopes() {
        let mut other_region = record(4, 2, 95);
        other_region.region = "europe".to_string();
        let mut other_index = record(4, 3, 95);
        other_index.index = IndexKind::Geri;
        let records = vec![record(4, 1, 20), other_region, other_index];
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();

        let stats = HistoryService::default()
            .monthly(&records, IndexKind::Reri, "middle-east", 2026, 4, now)
            .unwrap();
        assert_eq!(stats.days, 1);
        assert_eq!(stats.max, Some(20));
        assert_eq!(stats.bands.critical, 0);
    }

    #[test]
    fn rejects_malformed_month() {
        let service = HistoryService::default();
        let malformed = service.monthly(&[], IndexKind::Reri, "middle-east", 2026, 13, Utc::now());
        assert!(matches!(
            malformed,
            Err(ScoreError::InvalidInput { field: "month", .. })
        ));
        assert!(month_bounds(2026, 0).is_err());
        let (start, end) = month_bounds(2026, 12).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2026, 12, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2027, 1, 1).unwrap());
    }

    #[test]
    fn lists_months_with_public_data() {
        let records = vec![record(3, 5, 10), record(4, 2, 10), record(4, 20, 10)];
        let now = Utc.with_ymd_and_hms(2026, 4, 10, 0, 0, 0).unwrap();
        let months = HistoryService::default().available_months(&records, now);
        assert_eq!(months, vec![(2026, 4), (2026, 3)]);
    }
}
