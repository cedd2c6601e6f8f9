use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use risk_index::classify::{default_vocabulary, fallback_category, Classifier};
use risk_index::config::Config;
use risk_index::models::{Band, CompositeRecord, Event, IndexKind, Trend};
use risk_index::risk::ScoreWeights;
use risk_index::{Disclosure, Pipeline, ScoreError, SubScores};

fn pipeline() -> Pipeline {
    Pipeline::new(&Config::default()).unwrap()
}

fn event(text: &str, occurred_at: DateTime<Utc>) -> Event {
    Event {
        id: Uuid::new_v4(),
        region: "europe".to_string(),
        text: text.to_string(),
        occurred_at,
    }
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, d).unwrap()
}

fn computed(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, d, 23, 30, 0).unwrap()
}

fn score_month(pipeline: &Pipeline, days: u32) -> Vec<CompositeRecord> {
    let mut records: Vec<CompositeRecord> = Vec::new();
    for d in 1..=days {
        let events = vec![
            event("pipeline outage", computed(d) - Duration::hours(5)),
            event("election called", computed(d) - Duration::hours(3)),
        ];
        let scores = SubScores {
            regional_base: (20 + d) as f64,
            asset_transmission: 30.0,
            contagion: 10.0,
        };
        let record = pipeline
            .score(IndexKind::Eeri, "europe", day(d), events, scores, records.last(), computed(d))
            .unwrap();
        records.push(record);
    }
    records
}

#[test]
fn scenario_end_to_end() {
    let pipeline = pipeline();
    let t = computed(1);
    let events = vec![
        event("oil refinery fire", t - Duration::hours(6)),
        event("government election results", t - Duration::hours(2)),
    ];
    let record = pipeline
        .score(
            IndexKind::Eeri,
            "europe",
            day(1),
            events,
            SubScores {
                regional_base: 40.0,
                asset_transmission: 30.0,
                contagion: 10.0,
            },
            None,
            t,
        )
        .unwrap();

    let pressure = 100.0 * (1.0 - (-2.3f64 / 8.0).exp());
    let expected = 0.45 * 40.0 + 0.25 * pressure + 0.20 * 30.0 + 0.10 * 10.0;
    assert!((record.composite - expected).abs() < 1e-9);
    assert_eq!(record.band, Band::Moderate);
    assert_eq!(record.trend, Trend::Stable);

    assert_eq!(
        pipeline.filter.to_public_view(&record, t + Duration::hours(23) + Duration::minutes(59)),
        Disclosure::Unavailable
    );
    let view = pipeline
        .filter
        .to_public_view(&record, t + Duration::hours(24))
        .into_option()
        .unwrap();
    assert_eq!(view.level, record.level);
    assert_eq!(view.top_drivers.len(), 2);
}

#[test]
fn trend_and_history_over_a_month() {
    let pipeline = pipeline();
    let records = score_month(&pipeline, 30);

    assert_eq!(records[0].trend, Trend::Stable);
    // base rises by one point a day, weighted 0.45, under the 0.5 tolerance
    assert!(records[1..].iter().all(|r| r.trend == Trend::Stable));

    // days 1..=20 have cleared the window
    let now = computed(21);
    let stats = pipeline
        .history
        .monthly(&records, IndexKind::Eeri, "europe", 2026, 6, now)
        .unwrap();
    assert_eq!(stats.days, 20);
    let levels: Vec<u8> = records[..20].iter().map(|r| r.level).collect();
    assert_eq!(stats.min, levels.iter().min().copied());
    assert_eq!(stats.max, levels.iter().max().copied());
    assert_eq!(stats.bands.total(), 20);
}

#[test]
fn public_latest_never_serves_fresh_record() {
    let pipeline = pipeline();
    let records = score_month(&pipeline, 5);

    for hours in 0..72 {
        let now = computed(5) + Duration::hours(hours);
        let latest = pipeline
            .filter
            .latest(&records, IndexKind::Eeri, "europe", now);
        if let Disclosure::Available(view) = latest {
            assert!(now - view.computed_at >= Duration::hours(24));
        }
    }

    let now = computed(5) + Duration::hours(1);
    let view = pipeline
        .filter
        .resolve(&records[4], &records, now)
        .into_option()
        .unwrap();
    assert_eq!(view.computed_at, computed(4));
}

#[test]
fn rejects_nan_at_the_boundary() {
    let err = pipeline()
        .score(
            IndexKind::Geri,
            "global",
            day(1),
            Vec::new(),
            SubScores {
                regional_base: f64::NAN,
                asset_transmission: 10.0,
                contagion: 10.0,
            },
            None,
            computed(1),
        )
        .unwrap_err();
    assert!(matches!(err, ScoreError::InvalidInput { field: "regional_base", .. }));
}

#[test]
fn startup_rejects_broken_configuration() {
    let bad_weights = ScoreWeights {
        contagion: 0.2,
        ..ScoreWeights::default()
    };
    let classifier = Classifier::new(default_vocabulary(), fallback_category()).unwrap();
    assert!(matches!(
        Pipeline::with_parts(classifier, bad_weights, &Config::default()),
        Err(ScoreError::Configuration(_))
    ));

    let config = Config {
        trend_epsilon: -1.0,
        ..Config::default()
    };
    assert!(Pipeline::new(&config).is_err());
}
