use anyhow::{anyhow, Context};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::models::{Band, CompositeRecord, Driver, Event, IndexKind, Trend};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<usize> {
    let events = vec![
        (
            "seed-001",
            "europe",
            "Pipeline sabotage halts gas flows to the Baltic",
            "2026-02-02T07:30:00Z",
        ),
        ("seed-002", "europe", "EU agrees new sanctions package", "2026-02-02T11:10:00Z"),
        ("seed-003", "europe", "Coalition government wins confidence vote", "2026-02-02T16:45:00Z"),
        (
            "seed-004",
            "middle-east",
            "Missile strikes reported near the border",
            "2026-02-02T04:20:00Z",
        ),
        ("seed-005", "middle-east", "Ceasefire talks resume in Doha", "2026-02-02T13:00:00Z"),
        ("seed-006", "global", "Shipping disruption in the Red Sea widens", "2026-02-02T09:15:00Z"),
    ];

    let mut inserted = 0usize;
    for (source_key, region, text, occurred_at) in events {
        let occurred_at: DateTime<Utc> = occurred_at
            .parse()
            .with_context(|| format!("invalid seed timestamp for {source_key}"))?;
        if insert_event(pool, region, text, occurred_at, source_key).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}

async fn insert_event(
    pool: &PgPool,
    region: &str,
    text: &str,
    occurred_at: DateTime<Utc>,
    source_key: &str,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO risk_index.events (id, region, text, occurred_at, source_key)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(region)
    .bind(text)
    .bind(occurred_at)
    .bind(source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        region: String,
        occurred_at: DateTime<Utc>,
        text: String,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("malformed row {}", line + 1))?;
        let source_key = row
            .source_key
            .filter(|key| !key.trim().is_empty())
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        if insert_event(pool, row.region.trim(), &row.text, row.occurred_at, &source_key).await? {
            inserted += 1;
        }
    }

    info!(inserted, path = %csv_path.display(), "imported events");
    Ok(inserted)
}

/// Events whose timestamp falls on `date` (UTC).
pub async fn fetch_events(
    pool: &PgPool,
    region: &str,
    date: NaiveDate,
) -> anyhow::Result<Vec<Event>> {
    let start = date
        .and_hms_opt(0, 0, 0)
        .context("invalid date")?
        .and_utc();
    let end = start + Duration::days(1);

    let rows = sqlx::query(
        r#"
        SELECT id, region, text, occurred_at
        FROM risk_index.events
        WHERE region = $1 AND occurred_at >= $2 AND occurred_at < $3
        ORDER BY occurred_at, id
        "#,
    )
    .bind(region)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    let mut events = Vec::with_capacity(rows.len());
    for row in rows {
        events.push(Event {
            id: row.try_get("id")?,
            region: row.try_get("region")?,
            text: row.try_get("text")?,
            occurred_at: row.try_get("occurred_at")?,
        });
    }

    Ok(events)
}

/// Writes the authoritative record for its (index, region, date). Returns
/// false when one already exists; the stored record is left untouched.
pub async fn store_record(pool: &PgPool, record: &CompositeRecord) -> anyhow::Result<bool> {
    let drivers = serde_json::to_string(&record.drivers)?;
    let assets = serde_json::to_string(&record.affected_assets)?;

    let result = sqlx::query(
        r#"
        INSERT INTO risk_index.records
        (index_name, region, record_date, regional_base, theme_pressure, asset_transmission,
         contagion, composite, level, band, trend, interpretation, drivers, affected_assets,
         computed_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        ON CONFLICT (index_name, region, record_date) DO NOTHING
        "#,
    )
    .bind(record.index.as_str())
    .bind(&record.region)
    .bind(record.date)
    .bind(record.regional_base)
    .bind(record.theme_pressure)
    .bind(record.asset_transmission)
    .bind(record.contagion)
    .bind(record.composite)
    .bind(i16::from(record.level))
    .bind(record.band.as_str())
    .bind(record.trend.as_str())
    .bind(&record.interpretation)
    .bind(drivers)
    .bind(assets)
    .bind(record.computed_at)
    .execute(pool)
    .await?;

    let inserted = result.rows_affected() > 0;
    info!(
        index = record.index.as_str(),
        region = %record.region,
        date = %record.date,
        inserted,
        "stored composite record"
    );
    Ok(inserted)
}

pub async fn fetch_record(
    pool: &PgPool,
    index: IndexKind,
    region: &str,
    date: NaiveDate,
) -> anyhow::Result<Option<CompositeRecord>> {
    let row = sqlx::query(&format!(
        "SELECT {RECORD_COLUMNS} FROM risk_index.records \
         WHERE index_name = $1 AND region = $2 AND record_date = $3"
    ))
    .bind(index.as_str())
    .bind(region)
    .bind(date)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(record_from_row).transpose()
}

/// Records with `from <= date < to`, oldest first.
pub async fn fetch_records(
    pool: &PgPool,
    index: IndexKind,
    region: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> anyhow::Result<Vec<CompositeRecord>> {
    let rows = sqlx::query(&format!(
        "SELECT {RECORD_COLUMNS} FROM risk_index.records \
         WHERE index_name = $1 AND region = $2 AND record_date >= $3 AND record_date < $4 \
         ORDER BY record_date"
    ))
    .bind(index.as_str())
    .bind(region)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    rows.iter().map(record_from_row).collect()
}

const RECORD_COLUMNS: &str = "index_name, region, record_date, regional_base, theme_pressure, \
    asset_transmission, contagion, composite, level, band, trend, interpretation, drivers, \
    affected_assets, computed_at";

fn record_from_row(row: &PgRow) -> anyhow::Result<CompositeRecord> {
    let index: String = row.try_get("index_name")?;
    let band: String = row.try_get("band")?;
    let trend: String = row.try_get("trend")?;
    let level: i16 = row.try_get("level")?;
    let drivers: String = row.try_get("drivers")?;
    let assets: String = row.try_get("affected_assets")?;

    Ok(CompositeRecord {
        index: index.parse::<IndexKind>().map_err(|e: String| anyhow!(e))?,
        region: row.try_get("region")?,
        date: row.try_get("record_date")?,
        regional_base: row.try_get("regional_base")?,
        theme_pressure: row.try_get("theme_pressure")?,
        asset_transmission: row.try_get("asset_transmission")?,
        contagion: row.try_get("contagion")?,
        composite: row.try_get("composite")?,
        level: u8::try_from(level).with_context(|| format!("stored level {level} out of range"))?,
        band: band.parse::<Band>().map_err(|e: String| anyhow!(e))?,
        trend: trend.parse::<Trend>().map_err(|e: String| anyhow!(e))?,
        interpretation: row.try_get("interpretation")?,
        drivers: serde_json::from_str::<Vec<Driver>>(&drivers).context("malformed drivers column")?,
        affected_assets: serde_json::from_str(&assets).context("malformed affected_assets column")?,
        computed_at: row.try_get("computed_at")?,
    })
}
