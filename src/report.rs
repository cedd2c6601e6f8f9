use std::collections::HashMap;
use std::fmt::Write;

use crate::disclosure::Disclosure;
use crate::models::{DriverSummary, IndexKind, MonthlyStats, PublicView};

/// How often each driver headline appears across published days.
pub fn summarize_drivers(views: &[PublicView]) -> Vec<DriverSummary> {
    let mut map: HashMap<String, usize> = HashMap::new();

    for view in views {
        for driver in view.top_drivers.iter() {
            *map.entry(driver.headline.clone()).or_insert(0) += 1;
        }
    }

    let mut summaries: Vec<DriverSummary> = map
        .into_iter()
        .map(|(headline, count)| DriverSummary { headline, count })
        .collect();

    summaries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.headline.cmp(&b.headline)));
    summaries
}

/// Markdown report built from public data only.
pub fn build_report(
    index: IndexKind,
    region: &str,
    latest: &Disclosure,
    stats: &MonthlyStats,
    views: &[PublicView],
) -> String {
    let mut output = String::new();

    let _ = writeln!(
        output,
        "# {} Risk Report: {}",
        index.as_str().to_uppercase(),
        region
    );
    let _ = writeln!(output, "Period {}-{:02}", stats.year, stats.month);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Latest Published Reading");

    match latest {
        Disclosure::Available(view) => {
            let _ = writeln!(
                output,
                "- Level {} ({}, {}) as of {}",
                view.level,
                view.band,
                view.trend,
                view.computed_at.format("%Y-%m-%d %H:%M UTC")
            );
            let _ = writeln!(output, "- {}", view.interpretation);
            for driver in view.top_drivers.iter() {
                let _ = writeln!(output, "- {}: {}", driver.headline, driver.title);
            }
            if !view.affected_assets.is_empty() {
                let _ = writeln!(output, "- Affected assets: {}", view.affected_assets.join(", "));
            }
        }
        Disclosure::Unavailable => {
            let _ = writeln!(output, "No data for this period.");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Monthly Summary");

    match (stats.average, stats.min, stats.max) {
        (Some(average), Some(min), Some(max)) => {
            let _ = writeln!(
                output,
                "- {} published days, average {:.1}, min {}, max {}",
                stats.days, average, min, max
            );
            let _ = writeln!(
                output,
                "- Bands: LOW {}, MODERATE {}, ELEVATED {}, CRITICAL {}",
                stats.bands.low, stats.bands.moderate, stats.bands.elevated, stats.bands.critical
            );
        }
        _ => {
            let _ = writeln!(output, "No data for this period.");
        }
    }

    let summaries = summarize_drivers(views);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recurring Drivers");

    if summaries.is_empty() {
        let _ = writeln!(output, "No drivers recorded for this period.");
    } else {
        for summary in summaries.iter().take(5) {
            let _ = writeln!(output, "- {}: {} days", summary.headline, summary.count);
        }
    }

    output
}
