//! CSV rendering of stored histories.
//!
//! Columns are `t`, every state component, then every applied actuation
//! component, named after the manifest channels.

use std::fmt::Write;

use crate::base::BaseValues;
use crate::types::{Channel, HistoryRecord, RunManifest};

fn header(manifest: &RunManifest, suffix: &str) -> String {
    let mut line = String::from("t_s");
    for ch in manifest.states.iter().chain(&manifest.actuations) {
        line.push(',');
        line.push_str(&ch.name);
        line.push_str(suffix);
    }
    line.push('\n');
    line
}

fn render(
    manifest: &RunManifest,
    records: &[HistoryRecord],
    suffix: &str,
    scale: impl Fn(&Channel, f64) -> f64,
) -> String {
    let mut csv = header(manifest, suffix);
    for record in records {
        let _ = write!(csv, "{}", record.t);
        let values = record.x.iter().zip(&manifest.states).chain(
            record.u.iter().zip(&manifest.actuations),
        );
        for (v, ch) in values {
            let _ = write!(csv, ",{}", scale(ch, *v));
        }
        csv.push('\n');
    }
    csv
}

/// SI values as recorded.
pub fn to_csv(manifest: &RunManifest, records: &[HistoryRecord]) -> String {
    render(manifest, records, "", |_, v| v)
}

/// Values divided by their base; time stays in seconds.
pub fn to_csv_per_unit(
    manifest: &RunManifest,
    records: &[HistoryRecord],
    base: &BaseValues,
) -> String {
    render(manifest, records, "_pu", |ch, v| {
        base.to_per_unit(ch.quantity, v)
    })
}
