//! Writes graph metadata and metric values in the host's plugin format.
//!
//! Metadata: a `# mackerel-agent-plugin` line, then `{"graphs": {...}}`.
//! Values: one `key\tvalue\tunix_seconds` line per metric.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use jobwatch_db::Snapshot;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, warn};

use super::graph::{Graph, GraphDefinition, Metric, MetricKeyPrefix};
use super::state::LastValues;

/// Header the host looks for before the metadata JSON.
pub const META_HEADER: &str = "# mackerel-agent-plugin";

/// Diffs across a longer gap than this are not reported.
const MAX_DIFF_INTERVAL_SECS: i64 = 600;

/// Why a cumulative metric produced no rate this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffSkip {
    NoPrevious,
    NoElapsedTime,
    TooLongInterval,
    CounterReset,
}

/// Per-minute rate between two readings of a cumulative counter.
pub fn per_minute_rate(
    current: u64,
    now: i64,
    previous: u64,
    previous_time: i64,
) -> std::result::Result<f64, DiffSkip> {
    let elapsed = now - previous_time;
    if elapsed <= 0 {
        return Err(DiffSkip::NoElapsedTime);
    }
    if elapsed > MAX_DIFF_INTERVAL_SECS {
        return Err(DiffSkip::TooLongInterval);
    }
    if current < previous {
        return Err(DiffSkip::CounterReset);
    }
    Ok((current - previous) as f64 * 60.0 / elapsed as f64)
}

#[derive(Serialize)]
struct Meta<'a> {
    graphs: BTreeMap<String, &'a Graph>,
}

/// Reports snapshots under a fixed graph definition.
#[derive(Debug, Clone)]
pub struct Reporter {
    definition: GraphDefinition,
    prefix: MetricKeyPrefix,
    state_path: PathBuf,
}

impl Reporter {
    pub fn new(definition: GraphDefinition, prefix: MetricKeyPrefix, state_path: PathBuf) -> Self {
        Self {
            definition,
            prefix,
            state_path,
        }
    }

    pub fn state_path(&self) -> &std::path::Path {
        &self.state_path
    }

    /// Write the metadata block the host reads at registration.
    pub fn write_definitions<W: Write>(&self, out: &mut W) -> Result<()> {
        let meta = Meta {
            graphs: self.definition.prefixed(&self.prefix),
        };
        writeln!(out, "{}", META_HEADER)?;
        serde_json::to_writer(&mut *out, &meta).context("Failed to serialize graph definition")?;
        writeln!(out)?;
        Ok(())
    }

    /// Write value lines for `snapshot` and record it for the next cycle.
    ///
    /// Cumulative metrics need the previous cycle's value; without it they
    /// are left out of this cycle's output.
    pub fn write_values<W: Write>(
        &self,
        out: &mut W,
        snapshot: &Snapshot,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let timestamp = now.timestamp();
        let last = LastValues::load(&self.state_path);

        for (graph_key, graph) in self.definition.graphs() {
            for metric in &graph.metrics {
                let Some(value) = snapshot.get(&metric.name) else {
                    continue;
                };
                let Some(formatted) = self.format_value(metric, value, timestamp, &last) else {
                    continue;
                };
                let key = self.prefix.key(&[graph_key, metric.name.as_str()]);
                writeln!(out, "{}\t{}\t{}", key, formatted, timestamp)?;
            }
        }

        let mut next = LastValues::new(timestamp);
        next.values
            .extend(snapshot.metrics().iter().map(|(n, v)| (n.to_string(), *v)));
        if let Err(e) = next.save(&self.state_path) {
            warn!(error = %format!("{:#}", e), "Failed to save metric state");
        }
        Ok(())
    }

    fn format_value(
        &self,
        metric: &Metric,
        value: u64,
        timestamp: i64,
        last: &LastValues,
    ) -> Option<String> {
        if metric.diff {
            let rate = last
                .get(&metric.name)
                .ok_or(DiffSkip::NoPrevious)
                .and_then(|previous| per_minute_rate(value, timestamp, previous, last.timestamp));
            return match rate {
                Ok(rate) => Some(format!("{:.6}", rate)),
                Err(skip) => {
                    debug!(metric = %metric.name, reason = ?skip, "Skipping rate");
                    None
                }
            };
        }
        // Gauges are whole job counts
        Some(value.to_string())
    }
}
