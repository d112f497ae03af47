//! Graph definitions registered with the metrics host.
//!
//! A definition is built once from the metric key prefix and handed to the
//! reporter; nothing here is process-global.

use serde::Serialize;
use std::collections::BTreeMap;

/// Prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "delayed_job";

/// Namespace for every reported metric key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricKeyPrefix(String);

impl MetricKeyPrefix {
    /// An empty prefix falls back to [`DEFAULT_PREFIX`].
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        if prefix.trim().is_empty() {
            Self(DEFAULT_PREFIX.to_string())
        } else {
            Self(prefix)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Join the prefix with further key segments: `prefix.a.b`.
    pub fn key(&self, segments: &[&str]) -> String {
        std::iter::once(self.0.as_str())
            .chain(segments.iter().copied().filter(|s| !s.is_empty()))
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl Default for MetricKeyPrefix {
    fn default() -> Self {
        Self(DEFAULT_PREFIX.to_string())
    }
}

impl std::fmt::Display for MetricKeyPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One metric line within a graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub name: String,
    pub label: String,
    /// Report the per-minute rate against the previous cycle instead of the raw value.
    #[serde(skip)]
    pub diff: bool,
    pub stacked: bool,
}

impl Metric {
    pub fn new(name: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            diff: false,
            stacked: false,
        }
    }

    pub fn with_diff(mut self) -> Self {
        self.diff = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Graph {
    pub label: String,
    pub unit: String,
    pub metrics: Vec<Metric>,
}

/// Graphs keyed by their name, without the metric key prefix.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraphDefinition {
    graphs: BTreeMap<String, Graph>,
}

impl GraphDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_graph(mut self, key: impl Into<String>, graph: Graph) -> Self {
        self.graphs.insert(key.into(), graph);
        self
    }

    /// The single `count` graph for delayed_job queue depth.
    pub fn delayed_job(prefix: &MetricKeyPrefix) -> Self {
        Self::new().with_graph(
            "count",
            Graph {
                label: format!("{} Count", title_case(prefix.as_str())),
                unit: "integer".to_string(),
                metrics: vec![
                    Metric::new("processed", "Processed Job Count").with_diff(),
                    Metric::new("queued", "Queued Job Count"),
                    Metric::new("processing", "Processing Job Count"),
                    Metric::new("failed", "Failed Job Count"),
                ],
            },
        )
    }

    pub fn graphs(&self) -> impl Iterator<Item = (&str, &Graph)> {
        self.graphs.iter().map(|(k, g)| (k.as_str(), g))
    }

    /// Graphs keyed as the host expects them: `prefix.graph`.
    pub fn prefixed(&self, prefix: &MetricKeyPrefix) -> BTreeMap<String, &Graph> {
        self.graphs
            .iter()
            .map(|(key, graph)| (prefix.key(&[key]), graph))
            .collect()
    }
}

/// Upper-case the first letter of every word.
///
/// Letters, digits and `_` continue a word, so `delayed_job` becomes `Delayed_job`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for ch in s.chars() {
        if at_word_start {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        at_word_start = !(ch.is_alphanumeric() || ch == '_');
    }
    out
}
