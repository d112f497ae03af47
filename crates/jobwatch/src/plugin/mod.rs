//! Metrics host integration: graph metadata, value lines, and diff state.

pub mod graph;
pub mod report;
pub mod state;

pub use graph::{GraphDefinition, MetricKeyPrefix, DEFAULT_PREFIX};
pub use report::{Reporter, META_HEADER};
pub use state::{default_state_path, LastValues};

/// Set by the host when it wants graph metadata instead of values.
pub const META_ENV: &str = "MACKEREL_AGENT_PLUGIN_META";

/// Whether the host asked for metadata (`META_ENV` set and non-empty).
pub fn wants_definitions(meta_env: Option<&str>) -> bool {
    meta_env.is_some_and(|v| !v.is_empty())
}
