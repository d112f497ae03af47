//! jobwatch: delayed_job queue depth for the metrics agent.
//!
//! The binary collects one [`jobwatch_db::Snapshot`] per invocation and
//! prints it through [`plugin::Reporter`].

pub mod error;
pub mod plugin;
