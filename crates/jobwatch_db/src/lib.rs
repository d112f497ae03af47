//! Queue-depth collection for `delayed_job` tables.
//!
//! One call to [`collect`] opens a MySQL connection, reads the job table's
//! auto-increment watermark and per-status row counts, closes the
//! connection, and returns a [`Snapshot`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use jobwatch_db::{collect, ConnectionParams};
//!
//! let params = ConnectionParams::new("mysql", "app:secret@tcp(db:3306)/app_production");
//! let snapshot = collect(&params).await?;
//! println!("{} queued", snapshot.queued);
//! ```
//!
//! `processed` is derived from `Auto_increment - 1`. Finished jobs are deleted
//! from the table, so the identifier watermark is the only durable trace of
//! how many jobs ever existed. It over-counts rolled-back inserts and is
//! meaningless after the table is truncated or its identifier sequence reset.

mod collector;
mod data_source;
mod error;
mod table_status;
mod types;

pub use collector::{
    attribute_counts, collect, collect_from, status_counts_sql, table_status_sql, JobTableSource,
};
pub use data_source::{ConnectionParams, Driver, DriverDsn, Endpoint, TlsMode};
pub use error::{CollectError, ErrorKind, Result};
pub use table_status::{find_column, TableStatus, AUTO_INCREMENT_COLUMN};
pub use types::*;
