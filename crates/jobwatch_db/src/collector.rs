//! The collection cycle: two read queries, one snapshot.

use std::time::Instant;

use sqlx::mysql::{MySqlConnection, MySqlRow};
use sqlx::{Column, Connection, Row};
use tracing::{debug, info, warn, Instrument};

use crate::data_source::ConnectionParams;
use crate::error::{CollectError, Result};
use crate::table_status::TableStatus;
use crate::types::{processed_from_auto_increment, JobStatus, Snapshot, StatusCount, JOB_TABLE};

/// Read access to the job table's status and row counts.
///
/// Implemented for a live `MySqlConnection`; tests substitute in-memory tables.
#[allow(async_fn_in_trait)]
pub trait JobTableSource {
    /// Table status rows matching `table`.
    async fn table_status(&mut self, table: &str) -> Result<Vec<TableStatus>>;

    /// Per-status row counts, one row per `JobStatus` ordinal.
    async fn status_counts(&mut self) -> Result<Vec<StatusCount>>;
}

/// `SHOW TABLE STATUS` for exactly one table name.
pub fn table_status_sql(table: &str) -> String {
    // `_` is a LIKE wildcard
    format!("SHOW TABLE STATUS LIKE '{}'", table.replace('_', "\\_"))
}

/// Aggregate query returning `(ordinal, job_count)` for every status, ordered by ordinal.
pub fn status_counts_sql() -> String {
    let branches: Vec<String> = JobStatus::ALL
        .iter()
        .map(|status| {
            format!(
                "  -- {}\n  SELECT {} AS ordinal, COUNT(*) AS job_count FROM {} WHERE {}",
                status,
                status.ordinal(),
                JOB_TABLE,
                status.predicate()
            )
        })
        .collect();
    format!(
        "SELECT t.ordinal, t.job_count FROM (\n{}\n) AS t ORDER BY t.ordinal",
        branches.join("\n  UNION ALL\n")
    )
}

impl JobTableSource for MySqlConnection {
    async fn table_status(&mut self, table: &str) -> Result<Vec<TableStatus>> {
        let sql = table_status_sql(table);
        debug!(sql = %sql, "Reading table status");
        // Text protocol: cells arrive as the server's textual rendering
        let rows = sqlx::raw_sql(&sql)
            .fetch_all(&mut *self)
            .await
            .map_err(CollectError::Query)?;
        rows.iter().map(table_status_from_row).collect()
    }

    async fn status_counts(&mut self) -> Result<Vec<StatusCount>> {
        let sql = status_counts_sql();
        debug!(sql = %sql, "Counting jobs by status");
        let rows: Vec<(i64, i64)> = sqlx::query_as(&sql)
            .fetch_all(&mut *self)
            .await
            .map_err(CollectError::Query)?;
        Ok(rows
            .into_iter()
            .map(|(ordinal, count)| StatusCount { ordinal, count })
            .collect())
    }
}

fn table_status_from_row(row: &MySqlRow) -> Result<TableStatus> {
    let columns: Vec<String> = row
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    let values = (0..columns.len())
        .map(|i| {
            row.try_get_unchecked::<Option<String>, _>(i)
                .map_err(CollectError::Query)
        })
        .collect::<Result<Vec<_>>>()?;
    TableStatus::new(columns, values)
}

/// Pick the status row for `table`.
///
/// `LIKE` is escaped, but a case-insensitive collation can still return
/// neighbours, so several rows are narrowed down by the `Name` column.
fn select_table_status(mut rows: Vec<TableStatus>, table: &str) -> Result<TableStatus> {
    if rows.len() <= 1 {
        return rows
            .pop()
            .ok_or_else(|| CollectError::MissingTable(table.to_string()));
    }
    let count = rows.len();
    rows.into_iter()
        .find(|row| matches!(row.get_by_name("Name"), Ok(Some(name)) if name == table))
        .ok_or_else(|| {
            CollectError::shape(format!(
                "{} table status rows returned, none named '{}'",
                count, table
            ))
        })
}

/// Attribute aggregate rows to statuses by their ordinal.
///
/// Returns counts in `JobStatus::ALL` order. Every ordinal must appear exactly once.
pub fn attribute_counts(rows: &[StatusCount]) -> Result<[u64; 3]> {
    let mut counts: [Option<u64>; 3] = [None; 3];

    for row in rows {
        let status = JobStatus::from_ordinal(row.ordinal).ok_or_else(|| {
            CollectError::shape(format!("unknown status ordinal {}", row.ordinal))
        })?;
        let count = u64::try_from(row.count).map_err(|_| {
            CollectError::shape(format!("negative count {} for {}", row.count, status))
        })?;
        let slot = &mut counts[(status.ordinal() - 1) as usize];
        if slot.is_some() {
            return Err(CollectError::shape(format!("duplicate row for {}", status)));
        }
        *slot = Some(count);
    }

    let mut totals = [0u64; 3];
    for (total, (count, status)) in totals.iter_mut().zip(counts.iter().zip(JobStatus::ALL)) {
        *total = count.ok_or_else(|| {
            CollectError::shape(format!(
                "expected 3 status rows, got {} (missing {})",
                rows.len(),
                status
            ))
        })?;
    }
    Ok(totals)
}

/// Run one cycle against an already-open source.
pub async fn collect_from<S: JobTableSource>(source: &mut S) -> Result<Snapshot> {
    let status = select_table_status(source.table_status(JOB_TABLE).await?, JOB_TABLE)?;
    let auto_increment = status.auto_increment()?;
    let processed = processed_from_auto_increment(auto_increment);
    debug!(auto_increment, processed, "Resolved processed count");

    let rows = source.status_counts().await?;
    let [queued, processing, failed] = attribute_counts(&rows)?;

    Ok(Snapshot {
        processed,
        queued,
        processing,
        failed,
    })
}

/// Open a connection, run one cycle, and close the connection.
///
/// The connection is closed whether or not the cycle succeeded.
pub async fn collect(params: &ConnectionParams) -> Result<Snapshot> {
    let span = tracing::debug_span!("collect", driver = params.driver());
    async {
        let options = params.connect_options()?;
        let started = Instant::now();

        let mut conn = MySqlConnection::connect_with(&options)
            .await
            .map_err(CollectError::Connection)?;
        debug!("Connected");

        let result = collect_from(&mut conn).await;

        if let Err(e) = conn.close().await {
            warn!(error = %e, "Connection did not close cleanly");
        }

        match &result {
            Ok(snapshot) => info!(
                processed = snapshot.processed,
                queued = snapshot.queued,
                processing = snapshot.processing,
                failed = snapshot.failed,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Collection cycle complete"
            ),
            Err(e) => debug!(error = %e, "Collection cycle failed"),
        }
        result
    }
    .instrument(span)
    .await
}
