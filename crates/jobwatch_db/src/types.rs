//! Domain types for the delayed_job table and a collection cycle.

/// Name of the job table.
pub const JOB_TABLE: &str = "delayed_jobs";

/// Classification of a job row.
///
/// Exactly one status applies to every row:
/// - `failed_at IS NOT NULL` -> `Failed`
/// - `failed_at IS NULL AND locked_by IS NOT NULL` -> `Processing`
/// - `failed_at IS NULL AND locked_by IS NULL` -> `Queued`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Queued,
    Processing,
    Failed,
}

impl JobStatus {
    /// All statuses in reporting order.
    pub const ALL: [JobStatus; 3] = [JobStatus::Queued, JobStatus::Processing, JobStatus::Failed];

    /// Classify a row from the nullability of its two marker columns.
    pub fn classify(failed_at_set: bool, locked_by_set: bool) -> Self {
        if failed_at_set {
            JobStatus::Failed
        } else if locked_by_set {
            JobStatus::Processing
        } else {
            JobStatus::Queued
        }
    }

    /// Explicit ordering key used by the aggregate query.
    pub fn ordinal(&self) -> i64 {
        match self {
            JobStatus::Queued => 1,
            JobStatus::Processing => 2,
            JobStatus::Failed => 3,
        }
    }

    pub fn from_ordinal(ordinal: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.ordinal() == ordinal)
    }

    /// SQL predicate selecting the rows of this status.
    pub fn predicate(&self) -> &'static str {
        match self {
            JobStatus::Queued => "failed_at IS NULL AND locked_by IS NULL",
            JobStatus::Processing => "failed_at IS NULL AND locked_by IS NOT NULL",
            JobStatus::Failed => "failed_at IS NOT NULL",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the status aggregate: ordering key and row count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCount {
    pub ordinal: i64,
    pub count: i64,
}

/// Result of one collection cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Lifetime processed jobs, estimated from the auto-increment watermark.
    pub processed: u64,
    pub queued: u64,
    pub processing: u64,
    pub failed: u64,
}

impl Snapshot {
    /// Metric name/value pairs in reporting order.
    pub fn metrics(&self) -> [(&'static str, u64); 4] {
        [
            ("processed", self.processed),
            ("queued", self.queued),
            ("processing", self.processing),
            ("failed", self.failed),
        ]
    }

    /// Look up a metric by name.
    pub fn get(&self, name: &str) -> Option<u64> {
        self.metrics()
            .into_iter()
            .find(|(metric, _)| *metric == name)
            .map(|(_, value)| value)
    }
}

/// Lifetime processed count from the table's next auto-increment value.
///
/// The next value is one past the last identifier issued, so the count is
/// `next - 1`. A never-written table may report 0; that is treated as 0.
pub fn processed_from_auto_increment(next_auto_increment: u64) -> u64 {
    next_auto_increment.saturating_sub(1)
}
