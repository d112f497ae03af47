//! Live collection against a scratch MySQL database.
//!
//! Run with:
//!   docker run -d --name jobwatch-mysql -e MYSQL_ROOT_PASSWORD=jobwatch \
//!     -e MYSQL_DATABASE=jobwatch_test -p 13306:3306 mysql:8
//!   JOBWATCH_TEST_DSN='root:jobwatch@tcp(127.0.0.1:13306)/jobwatch_test' \
//!     cargo test -p jobwatch_db --features docker-tests
//!
//! Every test recreates `delayed_jobs`, so run them single-threaded:
//! `-- --test-threads=1`.

#![cfg(feature = "docker-tests")]

use jobwatch_db::{collect, CollectError, ConnectionParams, ErrorKind, Snapshot};
use sqlx::mysql::MySqlConnection;
use sqlx::Connection;
use std::time::Duration;

const CREATE_TABLE: &str = r#"
CREATE TABLE delayed_jobs (
    id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
    priority INT NOT NULL DEFAULT 0,
    attempts INT NOT NULL DEFAULT 0,
    handler TEXT NOT NULL,
    last_error TEXT NULL,
    run_at DATETIME NULL,
    locked_at DATETIME NULL,
    failed_at DATETIME NULL,
    locked_by VARCHAR(255) NULL,
    queue VARCHAR(255) NULL,
    created_at DATETIME NULL,
    updated_at DATETIME NULL
)
"#;

fn test_params() -> ConnectionParams {
    let dsn = std::env::var("JOBWATCH_TEST_DSN")
        .expect("JOBWATCH_TEST_DSN must point at a scratch MySQL database");
    ConnectionParams::new("mysql", dsn)
}

async fn reset_table(params: &ConnectionParams) -> MySqlConnection {
    let options = params.connect_options().unwrap();
    let mut conn = MySqlConnection::connect_with(&options).await.unwrap();
    sqlx::raw_sql("DROP TABLE IF EXISTS delayed_jobs")
        .execute(&mut conn)
        .await
        .unwrap();
    sqlx::raw_sql(CREATE_TABLE).execute(&mut conn).await.unwrap();
    conn
}

/// Sessions open on the server, as seen by `conn` (which counts itself).
async fn threads_connected(conn: &mut MySqlConnection) -> i64 {
    let (_, value): (String, String) =
        sqlx::query_as("SHOW GLOBAL STATUS LIKE 'Threads_connected'")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
    value.parse().unwrap()
}

/// Polls until the server has dropped sessions that sent COM_QUIT.
async fn settled_threads_connected(conn: &mut MySqlConnection, expected: i64) -> i64 {
    let mut current = threads_connected(conn).await;
    for _ in 0..40 {
        if current <= expected {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        current = threads_connected(conn).await;
    }
    current
}

async fn insert_jobs(conn: &mut MySqlConnection, count: usize, failed: bool, locked: bool) {
    for _ in 0..count {
        sqlx::query(
            "INSERT INTO delayed_jobs (handler, failed_at, locked_by) VALUES (?, ?, ?)",
        )
        .bind("--- !ruby/object:NoopJob {}")
        .bind(failed.then(|| chrono::Utc::now().naive_utc()))
        .bind(locked.then_some("host:worker.1 pid:1"))
        .execute(&mut *conn)
        .await
        .unwrap();
    }
}

#[tokio::test]
async fn test_fresh_table_reports_zeroes() {
    let params = test_params();
    let conn = reset_table(&params).await;
    conn.close().await.unwrap();

    let snapshot = collect(&params).await.unwrap();
    assert_eq!(snapshot, Snapshot::default());
}

#[tokio::test]
async fn test_counts_each_status_and_deleted_jobs() {
    let params = test_params();
    let mut conn = reset_table(&params).await;

    insert_jobs(&mut conn, 3, true, false).await;
    insert_jobs(&mut conn, 2, false, true).await;
    insert_jobs(&mut conn, 5, false, false).await;
    // Completed jobs are deleted; they still count as processed
    insert_jobs(&mut conn, 4, false, true).await;
    sqlx::raw_sql("DELETE FROM delayed_jobs WHERE id > 10")
        .execute(&mut conn)
        .await
        .unwrap();
    // Table status is cached by default on MySQL 8
    sqlx::raw_sql("ANALYZE TABLE delayed_jobs")
        .execute(&mut conn)
        .await
        .unwrap();
    conn.close().await.unwrap();

    let snapshot = collect(&params).await.unwrap();
    assert_eq!(snapshot.queued, 5);
    assert_eq!(snapshot.processing, 2);
    assert_eq!(snapshot.failed, 3);
    assert_eq!(snapshot.processed, 14);
}

#[tokio::test]
async fn test_missing_table_is_schema_error() {
    let params = test_params();
    let mut conn = reset_table(&params).await;
    sqlx::raw_sql("DROP TABLE delayed_jobs")
        .execute(&mut conn)
        .await
        .unwrap();
    conn.close().await.unwrap();

    let err = collect(&params).await.unwrap_err();
    assert!(matches!(err, CollectError::MissingTable(_)));
    assert_eq!(err.kind(), ErrorKind::Schema);
}

#[tokio::test]
async fn test_failed_cycles_release_their_connection() {
    let params = test_params();
    let mut conn = reset_table(&params).await;
    // No AUTO_INCREMENT key: Auto_increment is NULL, so collection fails
    // only after the connection is open and the first query has run
    sqlx::raw_sql("DROP TABLE delayed_jobs")
        .execute(&mut conn)
        .await
        .unwrap();
    sqlx::raw_sql("CREATE TABLE delayed_jobs (id BIGINT NOT NULL PRIMARY KEY, handler TEXT NOT NULL, failed_at DATETIME NULL, locked_by VARCHAR(255) NULL)")
        .execute(&mut conn)
        .await
        .unwrap();

    let baseline = threads_connected(&mut conn).await;
    for _ in 0..5 {
        let err = collect(&params).await.unwrap_err();
        assert!(matches!(err, CollectError::Parse(_)), "{err:?}");
        assert_eq!(err.kind(), ErrorKind::Parse);
    }
    assert_eq!(settled_threads_connected(&mut conn, baseline).await, baseline);
    conn.close().await.unwrap();
}
