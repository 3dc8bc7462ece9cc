//! SQLite-backed run history.
//!
//! Every pipeline run, successful or failed, is appended to an `analyses` table so
//! past results can be listed and aggregated. The pipeline itself never touches the
//! database; the service layer logs the terminal [`AnalysisResult`] here.

use std::path::Path;
use std::str::FromStr;

use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::pipeline::AnalysisResult;

/// Errors emitted by the history store.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Underlying SQLite operation failed.
    #[error("Database operation failed: {0}")]
    Database(#[from] sqlx::Error),
    /// The database directory could not be created.
    #[error("Failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),
    /// Timestamp formatting failed.
    #[error("Failed to format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

/// One logged run, as stored.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    /// Row id.
    pub id: i64,
    /// RFC 3339 UTC timestamp of when the run was logged.
    pub timestamp: String,
    /// Display name of the analyzed document.
    pub filename: String,
    /// Terminal pipeline status name.
    pub status: String,
    /// Summary text.
    pub summary: String,
    /// Key information text.
    pub key_info: String,
    /// Risk narrative.
    pub risks: String,
    /// Numeric risk score.
    pub risk_score: i64,
    /// Final report text.
    pub report: String,
    /// Detected document language.
    pub language: String,
    /// Failure detail; empty on success.
    pub error: String,
    /// Length of the report in characters.
    pub char_count: i64,
}

/// Aggregate view over the logged runs.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryStats {
    /// Total runs logged.
    pub total: i64,
    /// Runs that reached `complete`.
    pub successful: i64,
    /// Runs that ended `failed`.
    pub failed: i64,
    /// Mean risk score over completed runs; zero when none completed.
    pub average_risk_score: f64,
    /// The five most recently logged runs.
    pub recent: Vec<RunRecord>,
}

/// Append-only log of analysis runs.
pub struct HistoryStore {
    pool: SqlitePool,
}

impl HistoryStore {
    /// Open (creating if needed) the database at `path` and ensure the schema.
    pub async fn connect(path: &Path) -> Result<Self, HistoryError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), HistoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS analyses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                filename TEXT NOT NULL,
                status TEXT NOT NULL,
                summary TEXT NOT NULL DEFAULT '',
                key_info TEXT NOT NULL DEFAULT '',
                risks TEXT NOT NULL DEFAULT '',
                risk_score INTEGER NOT NULL DEFAULT 0,
                report TEXT NOT NULL DEFAULT '',
                language TEXT NOT NULL DEFAULT 'English',
                error TEXT NOT NULL DEFAULT '',
                char_count INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Append one terminal run result.
    pub async fn log(&self, result: &AnalysisResult) -> Result<(), HistoryError> {
        let timestamp = OffsetDateTime::now_utc().format(&Rfc3339)?;
        sqlx::query(
            r#"
            INSERT INTO analyses
                (timestamp, filename, status, summary, key_info, risks,
                 risk_score, report, language, error, char_count)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&timestamp)
        .bind(&result.filename)
        .bind(result.status.as_str())
        .bind(&result.summary)
        .bind(&result.key_info)
        .bind(&result.risks)
        .bind(i64::from(result.risk_score))
        .bind(&result.report)
        .bind(&result.language)
        .bind(&result.error)
        .bind(result.report.chars().count() as i64)
        .execute(&self.pool)
        .await?;
        tracing::debug!(filename = result.filename, status = %result.status, "Run logged");
        Ok(())
    }

    /// All logged runs, most recent first.
    pub async fn list_all(&self) -> Result<Vec<RunRecord>, HistoryError> {
        let rows = sqlx::query("SELECT * FROM analyses ORDER BY timestamp DESC, id DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(record_from_row).collect())
    }

    /// The most recent run logged for `filename`, if any.
    pub async fn latest_for(&self, filename: &str) -> Result<Option<RunRecord>, HistoryError> {
        let row = sqlx::query(
            "SELECT * FROM analyses WHERE filename = ? ORDER BY timestamp DESC, id DESC LIMIT 1",
        )
        .bind(filename)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(record_from_row))
    }

    /// Aggregate counts and the five most recent runs.
    pub async fn stats(&self) -> Result<HistoryStats, HistoryError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM analyses")
            .fetch_one(&self.pool)
            .await?;
        let successful: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM analyses WHERE status = 'complete'")
                .fetch_one(&self.pool)
                .await?;
        let failed: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM analyses WHERE status = 'failed'")
                .fetch_one(&self.pool)
                .await?;
        let average_risk_score: Option<f64> =
            sqlx::query_scalar("SELECT AVG(risk_score) FROM analyses WHERE status = 'complete'")
                .fetch_one(&self.pool)
                .await?;

        let rows =
            sqlx::query("SELECT * FROM analyses ORDER BY timestamp DESC, id DESC LIMIT 5")
                .fetch_all(&self.pool)
                .await?;

        Ok(HistoryStats {
            total,
            successful,
            failed,
            average_risk_score: average_risk_score.unwrap_or(0.0),
            recent: rows.iter().map(record_from_row).collect(),
        })
    }
}

fn record_from_row(row: &SqliteRow) -> RunRecord {
    RunRecord {
        id: row.get("id"),
        timestamp: row.get("timestamp"),
        filename: row.get("filename"),
        status: row.get("status"),
        summary: row.get("summary"),
        key_info: row.get("key_info"),
        risks: row.get("risks"),
        risk_score: row.get("risk_score"),
        report: row.get("report"),
        language: row.get("language"),
        error: row.get("error"),
        char_count: row.get("char_count"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{PipelineStatus, RunState};

    async fn temp_store() -> (HistoryStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = HistoryStore::connect(&dir.path().join("analyses.db"))
            .await
            .expect("connect");
        (store, dir)
    }

    fn complete_result(filename: &str, score: u8) -> AnalysisResult {
        RunState::new(filename)
            .with_processed("text".into(), "English".into())
            .with_analysis("summary".into(), "key info".into(), "risks".into())
            .with_risk_score(score, "reasoning".into())
            .with_report("the report".into())
            .with_questions(vec!["q?".into()])
            .into_result()
    }

    fn failed_result(filename: &str) -> AnalysisResult {
        RunState::new(filename)
            .with_failure("extraction failed")
            .into_result()
    }

    #[tokio::test]
    async fn logged_run_round_trips_through_list() {
        let (store, _dir) = temp_store().await;
        store.log(&complete_result("a.pdf", 40)).await.unwrap();

        let records = store.list_all().await.unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.filename, "a.pdf");
        assert_eq!(record.status, "complete");
        assert_eq!(record.risk_score, 40);
        assert_eq!(record.char_count, "the report".chars().count() as i64);
        assert!(record.timestamp.contains('T'));
    }

    #[tokio::test]
    async fn failed_runs_are_logged_with_error_detail() {
        let (store, _dir) = temp_store().await;
        store.log(&failed_result("bad.pdf")).await.unwrap();

        let records = store.list_all().await.unwrap();
        assert_eq!(records[0].status, "failed");
        assert_eq!(records[0].error, "extraction failed");
        assert_eq!(records[0].risk_score, 0);
    }

    #[tokio::test]
    async fn latest_for_picks_the_newest_entry_for_a_filename() {
        let (store, _dir) = temp_store().await;
        store.log(&complete_result("a.pdf", 10)).await.unwrap();
        store.log(&complete_result("b.pdf", 20)).await.unwrap();
        store.log(&complete_result("a.pdf", 30)).await.unwrap();

        let latest = store.latest_for("a.pdf").await.unwrap().unwrap();
        assert_eq!(latest.risk_score, 30);
        assert!(store.latest_for("missing.pdf").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stats_average_only_covers_completed_runs() {
        let (store, _dir) = temp_store().await;
        store.log(&complete_result("a.pdf", 20)).await.unwrap();
        store.log(&complete_result("b.pdf", 40)).await.unwrap();
        store.log(&failed_result("c.pdf")).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.successful, 2);
        assert_eq!(stats.failed, 1);
        assert!((stats.average_risk_score - 30.0).abs() < f64::EPSILON);
        assert_eq!(stats.recent.len(), 3);
    }

    #[tokio::test]
    async fn stats_on_empty_store_are_zero() {
        let (store, _dir) = temp_store().await;
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.average_risk_score, 0.0);
        assert!(stats.recent.is_empty());
    }

    #[tokio::test]
    async fn connect_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("logs").join("deep").join("analyses.db");
        let store = HistoryStore::connect(&nested).await.unwrap();
        store.log(&complete_result("a.pdf", 5)).await.unwrap();
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[test]
    fn pipeline_statuses_match_the_stored_names() {
        assert_eq!(PipelineStatus::Complete.as_str(), "complete");
        assert_eq!(PipelineStatus::Failed.as_str(), "failed");
    }
}
