//! Repository for Caddyfile import sessions.

use sqlx::PgPool;
use uuid::Uuid;
use gatehouse_core::import_session::SessionStatus;
use gatehouse_core::types::{DbId, Timestamp};

use crate::models::import_session::{CommitRecord, CreateImportSession, ImportSession};

/// Column list for `import_sessions`.
const COLUMNS: &str = "id, uuid, source_file, status_id, parsed_data, conflict_report, \
     user_resolutions, error_msg, created_at, updated_at, committed_at";

fn open_status_ids() -> Vec<DbId> {
    SessionStatus::OPEN.iter().map(|s| s.id()).collect()
}

/// Provides CRUD and state-transition operations for import sessions.
pub struct ImportSessionRepo;

impl ImportSessionRepo {
    /// Insert a session row. A `committed` status also stamps `committed_at`.
    pub async fn create(
        pool: &PgPool,
        input: &CreateImportSession,
    ) -> Result<ImportSession, sqlx::Error> {
        let sql = format!(
            "INSERT INTO import_sessions \
                (uuid, source_file, status_id, parsed_data, conflict_report, \
                 user_resolutions, error_msg, committed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, \
                CASE WHEN $3 = {committed} THEN NOW() ELSE NULL END) \
             RETURNING {COLUMNS}",
            committed = SessionStatus::Committed.id(),
        );
        sqlx::query_as::<_, ImportSession>(&sql)
            .bind(input.uuid)
            .bind(&input.source_file)
            .bind(input.status.id())
            .bind(&input.parsed_data)
            .bind(&input.conflict_report)
            .bind(&input.user_resolutions)
            .bind(&input.error_msg)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_uuid(
        pool: &PgPool,
        uuid: Uuid,
    ) -> Result<Option<ImportSession>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM import_sessions WHERE uuid = $1");
        sqlx::query_as::<_, ImportSession>(&sql)
            .bind(uuid)
            .fetch_optional(pool)
            .await
    }

    /// The most recent pending/reviewing session, if any.
    pub async fn find_open(pool: &PgPool) -> Result<Option<ImportSession>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM import_sessions \
             WHERE status_id = ANY($1) \
             ORDER BY created_at DESC, id DESC LIMIT 1"
        );
        sqlx::query_as::<_, ImportSession>(&sql)
            .bind(open_status_ids())
            .fetch_optional(pool)
            .await
    }

    /// Commit time of the latest committed session for a source file.
    pub async fn latest_committed_at(
        pool: &PgPool,
        source_file: &str,
    ) -> Result<Option<Timestamp>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<Timestamp>>(
            "SELECT MAX(committed_at) FROM import_sessions \
             WHERE source_file = $1 AND status_id = $2",
        )
        .bind(source_file)
        .bind(SessionStatus::Committed.id())
        .fetch_one(pool)
        .await
    }

    /// Move a session to `to` only if it is currently in one of `from`.
    ///
    /// This is a single compare-and-set statement, so two concurrent
    /// callers cannot both win. Moving to `committed` stamps
    /// `committed_at`. Returns `None` when the session does not exist or
    /// is in another status.
    pub async fn transition_status(
        pool: &PgPool,
        uuid: Uuid,
        from: &[SessionStatus],
        to: SessionStatus,
    ) -> Result<Option<ImportSession>, sqlx::Error> {
        let sql = format!(
            "UPDATE import_sessions SET \
                status_id = $3, \
                committed_at = CASE WHEN $3 = {committed} THEN NOW() ELSE committed_at END, \
                updated_at = NOW() \
             WHERE uuid = $1 AND status_id = ANY($2) \
             RETURNING {COLUMNS}",
            committed = SessionStatus::Committed.id(),
        );
        let from_ids: Vec<DbId> = from.iter().map(|s| s.id()).collect();
        sqlx::query_as::<_, ImportSession>(&sql)
            .bind(uuid)
            .bind(from_ids)
            .bind(to.id())
            .fetch_optional(pool)
            .await
    }

    /// Store the outcome of a commit on an already-committed session.
    pub async fn record_commit(
        pool: &PgPool,
        uuid: Uuid,
        record: &CommitRecord,
    ) -> Result<Option<ImportSession>, sqlx::Error> {
        let sql = format!(
            "UPDATE import_sessions SET \
                parsed_data = $2, conflict_report = $3, user_resolutions = $4, \
                error_msg = $5, updated_at = NOW() \
             WHERE uuid = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportSession>(&sql)
            .bind(uuid)
            .bind(&record.parsed_data)
            .bind(&record.conflict_report)
            .bind(&record.user_resolutions)
            .bind(&record.error_msg)
            .fetch_optional(pool)
            .await
    }

    /// Mark every open session for a source file as `abandoned`.
    pub async fn abandon_open_for_source(
        pool: &PgPool,
        source_file: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE import_sessions SET status_id = $3, updated_at = NOW() \
             WHERE source_file = $1 AND status_id = ANY($2)",
        )
        .bind(source_file)
        .bind(open_status_ids())
        .bind(SessionStatus::Abandoned.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
