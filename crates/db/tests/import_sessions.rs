//! Integration tests for the import session repository.
//!
//! Verifies against a real database that:
//! - At most one open session exists per source file
//! - Status transitions are compare-and-set
//! - Committing stamps `committed_at` and feeds `latest_committed_at`
//! - Abandoning only touches open sessions of the given source

use sqlx::PgPool;
use uuid::Uuid;
use gatehouse_core::import_session::SessionStatus;
use gatehouse_db::models::import_session::{CommitRecord, CreateImportSession};
use gatehouse_db::repositories::ImportSessionRepo;

fn new_session(source: &str, status: SessionStatus) -> CreateImportSession {
    CreateImportSession {
        uuid: Uuid::new_v4(),
        source_file: source.to_string(),
        status,
        parsed_data: None,
        conflict_report: None,
        user_resolutions: None,
        error_msg: None,
    }
}

fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.code().as_deref() == Some("23505") && db.constraint() == Some(constraint)
        }
        _ => false,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a live PostgreSQL instance (DATABASE_URL)"]
async fn second_open_session_for_same_source_is_rejected(pool: PgPool) {
    ImportSessionRepo::create(&pool, &new_session("/etc/Caddyfile", SessionStatus::Pending))
        .await
        .unwrap();

    let err = ImportSessionRepo::create(&pool, &new_session("/etc/Caddyfile", SessionStatus::Reviewing))
        .await
        .unwrap_err();
    assert!(is_unique_violation(&err, "uq_import_sessions_open_source"));

    // Committed rows are not open and do not collide.
    ImportSessionRepo::create(&pool, &new_session("/etc/Caddyfile", SessionStatus::Committed))
        .await
        .unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a live PostgreSQL instance (DATABASE_URL)"]
async fn transition_is_compare_and_set(pool: PgPool) {
    let row = ImportSessionRepo::create(&pool, &new_session("up.caddyfile", SessionStatus::Reviewing))
        .await
        .unwrap();

    let committed = ImportSessionRepo::transition_status(
        &pool,
        row.uuid,
        &[SessionStatus::Reviewing],
        SessionStatus::Committed,
    )
    .await
    .unwrap()
    .expect("first transition wins");
    assert_eq!(committed.status().unwrap(), SessionStatus::Committed);
    assert!(committed.committed_at.is_some());

    let second = ImportSessionRepo::transition_status(
        &pool,
        row.uuid,
        &[SessionStatus::Reviewing],
        SessionStatus::Committed,
    )
    .await
    .unwrap();
    assert!(second.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a live PostgreSQL instance (DATABASE_URL)"]
async fn find_open_ignores_terminal_sessions(pool: PgPool) {
    ImportSessionRepo::create(&pool, &new_session("a", SessionStatus::Rejected))
        .await
        .unwrap();
    assert!(ImportSessionRepo::find_open(&pool).await.unwrap().is_none());

    let open = ImportSessionRepo::create(&pool, &new_session("b", SessionStatus::Pending))
        .await
        .unwrap();
    let found = ImportSessionRepo::find_open(&pool).await.unwrap().unwrap();
    assert_eq!(found.uuid, open.uuid);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a live PostgreSQL instance (DATABASE_URL)"]
async fn record_commit_and_latest_committed_at(pool: PgPool) {
    assert!(ImportSessionRepo::latest_committed_at(&pool, "/etc/Caddyfile")
        .await
        .unwrap()
        .is_none());

    let row = ImportSessionRepo::create(&pool, &new_session("/etc/Caddyfile", SessionStatus::Committed))
        .await
        .unwrap();
    let record = CommitRecord {
        parsed_data: serde_json::json!({ "hosts": [], "conflicts": [], "errors": [] }),
        conflict_report: serde_json::json!([]),
        user_resolutions: serde_json::json!({ "a.com": "skip" }),
        error_msg: Some("b.com: Host 'b.com' has no forward host".into()),
    };
    let updated = ImportSessionRepo::record_commit(&pool, row.uuid, &record)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.user_resolutions, Some(record.user_resolutions.clone()));
    assert_eq!(updated.error_msg, record.error_msg);

    let latest = ImportSessionRepo::latest_committed_at(&pool, "/etc/Caddyfile")
        .await
        .unwrap();
    assert_eq!(latest, row.committed_at);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a live PostgreSQL instance (DATABASE_URL)"]
async fn abandon_only_touches_open_sessions_of_source(pool: PgPool) {
    let open = ImportSessionRepo::create(&pool, &new_session("/etc/Caddyfile", SessionStatus::Pending))
        .await
        .unwrap();
    let other = ImportSessionRepo::create(&pool, &new_session("/other", SessionStatus::Pending))
        .await
        .unwrap();
    ImportSessionRepo::create(&pool, &new_session("/etc/Caddyfile", SessionStatus::Committed))
        .await
        .unwrap();

    let abandoned = ImportSessionRepo::abandon_open_for_source(&pool, "/etc/Caddyfile")
        .await
        .unwrap();
    assert_eq!(abandoned, 1);

    let open = ImportSessionRepo::find_by_uuid(&pool, open.uuid).await.unwrap().unwrap();
    assert_eq!(open.status().unwrap(), SessionStatus::Abandoned);
    let other = ImportSessionRepo::find_by_uuid(&pool, other.uuid).await.unwrap().unwrap();
    assert_eq!(other.status().unwrap(), SessionStatus::Pending);
}
