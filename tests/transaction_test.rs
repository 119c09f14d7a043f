//! Transactional mutation semantics: commit on success, rollback on failure,
//! connection always returned to the pool.

use tempfile::NamedTempFile;
use tinyorm::{Db, OrmError, PoolConfig, SqlValue};

async fn setup(maxsize: u32) -> (Db, NamedTempFile) {
    let file = NamedTempFile::new().unwrap();
    let config = PoolConfig::sqlite(file.path().to_str().unwrap())
        .with_pool_size(1, maxsize)
        .with_acquire_timeout(5);
    let db = Db::connect(config).await.unwrap();
    db.mutate(
        "CREATE TABLE accounts (id varchar(50) PRIMARY KEY, balance bigint)",
        &[],
    )
    .await
    .unwrap();
    (db, file)
}

async fn count_accounts(db: &Db) -> i64 {
    let rows = db
        .query("SELECT count(id) AS n FROM accounts", &[], Some(1))
        .await
        .unwrap();
    rows[0].get_i64("n").unwrap()
}

#[tokio::test]
async fn test_non_autocommit_mutation_commits_on_success() {
    let (db, _file) = setup(2).await;

    let affected = db
        .mutate_with(
            "INSERT INTO accounts (id, balance) VALUES (?, ?)",
            &[SqlValue::from("a1"), SqlValue::Int(100)],
            false,
        )
        .await
        .unwrap();
    assert_eq!(affected, 1);

    // Visible from another connection: the transaction committed.
    assert_eq!(count_accounts(&db).await, 1);
}

#[tokio::test]
async fn test_failed_mutation_rolls_back_and_reraises() {
    let (db, _file) = setup(2).await;

    db.mutate_with(
        "INSERT INTO accounts (id, balance) VALUES (?, ?)",
        &[SqlValue::from("a1"), SqlValue::Int(100)],
        false,
    )
    .await
    .unwrap();

    // A multi-row insert whose last row violates the primary key: the
    // statement fails and the transaction rolls back, so neither row lands.
    let result = db
        .mutate_with(
            "INSERT INTO accounts (id, balance) VALUES (?, ?), (?, ?)",
            &[
                SqlValue::from("a2"),
                SqlValue::Int(50),
                SqlValue::from("a1"),
                SqlValue::Int(75),
            ],
            false,
        )
        .await;

    // The original database error propagates, not a rollback artifact.
    match result {
        Err(OrmError::Database { message, .. }) => {
            assert!(message.to_lowercase().contains("unique"), "{message}");
        }
        other => panic!("expected database error, got {other:?}"),
    }

    assert_eq!(count_accounts(&db).await, 1);
}

#[tokio::test]
async fn test_connection_released_after_failed_transaction() {
    // With a single-connection pool, a leaked transaction connection would
    // make any further acquire time out.
    let (db, _file) = setup(1).await;

    db.mutate_with(
        "INSERT INTO accounts (id, balance) VALUES (?, ?)",
        &[SqlValue::from("a1"), SqlValue::Int(100)],
        false,
    )
    .await
    .unwrap();

    let result = db
        .mutate_with(
            "INSERT INTO accounts (id, balance) VALUES (?, ?)",
            &[SqlValue::from("a1"), SqlValue::Int(0)],
            false,
        )
        .await;
    assert!(result.is_err());

    // The connection came back: acquiring and querying both still work.
    let conn = db.acquire().await.unwrap();
    drop(conn);
    assert_eq!(count_accounts(&db).await, 1);
}

#[tokio::test]
async fn test_autocommit_failure_also_releases_connection() {
    let (db, _file) = setup(1).await;

    db.mutate(
        "INSERT INTO accounts (id, balance) VALUES (?, ?)",
        &[SqlValue::from("a1"), SqlValue::Int(100)],
    )
    .await
    .unwrap();

    let result = db
        .mutate(
            "INSERT INTO accounts (id, balance) VALUES (?, ?)",
            &[SqlValue::from("a1"), SqlValue::Int(0)],
        )
        .await;
    assert!(matches!(result, Err(OrmError::Database { .. })));

    assert_eq!(count_accounts(&db).await, 1);
}
