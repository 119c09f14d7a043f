//! SQL execution engine.
//!
//! Two operations: `query` for parameterized SELECTs (optionally bounded to
//! a row limit, enforced via streaming so only the needed rows are fetched)
//! and `mutate` for INSERT/UPDATE/DELETE, either autocommitted or wrapped in
//! an explicit transaction that rolls back on any execution error before the
//! error propagates. Every round-trip is bounded by a statement timeout.
//!
//! The executor uses database-specific implementations organized in
//! submodules, each providing identical functionality adapted to the
//! backend's type system.

use crate::db::placeholder;
use crate::db::pool::DbPool;
use crate::db::types::ToRow;
use crate::error::{OrmError, OrmResult};
use crate::models::{Row, SqlValue};
use futures_util::StreamExt;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Default per-statement timeout in seconds.
pub const DEFAULT_STATEMENT_TIMEOUT_SECS: u64 = 30;

/// Statement execution engine bound to no particular pool.
#[derive(Debug, Clone)]
pub struct Executor {
    statement_timeout: Duration,
}

impl Executor {
    /// Create an executor with the default statement timeout.
    pub fn new() -> Self {
        Self {
            statement_timeout: Duration::from_secs(DEFAULT_STATEMENT_TIMEOUT_SECS),
        }
    }

    /// Create an executor with a custom statement timeout.
    pub fn with_timeout(statement_timeout: Duration) -> Self {
        Self { statement_timeout }
    }

    /// Execute a SELECT statement and return its rows as attribute bags.
    ///
    /// With `row_limit = Some(n)` at most `n` rows are fetched. Read-only;
    /// never opens a transaction.
    pub async fn query(
        &self,
        pool: &DbPool,
        sql: &str,
        args: &[SqlValue],
        row_limit: Option<usize>,
    ) -> OrmResult<Vec<Row>> {
        let statement = placeholder::expand(sql, args.len(), pool.db_type())?;

        debug!(
            sql = %statement,
            params = args.len(),
            limit = ?row_limit,
            "executing query"
        );

        let rows: Vec<Row> = match pool {
            DbPool::MySql(p) => {
                mysql::fetch_rows(p, &statement, args, row_limit, self.statement_timeout)
                    .await?
                    .iter()
                    .map(ToRow::to_row)
                    .collect()
            }
            DbPool::Postgres(p) => {
                postgres::fetch_rows(p, &statement, args, row_limit, self.statement_timeout)
                    .await?
                    .iter()
                    .map(ToRow::to_row)
                    .collect()
            }
            DbPool::Sqlite(p) => {
                sqlite::fetch_rows(p, &statement, args, row_limit, self.statement_timeout)
                    .await?
                    .iter()
                    .map(ToRow::to_row)
                    .collect()
            }
        };

        debug!(rows = rows.len(), "query returned");
        Ok(rows)
    }

    /// Execute a mutation and return the affected-row count.
    ///
    /// With `autocommit` the statement commits on its own. Otherwise a
    /// transaction is opened first; it commits on success, and on any
    /// execution error it rolls back before the original error is re-raised.
    /// The connection returns to the pool on every path.
    pub async fn mutate(
        &self,
        pool: &DbPool,
        sql: &str,
        args: &[SqlValue],
        autocommit: bool,
    ) -> OrmResult<u64> {
        let statement = placeholder::expand(sql, args.len(), pool.db_type())?;

        debug!(
            sql = %statement,
            params = args.len(),
            autocommit = autocommit,
            "executing mutation"
        );

        let rows_affected = match (pool, autocommit) {
            (DbPool::MySql(p), true) => {
                mysql::execute_write(p, &statement, args, self.statement_timeout).await?
            }
            (DbPool::MySql(p), false) => {
                mysql::execute_transactional(p, &statement, args, self.statement_timeout).await?
            }
            (DbPool::Postgres(p), true) => {
                postgres::execute_write(p, &statement, args, self.statement_timeout).await?
            }
            (DbPool::Postgres(p), false) => {
                postgres::execute_transactional(p, &statement, args, self.statement_timeout)
                    .await?
            }
            (DbPool::Sqlite(p), true) => {
                sqlite::execute_write(p, &statement, args, self.statement_timeout).await?
            }
            (DbPool::Sqlite(p), false) => {
                sqlite::execute_transactional(p, &statement, args, self.statement_timeout).await?
            }
        };

        debug!(rows_affected = rows_affected, "mutation executed");
        Ok(rows_affected)
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_rows<R>(results: Vec<Result<R, sqlx::Error>>) -> OrmResult<Vec<R>> {
    let mut rows = Vec::with_capacity(results.len());
    for result in results {
        rows.push(result.map_err(OrmError::from)?);
    }
    Ok(rows)
}

fn timeout_error(operation: &str, elapsed: Duration) -> OrmError {
    OrmError::timeout(operation, elapsed.as_secs())
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================
//
// Each module below provides the same interface adapted to its backend.
// The code structure is intentionally parallel to make differences obvious.

mod mysql {
    use super::*;
    use crate::db::params::bind_mysql_value;
    use sqlx::MySqlPool;
    use sqlx::mysql::MySqlRow;

    pub async fn fetch_rows(
        pool: &MySqlPool,
        sql: &str,
        args: &[SqlValue],
        row_limit: Option<usize>,
        statement_timeout: Duration,
    ) -> OrmResult<Vec<MySqlRow>> {
        if let Some(limit) = row_limit {
            // Stream and take only the needed rows.
            let results = if args.is_empty() {
                use sqlx::Executor;
                let stream = pool.fetch(sql);
                timeout(statement_timeout, stream.take(limit).collect::<Vec<_>>()).await
            } else {
                let mut query = sqlx::query(sql);
                for value in args {
                    query = bind_mysql_value(query, value);
                }
                let stream = query.fetch(pool);
                timeout(statement_timeout, stream.take(limit).collect::<Vec<_>>()).await
            };
            match results {
                Ok(results) => collect_rows(results),
                Err(_) => Err(timeout_error("query execution", statement_timeout)),
            }
        } else {
            let result = if args.is_empty() {
                use sqlx::Executor;
                timeout(statement_timeout, pool.fetch_all(sql)).await
            } else {
                let mut query = sqlx::query(sql);
                for value in args {
                    query = bind_mysql_value(query, value);
                }
                timeout(statement_timeout, query.fetch_all(pool)).await
            };
            match result {
                Ok(Ok(rows)) => Ok(rows),
                Ok(Err(e)) => Err(OrmError::from(e)),
                Err(_) => Err(timeout_error("query execution", statement_timeout)),
            }
        }
    }

    pub async fn execute_write(
        pool: &MySqlPool,
        sql: &str,
        args: &[SqlValue],
        statement_timeout: Duration,
    ) -> OrmResult<u64> {
        // When args is empty, execute raw SQL directly; some statements
        // (DDL among them) do not support prepared execution everywhere.
        let result = if args.is_empty() {
            use sqlx::Executor;
            timeout(statement_timeout, pool.execute(sql)).await
        } else {
            let mut query = sqlx::query(sql);
            for value in args {
                query = bind_mysql_value(query, value);
            }
            timeout(statement_timeout, query.execute(pool)).await
        };

        match result {
            Ok(Ok(r)) => Ok(r.rows_affected()),
            Ok(Err(e)) => Err(OrmError::from(e)),
            Err(_) => Err(timeout_error("write operation", statement_timeout)),
        }
    }

    pub async fn execute_transactional(
        pool: &MySqlPool,
        sql: &str,
        args: &[SqlValue],
        statement_timeout: Duration,
    ) -> OrmResult<u64> {
        let mut tx = pool.begin().await.map_err(OrmError::from)?;

        let result = if args.is_empty() {
            use sqlx::Executor;
            timeout(statement_timeout, (&mut *tx).execute(sql)).await
        } else {
            let mut query = sqlx::query(sql);
            for value in args {
                query = bind_mysql_value(query, value);
            }
            timeout(statement_timeout, query.execute(&mut *tx)).await
        };

        match result {
            Ok(Ok(r)) => {
                let rows_affected = r.rows_affected();
                tx.commit().await.map_err(OrmError::from)?;
                Ok(rows_affected)
            }
            Ok(Err(e)) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "rollback failed after execution error");
                }
                Err(OrmError::from(e))
            }
            Err(_) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "rollback failed after timeout");
                }
                Err(timeout_error("write operation", statement_timeout))
            }
        }
    }
}

mod postgres {
    use super::*;
    use crate::db::params::bind_postgres_value;
    use sqlx::PgPool;
    use sqlx::postgres::PgRow;

    pub async fn fetch_rows(
        pool: &PgPool,
        sql: &str,
        args: &[SqlValue],
        row_limit: Option<usize>,
        statement_timeout: Duration,
    ) -> OrmResult<Vec<PgRow>> {
        if let Some(limit) = row_limit {
            let results = if args.is_empty() {
                use sqlx::Executor;
                let stream = pool.fetch(sql);
                timeout(statement_timeout, stream.take(limit).collect::<Vec<_>>()).await
            } else {
                let mut query = sqlx::query(sql);
                for value in args {
                    query = bind_postgres_value(query, value);
                }
                let stream = query.fetch(pool);
                timeout(statement_timeout, stream.take(limit).collect::<Vec<_>>()).await
            };
            match results {
                Ok(results) => collect_rows(results),
                Err(_) => Err(timeout_error("query execution", statement_timeout)),
            }
        } else {
            let result = if args.is_empty() {
                use sqlx::Executor;
                timeout(statement_timeout, pool.fetch_all(sql)).await
            } else {
                let mut query = sqlx::query(sql);
                for value in args {
                    query = bind_postgres_value(query, value);
                }
                timeout(statement_timeout, query.fetch_all(pool)).await
            };
            match result {
                Ok(Ok(rows)) => Ok(rows),
                Ok(Err(e)) => Err(OrmError::from(e)),
                Err(_) => Err(timeout_error("query execution", statement_timeout)),
            }
        }
    }

    pub async fn execute_write(
        pool: &PgPool,
        sql: &str,
        args: &[SqlValue],
        statement_timeout: Duration,
    ) -> OrmResult<u64> {
        let result = if args.is_empty() {
            use sqlx::Executor;
            timeout(statement_timeout, pool.execute(sql)).await
        } else {
            let mut query = sqlx::query(sql);
            for value in args {
                query = bind_postgres_value(query, value);
            }
            timeout(statement_timeout, query.execute(pool)).await
        };

        match result {
            Ok(Ok(r)) => Ok(r.rows_affected()),
            Ok(Err(e)) => Err(OrmError::from(e)),
            Err(_) => Err(timeout_error("write operation", statement_timeout)),
        }
    }

    pub async fn execute_transactional(
        pool: &PgPool,
        sql: &str,
        args: &[SqlValue],
        statement_timeout: Duration,
    ) -> OrmResult<u64> {
        let mut tx = pool.begin().await.map_err(OrmError::from)?;

        let result = if args.is_empty() {
            use sqlx::Executor;
            timeout(statement_timeout, (&mut *tx).execute(sql)).await
        } else {
            let mut query = sqlx::query(sql);
            for value in args {
                query = bind_postgres_value(query, value);
            }
            timeout(statement_timeout, query.execute(&mut *tx)).await
        };

        match result {
            Ok(Ok(r)) => {
                let rows_affected = r.rows_affected();
                tx.commit().await.map_err(OrmError::from)?;
                Ok(rows_affected)
            }
            Ok(Err(e)) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "rollback failed after execution error");
                }
                Err(OrmError::from(e))
            }
            Err(_) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "rollback failed after timeout");
                }
                Err(timeout_error("write operation", statement_timeout))
            }
        }
    }
}

mod sqlite {
    use super::*;
    use crate::db::params::bind_sqlite_value;
    use sqlx::SqlitePool;
    use sqlx::sqlite::SqliteRow;

    pub async fn fetch_rows(
        pool: &SqlitePool,
        sql: &str,
        args: &[SqlValue],
        row_limit: Option<usize>,
        statement_timeout: Duration,
    ) -> OrmResult<Vec<SqliteRow>> {
        if let Some(limit) = row_limit {
            let results = if args.is_empty() {
                use sqlx::Executor;
                let stream = pool.fetch(sql);
                timeout(statement_timeout, stream.take(limit).collect::<Vec<_>>()).await
            } else {
                let mut query = sqlx::query(sql);
                for value in args {
                    query = bind_sqlite_value(query, value);
                }
                let stream = query.fetch(pool);
                timeout(statement_timeout, stream.take(limit).collect::<Vec<_>>()).await
            };
            match results {
                Ok(results) => collect_rows(results),
                Err(_) => Err(timeout_error("query execution", statement_timeout)),
            }
        } else {
            let result = if args.is_empty() {
                use sqlx::Executor;
                timeout(statement_timeout, pool.fetch_all(sql)).await
            } else {
                let mut query = sqlx::query(sql);
                for value in args {
                    query = bind_sqlite_value(query, value);
                }
                timeout(statement_timeout, query.fetch_all(pool)).await
            };
            match result {
                Ok(Ok(rows)) => Ok(rows),
                Ok(Err(e)) => Err(OrmError::from(e)),
                Err(_) => Err(timeout_error("query execution", statement_timeout)),
            }
        }
    }

    pub async fn execute_write(
        pool: &SqlitePool,
        sql: &str,
        args: &[SqlValue],
        statement_timeout: Duration,
    ) -> OrmResult<u64> {
        let result = if args.is_empty() {
            use sqlx::Executor;
            timeout(statement_timeout, pool.execute(sql)).await
        } else {
            let mut query = sqlx::query(sql);
            for value in args {
                query = bind_sqlite_value(query, value);
            }
            timeout(statement_timeout, query.execute(pool)).await
        };

        match result {
            Ok(Ok(r)) => Ok(r.rows_affected()),
            Ok(Err(e)) => Err(OrmError::from(e)),
            Err(_) => Err(timeout_error("write operation", statement_timeout)),
        }
    }

    pub async fn execute_transactional(
        pool: &SqlitePool,
        sql: &str,
        args: &[SqlValue],
        statement_timeout: Duration,
    ) -> OrmResult<u64> {
        let mut tx = pool.begin().await.map_err(OrmError::from)?;

        let result = if args.is_empty() {
            use sqlx::Executor;
            timeout(statement_timeout, (&mut *tx).execute(sql)).await
        } else {
            let mut query = sqlx::query(sql);
            for value in args {
                query = bind_sqlite_value(query, value);
            }
            timeout(statement_timeout, query.execute(&mut *tx)).await
        };

        match result {
            Ok(Ok(r)) => {
                let rows_affected = r.rows_affected();
                tx.commit().await.map_err(OrmError::from)?;
                Ok(rows_affected)
            }
            Ok(Err(e)) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "rollback failed after execution error");
                }
                Err(OrmError::from(e))
            }
            Err(_) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "rollback failed after timeout");
                }
                Err(timeout_error("write operation", statement_timeout))
            }
        }
    }
}
