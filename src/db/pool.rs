//! Connection pool management.
//!
//! One [`Db`] handle owns one bounded pool of live connections for a single
//! database, created by [`Db::connect`] and torn down by [`Db::close`]. The
//! handle is passed by reference to every operation; there is no process
//! global. Database-specific pools (MySqlPool, PgPool, SqlitePool) are used
//! directly to keep full type support.

use crate::config::PoolConfig;
use crate::db::DatabaseType;
use crate::db::executor::Executor;
use crate::error::{OrmError, OrmResult};
use crate::models::{Row, SqlValue};
use sqlx::{
    MySql, MySqlPool, PgPool, Postgres, Sqlite, SqlitePool, mysql::MySqlConnectOptions,
    mysql::MySqlPoolOptions, postgres::PgConnectOptions, postgres::PgPoolOptions,
    sqlite::SqliteConnectOptions, sqlite::SqlitePoolOptions,
};
use tracing::{debug, info};

/// Database-specific connection pool.
#[derive(Debug, Clone)]
pub enum DbPool {
    MySql(MySqlPool),
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

impl DbPool {
    /// Get the database type for this pool.
    pub fn db_type(&self) -> DatabaseType {
        match self {
            DbPool::MySql(_) => DatabaseType::MySql,
            DbPool::Postgres(_) => DatabaseType::Postgres,
            DbPool::Sqlite(_) => DatabaseType::Sqlite,
        }
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        match self {
            DbPool::MySql(pool) => pool.close().await,
            DbPool::Postgres(pool) => pool.close().await,
            DbPool::Sqlite(pool) => pool.close().await,
        }
    }

    /// Current number of connections, idle or checked out.
    pub fn size(&self) -> u32 {
        match self {
            DbPool::MySql(pool) => pool.size(),
            DbPool::Postgres(pool) => pool.size(),
            DbPool::Sqlite(pool) => pool.size(),
        }
    }

    /// Number of connections currently idle in the pool.
    pub fn num_idle(&self) -> usize {
        match self {
            DbPool::MySql(pool) => pool.num_idle(),
            DbPool::Postgres(pool) => pool.num_idle(),
            DbPool::Sqlite(pool) => pool.num_idle(),
        }
    }
}

/// A checked-out connection. Held for the duration of one logical operation
/// and returned to the pool on drop, on every exit path.
pub enum PooledConnection {
    MySql(sqlx::pool::PoolConnection<MySql>),
    Postgres(sqlx::pool::PoolConnection<Postgres>),
    Sqlite(sqlx::pool::PoolConnection<Sqlite>),
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match self {
            PooledConnection::MySql(_) => "MySql",
            PooledConnection::Postgres(_) => "Postgres",
            PooledConnection::Sqlite(_) => "Sqlite",
        };
        f.debug_tuple("PooledConnection").field(&backend).finish()
    }
}

/// Handle to one database: the pool, the execution engine, and the
/// configured autocommit default.
#[derive(Debug, Clone)]
pub struct Db {
    pool: DbPool,
    executor: Executor,
    autocommit: bool,
    acquire_timeout_secs: u64,
}

impl Db {
    /// Open a connection pool for the given configuration.
    ///
    /// Fatal when the database is unreachable at the configured
    /// host/port/credentials, or when the pool bounds are invalid.
    pub async fn connect(config: PoolConfig) -> OrmResult<Self> {
        config.validate()?;

        info!(
            db_type = %config.db_type,
            host = %config.host,
            db = %config.db,
            minsize = config.minsize,
            maxsize = config.maxsize,
            "creating database connection pool"
        );

        let pool = create_pool(&config).await?;

        Ok(Self {
            pool,
            executor: Executor::new(),
            autocommit: config.autocommit,
            acquire_timeout_secs: config.acquire_timeout_secs,
        })
    }

    pub fn db_type(&self) -> DatabaseType {
        self.pool.db_type()
    }

    /// The underlying pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Current number of connections, idle or checked out.
    pub fn pool_size(&self) -> u32 {
        self.pool.size()
    }

    /// Number of connections currently idle in the pool.
    pub fn idle_connections(&self) -> usize {
        self.pool.num_idle()
    }

    /// Check out a connection. Suspends while the pool is exhausted and at
    /// its ceiling; gives up after the configured acquire timeout.
    pub async fn acquire(&self) -> OrmResult<PooledConnection> {
        let result = match &self.pool {
            DbPool::MySql(pool) => pool.acquire().await.map(PooledConnection::MySql),
            DbPool::Postgres(pool) => pool.acquire().await.map(PooledConnection::Postgres),
            DbPool::Sqlite(pool) => pool.acquire().await.map(PooledConnection::Sqlite),
        };
        result.map_err(|e| match e {
            sqlx::Error::PoolTimedOut => {
                OrmError::timeout("connection pool acquire", self.acquire_timeout_secs)
            }
            other => OrmError::from(other),
        })
    }

    /// Execute a SELECT statement, returning at most `row_limit` rows when
    /// given. Read-only; never opens a transaction.
    pub async fn query(
        &self,
        sql: &str,
        args: &[SqlValue],
        row_limit: Option<usize>,
    ) -> OrmResult<Vec<Row>> {
        self.executor.query(&self.pool, sql, args, row_limit).await
    }

    /// Execute an INSERT/UPDATE/DELETE statement under the pool's configured
    /// autocommit default, returning the affected-row count.
    pub async fn mutate(&self, sql: &str, args: &[SqlValue]) -> OrmResult<u64> {
        self.executor
            .mutate(&self.pool, sql, args, self.autocommit)
            .await
    }

    /// Execute a mutation with an explicit autocommit mode. With autocommit
    /// off the statement runs inside a transaction that commits on success
    /// and rolls back on any execution error before the error propagates.
    pub async fn mutate_with(
        &self,
        sql: &str,
        args: &[SqlValue],
        autocommit: bool,
    ) -> OrmResult<u64> {
        self.executor
            .mutate(&self.pool, sql, args, autocommit)
            .await
    }

    /// Close the pool. In-flight operations fail afterwards.
    pub async fn close(&self) {
        debug!(db_type = %self.db_type(), "closing database connection pool");
        self.pool.close().await;
    }
}

/// Create a connection pool for the given configuration.
async fn create_pool(config: &PoolConfig) -> OrmResult<DbPool> {
    let connect_failed =
        |e: sqlx::Error| OrmError::connection(format!("Failed to connect: {}", e));

    match config.db_type {
        DatabaseType::MySql => {
            let options = MySqlConnectOptions::new()
                .host(&config.host)
                .port(config.port)
                .username(&config.user)
                .password(&config.password)
                .database(&config.db)
                .charset(&config.charset);

            let pool = MySqlPoolOptions::new()
                .min_connections(config.minsize)
                .max_connections(config.maxsize)
                .acquire_timeout(config.acquire_timeout())
                .connect_with(options)
                .await
                .map_err(connect_failed)?;
            Ok(DbPool::MySql(pool))
        }
        DatabaseType::Postgres => {
            let options = PgConnectOptions::new()
                .host(&config.host)
                .port(config.port)
                .username(&config.user)
                .password(&config.password)
                .database(&config.db);

            let pool = PgPoolOptions::new()
                .min_connections(config.minsize)
                .max_connections(config.maxsize)
                .acquire_timeout(config.acquire_timeout())
                .connect_with(options)
                .await
                .map_err(connect_failed)?;
            Ok(DbPool::Postgres(pool))
        }
        DatabaseType::Sqlite => {
            let options = SqliteConnectOptions::new()
                .filename(&config.db)
                .create_if_missing(true);

            let pool = SqlitePoolOptions::new()
                .min_connections(config.minsize)
                .max_connections(config.maxsize)
                .acquire_timeout(config.acquire_timeout())
                .connect_with(options)
                .await
                .map_err(connect_failed)?;
            Ok(DbPool::Sqlite(pool))
        }
    }
}
