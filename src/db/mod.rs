//! Database access layer: connection pooling, statement execution,
//! placeholder translation, and result-row decoding.

pub mod executor;
pub mod params;
pub mod placeholder;
pub mod pool;
pub mod types;

pub use executor::Executor;
pub use pool::{Db, DbPool, PooledConnection};

/// Database backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    MySql,
    Postgres,
    Sqlite,
}

impl DatabaseType {
    /// Backend for a connection URL scheme.
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        let lower = scheme.to_ascii_lowercase();
        match lower.as_str() {
            "mysql" => Some(Self::MySql),
            "postgres" | "postgresql" => Some(Self::Postgres),
            s if s.starts_with("sqlite") => Some(Self::Sqlite),
            _ => None,
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MySql => write!(f, "mysql"),
            Self::Postgres => write!(f, "postgresql"),
            Self::Sqlite => write!(f, "sqlite"),
        }
    }
}
