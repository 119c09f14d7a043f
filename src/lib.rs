//! tinyorm
//!
//! A minimal asynchronous ORM: table schemas are declared once per mapped
//! type and compiled into statement templates, a bounded connection pool
//! backs the execution engine, and mapped types get single-table CRUD with
//! WHERE/ORDER BY/LIMIT support over MySQL, PostgreSQL, or SQLite.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod orm;

pub use config::PoolConfig;
pub use db::{DatabaseType, Db};
pub use error::{OrmError, OrmResult};
pub use models::{FieldDescriptor, Limit, Row, SqlValue, TableSchema};
pub use orm::Model;
