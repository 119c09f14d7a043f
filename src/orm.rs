//! Record façade: mapped types and their CRUD operations.
//!
//! A mapped type declares its fields once, compiles them into a
//! [`TableSchema`] held in a static, and implements [`Model`] to move values
//! between the struct and the attribute-bag [`Row`] form. The finder and
//! persistence operations are provided by the trait and run entirely on the
//! schema's pre-built statement templates.
//!
//! ```ignore
//! struct User {
//!     id: Option<String>,
//!     name: Option<String>,
//! }
//!
//! static USER_SCHEMA: LazyLock<TableSchema> = LazyLock::new(|| {
//!     TableSchema::builder("users")
//!         .field("id", FieldDescriptor::string().primary_key())
//!         .field("name", FieldDescriptor::string())
//!         .build()
//!         .expect("valid users schema")
//! });
//!
//! impl Model for User {
//!     fn schema() -> &'static TableSchema { &USER_SCHEMA }
//!     // from_row / get / set move values between struct and Row
//! }
//! ```

use crate::db::Db;
use crate::error::OrmResult;
use crate::models::{Limit, Row, SqlValue, TableSchema};
use tracing::warn;

/// One mapped table row as a typed struct.
///
/// Implementors provide the compiled schema and the value plumbing; the
/// trait provides the class-level finders and instance-level persistence.
#[allow(async_fn_in_trait)]
pub trait Model: Sized {
    /// Compiled schema for this model's table, built once.
    fn schema() -> &'static TableSchema;

    /// Materialize one instance from a result row.
    fn from_row(row: &Row) -> OrmResult<Self>;

    /// Current value of a mapped attribute, `None` when unset.
    fn get(&self, attr: &str) -> Option<SqlValue>;

    /// Store a value for a mapped attribute.
    fn set(&mut self, attr: &str, value: SqlValue);

    /// Value of `attr`, falling back to the field's declared default. A
    /// resolved default is written back onto the record so repeated reads
    /// are stable; without a default the attribute resolves to NULL.
    fn value_or_default(&mut self, attr: &str) -> SqlValue {
        if let Some(value) = self.get(attr) {
            return value;
        }
        match Self::schema().field(attr).resolve_default() {
            Some(resolved) => {
                self.set(attr, resolved.clone());
                resolved
            }
            None => SqlValue::Null,
        }
    }

    /// Fetch all rows matching the optional `filter`/`order_by` fragments.
    ///
    /// The fragments are appended verbatim after `WHERE` / `ORDER BY`; they
    /// are caller-supplied SQL, not escaped by this layer. Positional `?`
    /// markers inside `filter` are bound from `args`.
    async fn find_all(
        db: &Db,
        filter: Option<&str>,
        args: &[SqlValue],
        order_by: Option<&str>,
        limit: Option<Limit>,
    ) -> OrmResult<Vec<Self>> {
        let schema = Self::schema();
        let mut sql = schema.select_sql().to_string();
        let mut args = args.to_vec();

        if let Some(filter) = filter {
            sql.push_str(" WHERE ");
            sql.push_str(filter);
        }
        if let Some(order_by) = order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order_by);
        }
        match limit {
            Some(Limit::Count(count)) => {
                sql.push_str(" LIMIT ?");
                args.push(SqlValue::Int(count as i64));
            }
            Some(Limit::Rows { offset, count }) => {
                sql.push_str(" LIMIT ? OFFSET ?");
                args.push(SqlValue::Int(count as i64));
                args.push(SqlValue::Int(offset as i64));
            }
            None => {}
        }

        let rows = db.query(&sql, &args, None).await?;
        rows.iter().map(Self::from_row).collect()
    }

    /// Evaluate an aggregate select expression (e.g. `count(id)`) over the
    /// table, returning the value or `None` when no row matched.
    async fn find_count(
        db: &Db,
        select_expr: &str,
        filter: Option<&str>,
        args: &[SqlValue],
    ) -> OrmResult<Option<i64>> {
        let schema = Self::schema();
        let mut sql = format!("SELECT {} AS _num_ FROM {}", select_expr, schema.table());
        if let Some(filter) = filter {
            sql.push_str(" WHERE ");
            sql.push_str(filter);
        }

        let rows = db.query(&sql, args, Some(1)).await?;
        match rows.first() {
            Some(row) => Ok(row.get("_num_").and_then(SqlValue::as_i64)),
            None => Ok(None),
        }
    }

    /// Fetch the row with the given primary key value.
    async fn find_by_key(db: &Db, pk: impl Into<SqlValue>) -> OrmResult<Option<Self>> {
        let schema = Self::schema();
        let sql = format!(
            "{} WHERE {} = ?",
            schema.select_sql(),
            schema.primary_key_column()
        );
        let rows = db.query(&sql, &[pk.into()], Some(1)).await?;
        rows.first().map(Self::from_row).transpose()
    }

    /// Insert this record. Unset attributes resolve to their declared
    /// defaults (factories invoked) and the resolved values are persisted
    /// back onto the record. Returns the affected-row count; a count other
    /// than 1 is reported as a warning, not an error.
    async fn save(&mut self, db: &Db) -> OrmResult<u64> {
        let schema = Self::schema();
        let mut args = Vec::with_capacity(schema.columns().len() + 1);
        for attr in schema.columns() {
            args.push(self.value_or_default(attr));
        }
        args.push(self.value_or_default(schema.primary_key()));

        let rows_affected = db.mutate(schema.insert_sql(), &args).await?;
        if rows_affected != 1 {
            warn!(
                table = schema.table(),
                rows_affected, "insert affected an unexpected number of rows"
            );
        }
        Ok(rows_affected)
    }

    /// Update the row with this record's primary key using current values
    /// only; unset attributes are written as NULL, not their defaults.
    async fn update(&self, db: &Db) -> OrmResult<u64> {
        let schema = Self::schema();
        let mut args = Vec::with_capacity(schema.columns().len() + 1);
        for attr in schema.columns() {
            args.push(self.get(attr).unwrap_or(SqlValue::Null));
        }
        args.push(self.get(schema.primary_key()).unwrap_or(SqlValue::Null));

        let rows_affected = db.mutate(schema.update_sql(), &args).await?;
        if rows_affected != 1 {
            warn!(
                table = schema.table(),
                rows_affected, "update affected an unexpected number of rows"
            );
        }
        Ok(rows_affected)
    }

    /// Delete the row with this record's primary key.
    async fn remove(&self, db: &Db) -> OrmResult<u64> {
        let schema = Self::schema();
        let pk = self.get(schema.primary_key()).unwrap_or(SqlValue::Null);

        let rows_affected = db.mutate(schema.delete_sql(), &[pk]).await?;
        if rows_affected != 1 {
            warn!(
                table = schema.table(),
                rows_affected, "delete affected an unexpected number of rows"
            );
        }
        Ok(rows_affected)
    }
}
