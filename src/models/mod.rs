//! Data model: column values, result rows, field descriptors, and compiled
//! table schemas.

pub mod field;
pub mod schema;
pub mod value;

pub use field::{FieldDefault, FieldDescriptor};
pub use schema::{TableSchema, TableSchemaBuilder};
pub use value::{Limit, Row, SqlValue};
