//! Table schemas compiled from field declarations.
//!
//! [`TableSchemaBuilder`] runs once per mapped type: it walks the declared
//! field descriptors in order, checks the primary-key invariant, resolves
//! column names, and pre-builds the four canonical statement templates. The
//! resulting [`TableSchema`] is immutable and meant to live in a static.

use crate::error::{OrmError, OrmResult};
use crate::models::field::FieldDescriptor;
use indexmap::IndexMap;

/// Compiled metadata and statement templates for one mapped table.
#[derive(Debug, Clone)]
pub struct TableSchema {
    table: String,
    primary_key: String,
    columns: Vec<String>,
    fields: IndexMap<String, FieldDescriptor>,
    select_sql: String,
    insert_sql: String,
    update_sql: String,
    delete_sql: String,
}

impl TableSchema {
    /// Start declaring a schema for the given table.
    pub fn builder(table: impl Into<String>) -> TableSchemaBuilder {
        TableSchemaBuilder {
            table: table.into(),
            fields: Vec::new(),
        }
    }

    /// Table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Attribute name of the primary key.
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Column name of the primary key.
    pub fn primary_key_column(&self) -> &str {
        self.column_name(&self.primary_key)
    }

    /// Non-key attribute names, in declaration order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Descriptor for a declared attribute. Panics on unknown attributes;
    /// callers iterate the schema's own attribute lists.
    pub fn field(&self, attr: &str) -> &FieldDescriptor {
        &self.fields[attr]
    }

    /// Column name for an attribute (descriptor override or the attribute
    /// name itself).
    pub fn column_name<'a>(&'a self, attr: &'a str) -> &'a str {
        self.fields[attr].column_name(attr)
    }

    pub fn select_sql(&self) -> &str {
        &self.select_sql
    }

    pub fn insert_sql(&self) -> &str {
        &self.insert_sql
    }

    pub fn update_sql(&self) -> &str {
        &self.update_sql
    }

    pub fn delete_sql(&self) -> &str {
        &self.delete_sql
    }
}

/// Collects field declarations and compiles them into a [`TableSchema`].
pub struct TableSchemaBuilder {
    table: String,
    fields: Vec<(String, FieldDescriptor)>,
}

impl TableSchemaBuilder {
    /// Declare one attribute. Declaration order is the column order used by
    /// every generated statement.
    pub fn field(mut self, attr: impl Into<String>, descriptor: FieldDescriptor) -> Self {
        self.fields.push((attr.into(), descriptor));
        self
    }

    /// Compile the schema. Fails when the declaration names zero or more
    /// than one primary key.
    pub fn build(self) -> OrmResult<TableSchema> {
        let mut primary_key: Option<String> = None;
        let mut columns = Vec::new();

        for (attr, descriptor) in &self.fields {
            if descriptor.is_primary_key() {
                if let Some(existing) = &primary_key {
                    return Err(OrmError::declaration(
                        &self.table,
                        format!("duplicate primary key fields '{existing}' and '{attr}'"),
                    ));
                }
                primary_key = Some(attr.clone());
            } else {
                columns.push(attr.clone());
            }
        }

        let Some(primary_key) = primary_key else {
            return Err(OrmError::declaration(
                &self.table,
                "no primary key declared",
            ));
        };

        let fields: IndexMap<String, FieldDescriptor> = self.fields.into_iter().collect();
        let table = self.table;

        let column_name =
            |attr: &String| -> String { fields[attr.as_str()].column_name(attr).to_string() };

        let pk_column = column_name(&primary_key);
        let non_key: Vec<String> = columns.iter().map(column_name).collect();

        let mut select_columns = vec![pk_column.clone()];
        select_columns.extend(non_key.iter().cloned());
        let select_sql = format!("SELECT {} FROM {}", select_columns.join(", "), table);

        let mut insert_columns = non_key.clone();
        insert_columns.push(pk_column.clone());
        let placeholders = vec!["?"; insert_columns.len()].join(", ");
        let insert_sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            insert_columns.join(", "),
            placeholders
        );

        let assignments: Vec<String> = non_key.iter().map(|c| format!("{c} = ?")).collect();
        let update_sql = format!(
            "UPDATE {} SET {} WHERE {} = ?",
            table,
            assignments.join(", "),
            pk_column
        );

        let delete_sql = format!("DELETE FROM {} WHERE {} = ?", table, pk_column);

        Ok(TableSchema {
            table,
            primary_key,
            columns,
            fields,
            select_sql,
            insert_sql,
            update_sql,
            delete_sql,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_schema() -> TableSchema {
        TableSchema::builder("users")
            .field(
                "id",
                FieldDescriptor::with_type("varchar(50)").primary_key(),
            )
            .field("name", FieldDescriptor::string())
            .field("email", FieldDescriptor::string())
            .field("passwd", FieldDescriptor::string())
            .field("image", FieldDescriptor::string())
            .build()
            .unwrap()
    }

    #[test]
    fn test_registration_collects_metadata() {
        let schema = user_schema();
        assert_eq!(schema.table(), "users");
        assert_eq!(schema.primary_key(), "id");
        assert_eq!(schema.columns(), &["name", "email", "passwd", "image"]);
        assert_eq!(schema.field("id").column_type(), "varchar(50)");
    }

    #[test]
    fn test_select_template_pk_first_then_declaration_order() {
        let schema = user_schema();
        assert_eq!(
            schema.select_sql(),
            "SELECT id, name, email, passwd, image FROM users"
        );
    }

    #[test]
    fn test_insert_template_pk_last() {
        let schema = user_schema();
        assert_eq!(
            schema.insert_sql(),
            "INSERT INTO users (name, email, passwd, image, id) VALUES (?, ?, ?, ?, ?)"
        );
    }

    #[test]
    fn test_update_template_non_key_columns_only() {
        let schema = user_schema();
        assert_eq!(
            schema.update_sql(),
            "UPDATE users SET name = ?, email = ?, passwd = ?, image = ? WHERE id = ?"
        );
    }

    #[test]
    fn test_delete_template() {
        let schema = user_schema();
        assert_eq!(schema.delete_sql(), "DELETE FROM users WHERE id = ?");
    }

    #[test]
    fn test_missing_primary_key_is_declaration_error() {
        let result = TableSchema::builder("tags")
            .field("label", FieldDescriptor::string())
            .build();
        match result {
            Err(OrmError::Declaration { table, message }) => {
                assert_eq!(table, "tags");
                assert!(message.contains("no primary key"));
            }
            other => panic!("expected declaration error, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_primary_key_is_declaration_error() {
        let result = TableSchema::builder("pairs")
            .field("a", FieldDescriptor::integer().primary_key())
            .field("b", FieldDescriptor::integer().primary_key())
            .build();
        match result {
            Err(OrmError::Declaration { message, .. }) => {
                assert!(message.contains("'a'"));
                assert!(message.contains("'b'"));
            }
            other => panic!("expected declaration error, got {other:?}"),
        }
    }

    #[test]
    fn test_column_name_override_flows_into_templates() {
        let schema = TableSchema::builder("blogs")
            .field("id", FieldDescriptor::string().primary_key())
            .field("user_id", FieldDescriptor::string().column("author_id"))
            .build()
            .unwrap();
        assert_eq!(schema.column_name("user_id"), "author_id");
        assert_eq!(schema.select_sql(), "SELECT id, author_id FROM blogs");
        assert_eq!(
            schema.insert_sql(),
            "INSERT INTO blogs (author_id, id) VALUES (?, ?)"
        );
        assert_eq!(
            schema.update_sql(),
            "UPDATE blogs SET author_id = ? WHERE id = ?"
        );
    }

    #[test]
    fn test_primary_key_column_override() {
        let schema = TableSchema::builder("t")
            .field("key", FieldDescriptor::string().primary_key().column("k"))
            .field("v", FieldDescriptor::text())
            .build()
            .unwrap();
        assert_eq!(schema.primary_key(), "key");
        assert_eq!(schema.primary_key_column(), "k");
        assert_eq!(schema.delete_sql(), "DELETE FROM t WHERE k = ?");
    }
}
