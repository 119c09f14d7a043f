//! Per-column field descriptors.
//!
//! A [`FieldDescriptor`] declares one mapped column: an optional column-name
//! override, the storage type, the primary-key flag, and a default supplied
//! either as a fixed value or as a nullary factory invoked at save time.

use crate::models::value::SqlValue;
use std::fmt;

/// Default for a column left unset at save time.
#[derive(Clone)]
pub enum FieldDefault {
    /// No default; an unset attribute resolves to NULL.
    None,
    /// Fixed value.
    Value(SqlValue),
    /// Nullary factory invoked once per save.
    Factory(fn() -> SqlValue),
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Value(v) => write!(f, "Value({v:?})"),
            Self::Factory(_) => write!(f, "Factory(..)"),
        }
    }
}

/// Declaration of one mapped column.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    column: Option<String>,
    column_type: String,
    primary_key: bool,
    default: FieldDefault,
}

impl FieldDescriptor {
    /// Field with an explicit storage type.
    pub fn with_type(column_type: impl Into<String>) -> Self {
        Self {
            column: None,
            column_type: column_type.into(),
            primary_key: false,
            default: FieldDefault::None,
        }
    }

    /// `varchar(100)` string field.
    pub fn string() -> Self {
        Self::with_type("varchar(100)")
    }

    /// `text` field.
    pub fn text() -> Self {
        Self::with_type("text")
    }

    /// `bigint` integer field.
    pub fn integer() -> Self {
        Self::with_type("bigint")
    }

    /// `real` float field.
    pub fn float() -> Self {
        Self::with_type("real")
    }

    /// `boolean` field.
    pub fn boolean() -> Self {
        Self::with_type("boolean")
    }

    /// Mark this field as the primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Override the column name (otherwise the attribute name is used).
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.column = Some(name.into());
        self
    }

    /// Fixed default value.
    pub fn default_value(mut self, value: impl Into<SqlValue>) -> Self {
        self.default = FieldDefault::Value(value.into());
        self
    }

    /// Factory default, invoked when an unset attribute is saved.
    pub fn default_factory(mut self, factory: fn() -> SqlValue) -> Self {
        self.default = FieldDefault::Factory(factory);
        self
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn column_type(&self) -> &str {
        &self.column_type
    }

    pub fn has_default(&self) -> bool {
        !matches!(self.default, FieldDefault::None)
    }

    /// Column name for this field: the explicit override if declared, else
    /// the attribute name the schema declared it under.
    pub fn column_name<'a>(&'a self, attr: &'a str) -> &'a str {
        self.column.as_deref().unwrap_or(attr)
    }

    /// Resolve the default, invoking a factory if one was declared.
    pub fn resolve_default(&self) -> Option<SqlValue> {
        match &self.default {
            FieldDefault::None => None,
            FieldDefault::Value(v) => Some(v.clone()),
            FieldDefault::Factory(f) => Some(f()),
        }
    }
}
