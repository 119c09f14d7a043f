//! Driver-neutral positional placeholders.
//!
//! Statement templates use `?` as the positional marker regardless of
//! backend. Immediately before execution the marker is rewritten to the
//! driver's native syntax: `?` stays as-is for MySQL and SQLite, PostgreSQL
//! gets `$1..$n`. Argument count is checked against the marker count here,
//! so a mismatch surfaces before the statement reaches the wire.

use crate::db::DatabaseType;
use crate::error::{OrmError, OrmResult};

/// The neutral positional marker used by all generated templates.
pub const MARKER: char = '?';

/// Number of positional markers in a statement.
pub fn count(sql: &str) -> usize {
    sql.chars().filter(|&c| c == MARKER).count()
}

/// Validate the argument count and translate the statement to the backend's
/// native placeholder syntax.
pub fn expand(sql: &str, arg_count: usize, db_type: DatabaseType) -> OrmResult<String> {
    let markers = count(sql);
    if markers != arg_count {
        return Err(OrmError::invalid_argument(format!(
            "statement expects {markers} parameters, {arg_count} provided: {sql}"
        )));
    }

    match db_type {
        DatabaseType::MySql | DatabaseType::Sqlite => Ok(sql.to_string()),
        DatabaseType::Postgres => {
            let mut out = String::with_capacity(sql.len() + arg_count);
            let mut next = 0usize;
            for ch in sql.chars() {
                if ch == MARKER {
                    next += 1;
                    out.push('$');
                    out.push_str(&next.to_string());
                } else {
                    out.push(ch);
                }
            }
            Ok(out)
        }
    }
}
