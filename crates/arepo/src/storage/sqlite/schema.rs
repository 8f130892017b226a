//! SQLite schema definitions and SQL statements.
//!
//! Every collection is a table of JSON bodies keyed by `_id`. The `ord`
//! column records insertion order so unsorted reads are stable. Statements
//! are built per collection because table names cannot be bound as
//! parameters; names are validated before they reach any statement.

use arepo_core::storage::{RepositoryError, Result};

/// Checks that a collection name is a plain SQL identifier.
pub fn validate_collection(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_start && valid_rest && !name.starts_with("sqlite_") {
        Ok(())
    } else {
        Err(RepositoryError::InvalidData(format!(
            "invalid collection name: {name:?}"
        )))
    }
}

pub fn create_table(table: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS "{table}" (
    _id TEXT PRIMARY KEY,
    ord INTEGER NOT NULL,
    body TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS "idx_{table}_ord" ON "{table}"(ord);
"#
    )
}

pub fn insert(table: &str) -> String {
    format!(
        r#"
INSERT INTO "{table}" (_id, ord, body)
VALUES (?1, (SELECT COALESCE(MAX(ord), 0) + 1 FROM "{table}"), ?2)
"#
    )
}

pub fn select_all(table: &str) -> String {
    format!(
        r#"
SELECT body
FROM "{table}"
ORDER BY ord ASC
"#
    )
}

pub fn select_by_id(table: &str) -> String {
    format!(
        r#"
SELECT body
FROM "{table}"
WHERE _id = ?1
"#
    )
}

pub fn update_body(table: &str) -> String {
    format!(
        r#"
UPDATE "{table}"
SET body = ?2
WHERE _id = ?1
"#
    )
}

pub fn delete_by_id(table: &str) -> String {
    format!(
        r#"
DELETE FROM "{table}"
WHERE _id = ?1
"#
    )
}
