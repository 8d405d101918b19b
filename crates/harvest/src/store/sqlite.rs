//! SQLite-backed table store.
//!
//! The location is the database file path. Each table is written as
//! `Year TEXT`, the entity column as `TEXT` and one `REAL` column per metric,
//! in table order. Years are stored as `YYYY-01-01 00:00:00`.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, OpenFlags, params, params_from_iter};
use tracing::{debug, info};

use super::TableStore;
use crate::error::{HarvestError, Result};
use crate::tidy::{RowKey, TidyTable, YEAR_COLUMN, Year};

/// Stores tables in SQLite database files.
#[derive(Debug, Clone, Default)]
pub struct SqliteStore;

impl SqliteStore {
    pub fn new() -> Self {
        Self
    }

    /// Names of the tables in a database, sorted.
    pub fn table_names(&self, location: &str) -> Result<Vec<String>> {
        let conn = open_existing(location, "")?;
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .map_err(persistence(location))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(persistence(location))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(persistence(location))?;
        Ok(names)
    }
}

impl TableStore for SqliteStore {
    fn put(&self, table: &TidyTable, location: &str, name: &str) -> Result<()> {
        let path = Path::new(location);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    HarvestError::Persistence(format!(
                        "Failed to create directory '{}': {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let mut conn = Connection::open(path).map_err(persistence(location))?;
        let tx = conn.transaction().map_err(persistence(location))?;

        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table_name}; CREATE TABLE {table_name} ({columns});",
            table_name = quote_ident(name),
            columns = column_definitions(table),
        ))
        .map_err(persistence(location))?;

        {
            let placeholders = vec!["?"; table.metric_names().count() + 2].join(", ");
            let mut insert = tx
                .prepare(&format!("INSERT INTO {} VALUES ({})", quote_ident(name), placeholders))
                .map_err(persistence(location))?;

            for (row, key) in table.keys().iter().enumerate() {
                let mut values = vec![
                    Value::Text(key.year.to_timestamp_text()),
                    Value::Text(key.entity.clone()),
                ];
                values.extend(
                    table
                        .row_values(row)
                        .into_iter()
                        .map(|v| v.map_or(Value::Null, Value::Real)),
                );
                insert
                    .execute(params_from_iter(values.iter()))
                    .map_err(persistence(location))?;
            }
        }

        tx.commit().map_err(persistence(location))?;

        info!(
            database = %location,
            table = %name,
            rows = table.row_count(),
            "stored table"
        );
        Ok(())
    }

    fn get(&self, location: &str, name: &str) -> Result<TidyTable> {
        let conn = open_existing(location, name)?;

        let exists: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![name],
                |row| row.get(0),
            )
            .map_err(persistence(location))?;
        if exists == 0 {
            return Err(not_found(location, name));
        }

        let layout = read_layout(&conn, location, name)?;
        debug!(table = %name, columns = layout.metrics.len(), "reading stored table");

        let select = std::iter::once(YEAR_COLUMN)
            .chain(std::iter::once(layout.entity.as_str()))
            .chain(layout.metrics.iter().map(String::as_str))
            .map(quote_ident)
            .collect::<Vec<_>>()
            .join(", ");
        let mut stmt = conn
            .prepare(&format!("SELECT {} FROM {}", select, quote_ident(name)))
            .map_err(persistence(location))?;
        let mut rows = stmt.query([]).map_err(persistence(location))?;

        let mut keys = Vec::new();
        let mut columns: IndexMap<String, Vec<Option<f64>>> = layout
            .metrics
            .iter()
            .map(|m| (m.clone(), Vec::new()))
            .collect();

        while let Some(row) = rows.next().map_err(persistence(location))? {
            let year_cell = row.get_ref(0).map_err(persistence(location))?;
            let year = stored_year(year_cell).ok_or_else(|| {
                HarvestError::Persistence(format!(
                    "Unreadable {} value in '{}' row {}",
                    YEAR_COLUMN,
                    name,
                    keys.len() + 1
                ))
            })?;
            let entity: String = row.get(1).map_err(persistence(location))?;
            keys.push(RowKey::new(entity, year));

            for (offset, values) in columns.values_mut().enumerate() {
                let value: Option<f64> = row.get(offset + 2).map_err(persistence(location))?;
                values.push(value);
            }
        }

        TidyTable::from_parts(layout.entity, keys, columns)
    }
}

struct Layout {
    entity: String,
    metrics: Vec<String>,
}

/// Split the stored columns into year, entity and metrics.
fn read_layout(conn: &Connection, location: &str, name: &str) -> Result<Layout> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({})", quote_ident(name)))
        .map_err(persistence(location))?;
    let columns = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?))
        })
        .map_err(persistence(location))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(persistence(location))?;

    if !columns.iter().any(|(column, _)| column == YEAR_COLUMN) {
        return Err(HarvestError::Schema {
            table: name.to_string(),
            column: YEAR_COLUMN.to_string(),
        });
    }

    let mut entity = None;
    let mut metrics = Vec::new();
    for (column, declared) in columns {
        if column == YEAR_COLUMN {
            continue;
        }
        if entity.is_none() && declared.eq_ignore_ascii_case("TEXT") {
            entity = Some(column);
        } else {
            metrics.push(column);
        }
    }

    let entity = entity.ok_or_else(|| HarvestError::Schema {
        table: name.to_string(),
        column: "<entity>".to_string(),
    })?;
    Ok(Layout { entity, metrics })
}

fn open_existing(location: &str, name: &str) -> Result<Connection> {
    if !Path::new(location).is_file() {
        return Err(not_found(location, name));
    }
    Connection::open_with_flags(location, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(persistence(location))
}

fn stored_year(cell: ValueRef<'_>) -> Option<Year> {
    match cell {
        ValueRef::Text(bytes) => std::str::from_utf8(bytes).ok().and_then(Year::parse_stored),
        ValueRef::Integer(value) => i32::try_from(value).ok().and_then(Year::new),
        _ => None,
    }
}

fn column_definitions(table: &TidyTable) -> String {
    let mut columns = vec![
        format!("{} TEXT", quote_ident(YEAR_COLUMN)),
        format!("{} TEXT", quote_ident(table.entity_label())),
    ];
    columns.extend(
        table
            .metric_names()
            .map(|metric| format!("{} REAL", quote_ident(metric))),
    );
    columns.join(", ")
}

/// Double-quote an identifier, escaping embedded quotes.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn persistence(location: &str) -> impl Fn(rusqlite::Error) -> HarvestError + '_ {
    move |e| HarvestError::Persistence(format!("SQLite error at '{}': {}", location, e))
}

fn not_found(location: &str, name: &str) -> HarvestError {
    HarvestError::NotFound {
        location: location.to_string(),
        name: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn year(y: i32) -> Year {
        Year::new(y).unwrap()
    }

    fn sample() -> TidyTable {
        let keys = vec![
            RowKey::new("United States", year(2000)),
            RowKey::new("United States", year(2001)),
        ];
        let mut columns = IndexMap::new();
        columns.insert("All GHG".to_string(), vec![Some(1.5), None]);
        columns.insert("Maize".to_string(), vec![Some(250_000.0), Some(260_000.0)]);
        TidyTable::from_parts("Country", keys, columns).unwrap()
    }

    fn db_path(dir: &TempDir) -> String {
        dir.path().join("nested").join("merged.sqlite").display().to_string()
    }

    #[test]
    fn test_put_then_get() {
        let dir = TempDir::new().unwrap();
        let location = db_path(&dir);
        let store = SqliteStore::new();

        store.put(&sample(), &location, "merged").unwrap();
        let loaded = store.get(&location, "merged").unwrap();

        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_put_twice_replaces() {
        let dir = TempDir::new().unwrap();
        let location = db_path(&dir);
        let store = SqliteStore::new();

        store.put(&sample(), &location, "merged").unwrap();
        store.put(&sample(), &location, "merged").unwrap();

        let loaded = store.get(&location, "merged").unwrap();
        assert_eq!(loaded.row_count(), 2);
        assert_eq!(store.table_names(&location).unwrap(), vec!["merged"]);
    }

    #[test]
    fn test_year_is_stored_as_timestamp_text() {
        let dir = TempDir::new().unwrap();
        let location = db_path(&dir);
        SqliteStore::new().put(&sample(), &location, "merged").unwrap();

        let conn = Connection::open(&location).unwrap();
        let first: String = conn
            .query_row("SELECT \"Year\" FROM merged ORDER BY \"Year\" LIMIT 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(first, "2000-01-01 00:00:00");
    }

    #[test]
    fn test_get_missing_database() {
        let dir = TempDir::new().unwrap();
        let err = SqliteStore::new().get(&db_path(&dir), "merged").unwrap_err();
        assert!(matches!(err, HarvestError::NotFound { .. }));
    }

    #[test]
    fn test_get_missing_table() {
        let dir = TempDir::new().unwrap();
        let location = db_path(&dir);
        let store = SqliteStore::new();
        store.put(&sample(), &location, "merged").unwrap();

        let err = store.get(&location, "crop_production").unwrap_err();
        assert!(matches!(err, HarvestError::NotFound { name, .. } if name == "crop_production"));
    }
}
