//! SQLite data context.
//!
//! The schema is introspected from `sqlite_master` and the `table_info` /
//! `foreign_key_list` pragmas. Every foreign key becomes a many-to-one
//! relationship from the referencing column to the referenced one; table
//! config files can add more.

use std::collections::BTreeMap;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, OptionalExtension, ToSql};
use serde_json::Value as Json;
use tracing::{debug, info, warn};

use super::summary::{Row, Summary};
use super::DataContext;
use crate::action::{Action, Operation, Value};
use crate::error::{Error, Result};
use crate::metadata::table_config::apply_table_configs;
use crate::metadata::{
    AssociationType, ColumnType, SchemaBuilder, SchemaRegistry, SchemaSnapshot, TableConfig,
};
use crate::sql::Dialect;

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Value::Int(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Float(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Value::Text(s) | Value::Json(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

/// JSON form of a SQLite cell. Blobs are base64 text.
fn cell_to_json(value: ValueRef<'_>) -> Json {
    match value {
        ValueRef::Null => Json::Null,
        ValueRef::Integer(i) => Json::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        ValueRef::Text(bytes) => Json::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Json::String(BASE64.encode(bytes)),
    }
}

fn query_rows(conn: &Connection, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
    let mut stmt = conn.prepare(sql)?;
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt.query(params_from_iter(params.iter()))?;

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut map = Row::new();
        for (i, name) in names.iter().enumerate() {
            map.insert(name.clone(), cell_to_json(row.get_ref(i)?));
        }
        out.push(map);
    }
    Ok(out)
}

/// Raw SQL: rows when the statement yields columns, else the change count.
fn run_passthrough(conn: &Connection, operation: Operation, sql: &str) -> Result<Summary> {
    let column_count = conn.prepare(sql)?.column_count();
    if column_count > 0 {
        Ok(Summary::passthrough(operation, query_rows(conn, sql, &[])?))
    } else {
        let affected = conn.execute(sql, [])?;
        Ok(Summary::affected(operation, affected))
    }
}

/// Run one action on `conn`.
fn run_action(conn: &Connection, action: &mut Action) -> Result<Summary> {
    match action.operation() {
        Operation::Sql => {
            let statement = action.build()?;
            run_passthrough(conn, Operation::Sql, &statement.sql)
        }
        Operation::Native => {
            let content = action
                .native_content()
                .ok_or_else(|| Error::null_node("native"))?;
            run_passthrough(conn, Operation::Native, content)
        }
        op if op.is_query() => {
            let statement = action.build()?.clone();
            debug!(sql = %statement.sql, params = statement.params.len(), "Executing query");
            let rows = query_rows(conn, &statement.sql, &statement.params)?;
            let summary = Summary::rows(action, rows);
            if action.limit().is_none() {
                return Ok(summary);
            }
            let count = action.count()?;
            let total: i64 = conn.query_row(
                &count.sql,
                params_from_iter(count.params.iter()),
                |row| row.get(0),
            )?;
            Ok(summary.with_total(total.max(0) as u64))
        }
        op if op.is_write() => {
            let statement = action.build()?.clone();
            debug!(sql = %statement.sql, params = statement.params.len(), "Executing write");
            let affected = conn.execute(&statement.sql, params_from_iter(statement.params.iter()))?;
            let last_insert_id = (op == Operation::Insert).then(|| conn.last_insert_rowid());
            Ok(Summary::write(action, affected, last_insert_id))
        }
        op => Err(Error::malformed(format!(
            "{op} operation cannot be executed by a data context"
        ))),
    }
}

/// Build a schema snapshot from the database catalog.
fn introspect(
    conn: &Connection,
    source: &str,
    configs: &BTreeMap<String, TableConfig>,
) -> Result<SchemaSnapshot> {
    let mut builder = SchemaBuilder::new(source);

    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master \
         WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let tables: Vec<String> = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<_>>()?;

    let mut columns = conn.prepare(
        "SELECT name, type, \"notnull\", pk FROM pragma_table_info(?1) ORDER BY cid",
    )?;
    for name in &tables {
        let table = builder.add_table(name, None);
        let mut rows = columns.query([name])?;
        while let Some(row) = rows.next()? {
            let column: String = row.get(0)?;
            let declared: Option<String> = row.get(1)?;
            let not_null: bool = row.get(2)?;
            let pk: i64 = row.get(3)?;
            let column_type = ColumnType::from_declared(declared.as_deref().unwrap_or(""));
            let id = builder.add_column(table, &column, column_type, !not_null);
            if pk > 0 {
                builder.set_primary_key(id);
            }
        }
    }

    let mut foreign_keys =
        conn.prepare("SELECT \"table\", \"from\", \"to\" FROM pragma_foreign_key_list(?1)")?;
    for name in &tables {
        let keys: Vec<(String, String, Option<String>)> = foreign_keys
            .query_map([name], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<rusqlite::Result<_>>()?;
        for (target_table, from, to) in keys {
            let Some(table) = builder.find_table(name) else {
                continue;
            };
            let from_column = builder.find_column(table, &from);
            let target = builder.find_table(&target_table).and_then(|t| {
                // A foreign key without a column list references the primary key.
                let column = match &to {
                    Some(to) => to.clone(),
                    None => primary_key_column(conn, &target_table).ok().flatten()?,
                };
                builder.find_column(t, &column)
            });
            match (from_column, target) {
                (Some(from_column), Some(target)) => {
                    builder.relate(from_column, target, AssociationType::ManyToOne);
                }
                _ => warn!(table = %name, column = %from, target = %target_table, "Skipping unresolved foreign key"),
            }
        }
    }

    apply_table_configs(&mut builder, configs);
    let snapshot = builder.build();
    debug!(source, tables = tables.len(), "Loaded SQLite schema");
    Ok(snapshot)
}

fn primary_key_column(conn: &Connection, table: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT name FROM pragma_table_info(?1) WHERE pk = 1",
            [table],
            |row| row.get(0),
        )
        .optional()?)
}

/// Data context over one SQLite database.
///
/// The connection is shared by every request of the source and pinned for
/// the length of a transaction.
pub struct SqliteContext {
    source: String,
    conn: Mutex<Connection>,
    registry: SchemaRegistry,
    table_configs: BTreeMap<String, TableConfig>,
}

impl SqliteContext {
    /// Open a database file, or an in-memory database for `:memory:`.
    pub fn open(source: &str, path: &str) -> Result<Self> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        info!(source, path, "Opened SQLite database");
        Self::from_connection(source, conn)
    }

    pub fn from_connection(source: &str, conn: Connection) -> Result<Self> {
        let configs = BTreeMap::new();
        let snapshot = introspect(&conn, source, &configs)?;
        Ok(Self {
            source: source.to_string(),
            conn: Mutex::new(conn),
            registry: SchemaRegistry::new(snapshot),
            table_configs: configs,
        })
    }

    /// Install table configs and reload the schema with them applied.
    pub fn with_table_configs(mut self, configs: BTreeMap<String, TableConfig>) -> Result<Self> {
        if !configs.is_empty() {
            self.table_configs = configs;
            self.refresh_schema()?;
        }
        Ok(self)
    }

    /// Direct access to the connection, for seeding and maintenance.
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }
}

impl DataContext for SqliteContext {
    fn source(&self) -> &str {
        &self.source
    }

    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn schema(&self) -> Arc<SchemaSnapshot> {
        self.registry.snapshot()
    }

    fn execute(&self, action: &mut Action) -> Result<Summary> {
        let conn = self.conn.lock();
        run_action(&conn, action)
    }

    fn execute_sql(&self, sql: &str) -> Result<Summary> {
        let conn = self.conn.lock();
        run_passthrough(&conn, Operation::Sql, sql)
    }

    /// SQL is SQLite's native language.
    fn execute_native(&self, content: &str) -> Result<Summary> {
        let conn = self.conn.lock();
        run_passthrough(&conn, Operation::Native, content)
    }

    fn execute_transaction(&self, actions: &mut [Action]) -> Result<Summary> {
        let conn = self.conn.lock();
        conn.execute_batch("BEGIN")?;
        debug!(source = %self.source, statements = actions.len(), "Transaction started");

        let mut summaries = Vec::with_capacity(actions.len());
        for action in actions.iter_mut() {
            match run_action(&conn, action) {
                Ok(summary) => summaries.push(summary),
                Err(err) => {
                    warn!(source = %self.source, error = %err, "Transaction failed, rolling back");
                    if let Err(rollback) = conn.execute_batch("ROLLBACK") {
                        return Err(Error::Rollback {
                            source: Box::new(err),
                            rollback: Box::new(rollback.into()),
                        });
                    }
                    debug!(source = %self.source, "Transaction rolled back");
                    return Err(err);
                }
            }
        }

        conn.execute_batch("COMMIT")?;
        debug!(source = %self.source, "Transaction committed");
        Ok(Summary::transaction(summaries))
    }

    fn refresh_schema(&self) -> Result<()> {
        let snapshot = {
            let conn = self.conn.lock();
            introspect(&conn, &self.source, &self.table_configs)?
        };
        self.registry.swap(snapshot);
        info!(source = %self.source, generation = self.registry.generation(), "Refreshed schema");
        Ok(())
    }
}
