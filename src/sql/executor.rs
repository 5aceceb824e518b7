//! Executor for SQL-domain commands.
//!
//! Runs the generated query text on the caller-supplied SQLite connection.
//! Engine-level failures (bad identifier, constraint violation) are
//! expected domain failures: they come back as a failed CommandResult with
//! the SQL attached, never as an error. Every result carries the executed
//! SQL in its `sql` field.

use std::collections::BTreeMap;

use crate::registry::Executor;
use crate::types::{CommandResult, DomainCommand, ParamValue, Result, ResultData};

pub struct SqlExecutor {
    connection: rusqlite::Connection,
}

impl SqlExecutor {
    pub fn new(connection: rusqlite::Connection) -> Self {
        Self { connection }
    }
}

impl Executor for SqlExecutor {
    fn execute(&self, command: &DomainCommand, _input: &ResultData) -> Result<CommandResult> {
        let sql = command.rendered.as_str();
        tracing::debug!(%sql, "executing sql");

        let result = match command.operation.as_str() {
            "select" => self.query(sql),
            "count" => match self.query(sql) {
                r if !r.success => r,
                r => to_count(r),
            },
            "delete" | "update" | "insert" => self.mutate(sql),
            other => CommandResult::fail(format!("unknown sql operation '{other}'")),
        };

        Ok(result.with_sql(sql))
    }
}

impl SqlExecutor {
    fn query(&self, sql: &str) -> CommandResult {
        let mut stmt = match self.connection.prepare(sql) {
            Ok(stmt) => stmt,
            Err(e) => return CommandResult::fail(format!("query failed: {e}")),
        };
        let column_names: Vec<String> =
            stmt.column_names().iter().map(|s| s.to_string()).collect();

        let mut rows = match stmt.query([]) {
            Ok(rows) => rows,
            Err(e) => return CommandResult::fail(format!("query failed: {e}")),
        };

        let mut records: Vec<BTreeMap<String, ParamValue>> = Vec::new();
        loop {
            match rows.next() {
                Ok(Some(row)) => {
                    let mut record = BTreeMap::new();
                    for (i, name) in column_names.iter().enumerate() {
                        record.insert(name.clone(), cell_value(row, i));
                    }
                    records.push(record);
                }
                Ok(None) => break,
                Err(e) => return CommandResult::fail(format!("query failed: {e}")),
            }
        }

        CommandResult::ok(ResultData::Records(records))
    }

    fn mutate(&self, sql: &str) -> CommandResult {
        match self.connection.execute(sql, []) {
            Ok(affected) => CommandResult::ok(ResultData::Count(affected as u64)),
            Err(e) => CommandResult::fail(format!("statement failed: {e}")),
        }
    }
}

fn cell_value(row: &rusqlite::Row<'_>, index: usize) -> ParamValue {
    use rusqlite::types::ValueRef;
    match row.get_ref(index) {
        Ok(ValueRef::Integer(n)) => ParamValue::Num(n as f64),
        Ok(ValueRef::Real(f)) => ParamValue::Num(f),
        Ok(ValueRef::Text(t)) => ParamValue::Str(String::from_utf8_lossy(t).into_owned()),
        Ok(ValueRef::Blob(_)) => ParamValue::Str("<blob>".to_string()),
        Ok(ValueRef::Null) => ParamValue::Str(String::new()),
        Err(_) => ParamValue::Str(String::new()),
    }
}

/// Collapse a COUNT(*) result set into a Count payload.
fn to_count(result: CommandResult) -> CommandResult {
    let count = match &result.data {
        ResultData::Records(rows) => rows
            .first()
            .and_then(|row| row.values().next())
            .and_then(|v| v.as_num())
            .unwrap_or(0.0),
        _ => 0.0,
    };
    CommandResult::ok(ResultData::Count(count as u64))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
