use log::warn;
use serde_json::{Map, Value, json};

use crate::protocol::API_DB;

/// How a statement travels on the wire.
///
/// The server exposes two SQL actions with incompatible parameter shapes;
/// a read sent through the write action (or vice versa) is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// SELECT-shaped, dispatched via `getRecordsUsingSQL`.
    Read,
    /// DML/DDL, dispatched via `runSqlStatements`.
    Write,
}

/// A routed statement: target action plus its request params.
#[derive(Debug)]
pub struct Dispatch {
    pub kind: StatementKind,
    pub api: &'static str,
    pub action: &'static str,
    pub params: Map<String, Value>,
}

/// Classify a statement by its leading keyword, skipping whitespace and
/// `--` / `/* */` comments. `SELECT` and `WITH` are reads; everything else
/// (INSERT, UPDATE, DELETE, CREATE, ALTER, DROP, ...) is a write.
pub fn classify(sql: &str) -> StatementKind {
    let keyword = leading_keyword(sql);
    if keyword.eq_ignore_ascii_case("SELECT") || keyword.eq_ignore_ascii_case("WITH") {
        StatementKind::Read
    } else {
        StatementKind::Write
    }
}

/// Build the wire dispatch for a statement.
///
/// Reads carry `{databaseName, sql, sqlParams}`. Writes carry
/// `{databaseName, sqlStatements: [sql]}`; the write action takes an array
/// even for a single statement and has no parameter slot; bind values for
/// writes are not embedded yet and are ignored with a warning.
pub fn route(database: &str, sql: &str, params: &[Value]) -> Dispatch {
    match classify(sql) {
        StatementKind::Read => {
            let mut request = Map::new();
            request.insert("databaseName".into(), json!(database));
            request.insert("sql".into(), json!(sql));
            request.insert("sqlParams".into(), Value::Array(params.to_vec()));
            Dispatch {
                kind: StatementKind::Read,
                api: API_DB,
                action: "getRecordsUsingSQL",
                params: request,
            }
        }
        StatementKind::Write => {
            if !params.is_empty() {
                warn!("bind parameters are not supported for write statements and were ignored");
            }
            let mut request = Map::new();
            request.insert("databaseName".into(), json!(database));
            request.insert("sqlStatements".into(), json!([sql]));
            Dispatch {
                kind: StatementKind::Write,
                api: API_DB,
                action: "runSqlStatements",
                params: request,
            }
        }
    }
}

/// First SQL keyword of the statement, with leading whitespace and comments
/// stripped. Returns an empty string for a statement that is all comments.
fn leading_keyword(sql: &str) -> &str {
    let mut rest = sql;
    loop {
        rest = rest.trim_start();
        if let Some(after) = rest.strip_prefix("--") {
            rest = after.split_once('\n').map_or("", |(_, tail)| tail);
        } else if let Some(after) = rest.strip_prefix("/*") {
            rest = after.split_once("*/").map_or("", |(_, tail)| tail);
        } else {
            break;
        }
    }
    let end = rest
        .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .unwrap_or(rest.len());
    &rest[..end]
}
