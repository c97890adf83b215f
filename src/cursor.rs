use crate::connection::Connection;
use crate::core::{Column, ROWCOUNT_UNKNOWN, Result, Row};
use crate::sql::{self, Page, StatementKind};
use serde_json::{Map, Value};

/// Per-statement execution unit.
///
/// `execute` rewrites pagination, routes the statement to the right server
/// action, and buffers the whole result eagerly; the wire protocol has no
/// server-side cursor, so fetch calls only walk the local buffer and never
/// touch the network.
///
/// # Examples
///
/// ```no_run
/// use faircom_jsonapi::{Connection, ConnectionConfig};
///
/// # fn main() -> faircom_jsonapi::Result<()> {
/// let conn = Connection::open(ConnectionConfig::new("localhost"))?;
/// let mut cursor = conn.cursor()?;
/// cursor.execute("SELECT * FROM orders LIMIT 10", &[])?;
/// while let Some(row) = cursor.fetchone() {
///     println!("{row:?}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct Cursor<'conn> {
    conn: &'conn Connection,
    description: Option<Vec<Column>>,
    rows: Vec<Map<String, Value>>,
    position: usize,
    rowcount: i64,
}

impl<'conn> Cursor<'conn> {
    pub(crate) fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            description: None,
            rows: Vec::new(),
            position: 0,
            rowcount: ROWCOUNT_UNKNOWN,
        }
    }

    /// Execute a statement with positional (`?`) bind parameters.
    ///
    /// A trailing portable `LIMIT n` in the text is rewritten into the
    /// dialect's `TOP n` form before dispatch.
    pub fn execute(&mut self, sql_text: &str, params: &[Value]) -> Result<()> {
        self.run(sql_text, params, None, None)
    }

    /// Execute with structured pagination intent.
    ///
    /// Limit and offset must be [`Page::Literal`] values; the wire protocol
    /// cannot express a parameterized TOP/SKIP.
    pub fn execute_paged(
        &mut self,
        sql_text: &str,
        params: &[Value],
        limit: Option<Page>,
        offset: Option<Page>,
    ) -> Result<()> {
        self.run(sql_text, params, limit, offset)
    }

    fn run(
        &mut self,
        sql_text: &str,
        params: &[Value],
        limit: Option<Page>,
        offset: Option<Page>,
    ) -> Result<()> {
        let rewritten = sql::rewrite(sql_text, limit, offset)?;
        let dispatch = sql::route(self.conn.database(), &rewritten, params);
        let kind = dispatch.kind;

        let result = self.conn.dispatch(dispatch.action, &dispatch.params)?;

        self.rows = result
            .get("data")
            .and_then(Value::as_array)
            .map(|rows| {
                rows.iter()
                    .map(|row| row.as_object().cloned().unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default();
        self.position = 0;
        self.description = describe(&result, &self.rows);
        self.rowcount = reported_rowcount(&result, kind, self.rows.len());

        Ok(())
    }

    /// The next row, or `None` once the buffer is exhausted. Exhaustion is a
    /// normal terminal condition, never an error.
    pub fn fetchone(&mut self) -> Option<Row> {
        let row = self.rows.get(self.position)?;
        let row = self.project(row);
        self.position += 1;
        Some(row)
    }

    /// Up to `size` remaining rows.
    pub fn fetchmany(&mut self, size: usize) -> Vec<Row> {
        let mut out = Vec::new();
        for _ in 0..size {
            match self.fetchone() {
                Some(row) => out.push(row),
                None => break,
            }
        }
        out
    }

    /// All remaining rows.
    pub fn fetchall(&mut self) -> Vec<Row> {
        let mut out = Vec::new();
        while let Some(row) = self.fetchone() {
            out.push(row);
        }
        out
    }

    /// Column description of the current result, `None` when the last
    /// statement produced no describable result.
    pub fn description(&self) -> Option<&[Column]> {
        self.description.as_deref()
    }

    /// Buffered row count for reads; the server's affected count for writes
    /// when reported, [`ROWCOUNT_UNKNOWN`] otherwise.
    pub fn rowcount(&self) -> i64 {
        self.rowcount
    }

    /// Release the buffered result. The cursor may be reused with a fresh
    /// `execute`.
    pub fn close(&mut self) {
        self.rows.clear();
        self.position = 0;
        self.description = None;
    }

    // Order values by the description so every row comes out in the same
    // column order regardless of per-row key order.
    fn project(&self, row: &Map<String, Value>) -> Row {
        match &self.description {
            Some(columns) => columns
                .iter()
                .map(|c| row.get(&c.name).cloned().unwrap_or(Value::Null))
                .collect(),
            None => row.values().cloned().collect(),
        }
    }
}

impl Iterator for Cursor<'_> {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.fetchone()
    }
}

fn describe(result: &Map<String, Value>, rows: &[Map<String, Value>]) -> Option<Vec<Column>> {
    // Prefer the server's field metadata; fall back to the first row's keys.
    if let Some(fields) = result.get("fields").and_then(Value::as_array) {
        if !fields.is_empty() {
            return Some(
                fields
                    .iter()
                    .map(|field| {
                        let name = field
                            .get("name")
                            .and_then(Value::as_str)
                            .unwrap_or_default();
                        match field.get("type").and_then(Value::as_str) {
                            Some(type_code) => Column::with_type(name, type_code),
                            None => Column::new(name),
                        }
                    })
                    .collect(),
            );
        }
    }

    rows.first()
        .map(|row| row.keys().map(Column::new).collect())
}

fn reported_rowcount(result: &Map<String, Value>, kind: StatementKind, buffered: usize) -> i64 {
    if let Some(n) = result.get("affectedRecordCount").and_then(Value::as_i64) {
        return n;
    }
    if let Some(n) = result.get("returnedRecordCount").and_then(Value::as_i64) {
        return n;
    }
    match kind {
        StatementKind::Read => buffered as i64,
        StatementKind::Write => ROWCOUNT_UNKNOWN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionConfig;
    use crate::protocol::testing::{ScriptedTransport, ok_reply};
    use serde_json::json;

    fn connection_with(replies: Vec<Result<Value>>) -> Connection {
        let mut all = vec![ok_reply(json!({ "authToken": "tok-1" }))];
        all.extend(replies);
        Connection::open_with_transport(
            ConnectionConfig::new("localhost"),
            Box::new(ScriptedTransport::new(all)),
        )
        .unwrap()
    }

    fn select_reply() -> Result<Value> {
        ok_reply(json!({
            "fields": [
                { "name": "id", "type": "INTEGER" },
                { "name": "name", "type": "VARCHAR" }
            ],
            "data": [
                { "id": 1, "name": "Alice" },
                { "id": 2, "name": "Bob" },
                { "id": 3, "name": "Carol" }
            ],
            "returnedRecordCount": 3
        }))
    }

    #[test]
    fn test_execute_buffers_rows_and_description() {
        let conn = connection_with(vec![select_reply()]);
        let mut cursor = conn.cursor().unwrap();

        cursor.execute("SELECT id, name FROM people", &[]).unwrap();

        let description = cursor.description().unwrap();
        assert_eq!(description.len(), 2);
        assert_eq!(description[0], Column::with_type("id", "INTEGER"));
        assert_eq!(cursor.rowcount(), 3);
    }

    #[test]
    fn test_fetchone_walks_rows_in_description_order() {
        let conn = connection_with(vec![select_reply()]);
        let mut cursor = conn.cursor().unwrap();
        cursor.execute("SELECT id, name FROM people", &[]).unwrap();

        assert_eq!(cursor.fetchone(), Some(vec![json!(1), json!("Alice")]));
        assert_eq!(cursor.fetchone(), Some(vec![json!(2), json!("Bob")]));
        assert_eq!(cursor.fetchone(), Some(vec![json!(3), json!("Carol")]));
        assert_eq!(cursor.fetchone(), None);
        // Still None, still not an error.
        assert_eq!(cursor.fetchone(), None);
    }

    #[test]
    fn test_fetchmany_and_fetchall() {
        let conn = connection_with(vec![select_reply()]);
        let mut cursor = conn.cursor().unwrap();
        cursor.execute("SELECT id, name FROM people", &[]).unwrap();

        let first = cursor.fetchmany(2);
        assert_eq!(first.len(), 2);

        let rest = cursor.fetchall();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0], vec![json!(3), json!("Carol")]);

        assert!(cursor.fetchmany(10).is_empty());
        assert!(cursor.fetchall().is_empty());
    }

    #[test]
    fn test_description_falls_back_to_row_keys() {
        let conn = connection_with(vec![ok_reply(json!({
            "data": [ { "a": 1, "b": 2 } ]
        }))]);
        let mut cursor = conn.cursor().unwrap();
        cursor.execute("SELECT * FROM t", &[]).unwrap();

        let description = cursor.description().unwrap();
        assert_eq!(description, &[Column::new("a"), Column::new("b")]);
        assert_eq!(cursor.rowcount(), 1);
    }

    #[test]
    fn test_empty_read_result() {
        let conn = connection_with(vec![ok_reply(json!({ "data": [] }))]);
        let mut cursor = conn.cursor().unwrap();
        cursor.execute("SELECT * FROM t", &[]).unwrap();

        assert!(cursor.description().is_none());
        assert_eq!(cursor.rowcount(), 0);
        assert_eq!(cursor.fetchone(), None);
    }

    #[test]
    fn test_write_rowcount_unknown_without_server_count() {
        let conn = connection_with(vec![ok_reply(json!({}))]);
        let mut cursor = conn.cursor().unwrap();
        cursor.execute("INSERT INTO t VALUES (1)", &[]).unwrap();

        assert_eq!(cursor.rowcount(), ROWCOUNT_UNKNOWN);
        assert_eq!(cursor.fetchone(), None);
    }

    #[test]
    fn test_write_rowcount_uses_affected_count() {
        let conn = connection_with(vec![ok_reply(json!({ "affectedRecordCount": 7 }))]);
        let mut cursor = conn.cursor().unwrap();
        cursor.execute("DELETE FROM t", &[]).unwrap();

        assert_eq!(cursor.rowcount(), 7);
    }

    #[test]
    fn test_cursor_iterates() {
        let conn = connection_with(vec![select_reply()]);
        let mut cursor = conn.cursor().unwrap();
        cursor.execute("SELECT id, name FROM people", &[]).unwrap();

        let names: Vec<Value> = (&mut cursor).map(|row| row[1].clone()).collect();
        assert_eq!(names, vec![json!("Alice"), json!("Bob"), json!("Carol")]);
    }

    #[test]
    fn test_execute_paged_rejects_bound_limit() {
        let conn = connection_with(vec![]);
        let mut cursor = conn.cursor().unwrap();

        let err = cursor
            .execute_paged("SELECT * FROM t", &[], Some(Page::Bound), None)
            .unwrap_err();
        assert!(matches!(
            err,
            crate::core::DriverError::UnsupportedParameter(_)
        ));
    }

    #[test]
    fn test_cursor_close_releases_buffer() {
        let conn = connection_with(vec![select_reply()]);
        let mut cursor = conn.cursor().unwrap();
        cursor.execute("SELECT id, name FROM people", &[]).unwrap();

        cursor.close();
        assert_eq!(cursor.fetchone(), None);
        assert!(cursor.description().is_none());
    }
}
