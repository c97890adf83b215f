use serde_json::Value;

/// A fetched row, ordered by the cursor's column description.
pub type Row = Vec<Value>;

/// One entry of a cursor's column description.
///
/// The type code is the server's own type name when the response carries a
/// `fields` array; it is `None` when the description had to be derived from
/// row keys alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub type_code: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_code: None,
        }
    }

    pub fn with_type(name: impl Into<String>, type_code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_code: Some(type_code.into()),
        }
    }
}

/// Rowcount sentinel for statements where the server does not report an
/// affected-row count (write/DDL dispatch).
pub const ROWCOUNT_UNKNOWN: i64 = -1;
