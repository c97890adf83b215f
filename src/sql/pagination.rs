use crate::core::{DriverError, Result};
use lazy_static::lazy_static;
use regex::Regex;

/// A limit or offset argument.
///
/// The target dialect only accepts literal integers in its TOP/SKIP tokens;
/// sending `TOP ?` produces a server-side syntax error. A caller that wants
/// pagination must therefore resolve the value before execute, and a
/// late-bound placeholder is rejected outright rather than silently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Literal(u64),
    Bound,
}

impl From<u64> for Page {
    fn from(n: u64) -> Self {
        Page::Literal(n)
    }
}

lazy_static! {
    // Trailing top-level LIMIT n. Anchored at end of statement so limits
    // inside subqueries are left alone.
    static ref TRAILING_LIMIT: Regex =
        Regex::new(r"(?is)\s+LIMIT\s+(\d+)\s*$").unwrap();

    // Splits "<whitespace/comments>SELECT<ws><rest>" keeping the head verbatim.
    static ref SELECT_SPLIT: Regex =
        Regex::new(r"(?is)^((?:\s|--[^\n]*\n?|/\*.*?\*/)*SELECT)\s+(.*)$").unwrap();

    // A statement whose SELECT is already followed by TOP or SKIP has been
    // rewritten before (or was hand-written in dialect form).
    static ref ALREADY_PAGED: Regex =
        Regex::new(r"(?is)^(?:\s|--[^\n]*\n?|/\*.*?\*/)*SELECT\s+(?:DISTINCT\s+)?(?:TOP|SKIP)\b")
            .unwrap();
}

/// Rewrite portable limit/offset intent into the dialect's `TOP`/`SKIP`
/// tokens, placed immediately after `SELECT` and before the column list.
///
/// Two sources of intent are honored, raw text first:
///
/// 1. a trailing top-level `LIMIT n` in the statement text itself (raw SQL
///    from tools that assume portable syntax) is stripped and folded in;
/// 2. structured `limit`/`offset` arguments, which must be
///    [`Page::Literal`] values.
///
/// When both limit and offset apply, the emitted order is
/// `SKIP <offset> TOP <limit>`. The dialect takes no trailing
/// `FETCH ... ROWS ONLY` or end-of-query clause. Rewriting is idempotent: a
/// statement that already carries `TOP`/`SKIP` after its `SELECT` is
/// returned unchanged (minus any trailing `LIMIT`, which is still stripped).
///
/// # Examples
///
/// ```
/// use faircom_jsonapi::sql::{Page, rewrite};
///
/// let sql = rewrite(
///     "SELECT * FROM t",
///     Some(Page::Literal(10)),
///     Some(Page::Literal(20)),
/// ).unwrap();
/// assert_eq!(sql, "SELECT SKIP 20 TOP 10 * FROM t");
/// ```
pub fn rewrite(sql: &str, limit: Option<Page>, offset: Option<Page>) -> Result<String> {
    let mut limit = literal(limit, "LIMIT")?;
    let offset = literal(offset, "OFFSET")?;

    let mut text = sql.to_string();

    // Raw-text path. Runs before the structured path; a structured limit,
    // when present, takes precedence over the textual clause.
    if let Some(caps) = TRAILING_LIMIT.captures(&text) {
        let value: u64 = caps[1].parse().map_err(|_| {
            DriverError::UnsupportedParameter("LIMIT value out of range".into())
        })?;
        if limit.is_none() {
            limit = Some(value);
        }
        let clause_start = caps.get(0).unwrap().start();
        text.truncate(clause_start);
    }

    if limit.is_none() && offset.is_none() {
        return Ok(text);
    }

    if ALREADY_PAGED.is_match(&text) {
        return Ok(text);
    }

    // Only SELECT-shaped statements take pagination tokens.
    let select_span = SELECT_SPLIT
        .captures(&text)
        .map(|caps| (caps.get(1).unwrap().end(), caps.get(2).unwrap().start()));
    let Some((head_end, rest_start)) = select_span else {
        return Ok(text);
    };

    let mut tokens = String::new();
    if let Some(m) = offset {
        tokens.push_str(&format!("SKIP {m} "));
    }
    if let Some(n) = limit {
        tokens.push_str(&format!("TOP {n} "));
    }

    Ok(format!(
        "{} {}{}",
        &text[..head_end],
        tokens,
        &text[rest_start..]
    ))
}

fn literal(page: Option<Page>, clause: &str) -> Result<Option<u64>> {
    match page {
        None => Ok(None),
        Some(Page::Literal(n)) => Ok(Some(n)),
        Some(Page::Bound) => Err(DriverError::UnsupportedParameter(format!(
            "{clause} must be a literal integer; the server rejects a parameterized value"
        ))),
    }
}
