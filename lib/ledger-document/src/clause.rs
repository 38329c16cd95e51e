//! Parameterized clause fragments for an arbitrary number of columns.
//!
//! Every builder returns `None` when given no columns, so "no clause" stays
//! distinguishable from an empty string. Column names are emitted verbatim;
//! escaping them is the gateway's job.
//!
//! Each column group is followed by a single space, so fragments can be
//! appended to a statement without extra separators:
//!
//! ```
//! use ledger_document::clause;
//!
//! assert_eq!(
//!     clause::where_equals(&["team", "location"]).as_deref(),
//!     Some("WHERE team = ? AND location = ? "),
//! );
//! assert_eq!(
//!     clause::where_in(&[("a", 3), ("b", 2)]).as_deref(),
//!     Some("WHERE a IN (?,?,?) AND b IN (?,?) "),
//! );
//! assert_eq!(clause::set_assignment::<&str>(&[]), None);
//! ```

/// Comparison operator used between a column and its placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Equals,
    Like,
}

impl Comparator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::Equals => "=",
            Comparator::Like => "LIKE",
        }
    }
}

/// `WHERE c1 <op> ? AND c2 <op> ? ...`
pub fn where_clause<S: AsRef<str>>(comparator: Comparator, columns: &[S]) -> Option<String> {
    let mut clause: Option<String> = None;
    for column in columns {
        let prefix = if clause.is_none() { "WHERE" } else { "AND" };
        let group = format!("{} {} {} ? ", prefix, column.as_ref(), comparator.as_str());
        clause.get_or_insert_with(String::new).push_str(&group);
    }
    clause
}

/// `WHERE c1 = ? AND c2 = ? ...`
pub fn where_equals<S: AsRef<str>>(columns: &[S]) -> Option<String> {
    where_clause(Comparator::Equals, columns)
}

/// `WHERE c1 LIKE ? AND c2 LIKE ? ...`
pub fn where_like<S: AsRef<str>>(columns: &[S]) -> Option<String> {
    where_clause(Comparator::Like, columns)
}

/// `WHERE c1 IN (?,?) AND c2 IN (?) ...` with one placeholder per counted value.
pub fn where_in<S: AsRef<str>>(columns: &[(S, usize)]) -> Option<String> {
    let mut clause: Option<String> = None;
    for (column, count) in columns {
        let prefix = if clause.is_none() { "WHERE" } else { "AND" };
        let placeholders = vec!["?"; *count].join(",");
        let group = format!("{} {} IN ({}) ", prefix, column.as_ref(), placeholders);
        clause.get_or_insert_with(String::new).push_str(&group);
    }
    clause
}

/// `SET c1 = ? , c2 = ? ...`
pub fn set_assignment<S: AsRef<str>>(columns: &[S]) -> Option<String> {
    let mut clause: Option<String> = None;
    for column in columns {
        match clause.as_mut() {
            None => clause = Some(format!("SET {} = ? ", column.as_ref())),
            Some(c) => c.push_str(&format!(", {} = ? ", column.as_ref())),
        }
    }
    clause
}
