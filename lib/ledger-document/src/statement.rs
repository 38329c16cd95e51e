//! PartiQL statements rendered from the clause builders.
//!
//! Table and index names cannot be bound as parameters, so they are passed
//! through [`sanitize`] before being spliced into statement text. Values are
//! always carried separately in [`Statement::params`].

use serde_json::Value as JsonValue;

use crate::clause;
use crate::Snapshot;

/// Characters stripped from identifiers spliced into statement text.
const UNSAFE_CHARS: &[char] = &['\\', '\'', '"', '\u{8}', '\n', '\r', '\t', '\0'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    CreateTable,
    CreateIndex,
    Select,
    Insert,
    Update,
    History,
}

/// A parameterized statement with positional `?` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub text: String,
    pub params: Vec<JsonValue>,
}

impl Statement {
    fn new(kind: StatementKind, text: String, params: Vec<JsonValue>) -> Self {
        Self { kind, text, params }
    }

    /// Number of `?` placeholders in the text.
    pub fn placeholder_count(&self) -> usize {
        self.text.matches('?').count()
    }
}

/// Strip quoting and control characters from an identifier.
pub fn sanitize(identifier: &str) -> String {
    identifier.chars().filter(|c| !UNSAFE_CHARS.contains(c)).collect()
}

fn compose(head: String, clause: Option<String>) -> String {
    match clause {
        Some(clause) => format!("{} {}", head, clause.trim_end()),
        None => head,
    }
}

pub fn create_table(table: &str) -> Statement {
    let text = format!("CREATE TABLE {}", sanitize(table));
    Statement::new(StatementKind::CreateTable, text, Vec::new())
}

pub fn create_index(table: &str, index: &str) -> Statement {
    let text = format!("CREATE INDEX ON {} ({})", sanitize(table), sanitize(index));
    Statement::new(StatementKind::CreateIndex, text, Vec::new())
}

pub fn select_all(table: &str) -> Statement {
    let text = format!("SELECT * FROM {}", sanitize(table));
    Statement::new(StatementKind::Select, text, Vec::new())
}

/// `SELECT * FROM t WHERE a = ? AND ...`; an empty filter selects everything.
pub fn select_by_equality(table: &str, filter: &[(String, JsonValue)]) -> Statement {
    let columns: Vec<String> = filter.iter().map(|(column, _)| sanitize(column)).collect();
    let params = filter.iter().map(|(_, value)| value.clone()).collect();
    let text = compose(
        format!("SELECT * FROM {}", sanitize(table)),
        clause::where_equals(&columns),
    );
    Statement::new(StatementKind::Select, text, params)
}

/// `SELECT * FROM t WHERE a IN (?,?) AND ...`
pub fn select_by_membership(table: &str, filter: &[(String, Vec<JsonValue>)]) -> Statement {
    let columns: Vec<(String, usize)> = filter
        .iter()
        .map(|(column, values)| (sanitize(column), values.len()))
        .collect();
    let params = filter
        .iter()
        .flat_map(|(_, values)| values.iter().cloned())
        .collect();
    let text = compose(
        format!("SELECT * FROM {}", sanitize(table)),
        clause::where_in(&columns),
    );
    Statement::new(StatementKind::Select, text, params)
}

/// `SELECT * FROM t WHERE a LIKE ? AND ...` with `%needle%` parameters.
pub fn select_by_match(table: &str, filter: &[(String, String)]) -> Statement {
    let columns: Vec<String> = filter.iter().map(|(column, _)| sanitize(column)).collect();
    let params = filter
        .iter()
        .map(|(_, needle)| JsonValue::String(format!("%{}%", needle)))
        .collect();
    let text = compose(
        format!("SELECT * FROM {}", sanitize(table)),
        clause::where_like(&columns),
    );
    Statement::new(StatementKind::Select, text, params)
}

pub fn insert(table: &str, fields: &Snapshot) -> Statement {
    let text = format!("INSERT INTO {} ?", sanitize(table));
    Statement::new(
        StatementKind::Insert,
        text,
        vec![JsonValue::Object(fields.clone())],
    )
}

/// Whole-record update: `UPDATE t AS p SET p = ? WHERE id = ?`.
pub fn update(table: &str, index: &str, fields: &Snapshot, lookup: JsonValue) -> Statement {
    let head = format!("UPDATE {} AS p SET p = ?", sanitize(table));
    let text = compose(head, clause::where_equals(&[sanitize(index)]));
    Statement::new(
        StatementKind::Update,
        text,
        vec![JsonValue::Object(fields.clone()), lookup],
    )
}

/// `SELECT * FROM history(t) [WHERE metadata.id = ?]`
pub fn history(table: &str, link_id: Option<&str>) -> Statement {
    let head = format!("SELECT * FROM history({})", sanitize(table));
    match link_id {
        Some(link_id) => Statement::new(
            StatementKind::History,
            compose(head, clause::where_equals(&["metadata.id"])),
            vec![JsonValue::String(link_id.to_string())],
        ),
        None => Statement::new(StatementKind::History, head, Vec::new()),
    }
}
