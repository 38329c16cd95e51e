//! Depth-first rebuilding of plain snapshots into nested [`Strut`]s.
//!
//! The walk carries an explicit path of keys from the root. Each binding
//! resolves its target struct from the root by that path, so every level is
//! populated in place and siblings see the structs already bound before them.

use serde_json::Value as JsonValue;

use crate::{LedgerError, Snapshot, Strut, Value};

/// Deepest nesting accepted before reconstruction gives up. Matches the
/// recursion limit `serde_json` applies when parsing, so any document that
/// can be decoded from the ledger can be rebuilt.
pub const MAX_DEPTH: usize = 128;

/// Bind every entry of `snapshot` into `root`, replacing existing keys.
pub fn reconstruct(root: &mut Strut, snapshot: &Snapshot) -> Result<(), LedgerError> {
    let mut path = Vec::new();
    load(root, &mut path, snapshot)
}

fn load(root: &mut Strut, path: &mut Vec<String>, source: &Snapshot) -> Result<(), LedgerError> {
    if path.len() > MAX_DEPTH {
        return Err(LedgerError::SnapshotTooDeep(path.join(".")));
    }

    for (key, value) in source {
        let target = root.nested_mut(path.as_slice()).ok_or_else(|| {
            LedgerError::InvalidSnapshot(format!("no nested object at '{}'", path.join(".")))
        })?;

        match value {
            JsonValue::Object(inner) => {
                target.set(key.clone(), Strut::new());
                path.push(key.clone());
                load(root, path, inner)?;
                path.pop();
            }
            JsonValue::Null => {
                target.set(key.clone(), Value::Null);
            }
            JsonValue::Bool(_) | JsonValue::Number(_) | JsonValue::String(_) | JsonValue::Array(_) => {
                target.set(key.clone(), Value::from_json(value.clone())?);
            }
        }
    }

    Ok(())
}
