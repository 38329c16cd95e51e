//! Navigable nested objects.
//!
//! A [`Strut`] exposes arbitrary key/value pairs of a snapshot as addressable
//! fields. The document
//!
//! ```json
//! { "a": { "b": { "c": "d" } } }
//! ```
//!
//! becomes a `Strut` where `lookup(&["a", "b", "c"])` yields `"d"`, and where
//! `a` and `a.b` are themselves `Strut`s.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;

use crate::reconstruct::reconstruct;
use crate::{LedgerError, Snapshot, Value};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Strut {
    fields: BTreeMap<String, Value>,
}

impl Strut {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a plain snapshot, turning every nested object into a `Strut`.
    pub fn from_snapshot(snapshot: &Snapshot) -> Result<Self, LedgerError> {
        let mut strut = Strut::new();
        reconstruct(&mut strut, snapshot)?;
        Ok(strut)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.fields.get_mut(key)
    }

    /// Bind `value` under `key`, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Follow `path` through nested structs and return the value at its end.
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        let (last, parents) = path.split_last()?;
        let mut current = self;
        for key in parents {
            current = current.get(key.as_ref())?.as_nested()?;
        }
        current.get(last.as_ref())
    }

    /// The nested struct reached by following `path`; the empty path is `self`.
    pub fn nested_mut<S: AsRef<str>>(&mut self, path: &[S]) -> Option<&mut Strut> {
        let mut current = self;
        for key in path {
            current = current.fields.get_mut(key.as_ref())?.as_nested_mut()?;
        }
        Some(current)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Plain associative form, recursing into nested structs.
    pub fn to_snapshot(&self) -> Snapshot {
        self.fields
            .iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect()
    }

    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(self.to_snapshot())
    }
}

impl<'a> IntoIterator for &'a Strut {
    type Item = (&'a String, &'a Value);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl Serialize for Strut {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, &value.to_json())?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Strut {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let snapshot = Snapshot::deserialize(deserializer)?;
        Strut::from_snapshot(&snapshot).map_err(D::Error::custom)
    }
}
