use serde::{Serialize, Serializer, ser::SerializeSeq};
use std::collections::HashMap;
use std::collections::hash_map;
use std::rc::Rc;

use crate::processor::query_builder::QueryBuilder;
use crate::processor::value::Value;

/// One record: column name -> field value.
///
/// Equality ignores the order in which columns were inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Row<V = Value> {
    fields: HashMap<String, V>,
}

impl<V> Row<V> {
    pub fn new() -> Self {
        Row {
            fields: HashMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Row {
            fields: HashMap::with_capacity(capacity),
        }
    }

    pub fn get(&self, column: &str) -> Option<&V> {
        self.fields.get(column)
    }

    /// Sets `column`, returning the previous value if there was one
    pub fn insert(&mut self, column: impl Into<String>, value: V) -> Option<V> {
        self.fields.insert(column.into(), value)
    }

    pub fn contains_column(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, V> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<V> Default for Row<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, K: Into<String>> FromIterator<(K, V)> for Row<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Row {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl<V, const N: usize> From<[(&str, V); N]> for Row<V> {
    fn from(pairs: [(&str, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<V> IntoIterator for Row<V> {
    type Item = (String, V);
    type IntoIter = hash_map::IntoIter<String, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a, V> IntoIterator for &'a Row<V> {
    type Item = (&'a String, &'a V);
    type IntoIter = hash_map::Iter<'a, String, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// Ordered sequence of rows.
///
/// Rows sit behind `Rc` so operators can hand the same row to several result
/// tables without copying it. A row is never mutated once it is in a table.
#[derive(Debug, PartialEq, Eq)]
pub struct Table<V = Value> {
    rows: Vec<Rc<Row<V>>>,
}

// Cloning a table only bumps row reference counts.
impl<V> Clone for Table<V> {
    fn clone(&self) -> Self {
        Table {
            rows: self.rows.clone(),
        }
    }
}

impl<V> Table<V> {
    pub fn new() -> Self {
        Table { rows: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Table {
            rows: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Rc<Row<V>>] {
        &self.rows
    }

    pub fn iter(&self) -> impl Iterator<Item = &Row<V>> + '_ {
        self.rows.iter().map(|row| row.as_ref())
    }

    pub fn get(&self, idx: usize) -> Option<&Row<V>> {
        self.rows.get(idx).map(|row| row.as_ref())
    }

    pub fn push(&mut self, row: Row<V>) {
        self.rows.push(Rc::new(row));
    }

    /// Appends a row already owned by another table
    pub fn push_shared(&mut self, row: Rc<Row<V>>) {
        self.rows.push(row);
    }

    /// Start a fluent query over this table
    pub fn query<'a>(&self) -> QueryBuilder<'a, V> {
        QueryBuilder::new(self.clone())
    }
}

// Serialized as a sequence of row maps
impl<V: Serialize> Serialize for Table<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for row in self.iter() {
            seq.serialize_element(row)?;
        }
        seq.end()
    }
}

impl<V> Default for Table<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> FromIterator<Row<V>> for Table<V> {
    fn from_iter<I: IntoIterator<Item = Row<V>>>(iter: I) -> Self {
        Table {
            rows: iter.into_iter().map(Rc::new).collect(),
        }
    }
}

impl<V> FromIterator<Rc<Row<V>>> for Table<V> {
    fn from_iter<I: IntoIterator<Item = Rc<Row<V>>>>(iter: I) -> Self {
        Table {
            rows: iter.into_iter().collect(),
        }
    }
}

impl<V> From<Vec<Row<V>>> for Table<V> {
    fn from(rows: Vec<Row<V>>) -> Self {
        rows.into_iter().collect()
    }
}
