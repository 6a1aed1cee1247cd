use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::processor::{
    CastError,
    diagnostics::{Diagnostic, DiagnosticSink},
    row::{Row, Table},
    value::Value,
};

type CastFn = dyn Fn(&str) -> Result<Value, CastError>;

/// Turns one raw field into a typed [`Value`]
#[derive(Clone)]
pub enum Caster {
    /// Keep the field as a string
    Text,
    /// Signed 64-bit integer
    Int,
    /// 64-bit float
    Float,
    /// `true` / `false`, ASCII case-insensitive
    Bool,
    Custom(Rc<CastFn>),
}

impl Caster {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&str) -> Result<Value, CastError> + 'static,
    {
        Caster::Custom(Rc::new(f))
    }

    pub fn cast(&self, raw: &str) -> Result<Value, CastError> {
        match self {
            Caster::Text => Ok(Value::Str(raw.to_string())),
            Caster::Int => {
                // atoi_simd has no explicit plus sign
                let digits = match raw.strip_prefix('+') {
                    Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
                    _ => raw,
                };
                atoi_simd::parse(digits.as_bytes())
                    .map(Value::Int)
                    .map_err(|e| CastError::Int(e.to_string()))
            }
            Caster::Float => fast_float::parse::<f64, _>(raw)
                .map(Value::Float)
                .map_err(|e| CastError::Float(e.to_string())),
            Caster::Bool => {
                if raw.eq_ignore_ascii_case("true") {
                    Ok(Value::Bool(true))
                } else if raw.eq_ignore_ascii_case("false") {
                    Ok(Value::Bool(false))
                } else {
                    Err(CastError::Bool(format!("expected true or false, got {raw:?}")))
                }
            }
            Caster::Custom(f) => f(raw),
        }
    }
}

impl fmt::Debug for Caster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Caster::Text => f.write_str("Text"),
            Caster::Int => f.write_str("Int"),
            Caster::Float => f.write_str("Float"),
            Caster::Bool => f.write_str("Bool"),
            Caster::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Built-in caster names usable from configuration files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CastKind {
    #[serde(alias = "string")]
    Text,
    #[serde(alias = "integer")]
    Int,
    Float,
    #[serde(alias = "boolean")]
    Bool,
}

impl From<CastKind> for Caster {
    fn from(kind: CastKind) -> Self {
        match kind {
            CastKind::Text => Caster::Text,
            CastKind::Int => Caster::Int,
            CastKind::Float => Caster::Float,
            CastKind::Bool => Caster::Bool,
        }
    }
}

/// Declarative schema, e.g. `{"age": "int", "member": "bool"}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct SchemaConfig(pub HashMap<String, CastKind>);

/// Column name -> caster. Columns without an entry stay strings.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    casters: HashMap<String, Caster>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, column: impl Into<String>, caster: Caster) -> Self {
        self.casters.insert(column.into(), caster);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, caster: Caster) -> Option<Caster> {
        self.casters.insert(column.into(), caster)
    }

    pub fn get(&self, column: &str) -> Option<&Caster> {
        self.casters.get(column)
    }

    pub fn len(&self) -> usize {
        self.casters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.casters.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Caster)> for Schema {
    fn from_iter<I: IntoIterator<Item = (K, Caster)>>(iter: I) -> Self {
        Schema {
            casters: iter.into_iter().map(|(k, c)| (k.into(), c)).collect(),
        }
    }
}

impl From<SchemaConfig> for Schema {
    fn from(config: SchemaConfig) -> Self {
        config
            .0
            .into_iter()
            .map(|(column, kind)| (column, Caster::from(kind)))
            .collect()
    }
}

/// Casts every field of every row through `schema`.
///
/// A field whose caster fails keeps its raw string and is reported to `sink`;
/// the row and the rest of the batch carry on. Row count and column
/// membership are preserved.
pub fn apply_schema_to_rows<S>(table: &Table<String>, schema: &Schema, sink: &S) -> Table<Value>
where
    S: DiagnosticSink + ?Sized,
{
    let mut out = Table::with_capacity(table.len());
    let mut fallbacks = 0usize;

    for (row_idx, row) in table.iter().enumerate() {
        let mut typed = Row::with_capacity(row.len());

        for (column, raw) in row {
            let value = match schema.get(column) {
                None => Value::Str(raw.clone()),
                Some(caster) => match caster.cast(raw) {
                    Ok(value) => value,
                    Err(error) => {
                        fallbacks += 1;
                        sink.emit(Diagnostic::CastFallback {
                            row: row_idx,
                            column: column.clone(),
                            value: raw.clone(),
                            error,
                        });
                        Value::Str(raw.clone())
                    }
                },
            };
            typed.insert(column.clone(), value);
        }

        out.push(typed);
    }

    tracing::debug!(rows = out.len(), fallbacks, "schema applied");
    out
}
