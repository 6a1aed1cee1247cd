//! # miniquery
//!
//! `miniquery` loads delimiter-separated text into an in-memory, row-oriented
//! table and runs a handful of relational operators over it. It supports:
//!
//! - Memory-mapped CSV loading with header validation
//! - Schema-driven casting of raw fields (int, float, bool, custom)
//! - Query operators: filter, select, limit, order-by and distinct
//! - Diagnostics for bad rows, failed casts and incomparable sort keys,
//!   delivered through an injectable sink (`tracing` by default)
//!
//! Data-quality problems never abort an operation: a malformed line is
//! dropped, a field that fails to cast keeps its string, and incomparable
//! sort keys are treated as equal. Only an unreadable source is an error.
//!
//! # Example
//!
//! ```rust,no_run
//! use miniquery::{Caster, CsvLoader, Schema, SortOrder, TracingSink, Value};
//! use miniquery::{apply_schema_to_rows, limit, order_by, query};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let raw = CsvLoader::new().load("people.csv", &TracingSink)?;
//!
//!     let schema = Schema::new().with_column("age", Caster::Int);
//!     let people = apply_schema_to_rows(&raw, &schema, &TracingSink);
//!
//!     let adults = query(&people, |row| {
//!         row.get("age").and_then(Value::as_i64).is_some_and(|age| age >= 18)
//!     });
//!     let oldest = limit(&order_by(&adults, "age", SortOrder::Descending, &TracingSink), 3);
//!
//!     for row in oldest.iter() {
//!         println!("{:?}", row.get("name"));
//!     }
//!     Ok(())
//! }
//! ```

mod helpers;
pub mod processor;

pub use processor::{
    CastError, IncomparablePolicy, LoadError, QueryError, SortOrder,
    csv_loader::{CsvLoader, LoadSummary, LoaderConfig, SkippedLine, load},
    diagnostics::{CollectingSink, Diagnostic, DiagnosticSink, TracingSink},
    query_builder::QueryBuilder,
    query_engine::{distinct, limit, order_by, order_by_with_policy, query, select, try_order_by},
    row::{Row, Table},
    schema::{CastKind, Caster, Schema, SchemaConfig, apply_schema_to_rows},
    value::{FieldValue, Value},
};
