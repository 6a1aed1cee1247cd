use std::fmt;

use crate::processor::{
    IncomparablePolicy, QueryError, SortOrder,
    diagnostics::{DiagnosticSink, TracingSink},
    query_engine,
    row::{Row, Table},
    value::FieldValue,
};

type Predicate<'a, V> = Box<dyn Fn(&Row<V>) -> bool + 'a>;

enum Step<'a, V> {
    Filter(Predicate<'a, V>),
    Project(Vec<String>),
    OrderBy { key: String, order: SortOrder },
    Distinct,
    Limit(i64),
}

impl<V> fmt::Debug for Step<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Filter(_) => f.write_str("Filter(..)"),
            Step::Project(cols) => f.debug_tuple("Project").field(cols).finish(),
            Step::OrderBy { key, order } => f
                .debug_struct("OrderBy")
                .field("key", key)
                .field("order", order)
                .finish(),
            Step::Distinct => f.write_str("Distinct"),
            Step::Limit(n) => f.debug_tuple("Limit").field(n).finish(),
        }
    }
}

/// Fluent chain of query operators over one table.
///
/// Steps run in the order they were added, each feeding the next.
///
/// # Examples
///
/// ```rust
/// # use miniquery::{Row, Table, Value, SortOrder};
/// let table: Table = vec![
///     Row::from([("name", Value::from("Zed")), ("age", Value::Int(45))]),
///     Row::from([("name", Value::from("Ana")), ("age", Value::Int(27))]),
/// ]
/// .into();
///
/// let result = table
///     .query()
///     .filter(|row| row.get("age").and_then(Value::as_i64).is_some_and(|a| a > 18))
///     .order_by("age", SortOrder::Ascending)
///     .select(&["name"])
///     .limit(1)
///     .execute()
///     .unwrap();
///
/// assert_eq!(result.get(0).unwrap().get("name"), Some(&Value::from("Ana")));
/// ```
pub struct QueryBuilder<'a, V> {
    table: Table<V>,
    steps: Vec<Step<'a, V>>,
    sink: &'a dyn DiagnosticSink,
    policy: IncomparablePolicy,
}

impl<V> fmt::Debug for QueryBuilder<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("rows", &self.table.len())
            .field("steps", &self.steps)
            .field("policy", &self.policy)
            .finish()
    }
}

impl<'a, V> QueryBuilder<'a, V> {
    pub fn new(table: Table<V>) -> Self {
        Self {
            table,
            steps: Vec::new(),
            sink: &TracingSink,
            policy: IncomparablePolicy::default(),
        }
    }

    /// Keep rows matching `predicate`
    pub fn filter<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&Row<V>) -> bool + 'a,
    {
        self.steps.push(Step::Filter(Box::new(predicate)));
        self
    }

    /// Project onto `columns`; an empty list keeps every column
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.steps.push(Step::Project(
            columns.iter().map(|c| c.to_string()).collect(),
        ));
        self
    }

    pub fn order_by(mut self, key: &str, order: SortOrder) -> Self {
        self.steps.push(Step::OrderBy {
            key: key.to_string(),
            order,
        });
        self
    }

    pub fn distinct(mut self) -> Self {
        self.steps.push(Step::Distinct);
        self
    }

    /// Limit number of results
    pub fn limit(mut self, n: i64) -> Self {
        self.steps.push(Step::Limit(n));
        self
    }

    /// Send diagnostics somewhere other than `tracing`
    pub fn with_sink<'b>(self, sink: &'b dyn DiagnosticSink) -> QueryBuilder<'b, V>
    where
        'a: 'b,
    {
        QueryBuilder {
            table: self.table,
            steps: self.steps,
            sink,
            policy: self.policy,
        }
    }

    /// Make `order_by` steps fail on incomparable keys instead of treating them as equal
    pub fn strict_ordering(mut self) -> Self {
        self.policy = IncomparablePolicy::Fail;
        self
    }
}

impl<V: FieldValue> QueryBuilder<'_, V> {
    /// Execute every step in order
    pub fn execute(self) -> Result<Table<V>, QueryError> {
        let step_count = self.steps.len();
        let mut table = self.table;

        for step in &self.steps {
            table = match step {
                Step::Filter(predicate) => query_engine::query(&table, predicate),
                Step::Project(columns) => {
                    let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
                    query_engine::select(&table, |_| true, &columns)
                }
                Step::OrderBy { key, order } => query_engine::order_by_with_policy(
                    &table,
                    key,
                    *order,
                    self.policy,
                    self.sink,
                )?,
                Step::Distinct => query_engine::distinct(&table),
                Step::Limit(n) => query_engine::limit(&table, *n),
            };
        }

        tracing::debug!(steps = step_count, rows = table.len(), "query executed");
        Ok(table)
    }
}
