//! Relational-style operators over [`Table`]s.
//!
//! Every operator takes a table by reference and returns a new one. Inputs are
//! never mutated; unmodified rows are shared with the result by `Rc`.

use std::borrow::Cow;
use std::cell::Cell;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::rc::Rc;

use crate::helpers::sort_helpers::merge_sort_by;
use crate::processor::{
    IncomparablePolicy, QueryError, SortOrder,
    diagnostics::{Diagnostic, DiagnosticSink},
    row::{Row, Table},
    value::FieldValue,
};

/// Rows for which `predicate` holds, in original order
pub fn query<V, P>(table: &Table<V>, predicate: P) -> Table<V>
where
    P: Fn(&Row<V>) -> bool,
{
    table
        .rows()
        .iter()
        .filter(|row| predicate(row))
        .cloned()
        .collect()
}

/// Filter followed by projection.
///
/// With no `columns` matching rows are returned unchanged (`SELECT *`).
/// Otherwise each matching row is rebuilt with only the listed columns it
/// actually has; unknown columns are silently ignored.
pub fn select<V, P>(table: &Table<V>, predicate: P, columns: &[&str]) -> Table<V>
where
    V: Clone,
    P: Fn(&Row<V>) -> bool,
{
    if columns.is_empty() {
        return query(table, predicate);
    }

    let mut out = Table::new();
    for row in table.rows().iter().filter(|row| predicate(row)) {
        let projected: Row<V> = columns
            .iter()
            .filter_map(|col| row.get(col).map(|v| (*col, v.clone())))
            .collect();
        out.push(projected);
    }
    out
}

/// First `n` rows. `n <= 0` gives an empty table; `n >= len` gives the table itself.
pub fn limit<V>(table: &Table<V>, n: i64) -> Table<V> {
    if n <= 0 {
        return Table::new();
    }
    match usize::try_from(n) {
        Ok(n) if n < table.len() => table.rows()[..n].iter().cloned().collect(),
        _ => table.clone(),
    }
}

/// Stable sort on the value at `key`.
///
/// Rows with an absent or null key go last in either direction. Keys that
/// cannot be compared with each other are treated as equal; one
/// [`Diagnostic::Comparison`] is emitted per call when that happens.
pub fn order_by<V, S>(table: &Table<V>, key: &str, order: SortOrder, sink: &S) -> Table<V>
where
    V: FieldValue,
    S: DiagnosticSink + ?Sized,
{
    let (sorted, mismatch) = sort_rows(table, key, order);
    if let Some((left, right)) = mismatch {
        sink.emit(Diagnostic::Comparison {
            key: key.to_string(),
            left,
            right,
        });
    }
    sorted
}

/// Like [`order_by`], but fails on the first incomparable pair of keys
pub fn try_order_by<V>(table: &Table<V>, key: &str, order: SortOrder) -> Result<Table<V>, QueryError>
where
    V: FieldValue,
{
    match sort_rows(table, key, order) {
        (sorted, None) => Ok(sorted),
        (_, Some((left, right))) => Err(QueryError::Incomparable {
            key: key.to_string(),
            left,
            right,
        }),
    }
}

/// [`order_by`] or [`try_order_by`] depending on `policy`
pub fn order_by_with_policy<V, S>(
    table: &Table<V>,
    key: &str,
    order: SortOrder,
    policy: IncomparablePolicy,
    sink: &S,
) -> Result<Table<V>, QueryError>
where
    V: FieldValue,
    S: DiagnosticSink + ?Sized,
{
    match policy {
        IncomparablePolicy::TreatAsEqual => Ok(order_by(table, key, order, sink)),
        IncomparablePolicy::Fail => try_order_by(table, key, order),
    }
}

type Mismatch = Option<(&'static str, &'static str)>;

fn sort_rows<V: FieldValue>(table: &Table<V>, key: &str, order: SortOrder) -> (Table<V>, Mismatch) {
    let mismatch: Cell<Mismatch> = Cell::new(None);

    let mut compare = |a: &Rc<Row<V>>, b: &Rc<Row<V>>| {
        let left = a.get(key).filter(|v| !v.is_null());
        let right = b.get(key).filter(|v| !v.is_null());

        match (left, right) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(l), Some(r)) => match l.compare(r) {
                Some(ord) if order == SortOrder::Descending => ord.reverse(),
                Some(ord) => ord,
                None => {
                    if mismatch.get().is_none() {
                        mismatch.set(Some((l.kind(), r.kind())));
                    }
                    Ordering::Equal
                }
            },
        }
    };

    let sorted = merge_sort_by(table.rows(), &mut compare);
    (sorted.into_iter().collect(), mismatch.get())
}

/// First occurrence of every distinct row, in original order.
///
/// Rows are identified by their `(column, text)` pairs sorted by column, so
/// column insertion order does not matter and `27` equals `"27"`. A null value
/// counts the same as a missing column.
pub fn distinct<V: FieldValue>(table: &Table<V>) -> Table<V> {
    let mut seen: HashSet<Vec<(&str, Cow<'_, str>)>> = HashSet::with_capacity(table.len());
    let mut out = Table::new();

    for row in table.rows() {
        if seen.insert(canonical_key(row)) {
            out.push_shared(Rc::clone(row));
        }
    }
    out
}

fn canonical_key<V: FieldValue>(row: &Row<V>) -> Vec<(&str, Cow<'_, str>)> {
    let mut key: Vec<(&str, Cow<'_, str>)> = row
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.as_str(), v.text()))
        .collect();
    key.sort_unstable_by(|a, b| a.0.cmp(b.0));
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::diagnostics::CollectingSink;
    use crate::processor::value::Value;

    fn sample_data() -> Table {
        vec![
            Row::from([
                ("name", Value::from("alice")),
                ("age", Value::Int(24)),
                ("member", Value::Bool(true)),
            ]),
            Row::from([
                ("name", Value::from("bob")),
                ("age", Value::Int(30)),
                ("member", Value::Bool(false)),
            ]),
            Row::from([
                ("name", Value::from("carol")),
                ("age", Value::Int(27)),
                ("member", Value::Bool(true)),
            ]),
        ]
        .into()
    }

    fn names(table: &Table) -> Vec<String> {
        table
            .iter()
            .map(|row| row.get("name").map(Value::to_string).unwrap_or_default())
            .collect()
    }

    fn ages(values: &[Option<i64>]) -> Table {
        values
            .iter()
            .enumerate()
            .map(|(i, age)| Row::from([("id", Value::from(i as i64)), ("age", Value::from(*age))]))
            .collect()
    }

    #[test]
    fn test_query_returns_only_matching_rows() {
        let data = sample_data();
        let result = query(&data, |row| {
            row.get("age").and_then(Value::as_i64).is_some_and(|age| age > 25)
        });
        assert_eq!(names(&result), vec!["bob", "carol"]);
    }

    #[test]
    fn test_query_always_false_and_always_true() {
        let data = sample_data();
        assert!(query(&data, |_| false).is_empty());
        assert_eq!(query(&data, |_| true), data);
    }

    #[test]
    fn test_query_does_not_modify_input() {
        let data = sample_data();
        let before = data.clone();
        let _ = query(&data, |row| row.get("member") == Some(&Value::Bool(true)));
        assert_eq!(before, data);
    }

    #[test]
    fn test_query_shares_rows() {
        let data = sample_data();
        let result = query(&data, |_| true);
        assert!(Rc::ptr_eq(&data.rows()[1], &result.rows()[1]));
    }

    #[test]
    fn test_select_specific_columns() {
        let data = sample_data();
        let result = select(&data, |row| row.get("member") == Some(&Value::Bool(true)), &["name", "email"]);
        assert_eq!(result.len(), 2);
        for row in result.iter() {
            assert!(row.contains_column("name"));
            assert!(!row.contains_column("email"));
            assert!(!row.contains_column("age"));
            assert_eq!(row.len(), 1);
        }
    }

    #[test]
    fn test_select_all_columns() {
        let data = sample_data();
        let result = select(&data, |row| row.get("name") == Some(&Value::from("carol")), &[]);
        assert_eq!(result.len(), 1);
        assert_eq!(result.get(0), data.get(2));
    }

    #[test]
    fn test_limit() {
        let table: Table = (1..=3).map(|id| Row::from([("id", Value::Int(id))])).collect();

        let first_two = limit(&table, 2);
        assert_eq!(first_two.len(), 2);
        assert_eq!(first_two.get(0).unwrap().get("id"), Some(&Value::Int(1)));
        assert_eq!(first_two.get(1).unwrap().get("id"), Some(&Value::Int(2)));

        assert_eq!(limit(&table, 3), table);
        assert_eq!(limit(&table, 10), table);
        assert!(limit(&table, 0).is_empty());
        assert!(limit(&table, -1).is_empty());
    }

    #[test]
    fn test_order_by_ascending_and_descending() {
        let table: Table = vec![
            Row::from([("name", Value::from("Joe")), ("age", Value::Int(30))]),
            Row::from([("name", Value::from("Ana")), ("age", Value::Int(27))]),
            Row::from([("name", Value::from("Zed")), ("age", Value::Int(45))]),
        ]
        .into();
        let sink = CollectingSink::new();

        let asc = order_by(&table, "age", SortOrder::Ascending, &sink);
        assert_eq!(names(&asc), vec!["Ana", "Joe", "Zed"]);

        let desc = order_by(&table, "age", SortOrder::Descending, &sink);
        assert_eq!(names(&desc), vec!["Zed", "Joe", "Ana"]);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_order_by_nulls_last_both_directions() {
        let table: Table = vec![
            Row::from([("name", Value::from("Joe")), ("age", Value::Null)]),
            Row::from([("name", Value::from("Ana")), ("age", Value::Int(27))]),
            Row::from([("name", Value::from("Kim"))]),
            Row::from([("name", Value::from("Zed")), ("age", Value::Int(45))]),
        ]
        .into();
        let sink = CollectingSink::new();

        let asc = order_by(&table, "age", SortOrder::Ascending, &sink);
        assert_eq!(names(&asc), vec!["Ana", "Zed", "Joe", "Kim"]);

        let desc = order_by(&table, "age", SortOrder::Descending, &sink);
        assert_eq!(names(&desc), vec!["Zed", "Ana", "Joe", "Kim"]);
    }

    #[test]
    fn test_order_by_is_stable() {
        let table = ages(&[Some(2), Some(1), Some(2), Some(1)]);
        let sorted = order_by(&table, "age", SortOrder::Ascending, &CollectingSink::new());
        let ids: Vec<_> = sorted.iter().map(|r| r.get("id").cloned().unwrap()).collect();
        assert_eq!(ids, vec![Value::Int(1), Value::Int(3), Value::Int(0), Value::Int(2)]);
    }

    #[test]
    fn test_order_by_incomparable_completes_and_warns_once() {
        let table: Table = vec![
            Row::from([("name", Value::from("Joe")), ("age", Value::from("old"))]),
            Row::from([("name", Value::from("Ana")), ("age", Value::Int(27))]),
            Row::from([("name", Value::from("Bo")), ("age", Value::Bool(true))]),
        ]
        .into();
        let sink = CollectingSink::new();

        let result = order_by(&table, "age", SortOrder::Ascending, &sink);
        assert_eq!(result.len(), 3);
        assert_eq!(sink.len(), 1);
        assert!(matches!(
            &sink.diagnostics()[0],
            Diagnostic::Comparison { key, .. } if key == "age"
        ));
    }

    #[test]
    fn test_try_order_by_fails_on_incomparable() {
        let table: Table = vec![
            Row::from([("age", Value::from("old"))]),
            Row::from([("age", Value::Int(27))]),
        ]
        .into();
        let err = try_order_by(&table, "age", SortOrder::Ascending).unwrap_err();
        assert!(matches!(err, QueryError::Incomparable { ref key, .. } if key == "age"));

        let ok = order_by_with_policy(
            &table,
            "age",
            SortOrder::Ascending,
            IncomparablePolicy::TreatAsEqual,
            &CollectingSink::new(),
        );
        assert_eq!(ok.unwrap().len(), 2);
    }

    #[test]
    fn test_order_by_does_not_modify_input() {
        let table = ages(&[Some(3), None, Some(1)]);
        let before = table.clone();
        let _ = order_by(&table, "age", SortOrder::Ascending, &CollectingSink::new());
        assert_eq!(table, before);
        assert_eq!(table.get(0).unwrap().get("age"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_order_by_on_raw_strings() {
        let table: Table<String> = vec![
            Row::from([("k", "b".to_string())]),
            Row::from([("k", "a".to_string())]),
        ]
        .into();
        let sorted = order_by(&table, "k", SortOrder::Ascending, &CollectingSink::new());
        assert_eq!(sorted.get(0).unwrap().get("k").map(String::as_str), Some("a"));
    }

    #[test]
    fn test_distinct_removes_duplicates() {
        let table: Table = vec![
            Row::from([("name", Value::from("Ana")), ("age", Value::Int(27))]),
            Row::from([("name", Value::from("Joe")), ("age", Value::Int(30))]),
            Row::from([("name", Value::from("Ana")), ("age", Value::Int(27))]),
            Row::from([("name", Value::from("Joe")), ("age", Value::Int(30))]),
        ]
        .into();
        let result = distinct(&table);
        assert_eq!(names(&result), vec!["Ana", "Joe"]);
    }

    #[test]
    fn test_distinct_ignores_key_order() {
        let mut first = Row::new();
        first.insert("name", Value::from("Ana"));
        first.insert("age", Value::Int(27));
        let mut second = Row::new();
        second.insert("age", Value::Int(27));
        second.insert("name", Value::from("Ana"));

        let table: Table = vec![first, second].into();
        assert_eq!(distinct(&table).len(), 1);
    }

    #[test]
    fn test_distinct_null_equals_missing() {
        let table: Table = vec![
            Row::from([("name", Value::from("Ana")), ("age", Value::Null)]),
            Row::from([("name", Value::from("Ana")), ("age", Value::Null)]),
            Row::from([("name", Value::from("Ana"))]),
        ]
        .into();
        assert_eq!(distinct(&table).len(), 1);
    }

    #[test]
    fn test_distinct_compares_values_by_text() {
        let table: Table = vec![
            Row::from([("age", Value::Int(27))]),
            Row::from([("age", Value::from("27"))]),
            Row::from([("age", Value::from("28"))]),
        ]
        .into();
        let result = distinct(&table);
        assert_eq!(result.len(), 2);
        assert_eq!(result.get(0).unwrap().get("age"), Some(&Value::Int(27)));
    }

    #[test]
    fn test_distinct_on_raw_strings() {
        let table: Table<String> = vec![
            Row::from([("k", "a".to_string())]),
            Row::from([("k", "a".to_string())]),
        ]
        .into();
        assert_eq!(distinct(&table).len(), 1);
    }

    #[test]
    fn test_distinct_is_idempotent() {
        let table = ages(&[Some(1), Some(1), None]);
        let table: Table = table
            .iter()
            .map(|row| Row::from([("age", row.get("age").cloned().unwrap_or_default())]))
            .collect();
        let once = distinct(&table);
        assert_eq!(once.len(), 2);
        assert_eq!(distinct(&once), once);
    }
}
