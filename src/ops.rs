//! Data operation evaluators.
//!
//! Each operation spec implements `Evaluate`. Evaluators read the dataset and
//! build new rows; they never mutate their input and never fail.

mod aggregate;
mod compare;
mod count;
mod diff;
mod extremum;
mod filter;
mod nth;
mod range;
mod retrieve;
mod select;
mod sort;

use serde_json::Value as Json;

use crate::datum::{Datum, FieldMap, Role, json_text, keys_equal, to_number};
use crate::result::OpResult;
use crate::spec::{OperationSpec, Selector};

/// Evaluate an operation against a dataset.
pub trait Evaluate {
    fn evaluate(&self, data: &[Datum], fields: &FieldMap) -> OpResult;
}

impl Evaluate for OperationSpec {
    fn evaluate(&self, data: &[Datum], fields: &FieldMap) -> OpResult {
        let result = match self {
            OperationSpec::RetrieveValue(spec) => spec.evaluate(data, fields),
            OperationSpec::Filter(spec) => spec.evaluate(data, fields),
            OperationSpec::Compare(spec) => spec.evaluate(data, fields),
            OperationSpec::CompareBool(spec) => spec.evaluate(data, fields),
            OperationSpec::DetermineRange(spec) => spec.evaluate(data, fields),
            OperationSpec::FindExtremum(spec) => spec.evaluate(data, fields),
            OperationSpec::Sort(spec) => spec.evaluate(data, fields),
            OperationSpec::Count(spec) => spec.evaluate(data, fields),
            OperationSpec::Sum(spec) => spec.evaluate(data, fields),
            OperationSpec::Average(spec) => spec.evaluate(data, fields),
            OperationSpec::Diff(spec) => spec.evaluate(data, fields),
            OperationSpec::Nth(spec) => spec.evaluate(data, fields),
            OperationSpec::SelectOne(spec) => spec.evaluate(data, fields),
            OperationSpec::SelectMultiple(spec) => spec.evaluate(data, fields),
        };
        tracing::debug!(op = self.name(), rows = data.len(), empty = result.is_empty(), "evaluated");
        result
    }
}

/// Evaluate an operation against a dataset.
pub fn evaluate(data: &[Datum], spec: &OperationSpec, fields: &FieldMap) -> OpResult {
    spec.evaluate(data, fields)
}

/// Restrict rows to one series when `group` is given.
pub(crate) fn scoped<'a>(data: &'a [Datum], group: Option<&str>) -> Vec<&'a Datum> {
    match group {
        Some(g) => data
            .iter()
            .filter(|d| d.group.as_deref() == Some(g))
            .collect(),
        None => data.iter().collect(),
    }
}

/// Every row the selector matches, in dataset order.
pub(crate) fn find_all<'a, I>(rows: I, selector: &Selector) -> Vec<&'a Datum>
where
    I: IntoIterator<Item = &'a Datum>,
{
    let keys = selector.keys();
    rows.into_iter()
        .enumerate()
        .filter(|(position, datum)| keys.matches(datum, *position))
        .map(|(_, datum)| datum)
        .collect()
}

/// The first row the selector matches.
pub(crate) fn find_datum<'a>(data: &'a [Datum], selector: &Selector) -> Option<&'a Datum> {
    let keys = selector.keys();
    let found = data
        .iter()
        .enumerate()
        .find(|(position, datum)| keys.matches(datum, *position))
        .map(|(_, datum)| datum);
    if found.is_none() {
        tracing::warn!(selector = %selector.label(), "selector matched no rows");
    }
    found
}

/// The finite values of a field across rows.
pub(crate) fn finite_values<'a, I>(rows: I, role: Role<'_>) -> Vec<f64>
where
    I: IntoIterator<Item = &'a Datum>,
{
    rows.into_iter()
        .map(|d| d.number(role))
        .filter(|v| v.is_finite())
        .collect()
}

/// Equality of a row's field with a value: numeric when both sides are
/// numbers, date-aware for category keys, textual otherwise.
pub(crate) fn field_equals(datum: &Datum, role: Role<'_>, value: &Json) -> bool {
    let Some(text) = datum.text(role) else {
        return false;
    };
    match (datum.number(role), to_number(value)) {
        (lhs, rhs) if lhs.is_finite() && rhs.is_finite() => lhs == rhs,
        _ if role == Role::Category => keys_equal(&text, &json_text(value)),
        _ => text == json_text(value),
    }
}

pub(crate) fn owned(rows: Vec<&Datum>) -> Vec<Datum> {
    rows.into_iter().cloned().collect()
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::spec::{Extremum, FindExtremum};

    #[test]
    fn dispatch_through_operation_spec() {
        let data = bars(&[("a", 5.0), ("b", 9.0), ("c", 9.0)]);
        let spec: OperationSpec = FindExtremum::new("value", Extremum::Max).into();
        match evaluate(&data, &spec, &FieldMap::default()) {
            OpResult::Rows(rows) => assert_eq!(targets(&rows), vec!["b", "c"]),
            _ => panic!("expected rows"),
        }
    }

    #[test]
    fn scoped_by_group() {
        let data = grouped(&[("a", "x", 1.0), ("a", "y", 2.0), ("b", "x", 3.0)]);
        assert_eq!(scoped(&data, Some("x")).len(), 2);
        assert_eq!(scoped(&data, None).len(), 3);
    }

    #[test]
    fn find_datum_takes_first_match() {
        let data = grouped(&[("a", "x", 1.0), ("a", "y", 2.0)]);
        let found = find_datum(&data, &Selector::from("a")).unwrap();
        assert_eq!(found.value, 1.0);
        let found = find_datum(&data, &Selector::keyed("a", "y")).unwrap();
        assert_eq!(found.value, 2.0);
        assert!(find_datum(&data, &Selector::keyed("a", "z")).is_none());
    }

    #[test]
    fn find_by_date_key() {
        let data = bars(&[("2020-01-01", 1.0), ("2021-01-01", 2.0)]);
        let found = find_datum(&data, &Selector::from("2021")).unwrap();
        assert_eq!(found.value, 2.0);
    }

    #[test]
    fn find_by_id() {
        let data = vec![Datum::new("Sum", 10.0).with_id("ops_0")];
        assert!(find_datum(&data, &Selector::from("ops_0")).is_some());
    }

    #[test]
    fn find_by_index() {
        let data = bars(&[("a", 1.0), ("b", 2.0)]);
        assert_eq!(find_all(&data, &Selector::index(1))[0].target, "b");
    }

    #[test]
    fn empty_selector_matches_nothing() {
        let data = bars(&[("a", 1.0)]);
        let selector = Selector::Keyed(Default::default());
        assert!(find_all(&data, &selector).is_empty());
    }
}
