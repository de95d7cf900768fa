use std::collections::HashMap;

use crate::datum::{Datum, FieldMap, Role, normalize_key};
use crate::result::OpResult;
use crate::spec::{Aggregate, Extremum, FindExtremum};

use super::{Evaluate, finite_values, scoped};

impl Evaluate for FindExtremum {
    /// Every row at the extremum is returned; ties are not broken.
    fn evaluate(&self, data: &[Datum], fields: &FieldMap) -> OpResult {
        let role = fields.role(&self.field);
        let rows = scoped(data, self.group.as_deref());
        let found = match self.aggregate {
            None => per_row(&rows, role, self.which),
            Some(aggregate) => per_category(&rows, role, self.which, aggregate),
        };
        OpResult::Rows(found.into_iter().cloned().collect())
    }
}

fn best(values: impl IntoIterator<Item = f64>, which: Extremum) -> Option<f64> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .reduce(|acc, v| match which {
            Extremum::Max => acc.max(v),
            Extremum::Min => acc.min(v),
        })
}

fn per_row<'a>(rows: &[&'a Datum], role: Role<'_>, which: Extremum) -> Vec<&'a Datum> {
    let Some(target) = best(rows.iter().map(|d| d.number(role)), which) else {
        return Vec::new();
    };
    rows.iter()
        .copied()
        .filter(|d| d.number(role) == target)
        .collect()
}

/// Combine rows sharing a category, then keep every row of the winning
/// categories.
fn per_category<'a>(rows: &[&'a Datum], role: Role<'_>, which: Extremum, aggregate: Aggregate) -> Vec<&'a Datum> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut categories: Vec<Vec<&'a Datum>> = Vec::new();
    for &datum in rows {
        let slot = *index.entry(normalize_key(&datum.target)).or_insert_with(|| {
            categories.push(Vec::new());
            categories.len() - 1
        });
        categories[slot].push(datum);
    }

    let totals: Vec<f64> = categories
        .iter()
        .map(|members| aggregate.apply(&finite_values(members.iter().copied(), role)))
        .collect();
    let Some(target) = best(totals.iter().copied(), which) else {
        return Vec::new();
    };
    categories
        .into_iter()
        .zip(totals)
        .filter(|(_, total)| *total == target)
        .flat_map(|(members, _)| members)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::fixtures::*;

    #[test]
    fn max_returns_all_ties() {
        let data = bars(&[("a", 5.0), ("b", 9.0), ("c", 9.0)]);
        let result = FindExtremum::new("value", Extremum::Max).evaluate(&data, &FieldMap::default());
        assert_eq!(targets(result.rows().unwrap()), vec!["b", "c"]);
    }

    #[test]
    fn min_skips_non_finite() {
        let data = bars(&[("a", f64::NAN), ("b", 2.0), ("c", 3.0)]);
        let result = FindExtremum::new("value", Extremum::Min).evaluate(&data, &FieldMap::default());
        assert_eq!(targets(result.rows().unwrap()), vec!["b"]);
    }

    #[test]
    fn empty_when_nothing_finite() {
        let data = bars(&[("a", f64::NAN)]);
        let result = FindExtremum::new("value", Extremum::Max).evaluate(&data, &FieldMap::default());
        assert!(result.is_empty());
    }

    #[test]
    fn aggregated_by_category() {
        let data = grouped(&[("a", "x", 5.0), ("a", "y", 5.0), ("b", "x", 8.0), ("b", "y", 1.0)]);
        let mut spec = FindExtremum::new("value", Extremum::Max);
        spec.aggregate = Some(Aggregate::Sum);
        let result = spec.evaluate(&data, &FieldMap::default());
        assert_eq!(targets(result.rows().unwrap()), vec!["a", "a"]);
    }

    #[test]
    fn aggregated_ties_keep_first_seen_order() {
        let data = grouped(&[("b", "x", 4.0), ("a", "x", 6.0), ("c", "x", 1.0), ("b", "y", 2.0), ("a", "y", 0.0)]);
        let mut spec = FindExtremum::new("value", Extremum::Max);
        spec.aggregate = Some(Aggregate::Sum);
        let result = spec.evaluate(&data, &FieldMap::default());
        let rows = result.rows().unwrap();
        assert_eq!(targets(rows), vec!["b", "b", "a", "a"]);
        assert_eq!(rows.iter().map(|d| d.value).collect::<Vec<_>>(), vec![4.0, 2.0, 6.0, 0.0]);
    }

    #[test]
    fn within_group() {
        let data = grouped(&[("a", "x", 5.0), ("b", "y", 50.0), ("c", "x", 7.0)]);
        let mut spec = FindExtremum::new("value", Extremum::Max);
        spec.group = Some("x".to_string());
        let result = spec.evaluate(&data, &FieldMap::default());
        assert_eq!(targets(result.rows().unwrap()), vec!["c"]);
    }
}
