use std::collections::HashSet;

use crate::datum::{Datum, FieldMap, normalize_key};
use crate::result::{OpResult, ScalarResult};
use crate::spec::{Count, CountLevel};

use super::Evaluate;

impl Evaluate for Count {
    /// Counts the input as given; filter first to count a subset.
    fn evaluate(&self, data: &[Datum], _fields: &FieldMap) -> OpResult {
        let count = match self.level {
            CountLevel::Row => data.len(),
            CountLevel::Category => data
                .iter()
                .map(|d| normalize_key(&d.target))
                .collect::<HashSet<_>>()
                .len(),
            CountLevel::Series => data
                .iter()
                .filter_map(|d| d.group.as_deref())
                .collect::<HashSet<_>>()
                .len(),
        };
        OpResult::Scalar(ScalarResult {
            field: self.field.clone().unwrap_or_else(|| "target".to_string()),
            label: "Count".to_string(),
            group: None,
            value: count as f64,
            unit: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::fixtures::*;

    fn count(data: &[Datum], level: CountLevel) -> f64 {
        let spec = Count { level, field: None };
        spec.evaluate(data, &FieldMap::default()).as_scalar().unwrap().value
    }

    #[test]
    fn count_levels() {
        let data = grouped(&[("a", "x", 1.0), ("a", "y", 2.0), ("b", "x", 3.0)]);
        assert_eq!(count(&data, CountLevel::Row), 3.0);
        assert_eq!(count(&data, CountLevel::Category), 2.0);
        assert_eq!(count(&data, CountLevel::Series), 2.0);
    }

    #[test]
    fn count_empty() {
        assert_eq!(count(&[], CountLevel::Row), 0.0);
    }

    #[test]
    fn series_ignores_missing_groups() {
        let data = bars(&[("a", 1.0), ("b", 2.0)]);
        assert_eq!(count(&data, CountLevel::Series), 0.0);
    }

    #[test]
    fn count_label() {
        let result = Count::default().evaluate(&bars(&[("a", 1.0)]), &FieldMap::default());
        assert_eq!(result.as_scalar().unwrap().label, "Count");
    }
}
