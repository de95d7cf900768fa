use std::collections::HashSet;

use crate::datum::{Datum, FieldMap, Role, compare_keys, normalize_key};
use crate::result::OpResult;
use crate::spec::{Nth, Side};

use super::Evaluate;

impl Evaluate for Nth {
    /// Picks the n-th distinct key in axis order, 1-based, and returns every
    /// row with that key. Out of range is empty.
    fn evaluate(&self, data: &[Datum], fields: &FieldMap) -> OpResult {
        let role = self
            .field
            .as_deref()
            .map(|f| fields.role(f))
            .unwrap_or(Role::Category);
        let key_of = |d: &Datum| d.text(role).map(|t| normalize_key(&t));

        let mut seen = HashSet::new();
        let mut keys: Vec<String> = data
            .iter()
            .filter_map(|d| key_of(d))
            .filter(|key| seen.insert(key.clone()))
            .collect();
        keys.sort_by(|a, b| compare_keys(a, b));

        let total = keys.len() as i64;
        if self.n <= 0 || self.n > total {
            return OpResult::Rows(Vec::new());
        }
        let index = match self.from {
            Side::Left => self.n - 1,
            Side::Right => total - self.n,
        } as usize;
        let picked = &keys[index];

        OpResult::Rows(
            data.iter()
                .filter(|&d| key_of(d).as_ref() == Some(picked))
                .cloned()
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::fixtures::*;

    fn months() -> Vec<Datum> {
        grouped(&[
            ("2020-03", "a", 3.0),
            ("2020-01", "a", 1.0),
            ("2020-05", "a", 5.0),
            ("2020-02", "a", 2.0),
            ("2020-04", "a", 4.0),
            ("2020-01", "b", 10.0),
        ])
    }

    fn nth(data: &[Datum], n: i64, from: Side) -> Vec<f64> {
        let result = Nth::new(n, from).evaluate(data, &FieldMap::default());
        result.rows().unwrap().iter().map(|d| d.value).collect()
    }

    #[test]
    fn left_is_chronological() {
        assert_eq!(nth(&months(), 1, Side::Left), vec![1.0, 10.0]);
        assert_eq!(nth(&months(), 2, Side::Left), vec![2.0]);
    }

    #[test]
    fn right_mirrors_left() {
        let data = months();
        assert_eq!(nth(&data, 3, Side::Right), nth(&data, 3, Side::Left));
        assert_eq!(nth(&data, 1, Side::Right), vec![5.0]);
        assert_eq!(nth(&data, 2, Side::Right), nth(&data, 4, Side::Left));
    }

    #[test]
    fn out_of_range_is_empty() {
        assert!(nth(&months(), 0, Side::Left).is_empty());
        assert!(nth(&months(), -1, Side::Left).is_empty());
        assert!(nth(&months(), 6, Side::Right).is_empty());
        assert!(nth(&[], 1, Side::Left).is_empty());
    }

    #[test]
    fn natural_order_for_labels() {
        let data = bars(&[("Q10", 10.0), ("Q2", 2.0), ("Q1", 1.0)]);
        assert_eq!(nth(&data, 2, Side::Left), vec![2.0]);
    }

    #[test]
    fn mixed_date_and_label_keys() {
        let data = bars(&[("total", 9.0), ("2021", 2.0), ("2020-06", 1.0), ("avg", 5.0)]);
        assert_eq!(nth(&data, 1, Side::Left), vec![1.0]);
        assert_eq!(nth(&data, 2, Side::Left), vec![2.0]);
        assert_eq!(nth(&data, 1, Side::Right), vec![9.0]);
    }

    #[test]
    fn nth_series() {
        let data = grouped(&[("a", "2021", 1.0), ("a", "2019", 2.0), ("b", "2020", 3.0)]);
        let mut spec = Nth::new(1, Side::Left);
        spec.field = Some("group".to_string());
        let result = spec.evaluate(&data, &FieldMap::default());
        assert_eq!(targets(result.rows().unwrap()), vec!["a"]);
        assert_eq!(result.rows().unwrap()[0].value, 2.0);
    }
}
