use crate::datum::{Datum, FieldMap};
use crate::result::{OpResult, ScalarResult};
use crate::spec::Diff;

use super::{Evaluate, find_datum};

impl Evaluate for Diff {
    /// `Null` unless both targets resolve to numeric rows.
    fn evaluate(&self, data: &[Datum], fields: &FieldMap) -> OpResult {
        let role = fields.role(&self.field);
        let (Some(a), Some(b)) = (find_datum(data, &self.target_a), find_datum(data, &self.target_b)) else {
            return OpResult::Null;
        };
        let (av, bv) = (a.number(role), b.number(role));
        if !av.is_finite() || !bv.is_finite() {
            return OpResult::Null;
        }
        let group = match (&a.group, &b.group) {
            (Some(x), Some(y)) if x == y => Some(x.clone()),
            _ => None,
        };
        OpResult::Scalar(ScalarResult {
            field: self.field.clone(),
            label: "Diff".to_string(),
            group,
            value: (av - bv).abs(),
            unit: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::fixtures::*;
    use crate::spec::Selector;

    #[test]
    fn absolute_difference() {
        let data = bars(&[("a", 3.0), ("b", 10.0)]);
        let fields = FieldMap::default();
        let ab = Diff::new("value", "a", "b").evaluate(&data, &fields);
        let ba = Diff::new("value", "b", "a").evaluate(&data, &fields);
        assert_eq!(ab.as_scalar().unwrap().value, 7.0);
        assert_eq!(ab, ba);
    }

    #[test]
    fn keyed_targets_keep_group() {
        let data = grouped(&[("a", "x", 3.0), ("b", "x", 1.0), ("b", "y", 100.0)]);
        let result = Diff::new("value", Selector::keyed("a", "x"), Selector::keyed("b", "x"))
            .evaluate(&data, &FieldMap::default());
        let scalar = result.as_scalar().unwrap();
        assert_eq!(scalar.value, 2.0);
        assert_eq!(scalar.group.as_deref(), Some("x"));
    }

    #[test]
    fn unresolved_is_null() {
        let data = bars(&[("a", 3.0)]);
        assert_eq!(Diff::new("value", "a", "zzz").evaluate(&data, &FieldMap::default()), OpResult::Null);
    }
}
