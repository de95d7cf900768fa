use crate::datum::{Datum, FieldMap};
use crate::result::OpResult;
use crate::spec::{Compare, CompareBool, CompareMode, Operator};

use super::{Evaluate, find_all, find_datum, finite_values, owned};

impl Evaluate for Compare {
    fn evaluate(&self, data: &[Datum], fields: &FieldMap) -> OpResult {
        let role = fields.role(&self.field);
        let a = find_all(data, &self.target_a);
        let b = find_all(data, &self.target_b);
        let (la, lb) = (self.target_a.label(), self.target_b.label());

        let av = self.aggregate.apply(&finite_values(a.iter().copied(), role));
        let bv = self.aggregate.apply(&finite_values(b.iter().copied(), role));
        if a.is_empty() || b.is_empty() || !av.is_finite() || !bv.is_finite() {
            tracing::warn!(a = %la, b = %lb, "compare: one or both targets not found");
            return match self.mode {
                CompareMode::Equal | CompareMode::NotEqual => {
                    OpResult::boolean(format!("{} vs {}: target not found", la, lb), false)
                }
                CompareMode::Larger | CompareMode::Smaller => OpResult::Rows(Vec::new()),
            };
        }

        match self.mode {
            CompareMode::Equal => OpResult::boolean(format!("{} ({}) == {} ({})", la, av, lb, bv), av == bv),
            CompareMode::NotEqual => OpResult::boolean(format!("{} ({}) != {} ({})", la, av, lb, bv), av != bv),
            CompareMode::Larger | CompareMode::Smaller => {
                let a_wins = if self.mode == CompareMode::Larger { av > bv } else { av < bv };
                if av == bv {
                    OpResult::Rows(Vec::new())
                } else if a_wins {
                    OpResult::Rows(owned(a))
                } else {
                    OpResult::Rows(owned(b))
                }
            }
        }
    }
}

impl Evaluate for CompareBool {
    fn evaluate(&self, data: &[Datum], fields: &FieldMap) -> OpResult {
        let role = fields.role(&self.field);
        let (la, lb) = (self.target_a.label(), self.target_b.label());
        let op = &self.operator;

        let (Some(a), Some(b)) = (find_datum(data, &self.target_a), find_datum(data, &self.target_b)) else {
            return OpResult::boolean(format!("{} {} {}: target not found", la, op, lb), false);
        };
        let (av, bv) = (a.number(role), b.number(role));
        if !av.is_finite() || !bv.is_finite() {
            return OpResult::boolean(format!("{} {} {}: value is not a number", la, op, lb), false);
        }

        let value = match op {
            Operator::Gt => av > bv,
            Operator::Ge => av >= bv,
            Operator::Lt => av < bv,
            Operator::Le => av <= bv,
            Operator::Eq => av == bv,
            Operator::Ne => av != bv,
            _ => {
                return OpResult::boolean(format!("{} {} {}: unsupported operator", la, op, lb), false);
            }
        };
        OpResult::boolean(format!("{} ({}) {} {} ({})", la, av, op, lb, bv), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::fixtures::*;
    use crate::result::BooleanResult;
    use crate::spec::Aggregate;

    #[test]
    fn larger_returns_winner_rows() {
        let data = bars(&[("a", 3.0), ("b", 7.0)]);
        let result = Compare::new("value", "a", "b").evaluate(&data, &FieldMap::default());
        assert_eq!(targets(result.rows().unwrap()), vec!["b"]);
    }

    #[test]
    fn smaller_returns_loser_rows() {
        let data = bars(&[("a", 3.0), ("b", 7.0)]);
        let result = Compare::new("value", "a", "b")
            .mode(CompareMode::Smaller)
            .evaluate(&data, &FieldMap::default());
        assert_eq!(targets(result.rows().unwrap()), vec!["a"]);
    }

    #[test]
    fn tie_is_empty() {
        let data = bars(&[("a", 5.0), ("b", 5.0)]);
        let result = Compare::new("value", "a", "b").evaluate(&data, &FieldMap::default());
        assert!(result.is_empty());
    }

    #[test]
    fn aggregates_across_series() {
        let data = grouped(&[("a", "x", 1.0), ("a", "y", 9.0), ("b", "x", 6.0), ("b", "y", 2.0)]);
        let fields = FieldMap::default();
        let sum = Compare::new("value", "a", "b").evaluate(&data, &fields);
        assert_eq!(sum.rows().unwrap().len(), 2);
        assert_eq!(sum.rows().unwrap()[0].target, "a");

        let min = Compare::new("value", "a", "b")
            .aggregate(Aggregate::Min)
            .evaluate(&data, &fields);
        assert_eq!(min.rows().unwrap()[0].target, "b");
    }

    #[test]
    fn equality_modes_are_boolean() {
        let data = bars(&[("a", 5.0), ("b", 5.0)]);
        let fields = FieldMap::default();
        let eq = Compare::new("value", "a", "b").mode(CompareMode::Equal).evaluate(&data, &fields);
        assert_eq!(eq.as_bool(), Some(true));
        let ne = Compare::new("value", "a", "b").mode(CompareMode::NotEqual).evaluate(&data, &fields);
        assert_eq!(ne.as_bool(), Some(false));
    }

    #[test]
    fn missing_target() {
        let data = bars(&[("a", 5.0)]);
        let result = Compare::new("value", "a", "zzz").evaluate(&data, &FieldMap::default());
        assert!(result.is_empty());
    }

    #[test]
    fn compare_bool_relations() {
        let data = bars(&[("a", 3.0), ("b", 7.0)]);
        let fields = FieldMap::default();
        let check = |op: &str| {
            CompareBool::new("value", "a", "b", Operator::from(op))
                .evaluate(&data, &fields)
                .as_bool()
        };
        assert_eq!(check("<"), Some(true));
        assert_eq!(check("<="), Some(true));
        assert_eq!(check(">"), Some(false));
        assert_eq!(check("=="), Some(false));
        assert_eq!(check("!="), Some(true));
    }

    #[test]
    fn compare_bool_description() {
        let data = bars(&[("a", 3.0), ("b", 7.0)]);
        let result = CompareBool::new("value", "a", "b", Operator::Lt).evaluate(&data, &FieldMap::default());
        match result {
            OpResult::Boolean(BooleanResult { description, value }) => {
                assert_eq!(description, "a (3) < b (7)");
                assert!(value);
            }
            _ => panic!("expected boolean"),
        }
    }

    #[test]
    fn compare_bool_unresolved_is_flagged_false() {
        let data = bars(&[("a", 3.0), ("b", f64::NAN)]);
        let fields = FieldMap::default();
        let missing = CompareBool::new("value", "a", "zzz", Operator::Lt).evaluate(&data, &fields);
        match missing {
            OpResult::Boolean(b) => {
                assert!(!b.value);
                assert!(b.description.contains("not found"));
            }
            _ => panic!("expected boolean"),
        }
        let nan = CompareBool::new("value", "a", "b", Operator::Lt).evaluate(&data, &fields);
        assert_eq!(nan.as_bool(), Some(false));
        let odd = CompareBool::new("value", "a", "a", Operator::Contains).evaluate(&data, &fields);
        assert_eq!(odd.as_bool(), Some(false));
    }
}
