use std::collections::HashSet;

use chrono::NaiveDate;
use serde_json::Value as Json;

use crate::datum::{Datum, FieldMap, Role, json_text, normalize_key, parse_date, to_number};
use crate::result::OpResult;
use crate::spec::{Filter, Operator};

use super::{Evaluate, field_equals, scoped};

impl Evaluate for Filter {
    fn evaluate(&self, data: &[Datum], fields: &FieldMap) -> OpResult {
        let role = fields.role(&self.field);
        let rows = scoped(data, self.group.as_deref())
            .into_iter()
            .filter(|datum| matches(datum, role, &self.operator, &self.value))
            .cloned()
            .collect();
        OpResult::Rows(rows)
    }
}

/// Test one row. Rows without the field never match.
fn matches(datum: &Datum, role: Role<'_>, operator: &Operator, value: &Json) -> bool {
    let Some(text) = datum.text(role) else {
        return false;
    };
    let key = |s: &str| match role {
        Role::Category => normalize_key(s),
        _ => s.to_string(),
    };

    match operator {
        Operator::In | Operator::NotIn => {
            let candidates: HashSet<String> = as_array(value).iter().map(|v| key(&json_text(v))).collect();
            let present = candidates.contains(&key(&text));
            (*operator == Operator::In) == present
        }
        Operator::Contains => {
            let haystack = text.to_lowercase();
            as_array(value)
                .iter()
                .any(|v| haystack.contains(&json_text(v).to_lowercase()))
        }
        Operator::Between => between(datum, role, &text, value),
        Operator::Gt | Operator::Ge | Operator::Lt | Operator::Le => {
            let lhs = datum.number(role);
            let rhs = to_number(value);
            if lhs.is_nan() || rhs.is_nan() {
                return false;
            }
            match operator {
                Operator::Gt => lhs > rhs,
                Operator::Ge => lhs >= rhs,
                Operator::Lt => lhs < rhs,
                _ => lhs <= rhs,
            }
        }
        Operator::Eq | Operator::Ne => (*operator == Operator::Eq) == field_equals(datum, role, value),
        Operator::Unknown(name) => {
            tracing::debug!(operator = %name, "unknown filter operator");
            false
        }
    }
}

/// Inclusive range test. Dates when the field and both endpoints parse as
/// dates, numbers otherwise.
fn between(datum: &Datum, role: Role<'_>, text: &str, value: &Json) -> bool {
    let Some((low, high)) = endpoints(value) else {
        return false;
    };
    let dates = (parse_date(text), date_of(low), date_of(high));
    if let (Some(d), Some(lo), Some(hi)) = dates {
        return lo <= d && d <= hi;
    }
    let n = datum.number(role);
    let (lo, hi) = (to_number(low), to_number(high));
    !n.is_nan() && !lo.is_nan() && !hi.is_nan() && lo <= n && n <= hi
}

/// `[low, high]` or `{"min": low, "max": high}`.
fn endpoints(value: &Json) -> Option<(&Json, &Json)> {
    match value {
        Json::Array(items) if items.len() == 2 => Some((&items[0], &items[1])),
        Json::Object(map) => {
            let low = map.get("min").or_else(|| map.get("from"))?;
            let high = map.get("max").or_else(|| map.get("to"))?;
            Some((low, high))
        }
        _ => None,
    }
}

fn date_of(value: &Json) -> Option<NaiveDate> {
    match value {
        Json::String(s) => parse_date(s),
        Json::Number(_) => parse_date(&json_text(value)),
        _ => None,
    }
}

fn as_array(value: &Json) -> Vec<Json> {
    match value {
        Json::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::fixtures::*;
    use serde_json::json;

    fn run(data: &[Datum], field: &str, op: &str, value: Json) -> Vec<String> {
        let result = Filter::new(field, Operator::from(op), value).evaluate(data, &FieldMap::default());
        match result {
            OpResult::Rows(rows) => rows.into_iter().map(|d| d.target).collect(),
            _ => panic!("expected rows"),
        }
    }

    #[test]
    fn numeric_comparisons() {
        let data = bars(&[("a", 1.0), ("b", 5.0), ("c", 9.0)]);
        assert_eq!(run(&data, "value", ">", json!(4)), vec!["b", "c"]);
        assert_eq!(run(&data, "value", ">=", json!("5")), vec!["b", "c"]);
        assert_eq!(run(&data, "value", "<", json!(5)), vec!["a"]);
        assert_eq!(run(&data, "value", "<=", json!(5)), vec!["a", "b"]);
        assert!(run(&data, "value", ">", json!("abc")).is_empty());
    }

    #[test]
    fn equality() {
        let data = bars(&[("a", 1.0), ("b", 5.0)]);
        assert_eq!(run(&data, "value", "==", json!(5)), vec!["b"]);
        assert_eq!(run(&data, "target", "==", json!("a")), vec!["a"]);
        assert_eq!(run(&data, "target", "!=", json!("a")), vec!["b"]);
    }

    #[test]
    fn equality_on_dates() {
        let data = bars(&[("2020-01-01", 1.0), ("2021-01-01", 2.0)]);
        assert_eq!(run(&data, "target", "==", json!("2021")), vec!["2021-01-01"]);
    }

    #[test]
    fn membership() {
        let data = bars(&[("a", 1.0), ("b", 2.0), ("c", 3.0)]);
        assert_eq!(run(&data, "target", "in", json!(["a", "c"])), vec!["a", "c"]);
        assert_eq!(run(&data, "target", "not-in", json!(["a", "c"])), vec!["b"]);
        assert_eq!(run(&data, "value", "in", json!([2])), vec!["b"]);
    }

    #[test]
    fn contains_is_case_insensitive() {
        let data = bars(&[("South Korea", 1.0), ("Japan", 2.0)]);
        assert_eq!(run(&data, "target", "contains", json!("korea")), vec!["South Korea"]);
        assert_eq!(run(&data, "target", "contains", json!(["jap", "xyz"])), vec!["Japan"]);
    }

    #[test]
    fn between_dates_inclusive() {
        let data = bars(&[("2019-12-31", 1.0), ("2020-01-01", 2.0), ("2020-06-30", 3.0), ("2020-07-01", 4.0)]);
        assert_eq!(
            run(&data, "target", "between", json!(["2020-01-01", "2020-06-30"])),
            vec!["2020-01-01", "2020-06-30"]
        );
    }

    #[test]
    fn between_numbers() {
        let data = bars(&[("a", 1.0), ("b", 5.0), ("c", 9.0)]);
        assert_eq!(run(&data, "value", "between", json!([1, 5])), vec!["a", "b"]);
        assert_eq!(run(&data, "value", "between", json!({"min": 5, "max": 9})), vec!["b", "c"]);
        assert!(run(&data, "value", "between", json!(5)).is_empty());
    }

    #[test]
    fn unknown_operator_matches_nothing() {
        let data = bars(&[("a", 1.0)]);
        assert!(run(&data, "value", "~=", json!(1)).is_empty());
    }

    #[test]
    fn missing_field_never_matches() {
        let data = vec![Datum::new("a", 1.0), Datum::new("b", 2.0).with_field("region", json!("Asia"))];
        assert_eq!(run(&data, "region", "!=", json!("Europe")), vec!["b"]);
    }

    #[test]
    fn external_field_names() {
        let fields = FieldMap::new("country", "rating");
        let data = bars(&[("KOR", 7.0), ("JPN", 8.0)]);
        let result = Filter::new("rating", Operator::Gt, json!(7.5)).evaluate(&data, &fields);
        assert_eq!(targets(result.rows().unwrap()), vec!["JPN"]);
        let result = Filter::new("country", Operator::Eq, json!("KOR")).evaluate(&data, &fields);
        assert_eq!(targets(result.rows().unwrap()), vec!["KOR"]);
    }

    #[test]
    fn filter_within_group() {
        let data = grouped(&[("a", "x", 1.0), ("b", "y", 2.0), ("c", "x", 3.0)]);
        let result = Filter::new("value", Operator::Gt, json!(0))
            .in_group("x")
            .evaluate(&data, &FieldMap::default());
        assert_eq!(targets(result.rows().unwrap()), vec!["a", "c"]);
    }

    #[test]
    fn filter_leaves_input_untouched() {
        let data = bars(&[("a", 1.0), ("b", 2.0)]);
        let before = data.clone();
        let _ = Filter::new("value", Operator::Gt, json!(1)).evaluate(&data, &FieldMap::default());
        assert_eq!(data, before);
    }
}
