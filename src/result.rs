//! Results of data operations.
//!
//! Evaluation never fails. An operation that cannot produce an answer
//! returns an empty row list, `OpResult::Null` or a non-finite value, and
//! the caller decides what that means.

use serde::Serialize;

use crate::datum::Datum;

/// A single computed number.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalarResult {
    pub field: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// A yes/no answer with a readable description of the question.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BooleanResult {
    pub description: String,
    pub value: bool,
}

/// The span of a field, with the rows at each end.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalResult {
    pub field: String,
    pub min: f64,
    pub max: f64,
    pub min_rows: Vec<Datum>,
    pub max_rows: Vec<Datum>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OpResult {
    Scalar(ScalarResult),
    Boolean(BooleanResult),
    Interval(IntervalResult),
    Rows(Vec<Datum>),
    Null,
}

impl OpResult {
    pub fn scalar(field: impl Into<String>, label: impl Into<String>, value: f64) -> Self {
        OpResult::Scalar(ScalarResult {
            field: field.into(),
            label: label.into(),
            group: None,
            value,
            unit: None,
        })
    }

    pub fn boolean(description: impl Into<String>, value: bool) -> Self {
        OpResult::Boolean(BooleanResult {
            description: description.into(),
            value,
        })
    }

    /// The rows, when the result is a row list.
    pub fn rows(&self) -> Option<&[Datum]> {
        match self {
            OpResult::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&ScalarResult> {
        match self {
            OpResult::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OpResult::Boolean(b) => Some(b.value),
            _ => None,
        }
    }

    /// Returns true if the operation found nothing: no rows, `Null`, or a
    /// scalar that is not a finite number.
    pub fn is_empty(&self) -> bool {
        match self {
            OpResult::Rows(rows) => rows.is_empty(),
            OpResult::Null => true,
            OpResult::Scalar(s) => !s.value.is_finite(),
            OpResult::Boolean(_) | OpResult::Interval(_) => false,
        }
    }

    /// The result as rows another operation can consume.
    ///
    /// Row lists are returned as they are; a scalar becomes one row labelled
    /// by its label. Booleans, intervals and `Null` have no row form.
    pub fn to_data(&self) -> Option<Vec<Datum>> {
        match self {
            OpResult::Rows(rows) => Some(rows.clone()),
            OpResult::Scalar(s) => {
                let mut datum = Datum::new(s.label.clone(), s.value);
                datum.group = s.group.clone();
                Some(vec![datum])
            }
            OpResult::Boolean(_) | OpResult::Interval(_) | OpResult::Null => None,
        }
    }
}

impl From<Vec<Datum>> for OpResult {
    fn from(rows: Vec<Datum>) -> Self {
        OpResult::Rows(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn untagged_serialization() {
        assert_eq!(serde_json::to_value(OpResult::Null).unwrap(), json!(null));
        assert_eq!(
            serde_json::to_value(OpResult::boolean("a > b", true)).unwrap(),
            json!({"description": "a > b", "value": true})
        );
        assert_eq!(
            serde_json::to_value(OpResult::Rows(vec![Datum::new("a", 1.0)])).unwrap(),
            json!([{"target": "a", "value": 1.0}])
        );
    }

    #[test]
    fn emptiness() {
        assert!(OpResult::Null.is_empty());
        assert!(OpResult::Rows(vec![]).is_empty());
        assert!(OpResult::scalar("v", "avg", f64::NAN).is_empty());
        assert!(!OpResult::scalar("v", "avg", 2.0).is_empty());
        assert!(!OpResult::boolean("x", false).is_empty());
    }

    #[test]
    fn scalar_to_data() {
        let data = OpResult::scalar("value", "sum", 12.0).to_data().unwrap();
        assert_eq!(data, vec![Datum::new("sum", 12.0)]);
        assert!(OpResult::boolean("x", true).to_data().is_none());
    }
}
