//! Typed operation specs.
//!
//! A spec is plain data: it says which operation to run and with what
//! parameters. On the wire every spec is a JSON object tagged by `op`:
//!
//! ```json
//! {"op": "filter", "field": "rating", "operator": ">", "value": 7}
//! ```

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as Json;

use crate::datum::{Datum, json_text, normalize_key, to_number};

/// One data operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum OperationSpec {
    RetrieveValue(RetrieveValue),
    Filter(Filter),
    Compare(Compare),
    CompareBool(CompareBool),
    DetermineRange(DetermineRange),
    FindExtremum(FindExtremum),
    Sort(Sort),
    Count(Count),
    Sum(Sum),
    Average(Average),
    Diff(Diff),
    Nth(Nth),
    SelectOne(SelectOne),
    SelectMultiple(SelectMultiple),
}

impl OperationSpec {
    /// The wire name of the operation.
    pub fn name(&self) -> &'static str {
        match self {
            OperationSpec::RetrieveValue(_) => "retrieveValue",
            OperationSpec::Filter(_) => "filter",
            OperationSpec::Compare(_) => "compare",
            OperationSpec::CompareBool(_) => "compareBool",
            OperationSpec::DetermineRange(_) => "determineRange",
            OperationSpec::FindExtremum(_) => "findExtremum",
            OperationSpec::Sort(_) => "sort",
            OperationSpec::Count(_) => "count",
            OperationSpec::Sum(_) => "sum",
            OperationSpec::Average(_) => "average",
            OperationSpec::Diff(_) => "diff",
            OperationSpec::Nth(_) => "nth",
            OperationSpec::SelectOne(_) => "selectOne",
            OperationSpec::SelectMultiple(_) => "selectMultiple",
        }
    }
}

macro_rules! impl_from_spec {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for OperationSpec {
                fn from(spec: $variant) -> Self {
                    OperationSpec::$variant(spec)
                }
            }
        )*
    };
}

impl_from_spec!(
    RetrieveValue,
    Filter,
    Compare,
    CompareBool,
    DetermineRange,
    FindExtremum,
    Sort,
    Count,
    Sum,
    Average,
    Diff,
    Nth,
    SelectOne,
    SelectMultiple,
);

/// Look up the rows matching `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveValue {
    pub field: String,
    pub target: Selector,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl RetrieveValue {
    pub fn new(field: impl Into<String>, target: impl Into<Selector>) -> Self {
        Self {
            field: field.into(),
            target: target.into(),
            group: None,
        }
    }
}

/// Keep the rows whose `field` satisfies `operator value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub field: String,
    pub operator: Operator,
    pub value: Json,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl Filter {
    pub fn new(field: impl Into<String>, operator: Operator, value: Json) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
            group: None,
        }
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

/// Compare two targets and pick a winner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compare {
    pub field: String,
    pub target_a: Selector,
    pub target_b: Selector,
    #[serde(default)]
    pub mode: CompareMode,
    #[serde(default)]
    pub aggregate: Aggregate,
}

impl Compare {
    pub fn new(field: impl Into<String>, a: impl Into<Selector>, b: impl Into<Selector>) -> Self {
        Self {
            field: field.into(),
            target_a: a.into(),
            target_b: b.into(),
            mode: CompareMode::default(),
            aggregate: Aggregate::default(),
        }
    }

    pub fn mode(mut self, mode: CompareMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn aggregate(mut self, aggregate: Aggregate) -> Self {
        self.aggregate = aggregate;
        self
    }
}

/// Test a relation between two targets' values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareBool {
    pub field: String,
    pub target_a: Selector,
    pub target_b: Selector,
    pub operator: Operator,
}

impl CompareBool {
    pub fn new(
        field: impl Into<String>,
        a: impl Into<Selector>,
        b: impl Into<Selector>,
        operator: Operator,
    ) -> Self {
        Self {
            field: field.into(),
            target_a: a.into(),
            target_b: b.into(),
            operator,
        }
    }
}

/// The min/max interval of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetermineRange {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl DetermineRange {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            group: None,
        }
    }
}

/// The rows holding the largest or smallest value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindExtremum {
    pub field: String,
    #[serde(default)]
    pub which: Extremum,
    /// When set, rows sharing a category are combined first and the rows of
    /// the winning categories are returned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<Aggregate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl FindExtremum {
    pub fn new(field: impl Into<String>, which: Extremum) -> Self {
        Self {
            field: field.into(),
            which,
            aggregate: None,
            group: None,
        }
    }
}

/// Reorder the rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sort {
    pub field: String,
    #[serde(default)]
    pub order: SortOrder,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl Sort {
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
            group: None,
        }
    }
}

/// Count rows, categories or series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Count {
    #[serde(default)]
    pub level: CountLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Total of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sum {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl Sum {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            group: None,
        }
    }
}

/// Mean of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Average {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl Average {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            group: None,
        }
    }
}

/// Absolute difference between two targets' values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diff {
    pub field: String,
    pub target_a: Selector,
    pub target_b: Selector,
}

impl Diff {
    pub fn new(field: impl Into<String>, a: impl Into<Selector>, b: impl Into<Selector>) -> Self {
        Self {
            field: field.into(),
            target_a: a.into(),
            target_b: b.into(),
        }
    }
}

/// The n-th category in axis order, 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nth {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(deserialize_with = "integral")]
    pub n: i64,
    #[serde(default)]
    pub from: Side,
}

impl Nth {
    pub fn new(n: i64, from: Side) -> Self {
        Self {
            field: None,
            n,
            from,
        }
    }
}

/// Rows whose `field` equals `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectOne {
    pub field: String,
    pub target: Json,
}

/// Rows whose `field` equals any of `target_list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectMultiple {
    pub field: String,
    pub target_list: Vec<Json>,
}

/// Comparison operators used by `filter` and `compareBool`.
///
/// Unrecognized operators deserialize to `Unknown` and match nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    In,
    NotIn,
    Contains,
    Between,
    Unknown(String),
}

impl Operator {
    pub fn as_str(&self) -> &str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::In => "in",
            Operator::NotIn => "not-in",
            Operator::Contains => "contains",
            Operator::Between => "between",
            Operator::Unknown(s) => s,
        }
    }

    /// True for the six relational operators.
    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            Operator::Eq | Operator::Ne | Operator::Gt | Operator::Ge | Operator::Lt | Operator::Le
        )
    }
}

impl From<String> for Operator {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "==" | "=" | "eq" => Operator::Eq,
            "!=" | "<>" | "ne" => Operator::Ne,
            ">" | "gt" => Operator::Gt,
            ">=" | "gte" => Operator::Ge,
            "<" | "lt" => Operator::Lt,
            "<=" | "lte" => Operator::Le,
            "in" => Operator::In,
            "not-in" | "not in" | "notin" => Operator::NotIn,
            "contains" => Operator::Contains,
            "between" => Operator::Between,
            _ => Operator::Unknown(s),
        }
    }
}

impl From<&str> for Operator {
    fn from(s: &str) -> Self {
        Operator::from(s.to_string())
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompareMode {
    #[default]
    Larger,
    Smaller,
    Equal,
    NotEqual,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Aggregate {
    #[default]
    Sum,
    Avg,
    Min,
    Max,
}

impl Aggregate {
    /// Combine values. NaN when there is nothing to combine.
    pub fn apply(self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return f64::NAN;
        }
        match self {
            Aggregate::Sum => values.iter().sum(),
            Aggregate::Avg => values.iter().sum::<f64>() / values.len() as f64,
            Aggregate::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Aggregate::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Extremum {
    #[default]
    Max,
    Min,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CountLevel {
    #[default]
    Row,
    Category,
    Series,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Side {
    #[default]
    Left,
    Right,
}

/// Identifies rows by key.
///
/// A plain value matches by category key or by stored id. An object names
/// any of a category, a series and a row index; all given keys must match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selector {
    Keyed(KeyedSelector),
    Scalar(Json),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyedSelector {
    #[serde(
        default,
        alias = "target",
        deserialize_with = "opt_key",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<String>,
    #[serde(
        default,
        alias = "group",
        deserialize_with = "opt_key",
        skip_serializing_if = "Option::is_none"
    )]
    pub series: Option<String>,
    #[serde(default, deserialize_with = "opt_key", skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, deserialize_with = "opt_key", skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(default, deserialize_with = "opt_key", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Accept any integral JSON number, or a string holding one: `2`, `2.0`, `"2"`.
fn integral<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Json::deserialize(deserializer)?;
    if let Some(n) = value.as_i64() {
        return Ok(n);
    }
    let n = to_number(&value);
    if n.is_finite() && n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Ok(n as i64)
    } else {
        Err(serde::de::Error::custom(format!("expected an integer, found {}", value)))
    }
}

/// Accept a key written as a JSON string or number.
fn opt_key<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Json>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.is_null()).map(|v| json_text(&v)))
}

/// The resolved keys a selector matches rows by.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchKeys {
    /// Normalized category key.
    pub category: Option<String>,
    pub series: Option<String>,
    pub index: Option<usize>,
    pub id: Option<String>,
}

impl MatchKeys {
    /// Returns true if the row at `position` matches every key given.
    /// A matching id is enough on its own; no keys at all match nothing.
    pub fn matches(&self, datum: &Datum, position: usize) -> bool {
        if let Some(id) = &self.id
            && datum.id.as_deref() == Some(id.as_str())
        {
            return true;
        }
        if self.category.is_none() && self.series.is_none() && self.index.is_none() {
            return false;
        }
        self.category
            .as_ref()
            .is_none_or(|c| &normalize_key(&datum.target) == c)
            && self
                .series
                .as_ref()
                .is_none_or(|s| datum.group.as_deref() == Some(s.as_str()))
            && self.index.is_none_or(|i| i == position)
    }
}

impl Selector {
    pub fn category(key: impl Into<String>) -> Self {
        Selector::Keyed(KeyedSelector {
            category: Some(key.into()),
            ..KeyedSelector::default()
        })
    }

    pub fn keyed(category: impl Into<String>, series: impl Into<String>) -> Self {
        Selector::Keyed(KeyedSelector {
            category: Some(category.into()),
            series: Some(series.into()),
            ..KeyedSelector::default()
        })
    }

    pub fn index(index: usize) -> Self {
        Selector::Keyed(KeyedSelector {
            index: Some(index),
            ..KeyedSelector::default()
        })
    }

    pub fn keys(&self) -> MatchKeys {
        match self {
            Selector::Scalar(value) => {
                let text = json_text(value);
                if text.is_empty() {
                    return MatchKeys::default();
                }
                MatchKeys {
                    category: Some(normalize_key(&text)),
                    id: Some(text),
                    ..MatchKeys::default()
                }
            }
            Selector::Keyed(k) => MatchKeys {
                category: k
                    .category
                    .as_ref()
                    .or(k.x.as_ref())
                    .or(k.y.as_ref())
                    .map(|c| normalize_key(c)),
                series: k.series.clone(),
                index: k.index,
                id: k.id.clone(),
            },
        }
    }

    /// Label used in result descriptions.
    pub fn label(&self) -> String {
        match self {
            Selector::Scalar(value) => json_text(value),
            Selector::Keyed(k) => {
                let category = k
                    .category
                    .as_ref()
                    .or(k.x.as_ref())
                    .or(k.y.as_ref())
                    .or(k.id.as_ref());
                match (category, &k.series, k.index) {
                    (Some(c), Some(s), _) => format!("{}/{}", c, s),
                    (Some(c), None, _) => c.clone(),
                    (None, Some(s), _) => s.clone(),
                    (None, None, Some(i)) => format!("#{}", i),
                    (None, None, None) => String::new(),
                }
            }
        }
    }
}

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        Selector::Scalar(Json::String(s.to_string()))
    }
}

impl From<String> for Selector {
    fn from(s: String) -> Self {
        Selector::Scalar(Json::String(s))
    }
}

impl From<Json> for Selector {
    fn from(value: Json) -> Self {
        serde_json::from_value(value.clone()).unwrap_or(Selector::Scalar(value))
    }
}
