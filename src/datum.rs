//! Data model for chart rows.
//!
//! The core types are:
//! - `Datum`: one row with a category key, an optional series key and a value
//! - `FieldMap`: maps a dataset's own column names onto those three roles
//! - key helpers: date-aware equality and natural ordering of category keys

use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

/// One row of chart data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Datum {
    /// Identifier assigned when a result is stored for later lookup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Category key (bar label, x-axis date, ...).
    pub target: String,
    /// Series key, for grouped/stacked bars and multi-line charts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Numeric measure. NaN when the source value was not numeric.
    pub value: f64,
    /// Any other columns, by their original names.
    #[serde(flatten)]
    pub fields: Map<String, Json>,
}

impl Datum {
    pub fn new(target: impl Into<String>, value: f64) -> Self {
        Self {
            id: None,
            target: target.into(),
            group: None,
            value,
            fields: Map::new(),
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Json) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Text of the field playing `role`, if the row has one.
    pub fn text(&self, role: Role<'_>) -> Option<String> {
        match role {
            Role::Category => Some(self.target.clone()),
            Role::Series => self.group.clone(),
            Role::Measure => Some(json_text(&number_json(self.value))),
            Role::Other(name) => self.fields.get(name).map(json_text),
        }
    }

    /// Numeric view of the field playing `role`. NaN when absent or not numeric.
    pub fn number(&self, role: Role<'_>) -> f64 {
        match role {
            Role::Measure => self.value,
            Role::Category => to_number(&Json::String(self.target.clone())),
            Role::Series => self
                .group
                .as_ref()
                .map(|g| to_number(&Json::String(g.clone())))
                .unwrap_or(f64::NAN),
            Role::Other(name) => self.fields.get(name).map(to_number).unwrap_or(f64::NAN),
        }
    }
}

/// The canonical role a field name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role<'a> {
    Category,
    Series,
    Measure,
    Other(&'a str),
}

/// Names of the dataset columns that play the three canonical roles.
///
/// Operations name fields the way the dataset does; the evaluator maps them
/// through this before matching, so it never depends on actual column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMap {
    pub category: String,
    pub series: Option<String>,
    pub measure: String,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            category: "target".to_string(),
            series: Some("group".to_string()),
            measure: "value".to_string(),
        }
    }
}

impl FieldMap {
    pub fn new(category: impl Into<String>, measure: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            series: None,
            measure: measure.into(),
        }
    }

    pub fn with_series(mut self, series: impl Into<String>) -> Self {
        self.series = Some(series.into());
        self
    }

    /// Map a field name to its role. The canonical names `target`, `group`
    /// and `value` always work, whatever the dataset calls its columns.
    pub fn role<'a>(&self, field: &'a str) -> Role<'a> {
        let is = |name: &str| field.eq_ignore_ascii_case(name);
        if is(&self.measure) || is("value") {
            Role::Measure
        } else if is(&self.category) || is("target") {
            Role::Category
        } else if self.series.as_deref().is_some_and(is) || is("group") || is("series") {
            Role::Series
        } else {
            Role::Other(field)
        }
    }

    /// Build a datum from a record keyed by the dataset's own column names.
    pub fn datum_from_record(&self, record: &Map<String, Json>) -> Datum {
        let mut fields = Map::new();
        let mut target = String::new();
        let mut group = None;
        let mut value = f64::NAN;
        let mut id = None;

        for (name, v) in record {
            let is = |column: &str| name.eq_ignore_ascii_case(column);
            if is(&self.category) {
                target = json_text(v);
            } else if self.series.as_deref().is_some_and(is) {
                if !v.is_null() {
                    group = Some(json_text(v));
                }
            } else if is(&self.measure) {
                value = to_number(v);
            } else if is("id") {
                id = Some(json_text(v));
            } else {
                fields.insert(name.clone(), v.clone());
            }
        }

        Datum {
            id,
            target,
            group,
            value,
            fields,
        }
    }
}

/// Load a dataset: CSV (with a header row) for `.csv`, a JSON array of
/// records otherwise.
pub fn load_dataset(path: &Path, fields: &FieldMap) -> Result<Vec<Datum>> {
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        let reader = csv::Reader::from_path(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        read_csv(reader, fields)
    } else {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let json: Json = serde_json::from_str(&text)
            .with_context(|| format!("{} is not valid JSON", path.display()))?;
        records_from_json(&json, fields)
    }
}

/// Read CSV records. Cells stay text; numeric columns are coerced on use.
pub fn read_csv<R: std::io::Read>(mut reader: csv::Reader<R>, fields: &FieldMap) -> Result<Vec<Datum>> {
    let headers = reader.headers().context("missing CSV header row")?.clone();
    let mut data = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("bad CSV record {}", line + 1))?;
        let record: Map<String, Json> = headers
            .iter()
            .zip(row.iter())
            .map(|(h, cell)| (h.to_string(), Json::String(cell.to_string())))
            .collect();
        data.push(fields.datum_from_record(&record));
    }
    Ok(data)
}

/// Convert a JSON array of objects into data.
pub fn records_from_json(json: &Json, fields: &FieldMap) -> Result<Vec<Datum>> {
    let Json::Array(items) = json else {
        bail!("dataset must be a JSON array of records");
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Json::Object(record) => Ok(fields.datum_from_record(record)),
            _ => bail!("record {} is not an object", i),
        })
        .collect()
}

/// Render a JSON value the way it reads as a label.
pub fn json_text(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        Json::Number(n) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => n.as_f64().map(|f| f.to_string()).unwrap_or_default(),
        },
        Json::Bool(b) => b.to_string(),
        Json::Null => String::new(),
        other => other.to_string(),
    }
}

/// Coerce a JSON value to a number. NaN when it has no numeric reading.
pub fn to_number(value: &Json) -> f64 {
    match value {
        Json::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Json::String(s) => s.trim().parse().unwrap_or(f64::NAN),
        Json::Bool(b) => f64::from(u8::from(*b)),
        _ => f64::NAN,
    }
}

fn number_json(n: f64) -> Json {
    serde_json::Number::from_f64(n)
        .map(Json::Number)
        .unwrap_or(Json::Null)
}

/// Parse a category key as a calendar date.
///
/// Four-digit years count as January 1st of that year.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let s = text.trim();
    if s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse().ok().and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1));
    }
    // Only strings that start like a year are worth trying.
    if s.len() < 7 || !s.as_bytes()[..4].iter().all(u8::is_ascii_digit) {
        return None;
    }
    for format in ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(s, format) {
            return Some(datetime.date());
        }
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(s) {
        return Some(datetime.date_naive());
    }
    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{}-01", s).replace('/', "-"), format) {
            return Some(date);
        }
    }
    None
}

/// Normalize a category key for matching: ISO date when it parses as one,
/// the trimmed text otherwise.
pub fn normalize_key(text: &str) -> String {
    match parse_date(text) {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => text.trim().to_string(),
    }
}

/// Value equality of two category keys.
pub fn keys_equal(a: &str, b: &str) -> bool {
    normalize_key(a) == normalize_key(b)
}

/// Order two category keys. Dates come first, chronologically; other keys
/// follow in natural order.
pub fn compare_keys(a: &str, b: &str) -> Ordering {
    match (parse_date(a), parse_date(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| natural_cmp(a, b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => natural_cmp(a, b),
    }
}

/// Numeric-aware string ordering: `item2` sorts before `item10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (mut x, mut y) = (a, b);
    loop {
        match (x.is_empty(), y.is_empty()) {
            (true, true) => return a.cmp(b),
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
        let (cx, rx) = take_chunk(x);
        let (cy, ry) = take_chunk(y);
        let ordering = match (is_digits(cx), is_digits(cy)) {
            (true, true) => {
                let tx = cx.trim_start_matches('0');
                let ty = cy.trim_start_matches('0');
                tx.len().cmp(&ty.len()).then_with(|| tx.cmp(ty))
            }
            _ => cx.to_lowercase().cmp(&cy.to_lowercase()),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
        x = rx;
        y = ry;
    }
}

fn is_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

/// Split off the leading run of digits or non-digits.
fn take_chunk(s: &str) -> (&str, &str) {
    let digit = s.starts_with(|c: char| c.is_ascii_digit());
    let end = s
        .find(|c: char| c.is_ascii_digit() != digit)
        .unwrap_or(s.len());
    s.split_at(end)
}
