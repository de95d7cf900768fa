use crate::datum::{Datum, FieldMap};
use crate::result::{IntervalResult, OpResult};
use crate::spec::DetermineRange;

use super::{Evaluate, scoped};

impl Evaluate for DetermineRange {
    fn evaluate(&self, data: &[Datum], fields: &FieldMap) -> OpResult {
        let role = fields.role(&self.field);
        let rows: Vec<(&Datum, f64)> = scoped(data, self.group.as_deref())
            .into_iter()
            .map(|d| (d, d.number(role)))
            .filter(|(_, v)| v.is_finite())
            .collect();
        if rows.is_empty() {
            return OpResult::Null;
        }

        let min = rows.iter().map(|(_, v)| *v).fold(f64::INFINITY, f64::min);
        let max = rows.iter().map(|(_, v)| *v).fold(f64::NEG_INFINITY, f64::max);
        let at = |bound: f64| {
            rows.iter()
                .filter(|(_, v)| *v == bound)
                .map(|(d, _)| (*d).clone())
                .collect()
        };

        OpResult::Interval(IntervalResult {
            field: self.field.clone(),
            min,
            max,
            min_rows: at(min),
            max_rows: at(max),
        })
    }
}
