use crate::datum::{Datum, FieldMap};
use crate::result::OpResult;
use crate::spec::{SelectMultiple, SelectOne};

use super::{Evaluate, field_equals};

impl Evaluate for SelectOne {
    fn evaluate(&self, data: &[Datum], fields: &FieldMap) -> OpResult {
        let role = fields.role(&self.field);
        OpResult::Rows(
            data.iter()
                .filter(|&d| field_equals(d, role, &self.target))
                .cloned()
                .collect(),
        )
    }
}

impl Evaluate for SelectMultiple {
    fn evaluate(&self, data: &[Datum], fields: &FieldMap) -> OpResult {
        let role = fields.role(&self.field);
        OpResult::Rows(
            data.iter()
                .filter(|&d| self.target_list.iter().any(|t| field_equals(d, role, t)))
                .cloned()
                .collect(),
        )
    }
}
