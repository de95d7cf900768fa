use crate::datum::{Datum, FieldMap};
use crate::result::{OpResult, ScalarResult};
use crate::spec::{Average, Sum};

use super::{Evaluate, finite_values, scoped};

impl Evaluate for Sum {
    fn evaluate(&self, data: &[Datum], fields: &FieldMap) -> OpResult {
        let values = finite_values(scoped(data, self.group.as_deref()), fields.role(&self.field));
        OpResult::Scalar(ScalarResult {
            field: self.field.clone(),
            label: "Sum".to_string(),
            group: self.group.clone(),
            value: values.iter().sum(),
            unit: None,
        })
    }
}

impl Evaluate for Average {
    /// `Null` when there is nothing to average.
    fn evaluate(&self, data: &[Datum], fields: &FieldMap) -> OpResult {
        let values = finite_values(scoped(data, self.group.as_deref()), fields.role(&self.field));
        if values.is_empty() {
            return OpResult::Null;
        }
        OpResult::Scalar(ScalarResult {
            field: self.field.clone(),
            label: "Average".to_string(),
            group: self.group.clone(),
            value: values.iter().sum::<f64>() / values.len() as f64,
            unit: None,
        })
    }
}
