use std::cmp::Ordering;

use crate::datum::{Datum, FieldMap, Role, compare_keys, natural_cmp};
use crate::result::OpResult;
use crate::spec::{Sort, SortOrder};

use super::{Evaluate, scoped};

impl Evaluate for Sort {
    fn evaluate(&self, data: &[Datum], fields: &FieldMap) -> OpResult {
        let role = fields.role(&self.field);
        let mut rows: Vec<Datum> = scoped(data, self.group.as_deref())
            .into_iter()
            .cloned()
            .collect();
        let numeric = match role {
            Role::Measure => true,
            Role::Other(_) => rows.iter().any(|d| d.number(role).is_finite()),
            Role::Category | Role::Series => false,
        };
        let descending = self.order == SortOrder::Desc;

        if numeric {
            rows.sort_by(|a, b| by_number(a.number(role), b.number(role), descending));
        } else {
            rows.sort_by(|a, b| {
                let (x, y) = (a.text(role).unwrap_or_default(), b.text(role).unwrap_or_default());
                let ordering = match role {
                    Role::Category => compare_keys(&x, &y),
                    _ => natural_cmp(&x, &y),
                };
                if descending { ordering.reverse() } else { ordering }
            });
        }
        OpResult::Rows(rows)
    }
}

/// Non-finite values go last in either direction.
fn by_number(a: f64, b: f64, descending: bool) -> Ordering {
    match (a.is_finite(), b.is_finite()) {
        (false, false) => Ordering::Equal,
        (false, true) => Ordering::Greater,
        (true, false) => Ordering::Less,
        (true, true) if descending => b.total_cmp(&a),
        (true, true) => a.total_cmp(&b),
    }
}
