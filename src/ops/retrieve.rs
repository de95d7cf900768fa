use crate::datum::{Datum, FieldMap};
use crate::result::OpResult;
use crate::spec::RetrieveValue;

use super::{Evaluate, find_all, owned, scoped};

impl Evaluate for RetrieveValue {
    fn evaluate(&self, data: &[Datum], _fields: &FieldMap) -> OpResult {
        let rows = scoped(data, self.group.as_deref());
        OpResult::Rows(owned(find_all(rows, &self.target)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::fixtures::*;
    use crate::spec::Selector;

    #[test]
    fn retrieve_all_matches() {
        let data = grouped(&[("KOR", "2020", 1.0), ("KOR", "2021", 2.0), ("JPN", "2020", 3.0)]);
        let result = RetrieveValue::new("value", "KOR").evaluate(&data, &FieldMap::default());
        match result {
            OpResult::Rows(rows) => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[1].value, 2.0);
            }
            _ => panic!("expected rows"),
        }
    }

    #[test]
    fn retrieve_keyed() {
        let data = grouped(&[("KOR", "2020", 1.0), ("KOR", "2021", 2.0)]);
        let result = RetrieveValue::new("value", Selector::keyed("KOR", "2021"))
            .evaluate(&data, &FieldMap::default());
        assert_eq!(result.rows().unwrap(), &data[1..]);
    }

    #[test]
    fn retrieve_within_group() {
        let data = grouped(&[("KOR", "2020", 1.0), ("KOR", "2021", 2.0)]);
        let mut spec = RetrieveValue::new("value", "KOR");
        spec.group = Some("2020".to_string());
        let result = spec.evaluate(&data, &FieldMap::default());
        assert_eq!(result.rows().unwrap(), &data[..1]);
    }

    #[test]
    fn retrieve_no_match_is_empty() {
        let data = bars(&[("a", 1.0)]);
        let result = RetrieveValue::new("value", "zzz").evaluate(&data, &FieldMap::default());
        assert!(result.is_empty());
        assert!(matches!(result, OpResult::Rows(_)));
    }
}
