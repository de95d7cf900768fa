//! Keyed operation plans.
//!
//! A plan is an ordered list of named steps, each a chain of operation specs.
//! Within a chain, a spec that yields rows feeds them to the next spec. Every
//! result that has a row form is kept in a `ResultStore` under the id
//! `<key>_<index>`, and the step named `last` runs against those stored rows
//! instead of the dataset:
//!
//! ```json
//! {
//!   "ops":  [{"op": "filter", "field": "value", "operator": ">", "value": 5},
//!            {"op": "sum", "field": "value"}],
//!   "ops2": [{"op": "average", "field": "value"}],
//!   "last": [{"op": "compareBool", "field": "value",
//!             "targetA": "ops_1", "targetB": "ops2_0", "operator": ">"}]
//! }
//! ```

use serde::Serialize;
use serde_json::Value as Json;

use crate::datum::{Datum, FieldMap};
use crate::ops::Evaluate;
use crate::result::OpResult;
use crate::spec::OperationSpec;

/// Name of the step that runs against stored results.
pub const LAST_KEY: &str = "last";

/// Step name used when a plan is given as a bare spec or list.
pub const DEFAULT_KEY: &str = "ops";

/// Id under which the `index`-th result of step `key` is stored.
pub fn result_id(key: &str, index: usize) -> String {
    format!("{}_{}", key, index)
}

/// Rows produced by earlier steps, by id, in the order they were stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultStore {
    entries: Vec<(String, Vec<Datum>)>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a result under `id`. Every stored row takes that id. Results
    /// without rows remove any previous entry.
    pub fn store(&mut self, id: &str, result: &OpResult) {
        let rows = result.to_data().unwrap_or_default();
        self.entries.retain(|(existing, _)| existing != id);
        if rows.is_empty() {
            return;
        }
        let rows = rows
            .into_iter()
            .map(|mut datum| {
                datum.id = Some(id.to_string());
                datum
            })
            .collect();
        self.entries.push((id.to_string(), rows));
    }

    pub fn get(&self, id: &str) -> Option<&[Datum]> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, rows)| rows.as_slice())
    }

    /// Every stored row.
    pub fn datums(&self) -> Vec<Datum> {
        self.entries
            .iter()
            .flat_map(|(_, rows)| rows.iter().cloned())
            .collect()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Named chains of operation specs, run in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Plan {
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    pub key: String,
    pub specs: Vec<OperationSpec>,
}

impl Plan {
    /// A plan with one step.
    pub fn chain(key: impl Into<String>, specs: Vec<OperationSpec>) -> Self {
        Self {
            steps: vec![Step {
                key: key.into(),
                specs,
            }],
        }
    }

    pub fn step(mut self, key: impl Into<String>, specs: Vec<OperationSpec>) -> Self {
        self.steps.push(Step {
            key: key.into(),
            specs,
        });
        self
    }

    /// Read a plan from JSON: one spec, a list of specs, or an object mapping
    /// step names to a spec or a list of specs. Object order is kept.
    pub fn from_json(value: Json) -> serde_json::Result<Self> {
        match value {
            Json::Array(_) => Ok(Plan::chain(DEFAULT_KEY, serde_json::from_value(value)?)),
            Json::Object(ref map) if map.contains_key("op") => {
                Ok(Plan::chain(DEFAULT_KEY, vec![serde_json::from_value(value)?]))
            }
            Json::Object(map) => {
                let mut plan = Plan::default();
                for (key, specs) in map {
                    let specs = match specs {
                        Json::Array(_) => serde_json::from_value(specs)?,
                        other => vec![serde_json::from_value(other)?],
                    };
                    plan = plan.step(key, specs);
                }
                Ok(plan)
            }
            other => Err(serde::de::Error::custom(format!(
                "expected an operation spec, a list of specs or a keyed plan, found {}",
                other
            ))),
        }
    }

    /// Run every step. Results are stored in `store` as they are produced.
    pub fn run(&self, data: &[Datum], fields: &FieldMap, store: &mut ResultStore) -> PlanReport {
        let mut steps = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let mut input = if step.key == LAST_KEY {
                store.datums()
            } else {
                data.to_vec()
            };
            tracing::info!(key = %step.key, specs = step.specs.len(), rows = input.len(), "running step");

            let mut results = Vec::with_capacity(step.specs.len());
            for (index, spec) in step.specs.iter().enumerate() {
                let result = spec.evaluate(&input, fields);
                let id = result_id(&step.key, index);
                store.store(&id, &result);
                if let OpResult::Rows(rows) = &result {
                    input = rows.clone();
                }
                results.push(StepResult { id, result });
            }
            steps.push(StepReport {
                key: step.key.clone(),
                results,
            });
        }
        PlanReport { steps }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    pub id: String,
    pub result: OpResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    pub key: String,
    pub results: Vec<StepResult>,
}

impl StepReport {
    /// The result of the last spec in the chain.
    pub fn output(&self) -> Option<&OpResult> {
        self.results.last().map(|r| &r.result)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlanReport {
    pub steps: Vec<StepReport>,
}

impl PlanReport {
    /// The output of the final step.
    pub fn output(&self) -> Option<&OpResult> {
        self.steps.last().and_then(StepReport::output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::fixtures::*;
    use crate::spec::{Filter, Operator, Sum};
    use serde_json::json;

    fn sales() -> Vec<Datum> {
        bars(&[("a", 2.0), ("b", 6.0), ("c", 8.0), ("d", 1.0)])
    }

    #[test]
    fn from_json_forms() {
        let one = Plan::from_json(json!({"op": "sum", "field": "value"})).unwrap();
        assert_eq!(one.steps.len(), 1);
        assert_eq!(one.steps[0].key, DEFAULT_KEY);

        let list = Plan::from_json(json!([{"op": "count"}, {"op": "sum", "field": "value"}])).unwrap();
        assert_eq!(list.steps[0].specs.len(), 2);

        let keyed = Plan::from_json(json!({
            "zeta": {"op": "count"},
            "alpha": [{"op": "count"}],
            "last": [{"op": "count"}]
        }))
        .unwrap();
        let keys: Vec<&str> = keyed.steps.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "last"]);

        assert!(Plan::from_json(json!(3)).is_err());
        assert!(Plan::from_json(json!({"ops": {"op": "explode"}})).is_err());
    }

    #[test]
    fn rows_chain_into_next_spec() {
        let plan = Plan::chain(
            DEFAULT_KEY,
            vec![
                Filter::new("value", Operator::Gt, json!(5)).into(),
                Sum::new("value").into(),
            ],
        );
        let mut store = ResultStore::new();
        let report = plan.run(&sales(), &FieldMap::default(), &mut store);
        assert_eq!(report.output().unwrap().as_scalar().unwrap().value, 14.0);
        assert_eq!(report.steps[0].results[0].id, "ops_0");
        assert_eq!(store.get("ops_0").unwrap().len(), 2);
        assert_eq!(store.get("ops_1").unwrap()[0].target, "Sum");
    }

    #[test]
    fn steps_start_from_the_dataset() {
        let plan = Plan::chain("ops", vec![Filter::new("value", Operator::Gt, json!(5)).into()])
            .step("ops2", vec![Sum::new("value").into()]);
        let report = plan.run(&sales(), &FieldMap::default(), &mut ResultStore::new());
        assert_eq!(report.output().unwrap().as_scalar().unwrap().value, 17.0);
    }

    #[test]
    fn last_compares_stored_results() {
        let plan = Plan::from_json(json!({
            "ops": [{"op": "sum", "field": "value"}],
            "ops2": [{"op": "average", "field": "value"}],
            "last": [{"op": "compareBool", "field": "value",
                      "targetA": "ops_0", "targetB": "ops2_0", "operator": ">"}]
        }))
        .unwrap();
        let mut store = ResultStore::new();
        let report = plan.run(&sales(), &FieldMap::default(), &mut store);
        assert_eq!(report.output().unwrap().as_bool(), Some(true));
        let ids: Vec<&str> = store.ids().collect();
        assert_eq!(ids, vec!["ops_0", "ops2_0"]);
    }

    #[test]
    fn last_diff_of_stored_scalars() {
        let plan = Plan::from_json(json!({
            "ops": {"op": "retrieveValue", "field": "value", "target": "b"},
            "ops2": {"op": "retrieveValue", "field": "value", "target": "d"},
            "last": {"op": "diff", "field": "value", "targetA": "ops_0", "targetB": "ops2_0"}
        }))
        .unwrap();
        let report = plan.run(&sales(), &FieldMap::default(), &mut ResultStore::new());
        assert_eq!(report.output().unwrap().as_scalar().unwrap().value, 5.0);
    }

    #[test]
    fn store_skips_results_without_rows() {
        let mut store = ResultStore::new();
        store.store("ops_0", &OpResult::boolean("x", true));
        store.store("ops_1", &OpResult::Null);
        store.store("ops_2", &OpResult::Rows(vec![]));
        assert!(store.is_empty());
    }

    #[test]
    fn store_replaces_by_id() {
        let mut store = ResultStore::new();
        store.store("ops_0", &OpResult::scalar("value", "Sum", 1.0));
        store.store("ops_0", &OpResult::scalar("value", "Sum", 2.0));
        assert_eq!(store.len(), 1);
        assert_eq!(store.datums()[0].value, 2.0);
        assert_eq!(store.datums()[0].id.as_deref(), Some("ops_0"));
        store.store("ops_0", &OpResult::Null);
        assert!(store.get("ops_0").is_none());
    }
}
