//! Task batches (C3's unit of enumeration): a named group of `instances`
//! replicas that share a model, an end condition and a checkpoint cadence,
//! optionally varying their initial state per replica via `patches`.

use crate::callback::SimCallback;
use crate::config::{opt_bool, opt_doc, opt_u64, req_doc};
use crate::error::ConfigError;
use crate::model::Model;
use serde_json::Value;

pub struct TaskBatch<M: Model, CB: SimCallback> {
    pub name: String,
    /// the base state document; replica `i`'s starting state is this
    /// document with `patches[i]` (if any) merged on top, per RFC 7386.
    /// `None` means the model's `Default` state, with no patches applied.
    base_state: Option<Value>,
    patches: Vec<Value>,
    pub terminate: M::Terminate,
    pub tweaks: Option<M::Tweaks>,
    pub instances: u64,
    pub sync: u64,
    pub backup: u64,
    pub save_trace: bool,
    pub save_mstate: bool,
    pub batch_callback: Option<CB>,
    pub instance_callback: Option<CB>,
    pub event_callback: Option<CB>,
}

impl<M: Model, CB: SimCallback> TaskBatch<M, CB> {
    /// Materialize replica `replica`'s starting state: the batch's base
    /// state document with that replica's patch (if one was supplied)
    /// merged on top.
    pub fn initial_state(&self, replica: usize) -> Result<M::State, ConfigError> {
        let base = match &self.base_state {
            Some(doc) => doc.clone(),
            None if self.patches.get(replica).is_none() => return Ok(M::State::default()),
            None => serde_json::to_value(M::State::default()).map_err(|e| ConfigError::Batch {
                name: self.name.clone(),
                reason: format!("default state is not representable as a document: {}", e),
            })?,
        };
        let mut doc = base;
        if let Some(patch) = self.patches.get(replica) {
            simutil::merge_patch(&mut doc, patch);
        }
        serde_json::from_value(doc).map_err(|e| ConfigError::Batch {
            name: self.name.clone(),
            reason: format!("replica {} initial state: {}", replica, e),
        })
    }

    /// Build a batch from its configuration object, validating required
    /// fields and falling back to defaults for optional ones per
    /// `throw_wrong_type`.
    pub fn from_config(
        name: String,
        obj: &Value,
        throw_wrong_type: bool,
        make_callback: impl Fn(&Value) -> Result<CB, ConfigError>,
    ) -> Result<Self, ConfigError> {
        let wrap = |e: ConfigError| match e {
            ConfigError::Batch { .. } => e,
            other => ConfigError::Batch {
                name: name.clone(),
                reason: other.to_string(),
            },
        };

        let base_state = obj.get("initial-state").cloned();
        let patches: Vec<Value> = match obj.get("patches") {
            None => Vec::new(),
            Some(Value::Array(items)) => items.clone(),
            Some(_) => {
                return Err(ConfigError::Batch {
                    name,
                    reason: "field 'patches' must be an array".to_string(),
                })
            }
        };
        let terminate: M::Terminate =
            req_doc(obj, "end-condition", "end-condition").map_err(wrap)?;
        let tweaks: Option<M::Tweaks> = match obj.get("tweaks") {
            None => None,
            Some(_) => Some(opt_doc(obj, "tweaks", "tweaks").map_err(wrap)?),
        };
        let instances = opt_u64(obj, "instances", 1, throw_wrong_type).map_err(wrap)?;
        if instances == 0 {
            return Err(ConfigError::Batch {
                name,
                reason: "'instances' must be at least 1".to_string(),
            });
        }
        let sync = opt_u64(obj, "sync", 0, throw_wrong_type).map_err(wrap)?;
        let backup = opt_u64(obj, "backup", 0, throw_wrong_type).map_err(wrap)?;
        let save_trace = opt_bool(obj, "save-trace", true, throw_wrong_type).map_err(wrap)?;
        let save_mstate =
            opt_bool(obj, "save-model-state", false, throw_wrong_type).map_err(wrap)?;

        let batch_callback = match obj.get("batch-callback") {
            None => None,
            Some(v) => Some(make_callback(v).map_err(wrap)?),
        };
        let instance_callback = match obj.get("callback") {
            None => None,
            Some(v) => Some(make_callback(v).map_err(wrap)?),
        };
        let event_callback = match obj.get("event-callback") {
            None => None,
            Some(v) => Some(make_callback(v).map_err(wrap)?),
        };

        Ok(Self {
            name,
            base_state,
            patches,
            terminate,
            tweaks,
            instances,
            sync,
            backup,
            save_trace,
            save_mstate,
            batch_callback,
            instance_callback,
            event_callback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Model, Terminate as TerminateTrait};
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct St {
        n: u64,
    }
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct Ms;
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct Dl;
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct Tw;
    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct End {}
    impl TerminateTrait<St> for End {
        fn test(&self, _s: &St) -> bool {
            true
        }
    }
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct M;
    impl Model for M {
        type State = St;
        type ModelState = Ms;
        type Delta = Dl;
        type Terminate = End;
        type Tweaks = Tw;
        const DIFFERENTIAL: bool = true;
        const RECOVERABLE: bool = false;
        fn combine(_state: &mut St, _delta: &Dl) {}
        fn difference(_new: &St, _old: &St) -> Dl {
            Dl
        }
    }

    #[derive(Default)]
    struct NoopCb;
    impl<Ctx: ?Sized> crate::callback::Callback<Ctx> for NoopCb {
        fn invoke(&self, _ctx: &Ctx) {}
    }
    fn make_cb(_v: &Value) -> Result<NoopCb, ConfigError> {
        Ok(NoopCb)
    }

    #[test]
    fn instances_zero_is_rejected() {
        let doc = json!({"end-condition": {}, "instances": 0});
        let result = TaskBatch::<M, NoopCb>::from_config("b".into(), &doc, false, make_cb);
        assert!(matches!(result, Err(ConfigError::Batch { .. })));
    }

    #[test]
    fn missing_end_condition_is_fatal() {
        let doc = json!({});
        let result = TaskBatch::<M, NoopCb>::from_config("b".into(), &doc, false, make_cb);
        assert!(result.is_err());
    }

    #[test]
    fn initial_state_with_no_patches_uses_base_as_is() {
        let doc = json!({"end-condition": {}, "initial-state": {"n": 7}});
        let batch = TaskBatch::<M, NoopCb>::from_config("b".into(), &doc, false, make_cb).unwrap();
        assert_eq!(batch.initial_state(0).unwrap().n, 7);
        assert_eq!(batch.initial_state(3).unwrap().n, 7);
    }

    #[test]
    fn per_replica_patch_overrides_base_field() {
        let doc = json!({
            "end-condition": {},
            "initial-state": {"n": 1},
            "patches": [{"n": 99}]
        });
        let batch = TaskBatch::<M, NoopCb>::from_config("b".into(), &doc, false, make_cb).unwrap();
        // replica 0 has a patch, replicas beyond the patches array fall back
        // to the unpatched base state.
        assert_eq!(batch.initial_state(0).unwrap().n, 99);
        assert_eq!(batch.initial_state(1).unwrap().n, 1);
    }

    #[test]
    fn patches_field_must_be_an_array() {
        let doc = json!({"end-condition": {}, "patches": {"not": "array"}});
        let result = TaskBatch::<M, NoopCb>::from_config("b".into(), &doc, false, make_cb);
        assert!(result.is_err());
    }
}
