//! The orchestrator (C5): owns the model, the workspace and every batch,
//! and drives them all to completion through a bounded worker pool.

use crate::batch::TaskBatch;
use crate::callback::{EngineView, SimCallback};
use crate::config::{opt_bool, opt_doc, opt_u64};
use crate::error::ConfigError;
use crate::model::Model;
use crate::task::{self, TaskEnv};
use indexmap::IndexMap;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

struct EngineInner<M: Model, CB: SimCallback> {
    model: M,
    workspace: PathBuf,
    batches: IndexMap<String, TaskBatch<M, CB>>,
    parallel_max: usize,
    global_callback: Option<CB>,
    tweaks: Option<M::Tweaks>,
    continue_mode: bool,
}

/// The result of running every batch once: how many replicas ran and how
/// many of them failed (returned a non-zero job status).
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    pub total: usize,
    pub failed: usize,
}

pub struct Engine<M: Model, CB: SimCallback>(Arc<EngineInner<M, CB>>);

impl<M: Model, CB: SimCallback> Clone for Engine<M, CB> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<M: Model, CB: SimCallback> Engine<M, CB> {
    /// Build an engine from its root configuration document. `continue_override`
    /// is the CLI-level forcing of resume mode (the document's own `continue`
    /// key is honored regardless); `make_callback` is supplied by the caller
    /// since the document only carries callback *data*, never the type itself.
    pub fn from_config(
        doc: &Value,
        continue_override: bool,
        make_callback: impl Fn(&Value) -> Result<CB, ConfigError>,
    ) -> Result<Self, ConfigError> {
        if !doc.is_object() {
            return Err(ConfigError::TypeMismatch {
                field: "<root>".to_string(),
                expected: "a JSON object",
            });
        }
        let obj = doc;

        let throw_wrong_type = opt_bool(obj, "throw-wrong-type", false, false)?;
        let continue_mode =
            opt_bool(obj, "continue", false, throw_wrong_type)? || continue_override;

        let workspace = obj
            .get("workspace")
            .and_then(Value::as_str)
            .map(PathBuf::from)
            .ok_or_else(|| ConfigError::Missing("workspace".to_string()))?;
        if !continue_mode {
            fs::create_dir_all(&workspace)?;
        }

        let default_parallel = num_cpus::get() as u64;
        let parallel_max = opt_u64(obj, "parallel", default_parallel, throw_wrong_type)? as usize;
        if parallel_max == 0 {
            return Err(ConfigError::OutOfRange {
                field: "parallel".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let mut model_doc = obj
            .get("model")
            .cloned()
            .ok_or_else(|| ConfigError::Missing("model".to_string()))?;
        if let Some(patches) = obj.get("patches").and_then(Value::as_array) {
            for patch in patches {
                simutil::merge_patch(&mut model_doc, patch);
            }
        }
        let model: M = serde_json::from_value(model_doc).map_err(|e| ConfigError::Decode {
            what: "model",
            reason: e.to_string(),
        })?;

        let tweaks: Option<M::Tweaks> = match obj.get("tweaks") {
            None => None,
            Some(_) => Some(opt_doc(obj, "tweaks", "tweaks")?),
        };

        let global_callback = match obj.get("callback") {
            None => None,
            Some(v) => Some(make_callback(v)?),
        };

        let tasks_doc = obj
            .get("tasks")
            .and_then(Value::as_object)
            .ok_or_else(|| ConfigError::Missing("tasks".to_string()))?;
        if tasks_doc.is_empty() {
            return Err(ConfigError::Missing("tasks (at least one)".to_string()));
        }

        let mut batches = IndexMap::with_capacity(tasks_doc.len());
        for (name, batch_doc) in tasks_doc {
            let batch = TaskBatch::from_config(
                name.clone(),
                batch_doc,
                throw_wrong_type,
                &make_callback,
            )?;
            batches.insert(name.clone(), batch);
        }

        Ok(Self(Arc::new(EngineInner {
            model,
            workspace,
            batches,
            parallel_max,
            global_callback,
            tweaks,
            continue_mode,
        })))
    }

    pub fn workspace(&self) -> &std::path::Path {
        &self.0.workspace
    }

    /// Every (batch name, replica id) pair, in batch insertion order and
    /// ascending replica id within a batch.
    fn jobs(&self) -> Vec<taskpool::Job> {
        let mut jobs = Vec::new();
        for (name, batch) in &self.0.batches {
            for replica in 0..batch.instances as usize {
                let inner = Arc::clone(&self.0);
                let name = name.clone();
                jobs.push(Box::new(move || -> i32 {
                    let batch = inner
                        .batches
                        .get(&name)
                        .expect("batch present for the lifetime of the run");
                    let env = TaskEnv {
                        workspace: &inner.workspace,
                        model: &inner.model,
                        engine_tweaks: inner.tweaks.as_ref(),
                        continue_mode: inner.continue_mode,
                    };
                    match task::run_task(&env, batch, replica) {
                        Ok(()) => 0,
                        Err(e) => {
                            log::error!("batch '{}' replica {}: {}", name, replica, e);
                            1
                        }
                    }
                }) as taskpool::Job);
            }
        }
        jobs
    }

    /// Run every batch's every replica to completion, bounded to at most
    /// `parallel` concurrently running replicas.
    pub fn run(&self) -> Result<RunSummary, taskpool::PoolError> {
        let pool = taskpool::WorkerPool::new(self.0.parallel_max)?;
        let jobs = self.jobs();
        let report = pool.run(jobs, false, true);
        if let Some(cb) = &self.0.global_callback {
            cb.invoke(&EngineView {
                workspace: &self.0.workspace,
            });
        }
        Ok(RunSummary {
            total: report.total,
            failed: report.failed,
        })
    }
}
