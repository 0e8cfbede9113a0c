//! End-to-end: build a tiny counter model, run it through `Engine` against
//! a scratch workspace, and check the checkpoints it leaves behind.

use serde::{Deserialize, Serialize};
use serde_json::json;
use simcore::{Callback, Engine, Model, TaskCtx, Terminate};
use std::fs;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CounterState {
    n: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CounterModelState;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CounterDelta {
    step: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CounterEnd {
    target: u64,
}

impl Terminate<CounterState> for CounterEnd {
    fn test(&self, state: &CounterState) -> bool {
        state.n >= self.target
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct NoTweaks;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Counter {}

impl Model for Counter {
    type State = CounterState;
    type ModelState = CounterModelState;
    type Delta = CounterDelta;
    type Terminate = CounterEnd;
    type Tweaks = NoTweaks;

    const DIFFERENTIAL: bool = true;
    const RECOVERABLE: bool = false;

    fn step_delta(
        &self,
        _state: &CounterState,
        _mstate: &mut CounterModelState,
        _ctx: &TaskCtx<'_, Self>,
    ) -> CounterDelta {
        CounterDelta { step: 1 }
    }

    fn combine(state: &mut CounterState, delta: &CounterDelta) {
        state.n += delta.step;
    }

    fn difference(new: &CounterState, old: &CounterState) -> CounterDelta {
        CounterDelta { step: new.n - old.n }
    }
}

#[derive(Default)]
struct NoopCallback;

impl<Ctx: ?Sized> Callback<Ctx> for NoopCallback {
    fn invoke(&self, _ctx: &Ctx) {}
}

fn make_callback(_v: &serde_json::Value) -> Result<NoopCallback, simcore::ConfigError> {
    Ok(NoopCallback)
}

#[test]
fn runs_all_replicas_and_writes_status() {
    let dir = tempfile::tempdir().expect("tempdir");
    let workspace = dir.path().to_str().unwrap().to_string();

    let doc = json!({
        "workspace": workspace,
        "parallel": 2,
        "model": {},
        "tasks": {
            "main": {
                "initial-state": {"n": 0},
                "end-condition": {"target": 5},
                "instances": 3,
                "sync": 0,
                "backup": 1,
                "save-trace": true
            }
        }
    });

    let engine = Engine::<Counter, NoopCallback>::from_config(&doc, false, make_callback)
        .expect("valid config");
    let summary = engine.run().expect("pool starts");

    assert_eq!(summary.total, 3);
    assert_eq!(summary.failed, 0);

    for replica in 0..3 {
        let replica_dir = dir
            .path()
            .join("tasks")
            .join("main")
            .join(replica.to_string());
        let status = fs::read_to_string(replica_dir.join("status")).expect("status written");
        let state: CounterState = serde_json::from_str(&status).unwrap();
        assert_eq!(state.n, 5);
        assert!(replica_dir.join("status.copy").exists());
        assert!(replica_dir.join("trace").exists() || replica_dir.join("trace.copy").exists());
        let out = fs::read_to_string(replica_dir.join(".out")).expect(".out written");
        assert!(out.contains("terminated after"));
    }
}

#[test]
fn rejects_config_with_no_tasks() {
    let dir = tempfile::tempdir().expect("tempdir");
    let doc = json!({
        "workspace": dir.path().to_str().unwrap(),
        "model": {},
        "tasks": {}
    });
    let result = Engine::<Counter, NoopCallback>::from_config(&doc, false, make_callback);
    assert!(result.is_err());
}

#[test]
fn rejects_missing_workspace() {
    let doc = json!({
        "model": {},
        "tasks": {
            "main": {
                "initial-state": {"n": 0},
                "end-condition": {"target": 1},
                "instances": 1
            }
        }
    });
    let result = Engine::<Counter, NoopCallback>::from_config(&doc, false, make_callback);
    assert!(matches!(result, Err(simcore::ConfigError::Missing(_))));
}

/// S3-style resumability: run a batch to a first checkpoint, then run again
/// against the same workspace with `continue=true` and a higher target.
/// The second run must pick up from the first run's final `status.copy`
/// rather than restarting from `initial-state`.
#[test]
fn continue_mode_resumes_from_status_copy() {
    let dir = tempfile::tempdir().expect("tempdir");
    let workspace = dir.path().to_str().unwrap().to_string();

    let first_run = json!({
        "workspace": workspace,
        "model": {},
        "tasks": {
            "main": {
                "initial-state": {"n": 0},
                "end-condition": {"target": 3},
                "instances": 1,
                "sync": 0,
                "backup": 0
            }
        }
    });
    let engine = Engine::<Counter, NoopCallback>::from_config(&first_run, false, make_callback)
        .expect("valid config");
    let summary = engine.run().expect("pool starts");
    assert_eq!(summary.failed, 0);

    let replica_dir = dir.path().join("tasks").join("main").join("0");
    let after_first: CounterState =
        serde_json::from_str(&fs::read_to_string(replica_dir.join("status")).unwrap()).unwrap();
    assert_eq!(after_first.n, 3);

    let second_run = json!({
        "workspace": workspace,
        "continue": true,
        "model": {},
        "tasks": {
            "main": {
                "initial-state": {"n": 0},
                "end-condition": {"target": 5},
                "instances": 1,
                "sync": 0,
                "backup": 0
            }
        }
    });
    let engine = Engine::<Counter, NoopCallback>::from_config(&second_run, false, make_callback)
        .expect("valid config");
    let summary = engine.run().expect("pool starts");
    assert_eq!(summary.failed, 0);

    let final_state: CounterState =
        serde_json::from_str(&fs::read_to_string(replica_dir.join("status")).unwrap()).unwrap();
    // resumed from n=3, not restarted from the initial-state's n=0
    assert_eq!(final_state.n, 5);
}

/// S2-style parallel run: two batches, bounded concurrency, every replica
/// directory created and the pool reports full success.
#[test]
fn two_batches_run_under_bounded_parallelism() {
    let dir = tempfile::tempdir().expect("tempdir");
    let workspace = dir.path().to_str().unwrap().to_string();

    let doc = json!({
        "workspace": workspace,
        "parallel": 2,
        "model": {},
        "tasks": {
            "A": {
                "initial-state": {"n": 0},
                "end-condition": {"target": 2},
                "instances": 2
            },
            "B": {
                "initial-state": {"n": 0},
                "end-condition": {"target": 2},
                "instances": 3
            }
        }
    });
    let engine = Engine::<Counter, NoopCallback>::from_config(&doc, false, make_callback)
        .expect("valid config");
    let summary = engine.run().expect("pool starts");

    assert_eq!(summary.total, 5);
    assert_eq!(summary.failed, 0);
    for (batch, replicas) in [("A", 2), ("B", 3)] {
        for replica in 0..replicas {
            let dir = dir
                .path()
                .join("tasks")
                .join(batch)
                .join(replica.to_string());
            assert!(dir.join("status").exists());
        }
    }
}
