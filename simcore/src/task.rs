//! The per-replica task runner (C2): the step loop, its two checkpoint
//! cadences, and the trace format. Grounded on the original's
//! `task_t::operator()()`, translated from a mutable back-referencing
//! closure into a function taking borrowed context.

use crate::batch::TaskBatch;
use crate::callback::{BatchView, SimCallback, TaskView};
use crate::error::TaskError;
use crate::model::{Model, TaskCtx};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

/// ASCII Unit Separator: delimits consecutive trace records within a file.
const RECORD_SEP: u8 = 0x1F;

/// Best-effort extraction of a human-readable message from a panic payload,
/// matching the handful of payload shapes `std::panic!`/`.unwrap()`/`.expect()`
/// actually produce.
fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// The slice of the engine a running task needs: nothing about other
/// batches or replicas, and no pointer back to the engine itself.
pub struct TaskEnv<'a, M: Model> {
    pub workspace: &'a Path,
    pub model: &'a M,
    pub engine_tweaks: Option<&'a M::Tweaks>,
    pub continue_mode: bool,
}

struct Paths {
    status: std::path::PathBuf,
    mstatus: std::path::PathBuf,
    trace: std::path::PathBuf,
    status_copy: std::path::PathBuf,
    mstatus_copy: std::path::PathBuf,
    trace_copy: std::path::PathBuf,
    out: std::path::PathBuf,
    err: std::path::PathBuf,
}

impl Paths {
    fn new(dir: &Path) -> Self {
        Self {
            status: dir.join("status"),
            mstatus: dir.join("mstatus"),
            trace: dir.join("trace"),
            status_copy: dir.join("status.copy"),
            mstatus_copy: dir.join("mstatus.copy"),
            trace_copy: dir.join("trace.copy"),
            out: dir.join(".out"),
            err: dir.join(".err"),
        }
    }
}

/// Run one replica of one batch to termination. Returns `Ok(())` on a clean
/// finish and `Err` on I/O failure or on a panic raised by the model step or
/// a callback — those are caught here (not only at the pool boundary) so the
/// failure is logged to this replica's own `.err` before the task gives up.
pub fn run_task<M: Model, CB: SimCallback>(
    env: &TaskEnv<'_, M>,
    batch: &TaskBatch<M, CB>,
    replica: usize,
) -> Result<(), TaskError> {
    let dir = env
        .workspace
        .join("tasks")
        .join(&batch.name)
        .join(replica.to_string());
    fs::create_dir_all(&dir)?;
    let paths = Paths::new(&dir);

    let mut out = OpenOptions::new().create(true).append(true).open(&paths.out)?;
    let mut errf = OpenOptions::new().create(true).append(true).open(&paths.err)?;

    let (mut state, mut mstate) = load_initial(env, batch, replica, &paths, &mut errf)?;

    let mut trajectory: Vec<M::Delta> = Vec::new();
    let mut flushed_to_trace: usize = 0;
    let mut step: u64 = 0;
    let sync_cadence = batch.sync + 1;
    let backup_cadence = sync_cadence * (batch.backup + 1);

    while !batch.terminate.test(&state) {
        // backup boundary runs before the sync boundary (matching the
        // original's order): the `.copy` files always capture what was on
        // disk at the *end of the previous* sync period, never the value
        // this iteration is about to write, so a `.copy` is only ever a
        // complete prior period's snapshot.
        if is_backup_boundary(step, backup_cadence) {
            fs::copy(&paths.status, &paths.status_copy)?;
            if batch.save_mstate {
                fs::copy(&paths.mstatus, &paths.mstatus_copy)?;
            }
            if batch.save_trace && !trajectory.is_empty() {
                append_records(&paths.trace_copy, &trajectory)?;
                trajectory.clear();
                flushed_to_trace = 0;
            }
        }
        if is_sync_boundary(step, sync_cadence) {
            write_doc(&paths.status, &state)?;
            if batch.save_mstate {
                write_doc(&paths.mstatus, &mstate)?;
            }
            if step != 0 && batch.save_trace && flushed_to_trace < trajectory.len() {
                append_records(&paths.trace, &trajectory[flushed_to_trace..])?;
                flushed_to_trace = trajectory.len();
            }
        }

        let ctx = TaskCtx {
            workspace: env.workspace,
            batch: &batch.name,
            replica,
            step,
            engine_tweaks: env.engine_tweaks,
            batch_tweaks: batch.tweaks.as_ref(),
        };

        if M::DIFFERENTIAL {
            let model = env.model;
            let state_ref = &state;
            let mstate_ref = &mut mstate;
            let delta = match catch_unwind(AssertUnwindSafe(|| {
                model.step_delta(state_ref, mstate_ref, &ctx)
            })) {
                Ok(delta) => delta,
                Err(payload) => {
                    let msg = panic_message(payload);
                    writeln!(errf, "error: model step panicked: {}", msg)?;
                    return Err(TaskError::Panicked(msg));
                }
            };
            M::combine(&mut state, &delta);
            if batch.save_trace {
                trajectory.push(delta);
            }
        } else {
            let model = env.model;
            let state_ref = &state;
            let mstate_ref = &mut mstate;
            let new_state = match catch_unwind(AssertUnwindSafe(|| {
                model.step_full(state_ref, mstate_ref, &ctx)
            })) {
                Ok(new_state) => new_state,
                Err(payload) => {
                    let msg = panic_message(payload);
                    writeln!(errf, "error: model step panicked: {}", msg)?;
                    return Err(TaskError::Panicked(msg));
                }
            };
            if batch.save_trace {
                trajectory.push(M::difference(&new_state, &state));
            }
            state = new_state;
        }

        if let Some(cb) = &batch.event_callback {
            let view = TaskView {
                workspace: env.workspace,
                batch: &batch.name,
                replica,
                step,
            };
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| cb.invoke(&view))) {
                let msg = panic_message(payload);
                writeln!(errf, "error: event callback panicked: {}", msg)?;
                return Err(TaskError::Panicked(msg));
            }
        }

        step += 1;
        writeln!(out, "step {} complete", step)?;
    }

    // termination: unconditional final write, flush whatever's left, and
    // refresh the .copy files exactly as a backup boundary would.
    write_doc(&paths.status, &state)?;
    if batch.save_mstate {
        write_doc(&paths.mstatus, &mstate)?;
    }
    if batch.save_trace && flushed_to_trace < trajectory.len() {
        append_records(&paths.trace, &trajectory[flushed_to_trace..])?;
    }
    fs::copy(&paths.status, &paths.status_copy)?;
    if batch.save_mstate {
        fs::copy(&paths.mstatus, &paths.mstatus_copy)?;
    }
    if batch.save_trace && !trajectory.is_empty() {
        append_records(&paths.trace_copy, &trajectory)?;
        trajectory.clear();
    }
    writeln!(out, "terminated after {} steps", step)?;
    writeln!(out, "[done]")?;

    if let Some(cb) = &batch.instance_callback {
        let view = TaskView {
            workspace: env.workspace,
            batch: &batch.name,
            replica,
            step,
        };
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| cb.invoke(&view))) {
            let msg = panic_message(payload);
            writeln!(errf, "error: instance callback panicked: {}", msg)?;
            return Err(TaskError::Panicked(msg));
        }
    }
    if replica == 0 {
        if let Some(cb) = &batch.batch_callback {
            let view = BatchView {
                workspace: env.workspace,
                batch: &batch.name,
            };
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| cb.invoke(&view))) {
                let msg = panic_message(payload);
                writeln!(errf, "error: batch callback panicked: {}", msg)?;
                return Err(TaskError::Panicked(msg));
            }
        }
    }

    Ok(())
}

fn load_initial<M: Model, CB: SimCallback>(
    env: &TaskEnv<'_, M>,
    batch: &TaskBatch<M, CB>,
    replica: usize,
    paths: &Paths,
    errf: &mut File,
) -> Result<(M::State, M::ModelState), TaskError> {
    if env.continue_mode {
        match read_doc::<M::State>(&paths.status_copy) {
            Ok(state) => {
                if M::RECOVERABLE && batch.save_mstate {
                    match read_doc::<M::ModelState>(&paths.mstatus_copy) {
                        Ok(m) => return Ok((state, m)),
                        Err(e) => {
                            // any failure during recovery resets both halves
                            // of the instance, not just the model state: a
                            // recovered state paired with a fresh model state
                            // would be an inconsistent hybrid.
                            writeln!(
                                errf,
                                "warning: failed to restore mstatus.copy: {}, starting from initial state",
                                e
                            )?;
                        }
                    }
                } else {
                    return Ok((state, M::ModelState::default()));
                }
            }
            Err(e) => {
                writeln!(
                    errf,
                    "warning: failed to restore status.copy: {}, starting from initial state",
                    e
                )?;
            }
        }
    }
    let state = batch
        .initial_state(replica)
        .map_err(|e| TaskError::Decode(e.to_string()))?;
    Ok((state, M::ModelState::default()))
}

/// `status`/`mstatus` are rewritten on steps `0, cadence, 2*cadence, ...`.
fn is_sync_boundary(step: u64, cadence: u64) -> bool {
    step % cadence == 0
}

/// `.copy` files are refreshed on the same schedule, skipping `step == 0`
/// (there's nothing to back up yet on the very first step).
fn is_backup_boundary(step: u64, cadence: u64) -> bool {
    step != 0 && step % cadence == 0
}

fn read_doc<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, TaskError> {
    let mut f = File::open(path)?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    Ok(serde_json::from_str(&buf)?)
}

fn write_doc<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), TaskError> {
    fs::write(path, serde_json::to_string(value)?)?;
    Ok(())
}

fn append_records<T: serde::Serialize>(path: &Path, records: &[T]) -> Result<(), TaskError> {
    let mut f = OpenOptions::new().create(true).append(true).open(path)?;
    for record in records {
        f.write_all(serde_json::to_string(record)?.as_bytes())?;
        f.write_all(&[RECORD_SEP])?;
    }
    Ok(())
}
