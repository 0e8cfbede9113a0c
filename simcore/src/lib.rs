//! A parallel, checkpointing simulation engine: plug in a model, a callback
//! and (optionally) a tweaks document, and the engine runs every configured
//! batch's replicas to termination, bounded to a fixed concurrency and
//! checkpointed on two cadences so a run can be resumed after a crash.

pub mod batch;
pub mod callback;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod task;

pub use batch::TaskBatch;
pub use callback::{BatchView, Callback, EngineView, HookCallback, SimCallback, TaskView};
pub use engine::{Engine, RunSummary};
pub use error::{ConfigError, TaskError};
pub use model::{Model, SimDoc, TaskCtx, Terminate};
