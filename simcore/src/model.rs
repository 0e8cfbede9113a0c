//! The model adapter contract (C1): the fixed capability set the engine
//! requires of a user-supplied model, and nothing more.

use serde::{de::DeserializeOwned, Serialize};

/// Anything that can cross the boundary to/from a persisted structured
/// document. A blanket impl over `Serialize + DeserializeOwned` — the engine
/// never defines its own serialization scheme, it reuses serde's.
pub trait SimDoc: Serialize + DeserializeOwned + Send + Sync + 'static {}
impl<T> SimDoc for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}

/// A pure predicate over `State` deciding whether a simulation instance has
/// reached its end condition.
pub trait Terminate<S>: Send + Sync + 'static {
    fn test(&self, state: &S) -> bool;
}

/// Read-only context handed to a model's step function and to callbacks.
/// Borrowed for the duration of one step; nothing here is retained past it,
/// which is what keeps [`Model`] free of back-references into the engine.
pub struct TaskCtx<'a, M: Model> {
    pub workspace: &'a std::path::Path,
    pub batch: &'a str,
    pub replica: usize,
    pub step: u64,
    pub engine_tweaks: Option<&'a M::Tweaks>,
    pub batch_tweaks: Option<&'a M::Tweaks>,
}

/// The capability set a plugged-in model must provide. Everything else about
/// the model's domain semantics is opaque to the engine.
///
/// `DIFFERENTIAL` selects which of [`Model::step_delta`]/[`Model::step_full`]
/// the task runner calls; a model only has to implement the one its flag
/// selects (the default bodies of the other panic, mirroring the original's
/// `if constexpr` branch that never instantiates the unused path).
pub trait Model: Send + Sync + 'static + DeserializeOwned {
    type State: SimDoc + Default + Clone;
    type ModelState: SimDoc + Default;
    type Delta: SimDoc + Clone;
    type Terminate: Terminate<Self::State> + DeserializeOwned + Send + Sync + 'static;
    type Tweaks: SimDoc + Default;

    /// if true, `step_delta` is called and its result combined into state via [`Model::combine`]
    const DIFFERENTIAL: bool;
    /// if true, `ModelState` is persisted and restored across a `continue` run
    const RECOVERABLE: bool;

    /// Produce the increment for this step. Only called when `DIFFERENTIAL` is true.
    #[allow(unused_variables)]
    fn step_delta(
        &self,
        state: &Self::State,
        mstate: &mut Self::ModelState,
        ctx: &TaskCtx<'_, Self>,
    ) -> Self::Delta {
        unimplemented!("Model::DIFFERENTIAL is true but step_delta was not implemented")
    }

    /// Produce the full next state. Only called when `DIFFERENTIAL` is false.
    #[allow(unused_variables)]
    fn step_full(
        &self,
        state: &Self::State,
        mstate: &mut Self::ModelState,
        ctx: &TaskCtx<'_, Self>,
    ) -> Self::State {
        unimplemented!("Model::DIFFERENTIAL is false but step_full was not implemented")
    }

    /// `state <- state (+) delta`. Only called when `DIFFERENTIAL` is true.
    fn combine(state: &mut Self::State, delta: &Self::Delta);

    /// `delta <- new (-) old`. Only called when `DIFFERENTIAL` is false and tracing is on.
    fn difference(new: &Self::State, old: &Self::State) -> Self::Delta;
}
