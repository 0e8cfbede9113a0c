/*
 * Created on Sun Jul 28 2026
 *
 * This file is a part of Skytable
 * Skytable (formerly known as TerrabaseDB or Skybase) is a free and open-source
 * NoSQL database written by Sayan Nandan ("the Author") with the
 * vision to provide flexibility in data modelling without compromising
 * on performance, queryability or scalability.
 *
 * Copyright (c) 2026, Sayan Nandan <ohsayan@outlook.com>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! A toy random-walk model: carries no general-purpose simulation semantics
//! and exists only so this binary has something concrete to drive through
//! `simcore::Engine`. Differential and recoverable, the way a real model is
//! expected to usually be.

use rand::Rng;
use serde::{Deserialize, Serialize};
use simcore::{Model, TaskCtx, Terminate};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct State {
    pub value: f64,
    pub steps: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelState;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Delta {
    pub dvalue: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndCondition {
    pub max_steps: u64,
}

impl Terminate<State> for EndCondition {
    fn test(&self, state: &State) -> bool {
        state.steps >= self.max_steps
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tweaks {
    /// the magnitude of each step's random excursion
    #[serde(default = "default_step_scale")]
    pub step_scale: f64,
    /// an artificial per-step delay, simulating real work
    #[serde(default)]
    pub sleep_ms: u64,
}

fn default_step_scale() -> f64 {
    1.0
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RandomWalk {}

impl Model for RandomWalk {
    type State = State;
    type ModelState = ModelState;
    type Delta = Delta;
    type Terminate = EndCondition;
    type Tweaks = Tweaks;

    const DIFFERENTIAL: bool = true;
    const RECOVERABLE: bool = true;

    fn step_delta(
        &self,
        _state: &State,
        _mstate: &mut ModelState,
        ctx: &TaskCtx<'_, Self>,
    ) -> Delta {
        let tweaks = ctx.batch_tweaks.or(ctx.engine_tweaks);
        let (scale, sleep_ms) = match tweaks {
            Some(t) => (t.step_scale, t.sleep_ms),
            None => (1.0, 0),
        };
        if sleep_ms > 0 {
            thread::sleep(Duration::from_millis(sleep_ms));
        }
        let dvalue = rand::thread_rng().gen_range(-1.0..=1.0) * scale;
        Delta { dvalue }
    }

    fn combine(state: &mut State, delta: &Delta) {
        state.value += delta.dvalue;
        state.steps += 1;
    }

    fn difference(new: &State, old: &State) -> Delta {
        Delta {
            dvalue: new.value - old.value,
        }
    }
}
