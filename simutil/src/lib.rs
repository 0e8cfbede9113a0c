/*
 * Created on Mon Jul 20 2020
 *
 * This file is a part of Skytable
 * Skytable (formerly known as TerrabaseDB or Skybase) is a free and open-source
 * NoSQL database written by Sayan Nandan ("the Author") with the
 * vision to provide flexibility in data modelling without compromising
 * on performance, queryability or scalability.
 *
 * Copyright (c) 2020, Sayan Nandan <ohsayan@outlook.com>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! Small utilities shared across the simulation harness crates.

pub mod util;

use serde_json::Value;
use std::error::Error;

/// A generic result, used only at the thinnest ambient edges (not within
/// the core engine, which always returns its own typed error enums).
pub type TResult<T> = Result<T, Box<dyn Error>>;

/// Right-biased deep merge of `patch` onto `base`, the JSON-merge-patch
/// semantics (RFC 7386): objects merge key-by-key recursively, any other
/// value (including `null`, which deletes the key) replaces outright.
pub fn merge_patch(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            for (key, patch_value) in patch_map {
                if patch_value.is_null() {
                    base_map.remove(key);
                } else {
                    merge_patch(
                        base_map.entry(key.clone()).or_insert(Value::Null),
                        patch_value,
                    );
                }
            }
        }
        (base_slot, patch_value) => {
            *base_slot = patch_value.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_overwrites_scalar_fields() {
        let mut base = json!({"a": 1, "b": 2});
        merge_patch(&mut base, &json!({"b": 3}));
        assert_eq!(base, json!({"a": 1, "b": 3}));
    }

    #[test]
    fn merge_recurses_into_nested_objects() {
        let mut base = json!({"outer": {"x": 1, "y": 2}});
        merge_patch(&mut base, &json!({"outer": {"y": 9}}));
        assert_eq!(base, json!({"outer": {"y": 9, "x": 1}}));
    }

    #[test]
    fn null_patch_value_deletes_key() {
        let mut base = json!({"a": 1, "b": 2});
        merge_patch(&mut base, &json!({"a": null}));
        assert_eq!(base, json!({"b": 2}));
    }
}
