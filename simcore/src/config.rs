//! Two-phase configuration loading: a document is first parsed as plain
//! `serde_json::Value` (and, when `patches` are present, merged per replica),
//! then walked field-by-field here. Required fields that are missing or
//! mistyped are fatal; optional fields that are mistyped fall back to their
//! default and are merely logged, unless `throw-wrong-type` promotes them to
//! fatal too.

use crate::error::ConfigError;
use serde_json::Value;

/// Read a required string field.
pub fn req_str(obj: &Value, field: &str) -> Result<String, ConfigError> {
    obj.get(field)
        .ok_or_else(|| ConfigError::Missing(field.to_string()))?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ConfigError::TypeMismatch {
            field: field.to_string(),
            expected: "a string",
        })
}

/// Read a required unsigned integer field.
pub fn req_u64(obj: &Value, field: &str) -> Result<u64, ConfigError> {
    obj.get(field)
        .ok_or_else(|| ConfigError::Missing(field.to_string()))?
        .as_u64()
        .ok_or_else(|| ConfigError::TypeMismatch {
            field: field.to_string(),
            expected: "a non-negative integer",
        })
}

/// Read an optional unsigned integer field, falling back to `default` when
/// the key is absent. When present but mistyped: fatal if `throw_wrong_type`,
/// otherwise a warning and the default.
pub fn opt_u64(
    obj: &Value,
    field: &str,
    default: u64,
    throw_wrong_type: bool,
) -> Result<u64, ConfigError> {
    match obj.get(field) {
        None => Ok(default),
        Some(v) => match v.as_u64() {
            Some(n) => Ok(n),
            None if throw_wrong_type => Err(ConfigError::TypeMismatch {
                field: field.to_string(),
                expected: "a non-negative integer",
            }),
            None => {
                log::warn!(
                    "config: field '{}' should be a non-negative integer, ignoring and using default {}",
                    field,
                    default
                );
                Ok(default)
            }
        },
    }
}

/// Read an optional boolean field, falling back to `default`.
pub fn opt_bool(
    obj: &Value,
    field: &str,
    default: bool,
    throw_wrong_type: bool,
) -> Result<bool, ConfigError> {
    match obj.get(field) {
        None => Ok(default),
        Some(v) => match v.as_bool() {
            Some(b) => Ok(b),
            None if throw_wrong_type => Err(ConfigError::TypeMismatch {
                field: field.to_string(),
                expected: "a boolean",
            }),
            None => {
                log::warn!(
                    "config: field '{}' should be a boolean, ignoring and using default {}",
                    field,
                    default
                );
                Ok(default)
            }
        },
    }
}

/// Decode an optional sub-document field into `T`, falling back to `T::default()`
/// when the key is absent.
pub fn opt_doc<T>(
    obj: &Value,
    field: &str,
    what: &'static str,
) -> Result<T, ConfigError>
where
    T: serde::de::DeserializeOwned + Default,
{
    match obj.get(field) {
        None => Ok(T::default()),
        Some(v) => serde_json::from_value(v.clone()).map_err(|e| ConfigError::Decode {
            what,
            reason: e.to_string(),
        }),
    }
}

/// Decode a required sub-document field into `T`.
pub fn req_doc<T>(obj: &Value, field: &str, what: &'static str) -> Result<T, ConfigError>
where
    T: serde::de::DeserializeOwned,
{
    let v = obj
        .get(field)
        .ok_or_else(|| ConfigError::Missing(field.to_string()))?;
    serde_json::from_value(v.clone()).map_err(|e| ConfigError::Decode {
        what,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn req_str_missing_is_fatal() {
        let obj = json!({});
        assert!(matches!(req_str(&obj, "workspace"), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn req_str_wrong_type_is_fatal() {
        let obj = json!({"workspace": 1});
        assert!(matches!(
            req_str(&obj, "workspace"),
            Err(ConfigError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn opt_u64_missing_falls_back_to_default() {
        let obj = json!({});
        assert_eq!(opt_u64(&obj, "sync", 7, false).unwrap(), 7);
    }

    #[test]
    fn opt_u64_wrong_type_warns_and_falls_back_when_lenient() {
        let obj = json!({"sync": "nope"});
        assert_eq!(opt_u64(&obj, "sync", 0, false).unwrap(), 0);
    }

    #[test]
    fn opt_u64_wrong_type_is_fatal_when_strict() {
        let obj = json!({"sync": "nope"});
        assert!(matches!(
            opt_u64(&obj, "sync", 0, true),
            Err(ConfigError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn opt_bool_present_overrides_default() {
        let obj = json!({"save-trace": false});
        assert!(!opt_bool(&obj, "save-trace", true, false).unwrap());
    }

    #[test]
    fn opt_doc_absent_uses_type_default() {
        #[derive(Debug, PartialEq, Default, serde::Serialize, serde::Deserialize)]
        struct Tweaks {
            scale: f64,
        }
        let obj = json!({});
        let tweaks: Tweaks = opt_doc(&obj, "tweaks", "tweaks").unwrap();
        assert_eq!(tweaks, Tweaks::default());
    }

    #[test]
    fn req_doc_missing_is_fatal() {
        let obj = json!({});
        let result: Result<serde_json::Value, _> = req_doc(&obj, "end-condition", "end-condition");
        assert!(matches!(result, Err(ConfigError::Missing(_))));
    }
}
