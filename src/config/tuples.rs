//! Tagged tuple lists
//!
//! JSON has a single ordered sequence type so fixed-arity tuples are written as
//! a tagged mapping:
//!
//! ```json
//! {"__tuple_list__": true, "list": [[0, 1], [2, 3]]}
//! ```
//!
//! [`reconstruct_tuples`] rewrites every such mapping into its list of rows.
//! The rows then decode into Rust tuples (e.g. `Vec<(usize, usize)>`),
//! which is where arity is enforced.
use super::ConfigError;
use serde_json::{Map, Value};

/// Key marking a mapping as a tagged tuple list.
pub const TUPLE_LIST_TAG: &str = "__tuple_list__";
/// Key holding the rows of a tagged tuple list.
pub const TUPLE_LIST_FIELD: &str = "list";

/// Replace every tagged tuple list in `value` by its rows, innermost first.
///
/// Mappings without the tag pass through unchanged.
pub fn reconstruct_tuples(value: Value) -> Result<Value, ConfigError> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(reconstruct_tuples)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let map = map
                .into_iter()
                .map(|(key, value)| Ok((key, reconstruct_tuples(value)?)))
                .collect::<Result<Map<_, _>, ConfigError>>()?;
            if map.contains_key(TUPLE_LIST_TAG) {
                tuple_rows(map)
            } else {
                Ok(Value::Object(map))
            }
        }
        other => Ok(other),
    }
}

/// Wrap rows in a tagged tuple list mapping.
pub fn tag_tuple_list(rows: Vec<Value>) -> Value {
    let mut map = Map::new();
    map.insert(TUPLE_LIST_TAG.into(), Value::Bool(true));
    map.insert(TUPLE_LIST_FIELD.into(), Value::Array(rows));
    Value::Object(map)
}

fn tuple_rows(mut map: Map<String, Value>) -> Result<Value, ConfigError> {
    let rows = match map.remove(TUPLE_LIST_FIELD) {
        Some(Value::Array(rows)) => rows,
        Some(other) => {
            return Err(ConfigError::TupleList {
                reason: format!("`{}` must be an array, found {}", TUPLE_LIST_FIELD, other),
            })
        }
        None => {
            return Err(ConfigError::TupleList {
                reason: format!("missing `{}` field", TUPLE_LIST_FIELD),
            })
        }
    };
    for (i, row) in rows.iter().enumerate() {
        if !row.is_array() {
            return Err(ConfigError::TupleList {
                reason: format!("row {} is not an array: {}", i, row),
            });
        }
    }
    Ok(Value::Array(rows))
}
