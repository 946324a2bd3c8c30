//! Lua <-> JSON value conversion
//!
//! Templates receive their context as plain Lua tables and hand back plain
//! Lua tables; this module converts both directions. Conversion of returned
//! values is depth-bounded so a reference cycle terminates with an error
//! instead of recursing forever.

use mlua::{Lua, Table, Value as LuaValue};
use serde_json::{Map, Number, Value as JsonValue};

/// Maximum nesting depth accepted when converting a returned value.
pub const MAX_VALUE_DEPTH: usize = 64;

/// Error produced when a Lua value cannot be represented as JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertError {
    /// Path into the returned value, empty for the root
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ConvertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "return value: {}", self.message)
        } else {
            write!(f, "return value at `{}`: {}", self.path, self.message)
        }
    }
}

impl std::error::Error for ConvertError {}

/// Convert a JSON value into a Lua value.
///
/// JSON nulls become `nil`; integral numbers become Lua integers.
pub fn json_to_lua(lua: &Lua, value: &JsonValue) -> mlua::Result<LuaValue> {
    Ok(match value {
        JsonValue::Null => LuaValue::Nil,
        JsonValue::Bool(b) => LuaValue::Boolean(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                LuaValue::Integer(i)
            } else {
                LuaValue::Number(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        JsonValue::String(s) => LuaValue::String(lua.create_string(s)?),
        JsonValue::Array(items) => {
            let table = lua.create_table_with_capacity(items.len(), 0)?;
            for (i, item) in items.iter().enumerate() {
                table.raw_set(i + 1, json_to_lua(lua, item)?)?;
            }
            LuaValue::Table(table)
        }
        JsonValue::Object(map) => {
            let table = lua.create_table_with_capacity(0, map.len())?;
            for (key, item) in map {
                table.raw_set(key.as_str(), json_to_lua(lua, item)?)?;
            }
            LuaValue::Table(table)
        }
    })
}

/// Convert a Lua value into a JSON value.
///
/// Tables whose keys are exactly `1..=n` become sequences; tables with
/// string keys become mappings. An empty table has nothing to distinguish
/// the two and becomes an empty sequence. Functions, userdata, and threads
/// are not representable and produce a [`ConvertError`].
pub fn lua_to_json(value: &LuaValue) -> Result<JsonValue, ConvertError> {
    convert(value, String::new(), 0)
}

fn convert(value: &LuaValue, path: String, depth: usize) -> Result<JsonValue, ConvertError> {
    if depth > MAX_VALUE_DEPTH {
        return Err(ConvertError {
            path,
            message: format!("nesting exceeds {MAX_VALUE_DEPTH} levels (cyclic table?)"),
        });
    }

    match value {
        LuaValue::Nil => Ok(JsonValue::Null),
        LuaValue::Boolean(b) => Ok(JsonValue::Bool(*b)),
        LuaValue::Integer(i) => Ok(JsonValue::Number((*i).into())),
        LuaValue::Number(n) => Number::from_f64(*n).map(JsonValue::Number).ok_or_else(|| {
            ConvertError {
                path,
                message: "number is not finite".to_string(),
            }
        }),
        LuaValue::String(s) => match s.to_str() {
            Ok(s) => Ok(JsonValue::String(s.to_string())),
            Err(_) => Err(ConvertError {
                path,
                message: "string is not valid UTF-8".to_string(),
            }),
        },
        LuaValue::Table(table) => convert_table(table, path, depth),
        other => Err(ConvertError {
            path,
            message: format!("unsupported Lua type `{}`", other.type_name()),
        }),
    }
}

fn convert_table(table: &Table, path: String, depth: usize) -> Result<JsonValue, ConvertError> {
    let len = table.raw_len();

    let mut pair_count = 0usize;
    let mut is_sequence = true;
    for pair in table.clone().pairs::<LuaValue, LuaValue>() {
        let (key, _) = pair.map_err(|e| ConvertError {
            path: path.clone(),
            message: e.to_string(),
        })?;
        pair_count += 1;
        match key {
            LuaValue::Integer(i) if i >= 1 && (i as usize) <= len => {}
            _ => is_sequence = false,
        }
    }

    if is_sequence && pair_count == len {
        let mut items = Vec::with_capacity(len);
        for i in 1..=len {
            let item: LuaValue = table.raw_get(i).map_err(|e| ConvertError {
                path: path.clone(),
                message: e.to_string(),
            })?;
            let child = if path.is_empty() {
                format!("[{i}]")
            } else {
                format!("{path}[{i}]")
            };
            items.push(convert(&item, child, depth + 1)?);
        }
        return Ok(JsonValue::Array(items));
    }

    let mut map = Map::new();
    for pair in table.clone().pairs::<LuaValue, LuaValue>() {
        let (key, item) = pair.map_err(|e| ConvertError {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let key = match key {
            LuaValue::String(s) => match s.to_str() {
                Ok(s) => s.to_string(),
                Err(_) => {
                    return Err(ConvertError {
                        path,
                        message: "mapping key is not valid UTF-8".to_string(),
                    });
                }
            },
            other => {
                return Err(ConvertError {
                    path,
                    message: format!("mapping keys must be strings, found `{}`", other.type_name()),
                });
            }
        };
        let child = if path.is_empty() {
            key.clone()
        } else {
            format!("{path}.{key}")
        };
        map.insert(key, convert(&item, child, depth + 1)?);
    }
    Ok(JsonValue::Object(map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval_to_json(source: &str) -> Result<JsonValue, ConvertError> {
        let lua = Lua::new();
        let value: LuaValue = lua.load(source).eval().unwrap();
        lua_to_json(&value)
    }

    #[test]
    fn test_scalars_round_trip() {
        let lua = Lua::new();
        let input = json!({
            "s": "text",
            "i": 42,
            "f": 1.5,
            "b": true,
            "n": null
        });

        let value = json_to_lua(&lua, &input).unwrap();
        let output = lua_to_json(&value).unwrap();

        // null becomes nil, which vanishes from the table
        assert_eq!(output, json!({ "s": "text", "i": 42, "f": 1.5, "b": true }));
    }

    #[test]
    fn test_sequence_detection() {
        assert_eq!(
            eval_to_json(r#"return { "a", "b", "c" }"#).unwrap(),
            json!(["a", "b", "c"])
        );
        assert_eq!(
            eval_to_json(r#"return { x = 1, y = 2 }"#).unwrap(),
            json!({ "x": 1, "y": 2 })
        );
        // empty table has no way to distinguish sequence from mapping
        assert_eq!(eval_to_json(r#"return {}"#).unwrap(), json!([]));
    }

    #[test]
    fn test_nested_structure() {
        let output = eval_to_json(
            r#"
            return {
                version = "1",
                steps = {
                    { name = "build", commands = { "go build", "go test" } },
                },
            }
            "#,
        )
        .unwrap();
        assert_eq!(output["steps"][0]["commands"][1], "go test");
    }

    #[test]
    fn test_unsupported_value() {
        let err = eval_to_json(r#"return { f = function() end }"#).unwrap_err();
        assert_eq!(err.path, "f");
        assert!(err.message.contains("function"));
    }

    #[test]
    fn test_non_string_key() {
        let err = eval_to_json(r#"return { [true] = 1 }"#).unwrap_err();
        assert!(err.message.contains("keys must be strings"));
    }

    #[test]
    fn test_cycle_terminates() {
        let err = eval_to_json(
            r#"
            local t = {}
            t.inner = t
            return t
            "#,
        )
        .unwrap_err();
        assert!(err.message.contains("nesting exceeds"));
    }

    #[test]
    fn test_json_to_lua_arrays_are_sequences() {
        let lua = Lua::new();
        let value = json_to_lua(&lua, &json!({ "items": [10, 20, 30] })).unwrap();
        lua.globals().set("ctx", value).unwrap();

        let total: i64 = lua
            .load(
                r#"
                local sum = 0
                for _, v in ipairs(ctx.items) do sum = sum + v end
                return sum
            "#,
            )
            .eval()
            .unwrap();
        assert_eq!(total, 60);
    }
}
