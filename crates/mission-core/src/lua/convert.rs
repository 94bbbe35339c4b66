//! Conversions between Lua values and [`ScriptValue`].

use mlua::{Lua, Table, Value};

use crate::script::{ScriptKey, ScriptTable, ScriptValue};

use super::api::LuaRef;

pub(crate) fn key_from_lua(key: &Value) -> Option<ScriptKey> {
    match key {
        Value::String(s) => Some(ScriptKey::Str(s.to_string_lossy().into_owned())),
        Value::Integer(i) => Some(ScriptKey::Int(*i)),
        Value::Number(n) => Some(ScriptKey::Num(*n)),
        _ => None,
    }
}

pub(crate) fn key_to_lua<'lua>(lua: &'lua Lua, key: &ScriptKey) -> mlua::Result<Value<'lua>> {
    Ok(match key {
        ScriptKey::Str(s) => Value::String(lua.create_string(s)?),
        ScriptKey::Int(i) => Value::Integer(*i),
        ScriptKey::Num(n) => Value::Number(*n),
    })
}

fn table_from_lua(table: &Table, depth: usize, limit: usize) -> ScriptValue {
    if depth >= limit {
        log::warn!("Lua table nested deeper than {} levels", limit);
        return ScriptValue::Opaque("table");
    }
    let mut out = ScriptTable::new();
    for pair in table.clone().pairs::<Value, Value>() {
        let Ok((key, value)) = pair else {
            continue;
        };
        let Some(key) = key_from_lua(&key) else {
            continue;
        };
        out.entries.push((key, from_lua(&value, depth + 1, limit)));
    }
    ScriptValue::Table(out)
}

/// Convert a Lua value. Tables nested past `limit` become opaque.
pub(crate) fn from_lua(value: &Value, depth: usize, limit: usize) -> ScriptValue {
    match value {
        Value::Nil => ScriptValue::Nil,
        Value::Boolean(b) => ScriptValue::Bool(*b),
        Value::Integer(i) => ScriptValue::Integer(*i),
        Value::Number(n) => ScriptValue::Number(*n),
        Value::String(s) => ScriptValue::Str(s.to_string_lossy().into_owned()),
        Value::Table(t) => table_from_lua(t, depth, limit),
        Value::UserData(ud) => match ud.borrow::<LuaRef>() {
            Ok(r) => ScriptValue::Ref(r.0.clone()),
            Err(_) => ScriptValue::Opaque("userdata"),
        },
        other => ScriptValue::Opaque(other.type_name()),
    }
}

/// Top-level conversion for snapshots: a table is only walked when it
/// carries a truthy `marker` field.
pub(crate) fn global_from_lua(value: &Value, marker: &str, limit: usize) -> ScriptValue {
    match value {
        Value::Table(t) => {
            let marked = matches!(
                t.raw_get::<_, Value>(marker),
                Ok(v) if !matches!(v, Value::Nil | Value::Boolean(false))
            );
            if marked {
                table_from_lua(t, 0, limit)
            } else {
                ScriptValue::Table(ScriptTable::new())
            }
        }
        other => from_lua(other, 0, limit),
    }
}

pub(crate) fn to_lua<'lua>(
    lua: &'lua Lua,
    value: &ScriptValue,
    depth: usize,
    limit: usize,
) -> mlua::Result<Value<'lua>> {
    Ok(match value {
        ScriptValue::Nil | ScriptValue::Opaque(_) => Value::Nil,
        ScriptValue::Bool(b) => Value::Boolean(*b),
        ScriptValue::Integer(i) => Value::Integer(*i),
        ScriptValue::Number(n) => Value::Number(*n),
        ScriptValue::Str(s) => Value::String(lua.create_string(s)?),
        ScriptValue::Ref(r) => Value::UserData(lua.create_userdata(LuaRef(r.clone()))?),
        ScriptValue::Table(t) => {
            if depth >= limit {
                log::warn!("Table nested deeper than {} levels not restored", limit);
                return Ok(Value::Nil);
            }
            let table = lua.create_table()?;
            for (key, value) in &t.entries {
                if matches!(key, ScriptKey::Num(n) if n.is_nan()) {
                    continue;
                }
                table.raw_set(key_to_lua(lua, key)?, to_lua(lua, value, depth + 1, limit)?)?;
            }
            Value::Table(table)
        }
    })
}
