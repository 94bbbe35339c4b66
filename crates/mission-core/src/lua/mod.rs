//! Lua 5.4 backend for mission scripts.
//!
//! Every mission instance gets its own `Lua` state with the mission API
//! installed, so globals never leak between missions. Availability
//! conditions are evaluated in one separate shared state.

pub(crate) mod api;
pub(crate) mod convert;

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::rc::Rc;

use mlua::{Function, Lua, MultiValue, Value};

use crate::config::DEFAULT_PERSIST_DEPTH;
use crate::error::ScriptError;
use crate::mission::MissionLog;
use crate::script::{CallReturn, ScriptBinding, ScriptEnv, ScriptHost, ScriptKey, ScriptValue};
use crate::universe::Universe;

use api::DeferToken;

/// Where mission sources are read from.
#[derive(Debug, Clone)]
pub enum ScriptSource {
    /// `<dir>/<script>.lua`
    Directory(PathBuf),
    /// Script name to source text
    Memory(HashMap<String, String>),
}

impl ScriptSource {
    pub fn read(&self, script: &str) -> Result<String, ScriptError> {
        match self {
            ScriptSource::Directory(dir) => {
                let path = dir.join(format!("{}.lua", script));
                std::fs::read_to_string(&path).map_err(|e| match e.kind() {
                    ErrorKind::NotFound => ScriptError::NotFound(script.to_string()),
                    _ => ScriptError::Load {
                        script: script.to_string(),
                        message: e.to_string(),
                    },
                })
            }
            ScriptSource::Memory(sources) => sources
                .get(script)
                .cloned()
                .ok_or_else(|| ScriptError::NotFound(script.to_string())),
        }
    }
}

pub struct LuaHost {
    source: ScriptSource,
    universe: Rc<Universe>,
    cond: Lua,
    depth_limit: usize,
}

impl LuaHost {
    pub fn new(source: ScriptSource, universe: Rc<Universe>) -> Result<Self, ScriptError> {
        let cond = Lua::new();
        api::register_refs(&cond, &universe).map_err(|e| ScriptError::Load {
            script: "condition".into(),
            message: e.to_string(),
        })?;
        Ok(Self {
            source,
            universe,
            cond,
            depth_limit: DEFAULT_PERSIST_DEPTH,
        })
    }

    pub fn from_dir(dir: impl Into<PathBuf>, universe: Rc<Universe>) -> Result<Self, ScriptError> {
        Self::new(ScriptSource::Directory(dir.into()), universe)
    }

    /// Host over in-memory `(script name, source)` pairs.
    pub fn in_memory<I, K, V>(sources: I, universe: Rc<Universe>) -> Result<Self, ScriptError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let sources = sources
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::new(ScriptSource::Memory(sources), universe)
    }

    pub fn with_depth_limit(mut self, depth_limit: usize) -> Self {
        self.depth_limit = depth_limit;
        self
    }

    pub fn universe(&self) -> &Rc<Universe> {
        &self.universe
    }
}

impl ScriptHost for LuaHost {
    fn load(&self, script: &str, binding: ScriptBinding) -> Result<Box<dyn ScriptEnv>, ScriptError> {
        let source = self.source.read(script)?;
        let load_err = |e: mlua::Error| ScriptError::Load {
            script: script.to_string(),
            message: e.to_string(),
        };

        let lua = Lua::new();
        api::register(&lua, &binding, &self.universe).map_err(load_err)?;
        lua.load(source.as_str())
            .set_name(script)
            .exec()
            .map_err(load_err)?;

        Ok(Box::new(LuaEnv {
            lua,
            depth_limit: self.depth_limit,
        }))
    }

    fn check_condition(&self, condition: &str, log: &MissionLog) -> Result<bool, ScriptError> {
        let runtime = |e: mlua::Error| ScriptError::Runtime {
            entry: "condition".into(),
            message: e.to_string(),
        };

        let done = self.cond.create_table().map_err(runtime)?;
        for name in log.iter() {
            done.set(name, true).map_err(runtime)?;
        }
        self.cond.globals().set("done", done).map_err(runtime)?;

        self.cond
            .load(format!("return {}", condition))
            .set_name("condition")
            .eval::<bool>()
            .map_err(runtime)
    }
}

/// One mission's private Lua state.
pub struct LuaEnv {
    lua: Lua,
    depth_limit: usize,
}

impl LuaEnv {
    fn function(&self, name: &str) -> Option<Function<'_>> {
        match self.lua.globals().get::<_, Value>(name) {
            Ok(Value::Function(f)) => Some(f),
            _ => None,
        }
    }
}

impl ScriptEnv for LuaEnv {
    fn has_entry(&self, name: &str) -> bool {
        self.function(name).is_some()
    }

    fn call(&mut self, entry: &str, args: &[ScriptValue]) -> Result<CallReturn, ScriptError> {
        let runtime = |e: mlua::Error| ScriptError::Runtime {
            entry: entry.to_string(),
            message: e.to_string(),
        };
        let func = self.function(entry).ok_or_else(|| ScriptError::MissingEntry {
            entry: entry.to_string(),
        })?;

        let args = args
            .iter()
            .map(|a| convert::to_lua(&self.lua, a, 0, self.depth_limit))
            .collect::<mlua::Result<Vec<_>>>()
            .map_err(runtime)?;
        let ret = func
            .call::<_, MultiValue>(MultiValue::from_vec(args))
            .map_err(runtime)?;

        Ok(match ret.into_iter().next() {
            Some(Value::UserData(ud)) if ud.is::<DeferToken>() => CallReturn::Deferred,
            Some(value) => CallReturn::Value(convert::from_lua(&value, 0, self.depth_limit)),
            None => CallReturn::Value(ScriptValue::Nil),
        })
    }

    fn snapshot_globals(
        &self,
        marker: &str,
        depth_limit: usize,
    ) -> Result<Vec<(ScriptKey, ScriptValue)>, ScriptError> {
        let mut out = Vec::new();
        for pair in self.lua.globals().pairs::<Value, Value>() {
            let (key, value) = pair.map_err(|e| ScriptError::Runtime {
                entry: "snapshot".into(),
                message: e.to_string(),
            })?;
            let Some(key) = convert::key_from_lua(&key) else {
                continue;
            };
            out.push((key, convert::global_from_lua(&value, marker, depth_limit)));
        }
        Ok(out)
    }

    fn get_global(&self, name: &str) -> Result<ScriptValue, ScriptError> {
        let value = self
            .lua
            .globals()
            .get::<_, Value>(name)
            .map_err(|e| ScriptError::Runtime {
                entry: name.to_string(),
                message: e.to_string(),
            })?;
        Ok(convert::from_lua(&value, 0, self.depth_limit))
    }

    fn set_global(&mut self, key: &ScriptKey, value: &ScriptValue) -> Result<(), ScriptError> {
        let set = || -> mlua::Result<()> {
            let k = convert::key_to_lua(&self.lua, key)?;
            let v = convert::to_lua(&self.lua, value, 0, self.depth_limit)?;
            self.lua.globals().raw_set(k, v)
        };
        set().map_err(|e| ScriptError::Runtime {
            entry: "restore".into(),
            message: e.to_string(),
        })
    }
}
