//! The narrow interface between missions and their scripting VM.
//!
//! Nothing outside the [`crate::lua`] backend knows which VM runs mission
//! scripts. Values cross the boundary as [`ScriptValue`], a closed tagged
//! union, and the persistor is written purely against it.

use crate::cargo::SharedHold;
use crate::error::ScriptError;
use crate::mission::{MissionId, MissionLog, SharedState};
use crate::universe::DomainRef;

/// Key of a table entry. Number keys stay distinct from string keys with
/// the same digits.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptKey {
    Str(String),
    Int(i64),
    Num(f64),
}

impl ScriptKey {
    pub fn is_number(&self) -> bool {
        !matches!(self, ScriptKey::Str(_))
    }
}

impl From<&str> for ScriptKey {
    fn from(s: &str) -> Self {
        ScriptKey::Str(s.to_string())
    }
}

impl From<i64> for ScriptKey {
    fn from(i: i64) -> Self {
        ScriptKey::Int(i)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Nil,
    Bool(bool),
    Integer(i64),
    Number(f64),
    Str(String),
    Table(ScriptTable),
    Ref(DomainRef),
    /// Anything the VM holds that has no portable representation
    /// (functions, coroutines, foreign userdata). Carries a type label.
    Opaque(&'static str),
}

impl ScriptValue {
    pub fn is_truthy(&self) -> bool {
        !matches!(self, ScriptValue::Nil | ScriptValue::Bool(false))
    }

    pub fn as_table(&self) -> Option<&ScriptTable> {
        match self {
            ScriptValue::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for ScriptValue {
    fn from(s: &str) -> Self {
        ScriptValue::Str(s.to_string())
    }
}

/// Table contents in VM iteration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptTable {
    pub entries: Vec<(ScriptKey, ScriptValue)>,
}

impl ScriptTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<ScriptKey>, value: ScriptValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &ScriptKey) -> Option<&ScriptValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_str(&self, key: &str) -> Option<&ScriptValue> {
        self.get(&ScriptKey::Str(key.to_string()))
    }

    /// True when the table carries a truthy string-keyed `marker` field.
    pub fn is_marked(&self, marker: &str) -> bool {
        self.get_str(marker).is_some_and(ScriptValue::is_truthy)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// How a script entry point returned.
#[derive(Debug, Clone, PartialEq)]
pub enum CallReturn {
    Value(ScriptValue),
    /// The script returned the deferral sentinel (`misn.DEFER`).
    Deferred,
}

/// What a freshly loaded environment is bound to.
#[derive(Clone)]
pub struct ScriptBinding {
    pub mission: MissionId,
    pub state: SharedState,
    pub hold: SharedHold,
}

/// One mission's private, isolated global namespace.
pub trait ScriptEnv {
    /// Whether a global function `name` exists.
    fn has_entry(&self, name: &str) -> bool;

    /// Call the global function `entry`.
    fn call(&mut self, entry: &str, args: &[ScriptValue]) -> Result<CallReturn, ScriptError>;

    /// Snapshot the global namespace for persistence.
    ///
    /// Top-level tables are only expanded when they carry a truthy `marker`
    /// field; the others come back as empty tables. Nesting deeper than
    /// `depth_limit` is reported as [`ScriptValue::Opaque`].
    fn snapshot_globals(
        &self,
        marker: &str,
        depth_limit: usize,
    ) -> Result<Vec<(ScriptKey, ScriptValue)>, ScriptError>;

    fn get_global(&self, name: &str) -> Result<ScriptValue, ScriptError>;

    fn set_global(&mut self, key: &ScriptKey, value: &ScriptValue) -> Result<(), ScriptError>;
}

/// Factory for mission environments plus the side-effect-free condition
/// evaluator used by the availability matcher.
pub trait ScriptHost {
    fn load(&self, script: &str, binding: ScriptBinding) -> Result<Box<dyn ScriptEnv>, ScriptError>;

    fn check_condition(&self, condition: &str, log: &MissionLog) -> Result<bool, ScriptError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_and_string_keys_differ() {
        let mut t = ScriptTable::new();
        t.insert(3i64, ScriptValue::from("int"));
        t.insert("3", ScriptValue::from("str"));
        assert_eq!(t.len(), 2);
        assert_eq!(t.get(&ScriptKey::Int(3)), Some(&ScriptValue::from("int")));
        assert_eq!(t.get_str("3"), Some(&ScriptValue::from("str")));
    }

    #[test]
    fn insert_replaces_existing_key() {
        let mut t = ScriptTable::new();
        t.insert("stage", ScriptValue::Integer(1));
        t.insert("stage", ScriptValue::Integer(2));
        assert_eq!(t.len(), 1);
        assert_eq!(t.get_str("stage"), Some(&ScriptValue::Integer(2)));
    }

    #[test]
    fn marker_must_be_truthy() {
        let mut t = ScriptTable::new();
        assert!(!t.is_marked("__save"));
        t.insert("__save", ScriptValue::Bool(false));
        assert!(!t.is_marked("__save"));
        t.insert("__save", ScriptValue::Bool(true));
        assert!(t.is_marked("__save"));
    }
}
