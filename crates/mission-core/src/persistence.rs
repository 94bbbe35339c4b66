//! Save/Load of the mission section
//!
//! Two layers live here. The generic persistor turns a script environment's
//! global namespace into a tree of [`DataNode`]s and back, keeping primitive
//! types, nested tables and domain references intact. On top of it,
//! [`MissionsSave`] is the serializable snapshot of every active mission,
//! written as JSON or as bincode.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::cargo::CargoId;
use crate::error::SaveError;
use crate::mission::{Marker, MissionId};
use crate::script::{ScriptKey, ScriptTable, ScriptValue};
use crate::universe::{DomainRef, RefKind, Universe};

/// Version number for the mission save format (increment when format changes)
pub const SAVE_VERSION: u32 = 1;

/// Top-level tables are only persisted when they carry this field set to a
/// truthy value. Nested tables are always persisted.
pub const SAVE_MARKER: &str = "__save";

/// One persisted key/value pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataNode {
    /// Key as text
    pub name: String,
    /// Whether `name` is the text of a number key
    pub keynum: bool,
    pub data: NodeData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeData {
    Table(Vec<DataNode>),
    /// Decimal text. Integers carry no fractional part, floats always do.
    Number(String),
    /// `'1'` or `'0'`
    Bool(char),
    Str(String),
    Planet(String),
    System(String),
    Faction(String),
    Ship(String),
}

fn key_text(key: &ScriptKey) -> (String, bool) {
    match key {
        ScriptKey::Str(s) => (s.clone(), false),
        ScriptKey::Int(i) => (i.to_string(), true),
        ScriptKey::Num(n) => (format!("{:?}", n), true),
    }
}

fn parse_key(name: &str, keynum: bool) -> Option<ScriptKey> {
    if !keynum {
        return Some(ScriptKey::Str(name.to_string()));
    }
    if let Ok(i) = name.parse::<i64>() {
        return Some(ScriptKey::Int(i));
    }
    name.parse::<f64>().ok().map(ScriptKey::Num)
}

fn ref_node(r: &DomainRef) -> NodeData {
    let name = r.name.clone();
    match r.kind {
        RefKind::Planet => NodeData::Planet(name),
        RefKind::System => NodeData::System(name),
        RefKind::Faction => NodeData::Faction(name),
        RefKind::Ship => NodeData::Ship(name),
    }
}

fn persist_value(value: &ScriptValue, depth: usize, limit: usize) -> Option<NodeData> {
    match value {
        ScriptValue::Integer(i) => Some(NodeData::Number(i.to_string())),
        ScriptValue::Number(n) => Some(NodeData::Number(format!("{:?}", n))),
        ScriptValue::Bool(b) => Some(NodeData::Bool(if *b { '1' } else { '0' })),
        ScriptValue::Str(s) => Some(NodeData::Str(s.clone())),
        ScriptValue::Ref(r) => Some(ref_node(r)),
        ScriptValue::Table(t) => {
            if depth >= limit {
                log::warn!("Table nested deeper than {} levels not saved", limit);
                return None;
            }
            Some(NodeData::Table(persist_table(t, depth + 1, limit)))
        }
        ScriptValue::Nil | ScriptValue::Opaque(_) => None,
    }
}

fn persist_table(table: &ScriptTable, depth: usize, limit: usize) -> Vec<DataNode> {
    table
        .entries
        .iter()
        .filter_map(|(key, value)| {
            let data = persist_value(value, depth, limit)?;
            let (name, keynum) = key_text(key);
            Some(DataNode { name, keynum, data })
        })
        .collect()
}

/// Serialize a snapshot of an environment's globals.
///
/// Top-level tables without a truthy [`SAVE_MARKER`] field are skipped;
/// functions, nil and foreign values are skipped everywhere.
pub fn persist_globals(globals: &[(ScriptKey, ScriptValue)], depth_limit: usize) -> Vec<DataNode> {
    globals
        .iter()
        .filter_map(|(key, value)| {
            if let ScriptValue::Table(t) = value {
                if !t.is_marked(SAVE_MARKER) {
                    return None;
                }
            }
            let data = persist_value(value, 0, depth_limit)?;
            let (name, keynum) = key_text(key);
            Some(DataNode { name, keynum, data })
        })
        .collect()
}

fn unpersist_value(
    node: &DataNode,
    universe: &Universe,
    depth: usize,
    limit: usize,
) -> Option<ScriptValue> {
    let resolve = |kind: RefKind, name: &str| {
        let found = universe.resolve(kind, name);
        if found.is_none() {
            log::warn!(
                "Saved {} '{}' for '{}' no longer exists - dropping",
                kind.label(),
                name,
                node.name
            );
        }
        found.map(ScriptValue::Ref)
    };

    match &node.data {
        NodeData::Number(text) => {
            if let Ok(i) = text.parse::<i64>() {
                return Some(ScriptValue::Integer(i));
            }
            match text.parse::<f64>() {
                Ok(n) => Some(ScriptValue::Number(n)),
                Err(_) => {
                    log::warn!("Invalid number '{}' for '{}' - dropping", text, node.name);
                    None
                }
            }
        }
        NodeData::Bool('1') => Some(ScriptValue::Bool(true)),
        NodeData::Bool('0') => Some(ScriptValue::Bool(false)),
        NodeData::Bool(c) => {
            log::warn!("Invalid boolean '{}' for '{}' - dropping", c, node.name);
            None
        }
        NodeData::Str(s) => Some(ScriptValue::Str(s.clone())),
        NodeData::Planet(name) => resolve(RefKind::Planet, name),
        NodeData::System(name) => resolve(RefKind::System, name),
        NodeData::Faction(name) => resolve(RefKind::Faction, name),
        NodeData::Ship(name) => resolve(RefKind::Ship, name),
        NodeData::Table(children) => {
            if depth >= limit {
                log::warn!("Saved table '{}' nested deeper than {} levels - dropping", node.name, limit);
                return None;
            }
            let mut table = ScriptTable::new();
            for (key, value) in unpersist_entries(children, universe, depth + 1, limit) {
                table.insert(key, value);
            }
            Some(ScriptValue::Table(table))
        }
    }
}

fn unpersist_entries(
    nodes: &[DataNode],
    universe: &Universe,
    depth: usize,
    limit: usize,
) -> Vec<(ScriptKey, ScriptValue)> {
    nodes
        .iter()
        .filter_map(|node| {
            let Some(key) = parse_key(&node.name, node.keynum) else {
                log::warn!("Invalid number key '{}' - dropping", node.name);
                return None;
            };
            let value = unpersist_value(node, universe, depth, limit)?;
            Some((key, value))
        })
        .collect()
}

/// Rebuild global assignments from a saved node tree. References are
/// re-resolved by name; anything that no longer resolves is dropped.
pub fn unpersist_nodes(
    nodes: &[DataNode],
    universe: &Universe,
    depth_limit: usize,
) -> Vec<(ScriptKey, ScriptValue)> {
    unpersist_entries(nodes, universe, 0, depth_limit)
}

/// An armed timer of a saved mission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedTimer {
    pub slot: usize,
    pub callback: String,
    pub remaining: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedOsd {
    pub title: String,
    pub items: Vec<String>,
    pub active: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedHook {
    pub event: String,
    pub callback: String,
}

/// Serializable snapshot of one active mission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedMission {
    /// Template name, resolved against the catalog on load
    pub template: String,
    pub id: MissionId,
    pub title: Option<String>,
    pub description: Option<String>,
    pub reward: Option<String>,
    pub npc: Option<String>,
    pub portrait: Option<String>,
    pub marker: Option<Marker>,
    pub cargo: Vec<CargoId>,
    pub timers: Vec<SavedTimer>,
    pub osd: Option<SavedOsd>,
    pub hooks: Vec<SavedHook>,
    /// Persisted script globals
    pub lua: Vec<DataNode>,
}

/// Serializable snapshot of the mission section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionsSave {
    /// Save format version
    pub version: u32,
    /// Completed template names
    pub completed: Vec<String>,
    /// Active missions in slot order
    pub missions: Vec<SavedMission>,
}

impl Default for MissionsSave {
    fn default() -> Self {
        Self {
            version: SAVE_VERSION,
            completed: Vec::new(),
            missions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveFormat {
    #[default]
    Json,
    Binary,
}

impl SaveFormat {
    pub fn encode<W: Write>(&self, writer: W, save: &MissionsSave) -> Result<(), SaveError> {
        match self {
            SaveFormat::Json => serde_json::to_writer_pretty(writer, save)?,
            SaveFormat::Binary => bincode::serialize_into(writer, save)?,
        }
        Ok(())
    }

    pub fn decode<R: Read>(&self, reader: R) -> Result<MissionsSave, SaveError> {
        let save: MissionsSave = match self {
            SaveFormat::Json => serde_json::from_reader(reader)?,
            SaveFormat::Binary => bincode::deserialize_from(reader)?,
        };

        if save.version != SAVE_VERSION {
            return Err(SaveError::VersionMismatch {
                expected: SAVE_VERSION,
                found: save.version,
            });
        }
        Ok(save)
    }
}
