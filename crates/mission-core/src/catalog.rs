//! Mission template catalog.
//!
//! Loaded once from a JSON document of the form
//! `{ "missions": [ { "name": ..., "lua": ..., "flags": {...}, "avail": {...} } ] }`
//! and never mutated afterwards. Bad entries are logged and skipped so one
//! broken template never takes the others down.

use std::path::Path;

use serde::Deserialize;

use crate::error::CatalogError;
use crate::universe::{FactionId, Universe};

/// Default template priority. Lower is more important.
pub const DEFAULT_PRIORITY: i32 = 5;

/// Index of a template in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId(pub usize);

/// Where a template can be offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MissionLocation {
    /// Only started explicitly (scripted triggers)
    None,
    /// Mission computer
    Computer,
    /// Spaceport bar
    Bar,
    Outfit,
    Shipyard,
    /// Runs once on landing
    Land,
    Commodity,
}

impl MissionLocation {
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "None" => Some(MissionLocation::None),
            "Computer" => Some(MissionLocation::Computer),
            "Bar" => Some(MissionLocation::Bar),
            "Outfit" => Some(MissionLocation::Outfit),
            "Shipyard" => Some(MissionLocation::Shipyard),
            "Land" => Some(MissionLocation::Land),
            "Commodity" => Some(MissionLocation::Commodity),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Availability {
    pub location: MissionLocation,
    /// Percent chance per trial; hundreds add extra trials.
    pub chance: u32,
    pub planet: Option<String>,
    pub system: Option<String>,
    /// `None` means any faction. Names that did not resolve are left out,
    /// so a filter of only unknown factions matches nowhere.
    pub factions: Option<Vec<FactionId>>,
    /// Script expression that must evaluate true.
    pub condition: Option<String>,
    /// Template that must be completed first.
    pub prerequisite: Option<String>,
    pub priority: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MissionTemplate {
    pub name: String,
    /// Name of the script source the mission runs.
    pub script: String,
    pub unique: bool,
    pub availability: Availability,
}

#[derive(Debug, Deserialize)]
struct RawTemplate {
    name: Option<String>,
    lua: Option<String>,
    #[serde(default)]
    flags: RawFlags,
    #[serde(default)]
    avail: RawAvail,
}

#[derive(Debug, Default, Deserialize)]
struct RawFlags {
    #[serde(default)]
    unique: bool,
}

#[derive(Debug, Default, Deserialize)]
struct RawAvail {
    location: Option<String>,
    chance: Option<u32>,
    planet: Option<String>,
    system: Option<String>,
    #[serde(default)]
    factions: Vec<String>,
    cond: Option<String>,
    done: Option<String>,
    priority: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    templates: Vec<MissionTemplate>,
}

impl Catalog {
    pub fn new(templates: Vec<MissionTemplate>) -> Self {
        Self { templates }
    }

    pub fn from_json(text: &str, universe: &Universe) -> Result<Self, CatalogError> {
        let doc: serde_json::Value = serde_json::from_str(text)?;
        let entries = doc
            .get("missions")
            .and_then(|m| m.as_array())
            .ok_or_else(|| CatalogError::Malformed("missing 'missions' array".into()))?;

        let mut templates: Vec<MissionTemplate> = Vec::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            let raw: RawTemplate = match serde_json::from_value(entry.clone()) {
                Ok(raw) => raw,
                Err(e) => {
                    log::warn!("Mission entry {} is malformed: {} - skipping", idx, e);
                    continue;
                }
            };
            let Some(template) = parse_template(raw, idx, universe) else {
                continue;
            };
            if templates.iter().any(|t| t.name == template.name) {
                log::warn!("Duplicate mission '{}' - keeping the first", template.name);
                continue;
            }
            templates.push(template);
        }

        log::info!("Loaded {} missions", templates.len());
        Ok(Self { templates })
    }

    pub fn load(path: impl AsRef<Path>, universe: &Universe) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text, universe)
    }

    pub fn lookup(&self, name: &str) -> Option<TemplateId> {
        self.templates.iter().position(|t| t.name == name).map(TemplateId)
    }

    pub fn get(&self, id: TemplateId) -> Option<&MissionTemplate> {
        self.templates.get(id.0)
    }

    /// Templates in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (TemplateId, &MissionTemplate)> {
        self.templates.iter().enumerate().map(|(i, t)| (TemplateId(i), t))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn parse_template(raw: RawTemplate, idx: usize, universe: &Universe) -> Option<MissionTemplate> {
    let Some(name) = raw.name else {
        log::warn!("Mission entry {} has no name - skipping", idx);
        return None;
    };
    let Some(script) = raw.lua else {
        log::warn!("Mission '{}' missing 'lua' element - skipping", name);
        return None;
    };

    let avail = raw.avail;
    let location = match avail.location.as_deref() {
        None => {
            log::warn!("Mission '{}' missing location", name);
            MissionLocation::None
        }
        Some(label) => MissionLocation::from_label(label).unwrap_or_else(|| {
            log::warn!("Mission '{}' has unknown location '{}'", name, label);
            MissionLocation::None
        }),
    };

    let chance = avail.chance.unwrap_or(0);
    if chance == 0 {
        log::warn!("Mission '{}' missing/invalid chance", name);
    }

    let factions = if avail.factions.is_empty() {
        None
    } else {
        let resolved: Vec<FactionId> = avail
            .factions
            .iter()
            .filter_map(|f| {
                let id = universe.faction_id(f);
                if id.is_none() {
                    log::warn!("Mission '{}' references unknown faction '{}'", name, f);
                }
                id
            })
            .collect();
        if resolved.is_empty() {
            log::warn!("Mission '{}' faction filter matches no known faction", name);
        }
        Some(resolved)
    };

    Some(MissionTemplate {
        name,
        script,
        unique: raw.flags.unique,
        availability: Availability {
            location,
            chance,
            planet: avail.planet,
            system: avail.system,
            factions,
            condition: avail.cond,
            prerequisite: avail.done,
            priority: avail.priority.unwrap_or(DEFAULT_PRIORITY),
        },
    })
}
