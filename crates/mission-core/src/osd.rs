//! On-screen objective display.
//!
//! Each running mission may own one OSD: a title, a list of objective items
//! and the index of the item currently highlighted. The list is kept in
//! display order (priority, then title, then items, then creation order).

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OsdId(pub u32);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Osd {
    pub id: OsdId,
    pub title: String,
    pub items: Vec<String>,
    /// Index into `items` of the highlighted objective.
    pub active: usize,
    /// Lower sorts first.
    pub priority: i32,
}

impl Osd {
    fn display_order(&self, other: &Osd) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.title.cmp(&other.title))
            .then_with(|| self.items.cmp(&other.items))
            .then_with(|| self.id.cmp(&other.id))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OsdList {
    entries: Vec<Osd>,
    next_id: u32,
}

impl OsdList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, title: &str, items: Vec<String>, priority: i32) -> OsdId {
        self.next_id = self.next_id.wrapping_add(1).max(1);
        let id = OsdId(self.next_id);
        self.entries.push(Osd {
            id,
            title: title.to_string(),
            items,
            active: 0,
            priority,
        });
        self.entries.sort_by(Osd::display_order);
        id
    }

    pub fn destroy(&mut self, id: OsdId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|o| o.id != id);
        if self.entries.len() == before {
            log::warn!("OSD {} not found", id.0);
            return false;
        }
        true
    }

    /// Highlight objective `index`. Out-of-range indices are rejected.
    pub fn set_active(&mut self, id: OsdId, index: usize) -> bool {
        let Some(osd) = self.entries.iter_mut().find(|o| o.id == id) else {
            log::warn!("OSD {} not found", id.0);
            return false;
        };
        if index >= osd.items.len() {
            log::warn!(
                "OSD '{}' active item {} out of range ({} items)",
                osd.title,
                index,
                osd.items.len()
            );
            return false;
        }
        osd.active = index;
        true
    }

    pub fn get(&self, id: OsdId) -> Option<&Osd> {
        self.entries.iter().find(|o| o.id == id)
    }

    pub fn active(&self, id: OsdId) -> Option<usize> {
        self.get(id).map(|o| o.active)
    }

    pub fn title(&self, id: OsdId) -> Option<&str> {
        self.get(id).map(|o| o.title.as_str())
    }

    pub fn items(&self, id: OsdId) -> Option<&[String]> {
        self.get(id).map(|o| o.items.as_slice())
    }

    /// Entries in display order.
    pub fn iter(&self) -> impl Iterator<Item = &Osd> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
