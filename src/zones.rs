//! Hidden-zone registry.
//!
//! Zones are opaque rectangles stored by id. The registry never
//! validates bounds and never invents ids: the scene assigns them when
//! the backing rectangle item is created, so relay-announced zones and
//! locally created ones share one id namespace.

use std::collections::HashMap;

use crate::types::{HiddenZone, ZoneBounds};

/// Holds every hidden zone the bridge currently knows about.
pub struct ZoneRegistry {
    zones: HashMap<String, HiddenZone>,
}

impl ZoneRegistry {
    pub fn new() -> Self {
        Self {
            zones: HashMap::new(),
        }
    }

    /// Insert a zone. Re-adding an id replaces the stored record, so
    /// the operation is idempotent per id.
    pub fn add(&mut self, zone: HiddenZone) {
        self.zones.insert(zone.id.clone(), zone);
    }

    /// Remove a zone. Unknown ids are a no-op returning `None`.
    pub fn remove(&mut self, id: &str) -> Option<HiddenZone> {
        self.zones.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&HiddenZone> {
        self.zones.get(id)
    }

    pub fn bounds(&self, id: &str) -> Option<ZoneBounds> {
        self.zones.get(id).map(|z| z.bounds)
    }

    pub fn zones(&self) -> impl Iterator<Item = &HiddenZone> {
        self.zones.values()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

impl Default for ZoneRegistry {
    fn default() -> Self {
        Self::new()
    }
}
