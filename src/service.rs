//! BridgeService – token cache, bot set, hidden zones, selection, map info.
//!
//! The service is the single place session state lives. Handlers are
//! synchronous and transport-free: they mutate state and return the
//! protocol payloads the caller should publish. The async session layer
//! ([`crate::bridge`]) owns all I/O.

use crate::distance::grid_distances;
use crate::protocol::{
    BotRegistered, BotUnregistered, SyncResponse, TokenMoved, TokenSelected, ZoneRemoved,
};
use crate::tokens::{is_token_item, reconcile, Reconciliation};
use crate::types::{
    BridgeServiceConfig, BridgeStats, HiddenZone, MapInfo, SceneItem, Token, Vec2,
    DEFAULT_BOT_NAME,
};
use crate::zones::ZoneRegistry;
use log::debug;
use std::collections::{HashMap, HashSet};

pub struct BridgeService {
    config: BridgeServiceConfig,
    tokens: HashMap<String, Token>,
    bots: HashSet<String>,
    zones: ZoneRegistry,
    selected: Option<String>,
    map_info: MapInfo,
}

impl BridgeService {
    pub fn new(config: BridgeServiceConfig) -> Self {
        let map_info = MapInfo {
            grid_size: config.default_grid_size,
            grid_unit: config.default_grid_unit.clone(),
            width: 0.0,
            height: 0.0,
        };
        Self {
            config,
            tokens: HashMap::new(),
            bots: HashSet::new(),
            zones: ZoneRegistry::new(),
            selected: None,
            map_info,
        }
    }

    // -----------------------------------------------------------------------
    // Scene observation
    // -----------------------------------------------------------------------

    /// Ingest a full scene snapshot.
    ///
    /// Filters to trackable items, rebuilds the token cache as a full
    /// replacement, and returns the move events implied by comparing
    /// against the previous cache.
    pub fn observe_items(&mut self, items: &[SceneItem]) -> Vec<TokenMoved> {
        let Reconciliation { cache, moves } = reconcile(
            &self.tokens,
            items.iter().filter(|i| is_token_item(i)),
            &self.bots,
        );
        self.tokens = cache;

        if !moves.is_empty() {
            debug!(
                "Observed scene: {} tokens tracked, {} moved",
                self.tokens.len(),
                moves.len()
            );
        }
        moves
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    /// Record a selection. The announcement only fires for tokens the
    /// cache knows; the recorded id updates either way.
    pub fn select_token(&mut self, token_id: &str) -> Option<TokenSelected> {
        self.selected = Some(token_id.to_string());
        let token = self.tokens.get(token_id)?;
        Some(TokenSelected {
            token_id: token.id.clone(),
            player_id: self.config.player_id.clone(),
        })
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected(&self) -> Option<&Token> {
        self.tokens.get(self.selected.as_deref()?)
    }

    // -----------------------------------------------------------------------
    // Bots
    // -----------------------------------------------------------------------

    /// Mark a token as bot-controlled. The cached snapshot (when there
    /// is one) flips immediately; future snapshots pick the flag up from
    /// the set.
    pub fn register_bot(&mut self, token_id: &str) -> BotRegistered {
        self.bots.insert(token_id.to_string());

        if let Some(token) = self.tokens.get_mut(token_id) {
            token.is_bot = true;
        }
        let name = self
            .tokens
            .get(token_id)
            .map(|t| t.name.clone())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_BOT_NAME.to_string());

        debug!("Registered bot token {token_id} ({name})");
        BotRegistered {
            token_id: token_id.to_string(),
            name,
        }
    }

    pub fn unregister_bot(&mut self, token_id: &str) -> BotUnregistered {
        self.bots.remove(token_id);
        if let Some(token) = self.tokens.get_mut(token_id) {
            token.is_bot = false;
        }

        debug!("Unregistered bot token {token_id}");
        BotUnregistered {
            token_id: token_id.to_string(),
        }
    }

    pub fn is_bot(&self, token_id: &str) -> bool {
        self.bots.contains(token_id)
    }

    pub fn bot_count(&self) -> usize {
        self.bots.len()
    }

    // -----------------------------------------------------------------------
    // Relay sync
    // -----------------------------------------------------------------------

    /// Apply a relay state snapshot.
    ///
    /// Tokens and zones **merge** by id (unlike scene observation, which
    /// replaces the cache wholesale); map info replaces as one record.
    /// Absent sections leave state untouched.
    pub fn apply_sync(&mut self, sync: SyncResponse) {
        if let Some(tokens) = sync.tokens {
            debug!("Sync merged {} tokens", tokens.len());
            for token in tokens {
                self.tokens.insert(token.id.clone(), token);
            }
        }
        if let Some(zones) = sync.hidden_zones {
            debug!("Sync merged {} hidden zones", zones.len());
            for zone in zones {
                self.zones.add(zone);
            }
        }
        if let Some(map_info) = sync.map_info {
            self.map_info = map_info;
        }
    }

    // -----------------------------------------------------------------------
    // Zones
    // -----------------------------------------------------------------------

    /// Store a zone (the backing scene item already exists) and hand the
    /// record back for publication.
    pub fn add_zone(&mut self, zone: HiddenZone) -> HiddenZone {
        self.zones.add(zone.clone());
        zone
    }

    /// Drop a zone. Unknown ids are a no-op, but the removal payload is
    /// returned regardless so peers prune their own copies.
    pub fn remove_zone(&mut self, zone_id: &str) -> ZoneRemoved {
        self.zones.remove(zone_id);
        ZoneRemoved {
            zone_id: zone_id.to_string(),
        }
    }

    pub fn zone(&self, zone_id: &str) -> Option<&HiddenZone> {
        self.zones.get(zone_id)
    }

    pub fn zones(&self) -> impl Iterator<Item = &HiddenZone> {
        self.zones.zones()
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    // -----------------------------------------------------------------------
    // Map & grid
    // -----------------------------------------------------------------------

    /// Record a scene grid query result. An empty unit label falls back
    /// to the configured default.
    pub fn set_map_scale(&mut self, pixels_per_unit: f64, unit_label: &str) {
        self.map_info.grid_size = pixels_per_unit;
        self.map_info.grid_unit = if unit_label.is_empty() {
            self.config.default_grid_unit.clone()
        } else {
            unit_label.to_string()
        };
    }

    /// Grid cell size for distance math. Non-positive map values (never
    /// valid divisors) yield the configured default.
    pub fn grid_size(&self) -> f64 {
        if self.map_info.grid_size > 0.0 {
            self.map_info.grid_size
        } else {
            self.config.default_grid_size
        }
    }

    pub fn map_info(&self) -> &MapInfo {
        &self.map_info
    }

    // -----------------------------------------------------------------------
    // Distances
    // -----------------------------------------------------------------------

    /// Grid-unit distances from a cached token to every other one.
    /// `None` when the reference token is not tracked.
    pub fn distances_from(&self, token_id: &str) -> Option<HashMap<String, u32>> {
        let reference = self.tokens.get(token_id)?;
        Some(grid_distances(reference, &self.tokens, self.grid_size()))
    }

    // -----------------------------------------------------------------------
    // Accessors & stats
    // -----------------------------------------------------------------------

    pub fn token(&self, token_id: &str) -> Option<&Token> {
        self.tokens.get(token_id)
    }

    pub fn token_position(&self, token_id: &str) -> Option<Vec2> {
        self.tokens.get(token_id).map(|t| t.position)
    }

    pub fn tokens(&self) -> &HashMap<String, Token> {
        &self.tokens
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn config(&self) -> &BridgeServiceConfig {
        &self.config
    }

    pub fn stats(&self) -> BridgeStats {
        BridgeStats {
            tracked_tokens: self.tokens.len(),
            hidden_zones: self.zones.len(),
            bot_tokens: self.bots.len(),
            selected: self.selected.clone(),
        }
    }
}
