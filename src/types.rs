//! Core bridge types shared across all modules.
//!
//! Wire-facing structs serialize with camelCase field names because the
//! relay peers are JavaScript clients; the names are the interop contract.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Grid cell size in scene pixels assumed when the map has not reported one.
pub const DEFAULT_GRID_SIZE: f64 = 150.0;

/// Grid unit label assumed when the map has not reported one.
pub const DEFAULT_GRID_UNIT: &str = "m";

/// Display name for tokens whose scene item carries no usable name.
pub const DEFAULT_TOKEN_NAME: &str = "Token";

/// Name announced for bot registrations of untracked tokens.
pub const DEFAULT_BOT_NAME: &str = "Bot";

/// Image width in pixels assumed when the scene item omits one.
pub const DEFAULT_IMAGE_WIDTH: f64 = 100.0;

// ---------------------------------------------------------------------------
// Basic math
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance_to(&self, other: &Vec2) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl std::fmt::Display for Vec2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Scene items (raw records as the tabletop host reports them)
// ---------------------------------------------------------------------------

/// Attached text content of a scene item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBlock {
    #[serde(default)]
    pub plain_text: String,
}

/// Image attachment of a scene item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageMeta {
    #[serde(default)]
    pub width: f64,
}

/// One item as the scene reports it. Everything except `id` and
/// `position` tolerates absence; hosts differ in how much they fill in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub text: Option<TextBlock>,
    pub position: Vec2,
    #[serde(default)]
    pub scale: Option<Vec2>,
    #[serde(default)]
    pub image: Option<ImageMeta>,
    #[serde(default)]
    pub visible: Option<bool>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub layer: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// Derived snapshot of one trackable scene item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub id: String,
    pub name: String,
    pub position: Vec2,
    pub size: f64,
    pub hidden: bool,
    pub controller_id: String,
    pub is_bot: bool,
}

// ---------------------------------------------------------------------------
// Zones & map
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ZoneBounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HiddenZone {
    pub id: String,
    pub bounds: ZoneBounds,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MapInfo {
    pub grid_size: f64,
    pub grid_unit: String,
    pub width: f64,
    pub height: f64,
}

/// Result of a scene grid query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GridScale {
    pub pixels_per_unit: f64,
    pub unit_label: String,
}

// ---------------------------------------------------------------------------
// Stats & config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeStats {
    pub tracked_tokens: usize,
    pub hidden_zones: usize,
    pub bot_tokens: usize,
    pub selected: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeServiceConfig {
    /// Grid cell size substituted when the map reports none (or a
    /// non-positive one).
    pub default_grid_size: f64,
    /// Grid unit label substituted when the map reports none.
    pub default_grid_unit: String,
    /// Player id stamped onto outgoing selection events.
    pub player_id: String,
}

impl Default for BridgeServiceConfig {
    fn default() -> Self {
        Self {
            default_grid_size: DEFAULT_GRID_SIZE,
            default_grid_unit: DEFAULT_GRID_UNIT.to_string(),
            player_id: "owlbear".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
