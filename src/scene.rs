//! Scene seam: the [`SceneApi`] trait, its update stream, and the
//! in-process [`MemoryScene`] implementation.
//!
//! The bridge never talks to a tabletop host directly; everything goes
//! through `SceneApi` so hosts (and tests) can plug in their own
//! backend. Scene updates arrive over a broadcast channel rather than
//! callbacks, letting any number of consumers watch one scene.

use crate::types::{GridScale, SceneItem, Vec2, ZoneBounds};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::broadcast;

/// Default edge length of a freshly created hidden-zone rectangle.
pub const DEFAULT_ZONE_SIZE: f64 = 200.0;

const ZONE_COLOR: &str = "#FFAA00";
const ZONE_FILL_OPACITY: f64 = 0.2;
const ZONE_STROKE_OPACITY: f64 = 0.8;
const ZONE_STROKE_WIDTH: f64 = 2.0;
const ZONE_LAYER: &str = "DRAWING";
const ZONE_NAME: &str = "Hidden Zone";
const ZONE_METADATA_KEY: &str = "hiddenZone";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("scene item not found: {0}")]
    ItemNotFound(String),
    #[error("grid information unavailable")]
    GridUnavailable,
    #[error("scene backend error: {0}")]
    Backend(String),
}

// ---------------------------------------------------------------------------
// Updates
// ---------------------------------------------------------------------------

/// One notification from the scene.
#[derive(Debug, Clone)]
pub enum SceneUpdate {
    /// Full item snapshot, sent after any item change.
    Items(Vec<SceneItem>),
    /// The player's selection changed. `None` means nothing usable was
    /// selected; consumers ignore it rather than clearing their own
    /// selection.
    Selection(Option<String>),
}

// ---------------------------------------------------------------------------
// Shape creation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ShapeStyle {
    pub fill_color: String,
    pub fill_opacity: f64,
    pub stroke_color: String,
    pub stroke_opacity: f64,
    pub stroke_width: f64,
}

/// Everything needed to create a rectangle item on the scene.
#[derive(Debug, Clone)]
pub struct RectangleSpec {
    pub bounds: ZoneBounds,
    pub style: ShapeStyle,
    pub name: String,
    pub layer: String,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl RectangleSpec {
    /// Stock hidden-zone rectangle: translucent amber on the drawing
    /// layer, tagged `hiddenZone` in metadata.
    pub fn hidden_zone(bounds: ZoneBounds) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert(ZONE_METADATA_KEY.to_string(), serde_json::json!(true));

        Self {
            bounds,
            style: ShapeStyle {
                fill_color: ZONE_COLOR.to_string(),
                fill_opacity: ZONE_FILL_OPACITY,
                stroke_color: ZONE_COLOR.to_string(),
                stroke_opacity: ZONE_STROKE_OPACITY,
                stroke_width: ZONE_STROKE_WIDTH,
            },
            name: ZONE_NAME.to_string(),
            layer: ZONE_LAYER.to_string(),
            metadata,
        }
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Anything that can act as the tabletop scene backend.
#[async_trait]
pub trait SceneApi: Send + Sync {
    /// Current full item snapshot.
    async fn items(&self) -> Result<Vec<SceneItem>, SceneError>;

    /// Current grid scale. Implementations report
    /// [`SceneError::GridUnavailable`] when the map has no usable grid;
    /// callers fall back to defaults.
    async fn grid_scale(&self) -> Result<GridScale, SceneError>;

    /// Move one item to an absolute position.
    async fn update_position(&self, id: &str, position: Vec2) -> Result<(), SceneError>;

    /// Create a rectangle item and return its scene-assigned id.
    async fn create_rectangle(&self, spec: RectangleSpec) -> Result<String, SceneError>;

    /// Delete one item.
    async fn delete_item(&self, id: &str) -> Result<(), SceneError>;

    /// Subscribe to scene updates. Each call returns an independent
    /// receiver positioned at the current end of the stream.
    fn updates(&self) -> broadcast::Receiver<SceneUpdate>;
}

// ---------------------------------------------------------------------------
// In-process scene
// ---------------------------------------------------------------------------

struct SceneState {
    items: Vec<SceneItem>,
    grid: Option<GridScale>,
    next_shape: u64,
}

/// In-process [`SceneApi`] backend.
///
/// Used by the agent binary and the integration tests. Host-side
/// helpers (`put_item`, `set_selection`, …) mutate the scene the way a
/// human at the table would and broadcast the resulting updates.
pub struct MemoryScene {
    state: Mutex<SceneState>,
    updates: broadcast::Sender<SceneUpdate>,
}

impl MemoryScene {
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(64);
        Self {
            state: Mutex::new(SceneState {
                items: Vec::new(),
                grid: None,
                next_shape: 0,
            }),
            updates,
        }
    }

    pub fn with_grid(pixels_per_unit: f64, unit_label: &str) -> Self {
        let scene = Self::new();
        scene.set_grid(pixels_per_unit, unit_label);
        scene
    }

    // -----------------------------------------------------------------------
    // Host-side helpers
    // -----------------------------------------------------------------------

    /// Insert or replace an item, then broadcast the new snapshot.
    pub fn put_item(&self, item: SceneItem) {
        {
            let mut state = self.state.lock();
            match state.items.iter_mut().find(|i| i.id == item.id) {
                Some(existing) => *existing = item,
                None => state.items.push(item),
            }
        }
        self.broadcast_items();
    }

    /// Move an item as a local drag would, then broadcast the new
    /// snapshot. Unknown ids still broadcast.
    pub fn move_item(&self, id: &str, position: Vec2) {
        {
            let mut state = self.state.lock();
            if let Some(item) = state.items.iter_mut().find(|i| i.id == id) {
                item.position = position;
            }
        }
        self.broadcast_items();
    }

    /// Remove an item if present, then broadcast the new snapshot.
    pub fn remove_item(&self, id: &str) {
        {
            let mut state = self.state.lock();
            state.items.retain(|i| i.id != id);
        }
        self.broadcast_items();
    }

    /// Announce a selection change.
    pub fn set_selection(&self, token_id: Option<&str>) {
        let _ = self
            .updates
            .send(SceneUpdate::Selection(token_id.map(str::to_string)));
    }

    pub fn set_grid(&self, pixels_per_unit: f64, unit_label: &str) {
        self.state.lock().grid = Some(GridScale {
            pixels_per_unit,
            unit_label: unit_label.to_string(),
        });
    }

    /// Forget the grid so queries fail, as on a map with no grid set up.
    pub fn clear_grid(&self) {
        self.state.lock().grid = None;
    }

    pub fn snapshot(&self) -> Vec<SceneItem> {
        self.state.lock().items.clone()
    }

    fn broadcast_items(&self) {
        let snapshot = self.state.lock().items.clone();
        let _ = self.updates.send(SceneUpdate::Items(snapshot));
    }
}

impl Default for MemoryScene {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SceneApi for MemoryScene {
    async fn items(&self) -> Result<Vec<SceneItem>, SceneError> {
        Ok(self.snapshot())
    }

    async fn grid_scale(&self) -> Result<GridScale, SceneError> {
        self.state
            .lock()
            .grid
            .clone()
            .ok_or(SceneError::GridUnavailable)
    }

    async fn update_position(&self, id: &str, position: Vec2) -> Result<(), SceneError> {
        {
            let mut state = self.state.lock();
            let item = state
                .items
                .iter_mut()
                .find(|i| i.id == id)
                .ok_or_else(|| SceneError::ItemNotFound(id.to_string()))?;
            item.position = position;
        }
        self.broadcast_items();
        Ok(())
    }

    async fn create_rectangle(&self, spec: RectangleSpec) -> Result<String, SceneError> {
        let id = {
            let mut state = self.state.lock();
            state.next_shape += 1;
            let id = format!("zone-{}", state.next_shape);

            state.items.push(SceneItem {
                id: id.clone(),
                name: spec.name,
                text: None,
                position: Vec2::new(spec.bounds.x, spec.bounds.y),
                scale: None,
                image: None,
                visible: None,
                metadata: spec.metadata,
                layer: spec.layer,
                kind: "SHAPE".to_string(),
            });
            id
        };
        self.broadcast_items();
        Ok(id)
    }

    async fn delete_item(&self, id: &str) -> Result<(), SceneError> {
        {
            let mut state = self.state.lock();
            let before = state.items.len();
            state.items.retain(|i| i.id != id);
            if state.items.len() == before {
                return Err(SceneError::ItemNotFound(id.to_string()));
            }
        }
        self.broadcast_items();
        Ok(())
    }

    fn updates(&self) -> broadcast::Receiver<SceneUpdate> {
        self.updates.subscribe()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
