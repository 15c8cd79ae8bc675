//! Token snapshots and scene reconciliation.
//!
//! Every scene observation is reduced to a fresh id → [`Token`] map plus
//! the move events implied by comparing it against the previous map. The
//! cache is a **full replacement**: items the scene stopped reporting
//! simply drop out, and nothing is announced for appearing or
//! disappearing tokens; peers resync via `sync:request` instead.

use std::collections::{HashMap, HashSet};

use crate::protocol::TokenMoved;
use crate::types::{SceneItem, Token, DEFAULT_IMAGE_WIDTH, DEFAULT_TOKEN_NAME};

/// Scene layer whose items are always trackable.
pub const CHARACTER_LAYER: &str = "CHARACTER";

/// Item kind that is trackable regardless of layer.
pub const IMAGE_KIND: &str = "IMAGE";

/// Metadata key carrying the controlling player's id.
pub const CONTROLLER_KEY: &str = "controllerId";

// ---------------------------------------------------------------------------
// Snapshot building
// ---------------------------------------------------------------------------

/// Whether a scene item participates in token tracking.
pub fn is_token_item(item: &SceneItem) -> bool {
    item.layer == CHARACTER_LAYER || item.kind == IMAGE_KIND
}

// Zero counts as unset; peers treat 0 the same as a missing field.
fn non_zero_or(value: f64, fallback: f64) -> f64 {
    if value == 0.0 {
        fallback
    } else {
        value
    }
}

/// Derive a [`Token`] snapshot from one eligible scene item.
///
/// Field rules:
/// - `name`: explicit name, else attached text content, else `"Token"`
///   (empty strings count as absent).
/// - `size`: larger scale axis times image width, with 1 and 100
///   substituted for missing or zero values.
/// - `hidden`: only an explicit `visible: false` hides a token.
pub fn build_token(item: &SceneItem, bots: &HashSet<String>) -> Token {
    let name = if !item.name.is_empty() {
        item.name.clone()
    } else {
        item.text
            .as_ref()
            .map(|t| t.plain_text.clone())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TOKEN_NAME.to_string())
    };

    let scale_x = item.scale.map(|s| non_zero_or(s.x, 1.0)).unwrap_or(1.0);
    let scale_y = item.scale.map(|s| non_zero_or(s.y, 1.0)).unwrap_or(1.0);
    let width = item
        .image
        .as_ref()
        .map(|i| non_zero_or(i.width, DEFAULT_IMAGE_WIDTH))
        .unwrap_or(DEFAULT_IMAGE_WIDTH);

    let controller_id = item
        .metadata
        .get(CONTROLLER_KEY)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    Token {
        id: item.id.clone(),
        name,
        position: item.position,
        size: scale_x.max(scale_y) * width,
        hidden: item.visible == Some(false),
        controller_id,
        is_bot: bots.contains(&item.id),
    }
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Result of one scene observation: the replacement cache and the move
/// events to publish.
#[derive(Debug, Default)]
pub struct Reconciliation {
    pub cache: HashMap<String, Token>,
    pub moves: Vec<TokenMoved>,
}

/// Rebuild the token cache from `items` (already filtered to eligible
/// ones) and emit a move event for every token whose position changed.
///
/// Positions compare by exact inequality. Peers echo coordinates
/// verbatim, so any bitwise change is a real move; an epsilon would
/// silently drop sub-epsilon corrections.
pub fn reconcile<'a, I>(
    previous: &HashMap<String, Token>,
    items: I,
    bots: &HashSet<String>,
) -> Reconciliation
where
    I: IntoIterator<Item = &'a SceneItem>,
{
    let mut cache = HashMap::new();
    let mut moves = Vec::new();

    for item in items {
        let token = build_token(item, bots);

        if let Some(old) = previous.get(&item.id) {
            if old.position.x != token.position.x || old.position.y != token.position.y {
                moves.push(TokenMoved {
                    token_id: token.id.clone(),
                    position: token.position,
                });
            }
        }

        cache.insert(item.id.clone(), token);
    }

    Reconciliation { cache, moves }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
