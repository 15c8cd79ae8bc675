//! Relay channel wire protocol.
//!
//! This module owns **every message that crosses the relay boundary**
//! between the bridge and its remote peers (chat client, automation
//! server, another bridge…).
//!
//! ## Subjects
//!
//! | Subject              | Direction       | Payload         |
//! |----------------------|-----------------|-----------------|
//! | `token:move`         | bridge → relay  | [`TokenMoved`]  |
//! | `token:select`       | bridge → relay  | [`TokenSelected`] |
//! | `zone:hidden:add`    | bridge → relay  | [`HiddenZone`]  |
//! | `zone:hidden:remove` | bridge → relay  | [`ZoneRemoved`] |
//! | `bot:register`       | bridge → relay  | [`BotRegistered`] |
//! | `bot:unregister`     | bridge → relay  | [`BotUnregistered`] |
//! | `sync:request`       | bridge → relay  | [`SyncRequest`] |
//! | `sync:response`      | relay → bridge  | [`SyncResponse`] |
//! | `owlbear:token:move` | relay → bridge  | [`MoveCommand`] |
//!
//! ## Design rules
//!
//! 1. Every struct is `Serialize + Deserialize` with camelCase JSON;
//!    the field names are the interop contract with JavaScript peers
//!    and are never renamed.
//! 2. `MoveCommand::direction` stays a plain string on the wire: an
//!    unknown label must degrade to a zero displacement downstream,
//!    never to a deserialization error.
//! 3. Every section of [`SyncResponse`] is optional; an absent section
//!    leaves the corresponding local state untouched.

use serde::{Deserialize, Serialize};

use crate::types::{HiddenZone, MapInfo, Token, Vec2};

// ---------------------------------------------------------------------------
// Outbound events  (bridge → relay)
// ---------------------------------------------------------------------------

/// A tracked token changed position on the scene.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenMoved {
    pub token_id: String,
    pub position: Vec2,
}

/// The local player selected a tracked token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenSelected {
    pub token_id: String,
    pub player_id: String,
}

/// A hidden zone was removed (scene deletion already happened).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ZoneRemoved {
    pub zone_id: String,
}

/// A token was marked as bot-controlled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BotRegistered {
    pub token_id: String,
    pub name: String,
}

/// A token lost its bot marking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BotUnregistered {
    pub token_id: String,
}

/// Asks the relay for a full state snapshot. Sent once after connecting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRequest {}

// ---------------------------------------------------------------------------
// Inbound messages  (relay → bridge)
// ---------------------------------------------------------------------------

/// Remote request to move a token by a compass direction.
///
/// `distance` is in grid units (the map's scale), not pixels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MoveCommand {
    pub token_id: String,
    pub direction: String,
    pub distance: f64,
}

/// Relay state snapshot. Tokens and zones merge by id into local state;
/// map info replaces wholesale.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    #[serde(default)]
    pub tokens: Option<Vec<Token>>,
    #[serde(default)]
    pub hidden_zones: Option<Vec<HiddenZone>>,
    #[serde(default)]
    pub map_info: Option<MapInfo>,
}

// ---------------------------------------------------------------------------
// Outbound event envelope
// ---------------------------------------------------------------------------

/// One publishable event: pairs a payload with its relay subject.
///
/// Service handlers return these; the session serializes and publishes
/// them without inspecting the payload.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    TokenMoved(TokenMoved),
    TokenSelected(TokenSelected),
    ZoneAdded(HiddenZone),
    ZoneRemoved(ZoneRemoved),
    BotRegistered(BotRegistered),
    BotUnregistered(BotUnregistered),
    SyncRequest,
}

impl OutboundEvent {
    pub fn subject(&self) -> &'static str {
        match self {
            OutboundEvent::TokenMoved(_) => subjects::TOKEN_MOVE,
            OutboundEvent::TokenSelected(_) => subjects::TOKEN_SELECT,
            OutboundEvent::ZoneAdded(_) => subjects::ZONE_HIDDEN_ADD,
            OutboundEvent::ZoneRemoved(_) => subjects::ZONE_HIDDEN_REMOVE,
            OutboundEvent::BotRegistered(_) => subjects::BOT_REGISTER,
            OutboundEvent::BotUnregistered(_) => subjects::BOT_UNREGISTER,
            OutboundEvent::SyncRequest => subjects::SYNC_REQUEST,
        }
    }

    pub fn payload(&self) -> serde_json::Result<Vec<u8>> {
        match self {
            OutboundEvent::TokenMoved(p) => serde_json::to_vec(p),
            OutboundEvent::TokenSelected(p) => serde_json::to_vec(p),
            OutboundEvent::ZoneAdded(p) => serde_json::to_vec(p),
            OutboundEvent::ZoneRemoved(p) => serde_json::to_vec(p),
            OutboundEvent::BotRegistered(p) => serde_json::to_vec(p),
            OutboundEvent::BotUnregistered(p) => serde_json::to_vec(p),
            OutboundEvent::SyncRequest => serde_json::to_vec(&SyncRequest {}),
        }
    }
}

// ---------------------------------------------------------------------------
// Connection / lifecycle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

// ---------------------------------------------------------------------------
// Subject helpers
// ---------------------------------------------------------------------------

/// All relay subjects used by the bridge protocol, as constants.
///
/// The names are verbatim channel identifiers; colons are part of the
/// name, not separators.
pub mod subjects {
    pub const TOKEN_MOVE: &str = "token:move";
    pub const TOKEN_SELECT: &str = "token:select";

    pub const ZONE_HIDDEN_ADD: &str = "zone:hidden:add";
    pub const ZONE_HIDDEN_REMOVE: &str = "zone:hidden:remove";

    pub const BOT_REGISTER: &str = "bot:register";
    pub const BOT_UNREGISTER: &str = "bot:unregister";

    pub const SYNC_REQUEST: &str = "sync:request";
    pub const SYNC_RESPONSE: &str = "sync:response";

    pub const REMOTE_TOKEN_MOVE: &str = "owlbear:token:move";
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ZoneBounds;

    #[test]
    fn token_moved_wire_shape() {
        let event = TokenMoved {
            token_id: "t1".to_string(),
            position: Vec2::new(450.0, -150.0),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"tokenId":"t1","position":{"x":450.0,"y":-150.0}}"#);
    }

    #[test]
    fn move_command_parses_wire_json() {
        let cmd: MoveCommand = serde_json::from_str(
            r#"{"tokenId":"abc","direction":"northeast","distance":2.5}"#,
        )
        .unwrap();
        assert_eq!(cmd.token_id, "abc");
        assert_eq!(cmd.direction, "northeast");
        assert_eq!(cmd.distance, 2.5);
    }

    #[test]
    fn move_command_keeps_unknown_directions() {
        // Rule 2: unknown labels must survive deserialization untouched.
        let cmd: MoveCommand = serde_json::from_str(
            r#"{"tokenId":"abc","direction":"sideways","distance":1.0}"#,
        )
        .unwrap();
        assert_eq!(cmd.direction, "sideways");
    }

    #[test]
    fn sync_response_sections_are_optional() {
        let sync: SyncResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(sync.tokens.is_none());
        assert!(sync.hidden_zones.is_none());
        assert!(sync.map_info.is_none());

        let sync: SyncResponse = serde_json::from_str(
            r#"{"mapInfo":{"gridSize":70.0,"gridUnit":"ft","width":0.0,"height":0.0}}"#,
        )
        .unwrap();
        assert_eq!(sync.map_info.unwrap().grid_size, 70.0);
    }

    #[test]
    fn outbound_events_map_to_their_subjects() {
        let zone = HiddenZone {
            id: "zone-1".to_string(),
            bounds: ZoneBounds {
                x: 0.0,
                y: 0.0,
                width: 200.0,
                height: 200.0,
            },
        };
        assert_eq!(OutboundEvent::ZoneAdded(zone).subject(), "zone:hidden:add");
        assert_eq!(
            OutboundEvent::ZoneRemoved(ZoneRemoved {
                zone_id: "zone-1".to_string()
            })
            .subject(),
            "zone:hidden:remove"
        );
        assert_eq!(OutboundEvent::SyncRequest.subject(), "sync:request");
        assert_eq!(
            OutboundEvent::SyncRequest.payload().unwrap(),
            b"{}".to_vec()
        );
    }
}
