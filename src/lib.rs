//! Tabletop Bridge
//!
//! Mirrors a virtual-tabletop scene's tokens onto a relay channel and
//! drives remote move commands back into the scene.
//!
//! ## Architecture
//!
//! ```text
//! BridgeSession  (bridge.rs)         ← relay connection + scene subscription
//!   └── BridgeService  (service.rs)  ← token cache, bots, zones, selection, map
//!         ├── tokens.rs              ← snapshot builder + reconciler
//!         ├── movement.rs            ← direction → pixel displacement
//!         ├── distance.rs            ← grid-unit distances
//!         └── zones.rs               ← hidden-zone registry
//! SceneApi  (scene.rs)               ← tabletop host seam (MemoryScene in-process)
//! protocol.rs                        ← relay wire payloads + subjects
//! ```
//!
//! `BridgeService` is synchronous session state; `BridgeSession` owns
//! all I/O and feeds it. Embedding hosts hold a `BridgeHandle` and
//! render state however they like.

// Core modules are always available (no agent feature needed).
pub mod distance;
pub mod movement;
pub mod protocol;
pub mod service;
pub mod tokens;
pub mod types;
pub mod zones;

// Session-side modules require the `agent` feature.
#[cfg(feature = "agent")]
pub mod bridge;
#[cfg(feature = "agent")]
pub mod scene;

// Convenience re-exports (agent only)
#[cfg(feature = "agent")]
pub use bridge::{BridgeCommand, BridgeConfig, BridgeHandle, BridgeSession};
#[cfg(feature = "agent")]
pub use scene::{MemoryScene, RectangleSpec, SceneApi, SceneError, SceneUpdate};

pub use movement::Direction;
pub use service::BridgeService;
pub use types::{
    BridgeServiceConfig, BridgeStats, GridScale, HiddenZone, MapInfo, SceneItem, Token, Vec2,
    ZoneBounds,
};
