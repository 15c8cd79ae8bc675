//! Relay session: BridgeSession connects a scene to the relay channel.
//!
//! ## Data flow
//!
//! ```text
//! scene updates  ──▶ apply_scene_update ──▶ token:move / token:select ──▶ relay
//! relay messages ──▶ apply_move_command / apply_sync_response ──▶ scene + state
//! host commands  ──▶ apply_command ──▶ zone / bot / selection events ──▶ relay
//! ```
//!
//! ## Event contract (inbound)
//!
//! | Subject              | Payload        | Effect                          |
//! |----------------------|----------------|---------------------------------|
//! | `owlbear:token:move` | `MoveCommand`  | one scene position update       |
//! | `sync:response`      | `SyncResponse` | merge into [`BridgeService`]    |
//!
//! ## Event contract (outbound)
//!
//! | Subject              | Payload          | Produced by                  |
//! |----------------------|------------------|------------------------------|
//! | `token:move`         | `TokenMoved`     | scene observation            |
//! | `token:select`       | `TokenSelected`  | selection change             |
//! | `zone:hidden:add`    | `HiddenZone`     | `BridgeCommand::AddZone`     |
//! | `zone:hidden:remove` | `ZoneRemoved`    | `BridgeCommand::RemoveZone`  |
//! | `bot:register`       | `BotRegistered`  | `BridgeCommand::SetBot`      |
//! | `bot:unregister`     | `BotUnregistered`| `BridgeCommand::SetBot`      |
//! | `sync:request`       | `SyncRequest`    | once, right after connecting |
//!
//! One task owns all session state; every scene await completes before
//! the next state mutation, so handlers never observe half-applied
//! updates. Reconnection policy is left to the transport.

use crate::movement;
use crate::protocol::{subjects, ConnectionState, MoveCommand, OutboundEvent, SyncResponse};
use crate::scene::{RectangleSpec, SceneApi, SceneUpdate};
use crate::service::BridgeService;
use crate::types::{BridgeStats, HiddenZone, Vec2, ZoneBounds};
use anyhow::{Context, Result};
use bytes::Bytes;
use futures::StreamExt;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Relay endpoint (e.g. "nats://localhost:4222")
    pub endpoint: String,
    /// How long to wait for the initial connection before reporting
    /// failure to the operator.
    pub connect_timeout: Duration,
    /// How deep to buffer host commands before dropping.
    pub command_buffer: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            endpoint: "nats://localhost:4222".into(),
            connect_timeout: Duration::from_secs(10),
            command_buffer: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// Host commands
// ---------------------------------------------------------------------------

/// An action requested by the embedding host (UI button, hotkey, …).
#[derive(Debug, Clone)]
pub enum BridgeCommand {
    /// Create a hidden zone: scene rectangle first, then local state,
    /// then the announcement.
    AddZone { bounds: ZoneBounds },
    /// Delete a hidden zone's scene item and forget it locally.
    RemoveZone { zone_id: String },
    /// Mark or unmark a token as bot-controlled.
    SetBot { token_id: String, is_bot: bool },
    /// Select a token on the local player's behalf.
    SelectToken { token_id: String },
}

// ---------------------------------------------------------------------------
// Handle (given to the embedding host)
// ---------------------------------------------------------------------------

/// Clonable host-side handle: sends commands into the running session
/// and reads service state.
#[derive(Clone)]
pub struct BridgeHandle {
    commands: mpsc::Sender<BridgeCommand>,
    service: Arc<Mutex<BridgeService>>,
}

impl BridgeHandle {
    /// Send a command (fire-and-forget, dropped with a warning when the
    /// buffer is full).
    pub fn send(&self, command: BridgeCommand) {
        if self.commands.try_send(command).is_err() {
            warn!("[session] Command buffer full; dropping command");
        }
    }

    /// Run a closure against the live service state.
    pub fn with_service<R>(&self, f: impl FnOnce(&BridgeService) -> R) -> R {
        f(&self.service.lock())
    }

    pub fn stats(&self) -> BridgeStats {
        self.service.lock().stats()
    }
}

// ---------------------------------------------------------------------------
// BridgeSession
// ---------------------------------------------------------------------------

/// Wraps a [`BridgeService`] and a [`SceneApi`] and bridges them onto
/// the relay.
///
/// The `apply_*` methods are public so hosts and tests can drive the
/// session without a live relay connection; [`BridgeSession::run`] wires
/// the same methods to real transport events.
pub struct BridgeSession {
    config: BridgeConfig,
    service: Arc<Mutex<BridgeService>>,
    scene: Arc<dyn SceneApi>,
    commands: mpsc::Receiver<BridgeCommand>,
    command_tx: mpsc::Sender<BridgeCommand>,
    state: ConnectionState,
}

impl BridgeSession {
    pub fn new(
        config: BridgeConfig,
        service: Arc<Mutex<BridgeService>>,
        scene: Arc<dyn SceneApi>,
    ) -> Self {
        let (command_tx, commands) = mpsc::channel(config.command_buffer);
        Self {
            config,
            service,
            scene,
            commands,
            command_tx,
            state: ConnectionState::Disconnected,
        }
    }

    pub fn handle(&self) -> BridgeHandle {
        BridgeHandle {
            commands: self.command_tx.clone(),
            service: self.service.clone(),
        }
    }

    pub fn service(&self) -> Arc<Mutex<BridgeService>> {
        self.service.clone()
    }

    // -----------------------------------------------------------------------
    // Event application
    // -----------------------------------------------------------------------

    /// Feed one scene update through the service.
    ///
    /// Item snapshots reconcile the token cache; selection changes are
    /// deduplicated (and `None` selections ignored) before recording.
    pub fn apply_scene_update(&self, update: SceneUpdate) -> Vec<OutboundEvent> {
        match update {
            SceneUpdate::Items(items) => {
                let moves = self.service.lock().observe_items(&items);
                moves.into_iter().map(OutboundEvent::TokenMoved).collect()
            }
            SceneUpdate::Selection(None) => Vec::new(),
            SceneUpdate::Selection(Some(token_id)) => {
                {
                    let service = self.service.lock();
                    if service.selected_id() == Some(token_id.as_str()) {
                        return Vec::new();
                    }
                }
                self.service
                    .lock()
                    .select_token(&token_id)
                    .map(OutboundEvent::TokenSelected)
                    .into_iter()
                    .collect()
            }
        }
    }

    /// Execute a remote move command: cached position plus a fresh grid
    /// query, then one scene mutation.
    ///
    /// The cache update and the outbound `token:move` follow from the
    /// scene's own change notification, not from here. Untracked tokens
    /// are ignored; scene failures are warned and swallowed.
    pub async fn apply_move_command(&self, command: MoveCommand) {
        let position = self.service.lock().token_position(&command.token_id);
        let Some(position) = position else {
            debug!("[session] Move for untracked token {}", command.token_id);
            return;
        };

        let pixels_per_unit = match self.scene.grid_scale().await {
            Ok(grid) => grid.pixels_per_unit,
            Err(e) => {
                let fallback = self.service.lock().config().default_grid_size;
                debug!("[session] Grid query failed ({e}); assuming {fallback} px");
                fallback
            }
        };

        let delta = movement::displacement(&command.direction, command.distance, pixels_per_unit);
        let target = Vec2::new(position.x + delta.x, position.y + delta.y);

        if let Err(e) = self.scene.update_position(&command.token_id, target).await {
            warn!(
                "[session] Scene move failed for {}: {}",
                command.token_id, e
            );
        }
    }

    /// Merge a relay state snapshot into the service.
    pub fn apply_sync_response(&self, sync: SyncResponse) {
        self.service.lock().apply_sync(sync);
    }

    /// Execute one host command.
    ///
    /// Zone commands talk to the scene first and leave local state
    /// unchanged when the scene call fails, so the registry never drifts
    /// ahead of the scene.
    pub async fn apply_command(&self, command: BridgeCommand) -> Vec<OutboundEvent> {
        match command {
            BridgeCommand::AddZone { bounds } => {
                match self
                    .scene
                    .create_rectangle(RectangleSpec::hidden_zone(bounds))
                    .await
                {
                    Ok(id) => {
                        let zone = self.service.lock().add_zone(HiddenZone { id, bounds });
                        info!("[session] Hidden zone {} created", zone.id);
                        vec![OutboundEvent::ZoneAdded(zone)]
                    }
                    Err(e) => {
                        warn!("[session] Zone creation failed: {e}");
                        Vec::new()
                    }
                }
            }
            BridgeCommand::RemoveZone { zone_id } => {
                match self.scene.delete_item(&zone_id).await {
                    Ok(()) => {
                        let removed = self.service.lock().remove_zone(&zone_id);
                        info!("[session] Hidden zone {} removed", removed.zone_id);
                        vec![OutboundEvent::ZoneRemoved(removed)]
                    }
                    Err(e) => {
                        warn!("[session] Zone removal failed for {zone_id}: {e}");
                        Vec::new()
                    }
                }
            }
            BridgeCommand::SetBot { token_id, is_bot } => {
                let event = {
                    let mut service = self.service.lock();
                    if is_bot {
                        OutboundEvent::BotRegistered(service.register_bot(&token_id))
                    } else {
                        OutboundEvent::BotUnregistered(service.unregister_bot(&token_id))
                    }
                };
                vec![event]
            }
            BridgeCommand::SelectToken { token_id } => {
                self.apply_scene_update(SceneUpdate::Selection(Some(token_id)))
            }
        }
    }

    /// Query the scene grid and record it on the service. Failures keep
    /// the configured defaults and are never surfaced.
    pub async fn refresh_grid_scale(&self) {
        match self.scene.grid_scale().await {
            Ok(grid) => {
                debug!(
                    "[session] Grid scale: {} px per {}",
                    grid.pixels_per_unit, grid.unit_label
                );
                self.service
                    .lock()
                    .set_map_scale(grid.pixels_per_unit, &grid.unit_label);
            }
            Err(e) => debug!("[session] Grid unavailable ({e}); keeping defaults"),
        }
    }

    // -----------------------------------------------------------------------
    // Run loop
    // -----------------------------------------------------------------------

    /// Connect to the relay, request a sync, prime state from the scene,
    /// then bridge both sides until ctrl-c or either side closes.
    pub async fn run(mut self) -> Result<()> {
        info!("[session] Connecting to {}", self.config.endpoint);
        self.set_state(ConnectionState::Connecting);

        let client = tokio::time::timeout(
            self.config.connect_timeout,
            async_nats::connect(&self.config.endpoint),
        )
        .await
        .context("Timed out connecting to relay")?
        .context("Failed to connect to relay")?;

        self.set_state(ConnectionState::Connected);

        let mut move_sub = client
            .subscribe(subjects::REMOTE_TOKEN_MOVE)
            .await
            .context("Failed to subscribe to move commands")?;
        let mut sync_sub = client
            .subscribe(subjects::SYNC_RESPONSE)
            .await
            .context("Failed to subscribe to sync responses")?;

        // Subscribe before the initial snapshot so a host mutation landing
        // in between arrives as a queued update instead of vanishing.
        let mut scene_updates = self.scene.updates();

        // Ask the relay for its state, then prime ours from the scene.
        publish_event(&client, &OutboundEvent::SyncRequest).await;
        self.refresh_grid_scale().await;

        match self.scene.items().await {
            Ok(items) => {
                let events = self.apply_scene_update(SceneUpdate::Items(items));
                publish_all(&client, &events).await;
            }
            Err(e) => warn!("[session] Initial scene snapshot failed: {e}"),
        }

        info!("[session] Bridging scene and relay");

        loop {
            tokio::select! {
                update = scene_updates.recv() => {
                    match update {
                        Ok(update) => {
                            let events = self.apply_scene_update(update);
                            publish_all(&client, &events).await;
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            // A fresh snapshot supersedes anything missed.
                            warn!("[session] Scene updates lagged by {n}; re-observing");
                            match self.scene.items().await {
                                Ok(items) => {
                                    let events =
                                        self.apply_scene_update(SceneUpdate::Items(items));
                                    publish_all(&client, &events).await;
                                }
                                Err(e) => warn!("[session] Scene snapshot failed: {e}"),
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            warn!("[session] Scene update stream closed");
                            break;
                        }
                    }
                }

                msg = move_sub.next() => {
                    let Some(msg) = msg else {
                        warn!("[session] Relay move subscription closed");
                        break;
                    };
                    match serde_json::from_slice::<MoveCommand>(&msg.payload) {
                        Ok(command) => {
                            debug!(
                                "[session] Move command: {} {} x{}",
                                command.token_id, command.direction, command.distance
                            );
                            self.apply_move_command(command).await;
                        }
                        Err(e) => warn!("[session] Bad move command payload: {e}"),
                    }
                }

                msg = sync_sub.next() => {
                    let Some(msg) = msg else {
                        warn!("[session] Relay sync subscription closed");
                        break;
                    };
                    match serde_json::from_slice::<SyncResponse>(&msg.payload) {
                        Ok(sync) => self.apply_sync_response(sync),
                        Err(e) => warn!("[session] Bad sync payload: {e}"),
                    }
                }

                command = self.commands.recv() => {
                    let Some(command) = command else { continue };
                    let events = self.apply_command(command).await;
                    publish_all(&client, &events).await;
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("[session] Shutting down (SIGINT)");
                    break;
                }
            }
        }

        self.set_state(ConnectionState::Disconnected);
        drop(client);
        Ok(())
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            info!("[session] Connection state: {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }
}

// ---------------------------------------------------------------------------
// Publish helpers
// ---------------------------------------------------------------------------

/// Serialise `event` and publish it on its subject. Failures are logged
/// and swallowed.
async fn publish_event(client: &async_nats::Client, event: &OutboundEvent) {
    match event.payload() {
        Ok(payload) => {
            if let Err(e) = client.publish(event.subject(), Bytes::from(payload)).await {
                warn!("[session] Failed to publish to {}: {}", event.subject(), e);
            }
        }
        Err(e) => warn!(
            "[session] Failed to serialise event for {}: {}",
            event.subject(),
            e
        ),
    }
}

async fn publish_all(client: &async_nats::Client, events: &[OutboundEvent]) {
    for event in events {
        publish_event(client, event).await;
    }
}
