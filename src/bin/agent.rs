//! tabletop-bridge-agent binary
//!
//! Development harness: wires an in-process [`MemoryScene`] to a live
//! relay so the bridge can be driven end to end without a tabletop host.
//!
//! ## Configuration (flags / env / TOML)
//!
//! | Key                           | Default                 | Description                     |
//! |-------------------------------|-------------------------|---------------------------------|
//! | `BRIDGE_ENDPOINT`             | `nats://localhost:4222` | Relay endpoint                  |
//! | `BRIDGE_PLAYER_ID`            | `owlbear`               | Player id on selection events   |
//! | `BRIDGE_CONNECT_TIMEOUT_SECS` | `10`                    | Initial connection timeout      |
//! | `BRIDGE_CONFIG`               | `tabletop-bridge`       | Config file name (TOML)         |
//! | `BRIDGE_GRID_DPI`             | `150`                   | Scene grid pixels per unit      |
//! | `BRIDGE_GRID_UNIT`            | `m`                     | Scene grid unit label           |
//! | `BRIDGE_DEMO_TOKENS`          | `0`                     | Demo tokens seeded on the scene |
//!
//! Flags beat env vars; env vars beat the config file. The config file
//! (`tabletop-bridge.toml` next to the working directory) is where a
//! previously used endpoint can be kept between runs:
//!
//! ```toml
//! endpoint = "nats://relay.example:4222"
//! player_id = "owlbear"
//! ```

use anyhow::Result;
use clap::Parser;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tabletop_bridge::{
    bridge::{BridgeConfig, BridgeSession},
    scene::MemoryScene,
    service::BridgeService,
    types::{BridgeServiceConfig, SceneItem, Vec2},
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "tabletop-bridge-agent", about = "Tabletop Bridge", version)]
struct Args {
    /// Relay endpoint (falls back to the config file, then localhost)
    #[arg(long, env = "BRIDGE_ENDPOINT")]
    endpoint: Option<String>,

    /// Player id stamped onto selection events
    #[arg(long, env = "BRIDGE_PLAYER_ID")]
    player_id: Option<String>,

    /// Initial connection timeout in seconds
    #[arg(long, env = "BRIDGE_CONNECT_TIMEOUT_SECS", default_value_t = 10)]
    connect_timeout_secs: u64,

    /// Config file name, read as TOML without its extension
    #[arg(long = "config", env = "BRIDGE_CONFIG", default_value = "tabletop-bridge")]
    config_file: String,

    /// Grid pixels per unit for the in-process scene
    #[arg(long, env = "BRIDGE_GRID_DPI", default_value_t = 150.0)]
    grid_dpi: f64,

    /// Grid unit label for the in-process scene
    #[arg(long, env = "BRIDGE_GRID_UNIT", default_value = "m")]
    grid_unit: String,

    /// Seed N demo tokens onto the in-process scene
    #[arg(long, env = "BRIDGE_DEMO_TOKENS", default_value_t = 0)]
    demo_tokens: usize,
}

// ---------------------------------------------------------------------------
// File settings
// ---------------------------------------------------------------------------

/// Subset of settings that may live in the config file. Everything is
/// optional; flags and env vars take precedence.
#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    endpoint: Option<String>,
    player_id: Option<String>,
}

fn load_settings(name: &str) -> FileSettings {
    match config::Config::builder()
        .add_source(config::File::with_name(name).required(false))
        .build()
        .and_then(|c| c.try_deserialize())
    {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("Ignoring config file '{name}': {e}");
            FileSettings::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tabletop_bridge=debug".parse()?),
        )
        .init();

    let args = Args::parse();
    let settings = load_settings(&args.config_file);

    let endpoint = args
        .endpoint
        .or(settings.endpoint)
        .unwrap_or_else(|| "nats://localhost:4222".to_string());
    let player_id = args
        .player_id
        .or(settings.player_id)
        .unwrap_or_else(|| "owlbear".to_string());

    tracing::info!(
        "Starting tabletop-bridge-agent (endpoint='{}', player='{}', grid={} px/{})",
        endpoint,
        player_id,
        args.grid_dpi,
        args.grid_unit,
    );

    // In-process scene with a grid, optionally pre-seeded.
    let scene = Arc::new(MemoryScene::with_grid(args.grid_dpi, &args.grid_unit));
    for n in 0..args.demo_tokens {
        scene.put_item(demo_token(n, args.grid_dpi));
    }
    if args.demo_tokens > 0 {
        tracing::info!("Seeded {} demo tokens", args.demo_tokens);
    }

    let service = Arc::new(parking_lot::Mutex::new(BridgeService::new(
        BridgeServiceConfig {
            player_id,
            ..Default::default()
        },
    )));

    let bridge_config = BridgeConfig {
        endpoint,
        connect_timeout: Duration::from_secs(args.connect_timeout_secs),
        ..Default::default()
    };

    // Run until shutdown
    BridgeSession::new(bridge_config, service, scene).run().await
}

/// A character token one grid cell apart from its neighbours.
fn demo_token(n: usize, grid_dpi: f64) -> SceneItem {
    SceneItem {
        id: format!("demo-{n}"),
        name: format!("Demo {n}"),
        text: None,
        position: Vec2::new(n as f64 * grid_dpi, 0.0),
        scale: None,
        image: None,
        visible: None,
        metadata: Default::default(),
        layer: "CHARACTER".to_string(),
        kind: String::new(),
    }
}
