//! BridgeService unit tests

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use tabletop_bridge::{
        protocol::SyncResponse,
        service::BridgeService,
        types::{
            BridgeServiceConfig, HiddenZone, MapInfo, SceneItem, Token, Vec2, ZoneBounds,
        },
    };

    fn make_service() -> BridgeService {
        BridgeService::new(BridgeServiceConfig::default())
    }

    fn make_item(id: &str, x: f64, y: f64) -> SceneItem {
        SceneItem {
            id: id.to_string(),
            name: format!("name-{id}"),
            text: None,
            position: Vec2::new(x, y),
            scale: None,
            image: None,
            visible: None,
            metadata: HashMap::new(),
            layer: "CHARACTER".to_string(),
            kind: String::new(),
        }
    }

    fn make_token(id: &str, x: f64, y: f64) -> Token {
        Token {
            id: id.to_string(),
            name: format!("name-{id}"),
            position: Vec2::new(x, y),
            size: 100.0,
            hidden: false,
            controller_id: String::new(),
            is_bot: false,
        }
    }

    // -----------------------------------------------------------------------
    // Scene observation
    // -----------------------------------------------------------------------

    #[test]
    fn observation_tracks_eligible_items_only() {
        let mut svc = make_service();

        let mut wall = make_item("wall", 0.0, 0.0);
        wall.layer = "PROP".to_string();

        let moves = svc.observe_items(&[make_item("hero", 0.0, 0.0), wall]);
        assert!(moves.is_empty());
        assert_eq!(svc.token_count(), 1);
        assert!(svc.token("hero").is_some());
        assert!(svc.token("wall").is_none());
    }

    #[test]
    fn observation_announces_position_changes() {
        let mut svc = make_service();
        svc.observe_items(&[make_item("hero", 0.0, 0.0), make_item("orc", 10.0, 10.0)]);

        let moves = svc.observe_items(&[
            make_item("hero", 150.0, 0.0),
            make_item("orc", 10.0, 10.0),
        ]);
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].token_id, "hero");
        assert_eq!(moves[0].position, Vec2::new(150.0, 0.0));
    }

    #[test]
    fn observation_replaces_the_cache() {
        let mut svc = make_service();
        svc.observe_items(&[make_item("hero", 0.0, 0.0), make_item("orc", 10.0, 10.0)]);
        assert_eq!(svc.token_count(), 2);

        // "orc" left the scene: no event, just gone.
        let moves = svc.observe_items(&[make_item("hero", 0.0, 0.0)]);
        assert!(moves.is_empty());
        assert_eq!(svc.token_count(), 1);
        assert!(svc.token("orc").is_none());
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    #[test]
    fn selecting_a_cached_token_announces_it() {
        let mut svc = BridgeService::new(BridgeServiceConfig {
            player_id: "table-1".to_string(),
            ..Default::default()
        });
        svc.observe_items(&[make_item("hero", 0.0, 0.0)]);

        let event = svc.select_token("hero").unwrap();
        assert_eq!(event.token_id, "hero");
        assert_eq!(event.player_id, "table-1");
        assert_eq!(svc.selected_id(), Some("hero"));
    }

    #[test]
    fn selecting_an_untracked_token_records_without_announcing() {
        let mut svc = make_service();
        assert!(svc.select_token("ghost").is_none());
        assert_eq!(svc.selected_id(), Some("ghost"));
        // The snapshot accessor reads through the cache, so it stays
        // empty until the token shows up.
        assert!(svc.selected().is_none());

        svc.observe_items(&[make_item("ghost", 0.0, 0.0)]);
        assert_eq!(svc.selected().unwrap().id, "ghost");
    }

    // -----------------------------------------------------------------------
    // Bots
    // -----------------------------------------------------------------------

    #[test]
    fn bot_registration_flips_the_cached_token() {
        let mut svc = make_service();
        svc.observe_items(&[make_item("hero", 0.0, 0.0)]);

        let event = svc.register_bot("hero");
        assert_eq!(event.token_id, "hero");
        assert_eq!(event.name, "name-hero");
        assert!(svc.token("hero").unwrap().is_bot);
        assert!(svc.is_bot("hero"));

        let event = svc.unregister_bot("hero");
        assert_eq!(event.token_id, "hero");
        assert!(!svc.token("hero").unwrap().is_bot);
        assert!(!svc.is_bot("hero"));
    }

    #[test]
    fn bot_registration_survives_reobservation() {
        let mut svc = make_service();
        svc.observe_items(&[make_item("hero", 0.0, 0.0)]);
        svc.register_bot("hero");

        // Rebuilt snapshots pick the flag up from the bot set.
        svc.observe_items(&[make_item("hero", 50.0, 0.0)]);
        assert!(svc.token("hero").unwrap().is_bot);
    }

    #[test]
    fn bot_registration_of_unknown_token_uses_fallback_name() {
        let mut svc = make_service();
        let event = svc.register_bot("mystery");
        assert_eq!(event.name, "Bot");
        assert_eq!(svc.bot_count(), 1);

        // The flag applies as soon as the token appears.
        svc.observe_items(&[make_item("mystery", 0.0, 0.0)]);
        assert!(svc.token("mystery").unwrap().is_bot);
    }

    // -----------------------------------------------------------------------
    // Relay sync
    // -----------------------------------------------------------------------

    #[test]
    fn sync_merges_tokens_instead_of_replacing() {
        let mut svc = make_service();
        svc.observe_items(&[make_item("hero", 0.0, 0.0)]);

        svc.apply_sync(SyncResponse {
            tokens: Some(vec![make_token("remote", 500.0, 500.0)]),
            hidden_zones: None,
            map_info: None,
        });

        // Both survive: sync merges by id.
        assert_eq!(svc.token_count(), 2);
        assert!(svc.token("hero").is_some());
        assert!(svc.token("remote").is_some());

        // A later observation replaces the cache, dropping the merged
        // token unless the scene reports it.
        svc.observe_items(&[make_item("hero", 0.0, 0.0)]);
        assert!(svc.token("remote").is_none());
    }

    #[test]
    fn sync_replaces_map_info_wholesale() {
        let mut svc = make_service();
        assert_eq!(svc.map_info().grid_size, 150.0);

        svc.apply_sync(SyncResponse {
            tokens: None,
            hidden_zones: None,
            map_info: Some(MapInfo {
                grid_size: 70.0,
                grid_unit: "ft".to_string(),
                width: 1400.0,
                height: 700.0,
            }),
        });
        assert_eq!(svc.map_info().grid_size, 70.0);
        assert_eq!(svc.map_info().grid_unit, "ft");
    }

    #[test]
    fn sync_merges_zones() {
        let mut svc = make_service();
        svc.apply_sync(SyncResponse {
            tokens: None,
            hidden_zones: Some(vec![HiddenZone {
                id: "zone-remote".to_string(),
                bounds: ZoneBounds {
                    x: 0.0,
                    y: 0.0,
                    width: 200.0,
                    height: 200.0,
                },
            }]),
            map_info: None,
        });
        assert_eq!(svc.zone_count(), 1);
        assert!(svc.zone("zone-remote").is_some());
    }

    #[test]
    fn empty_sync_changes_nothing() {
        let mut svc = make_service();
        svc.observe_items(&[make_item("hero", 1.0, 2.0)]);

        svc.apply_sync(SyncResponse::default());
        assert_eq!(svc.token_count(), 1);
        assert_eq!(svc.map_info().grid_size, 150.0);
        assert_eq!(svc.zone_count(), 0);
    }

    // -----------------------------------------------------------------------
    // Zones
    // -----------------------------------------------------------------------

    #[test]
    fn zone_add_and_remove_round_trip() {
        let mut svc = make_service();
        let zone = svc.add_zone(HiddenZone {
            id: "zone-1".to_string(),
            bounds: ZoneBounds {
                x: 40.0,
                y: 50.0,
                width: 200.0,
                height: 200.0,
            },
        });
        assert_eq!(zone.id, "zone-1");
        assert_eq!(svc.zone_count(), 1);

        let removed = svc.remove_zone("zone-1");
        assert_eq!(removed.zone_id, "zone-1");
        assert_eq!(svc.zone_count(), 0);
    }

    #[test]
    fn removing_an_unknown_zone_still_yields_the_payload() {
        let mut svc = make_service();
        // Peers prune their own copies, so the payload goes out anyway.
        let removed = svc.remove_zone("ghost");
        assert_eq!(removed.zone_id, "ghost");
        assert_eq!(svc.zone_count(), 0);
    }

    // -----------------------------------------------------------------------
    // Grid & distances
    // -----------------------------------------------------------------------

    #[test]
    fn grid_size_substitutes_non_positive_values() {
        let mut svc = make_service();
        assert_eq!(svc.grid_size(), 150.0);

        svc.apply_sync(SyncResponse {
            tokens: None,
            hidden_zones: None,
            map_info: Some(MapInfo {
                grid_size: 0.0,
                grid_unit: "m".to_string(),
                width: 0.0,
                height: 0.0,
            }),
        });
        assert_eq!(svc.grid_size(), 150.0);

        svc.set_map_scale(70.0, "ft");
        assert_eq!(svc.grid_size(), 70.0);
        assert_eq!(svc.map_info().grid_unit, "ft");
    }

    #[test]
    fn empty_unit_label_falls_back_to_default() {
        let mut svc = make_service();
        svc.set_map_scale(70.0, "");
        assert_eq!(svc.map_info().grid_unit, "m");
    }

    #[test]
    fn distances_use_the_map_grid() {
        let mut svc = make_service();
        svc.observe_items(&[
            make_item("hero", 0.0, 0.0),
            make_item("orc", 300.0, 0.0),
            make_item("ogre", 0.0, 400.0),
        ]);

        let distances = svc.distances_from("hero").unwrap();
        assert_eq!(distances.len(), 2);
        assert_eq!(distances["orc"], 2); // 300 px / 150
        assert_eq!(distances["ogre"], 3); // 400 px / 150 = 2.67

        svc.set_map_scale(100.0, "m");
        let distances = svc.distances_from("hero").unwrap();
        assert_eq!(distances["orc"], 3);
        assert_eq!(distances["ogre"], 4);

        assert!(svc.distances_from("ghost").is_none());
    }

    // -----------------------------------------------------------------------
    // Stats
    // -----------------------------------------------------------------------

    #[test]
    fn stats_reflect_session_state() {
        let mut svc = make_service();
        let stats = svc.stats();
        assert_eq!(stats.tracked_tokens, 0);
        assert_eq!(stats.hidden_zones, 0);
        assert_eq!(stats.bot_tokens, 0);
        assert!(stats.selected.is_none());

        svc.observe_items(&[make_item("hero", 0.0, 0.0), make_item("orc", 1.0, 1.0)]);
        svc.register_bot("orc");
        svc.select_token("hero");
        svc.add_zone(HiddenZone {
            id: "zone-1".to_string(),
            bounds: ZoneBounds {
                x: 0.0,
                y: 0.0,
                width: 200.0,
                height: 200.0,
            },
        });

        let stats = svc.stats();
        assert_eq!(stats.tracked_tokens, 2);
        assert_eq!(stats.hidden_zones, 1);
        assert_eq!(stats.bot_tokens, 1);
        assert_eq!(stats.selected.as_deref(), Some("hero"));
    }
}
