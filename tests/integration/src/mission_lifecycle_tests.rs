//! Mission lifecycle from creation to deletion, end to end

use crate::test_utils::{drain_events, event_names, Station};
use serde_json::json;
use skyfleet_control::ControlError;

#[tokio::test]
async fn test_full_mission_lifecycle() {
    let station = Station::new();
    let mut observer = station.plane.hub().subscribe();

    // Create the mission with one operator key.
    let endpoint = station
        .plane
        .create_mission(
            "survey-north",
            "Survey North",
            &["ssh-ed25519 OPERATOR laptop".to_string()],
        )
        .await
        .unwrap();
    assert_eq!(endpoint.address, "ssh://config.test/survey-north.git");
    assert_eq!(
        station.store.allowed(),
        vec![(
            "ssh-ed25519 OPERATOR laptop".to_string(),
            "survey-north".to_string()
        )]
    );

    // It shows up in the listing and an empty snapshot reads back.
    let listing = station.plane.list_missions().await;
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].slug, "survey-north");
    let snapshot = station.plane.read_mission("survey-north").await.unwrap();
    assert_eq!(snapshot.name, "Survey North");
    assert!(snapshot.drones.is_empty());

    // A drone announces itself over the transport, which makes it
    // assignable.
    station
        .device_report("drone-1", "mission-state", json!({
            "mission_slug": "",
            "timestamp": "2026-01-10T09:00:00Z"
        }))
        .await;
    station
        .plane
        .assign_drone("survey-north", "drone-1")
        .await
        .unwrap();
    assert_eq!(station.bus.count_of("initialize-trust"), 1);

    // And is later removed again.
    station
        .plane
        .remove_drone("survey-north", "drone-1")
        .await
        .unwrap();
    assert_eq!(station.store.count_of("survey-north", "drone-removed"), 1);
    assert_eq!(station.bus.count_of("leave-mission"), 1);

    station.plane.delete_mission("survey-north").await.unwrap();
    assert_eq!(station.store.destroyed(), vec!["survey-north".to_string()]);
    assert!(matches!(
        station.plane.read_mission("survey-north").await,
        Err(ControlError::UnknownMission(_))
    ));

    let events = drain_events(&mut observer);
    assert_eq!(
        event_names(&events),
        vec![
            "mission-created",
            "mission-drone-assigned",
            "mission-drone-removed",
            "mission-removed",
        ]
    );
}

#[tokio::test]
async fn test_slug_is_freed_for_reuse_after_deletion() {
    let station = Station::new();

    station
        .plane
        .create_mission("alpha", "Alpha", &[])
        .await
        .unwrap();
    assert!(matches!(
        station.plane.create_mission("alpha", "Alpha 2", &[]).await,
        Err(ControlError::SlugTaken(_))
    ));

    station.plane.delete_mission("alpha").await.unwrap();
    station
        .plane
        .create_mission("alpha", "Alpha 2", &[])
        .await
        .unwrap();
    let snapshot = station.plane.read_mission("alpha").await.unwrap();
    assert_eq!(snapshot.name, "Alpha 2");
}

#[tokio::test]
async fn test_failed_provisioning_leaves_no_trace() {
    let station = Station::new();
    station.store.fail_provision(true);

    assert!(station
        .plane
        .create_mission("alpha", "Alpha", &[])
        .await
        .is_err());
    assert!(station.plane.list_missions().await.is_empty());

    // The slug is usable once the store recovers.
    station.store.fail_provision(false);
    station
        .plane
        .create_mission("alpha", "Alpha", &[])
        .await
        .unwrap();
}
