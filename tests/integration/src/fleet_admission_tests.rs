//! Drone admission and trust handshake scenarios

use crate::test_utils::{drain_events, event_names, Station};
use serde_json::json;
use skyfleet_control::{Command, ControlError};
use skyfleet_domain::DroneStatus;

async fn admit(station: &Station, slug: &str, device_id: &str, key: &str) {
    station.activate(device_id);
    station.plane.assign_drone(slug, device_id).await.unwrap();
    station
        .device_report(device_id, "trust", json!({ "public_ssh_key": key }))
        .await;
}

#[tokio::test]
async fn test_trust_handshake_hands_out_store_endpoint() {
    let station = Station::new();
    station
        .plane
        .create_mission("alpha", "Alpha", &[])
        .await
        .unwrap();

    admit(&station, "alpha", "drone-1", "ssh-ed25519 KEY1 drone-1").await;

    // Persisted, key registered, joined.
    assert_eq!(station.store.count_of("alpha", "drone-added"), 1);
    assert!(station
        .store
        .allowed()
        .contains(&("ssh-ed25519 KEY1 drone-1".to_string(), "alpha".to_string())));

    let sent = station.bus.sent();
    let join = sent
        .iter()
        .find(|s| s.command.name() == "join-mission")
        .unwrap();
    assert_eq!(join.device_id, "drone-1");
    assert_eq!(join.channel, "control");
    match &join.command {
        Command::JoinMission(details) => {
            assert_eq!(details.mission_slug, "alpha");
            assert_eq!(details.git_server_address, "ssh://config.test/alpha.git");
            assert_eq!(details.git_server_key, "ssh-ed25519 TESTKEY");
        }
        other => panic!("unexpected command: {:?}", other),
    }

    let snapshot = station.plane.read_mission("alpha").await.unwrap();
    assert!(snapshot.drones[0].trusted);
}

#[tokio::test]
async fn test_duplicate_trust_reports_are_dropped() {
    let station = Station::new();
    station
        .plane
        .create_mission("alpha", "Alpha", &[])
        .await
        .unwrap();
    admit(&station, "alpha", "drone-1", "ssh-ed25519 KEY1").await;

    station
        .device_report("drone-1", "trust", json!({ "public_ssh_key": "ssh-ed25519 KEY1" }))
        .await;

    assert_eq!(station.store.count_of("alpha", "drone-added"), 1);
    assert_eq!(station.bus.count_of("join-mission"), 1);
}

#[tokio::test]
async fn test_state_reports_drive_status() {
    let station = Station::new();
    let mut observer = station.plane.hub().subscribe();
    station
        .plane
        .create_mission("alpha", "Alpha", &[])
        .await
        .unwrap();
    admit(&station, "alpha", "drone-1", "ssh-ed25519 KEY1").await;

    // A matching report brings the drone online.
    station
        .device_report("drone-1", "mission-state", json!({
            "mission_slug": "alpha",
            "timestamp": "2026-01-10T09:00:00Z"
        }))
        .await;
    let snapshot = station.plane.read_mission("alpha").await.unwrap();
    assert_eq!(snapshot.drones[0].status, DroneStatus::Online);

    // A lost assignment marks it failed, exactly once.
    for _ in 0..3 {
        station
            .device_report("drone-1", "mission-state", json!({
                "mission_slug": "",
                "timestamp": "2026-01-10T09:01:00Z"
            }))
            .await;
    }
    let snapshot = station.plane.read_mission("alpha").await.unwrap();
    assert_eq!(snapshot.drones[0].status, DroneStatus::Failed);

    let names = event_names(&drain_events(&mut observer));
    assert_eq!(
        names
            .iter()
            .filter(|n| n.as_str() == "mission-drone-failed")
            .count(),
        1
    );
}

#[tokio::test]
async fn test_failed_drone_can_be_readmitted() {
    let station = Station::new();
    station
        .plane
        .create_mission("alpha", "Alpha", &[])
        .await
        .unwrap();
    admit(&station, "alpha", "drone-1", "ssh-ed25519 KEY1").await;

    station
        .device_report("drone-1", "mission-state", json!({
            "mission_slug": "",
            "timestamp": "2026-01-10T09:00:00Z"
        }))
        .await;

    // Manual re-admission: remove, assign again, trust again.
    station
        .plane
        .remove_drone("alpha", "drone-1")
        .await
        .unwrap();
    admit(&station, "alpha", "drone-1", "ssh-ed25519 KEY2").await;

    station
        .device_report("drone-1", "mission-state", json!({
            "mission_slug": "alpha",
            "timestamp": "2026-01-10T09:05:00Z"
        }))
        .await;
    let snapshot = station.plane.read_mission("alpha").await.unwrap();
    assert_eq!(snapshot.drones.len(), 1);
    assert!(snapshot.drones[0].trusted);
    assert_eq!(snapshot.drones[0].status, DroneStatus::Online);
    assert_eq!(station.bus.count_of("initialize-trust"), 2);
}

#[tokio::test]
async fn test_a_drone_belongs_to_at_most_one_mission() {
    let station = Station::new();
    station
        .plane
        .create_mission("alpha", "Alpha", &[])
        .await
        .unwrap();
    station
        .plane
        .create_mission("bravo", "Bravo", &[])
        .await
        .unwrap();

    station.activate("drone-1");
    station.plane.assign_drone("alpha", "drone-1").await.unwrap();
    assert!(matches!(
        station.plane.assign_drone("bravo", "drone-1").await,
        Err(ControlError::DroneAlreadyAssigned(_))
    ));

    // Removing it from alpha frees it for bravo.
    station
        .plane
        .remove_drone("alpha", "drone-1")
        .await
        .unwrap();
    station.activate("drone-1");
    station.plane.assign_drone("bravo", "drone-1").await.unwrap();
}

#[tokio::test]
async fn test_trust_from_unassigned_drone_changes_nothing() {
    let station = Station::new();
    station
        .plane
        .create_mission("alpha", "Alpha", &[])
        .await
        .unwrap();

    station
        .device_report("stray", "trust", json!({ "public_ssh_key": "ssh-ed25519 STRAY" }))
        .await;

    assert_eq!(station.store.count_of("alpha", "drone-added"), 0);
    assert!(station.store.allowed().is_empty());
    assert_eq!(station.bus.count_of("join-mission"), 0);
    // But the report still counts as a sign of life.
    assert!(station.plane.liveness().is_active("stray"));
}
