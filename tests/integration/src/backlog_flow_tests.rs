//! Backlog distribution and reconciliation scenarios

use crate::test_utils::{drain_events, Station};
use serde_json::json;
use skyfleet_control::ControlError;
use skyfleet_domain::NewTask;

fn survey_task(id: &str) -> NewTask {
    NewTask {
        id: id.to_string(),
        kind: "survey".to_string(),
        priority: 5,
        payload: json!({ "area": "north-field" }),
    }
}

async fn mission_with_drones(station: &Station, slug: &str, drones: &[&str]) {
    station
        .plane
        .create_mission(slug, "Mission", &[])
        .await
        .unwrap();
    for drone in drones {
        station.activate(drone);
        station.plane.assign_drone(slug, drone).await.unwrap();
    }
}

#[tokio::test]
async fn test_new_task_is_persisted_and_fanned_out() {
    let station = Station::new();
    mission_with_drones(&station, "alpha", &["drone-1", "drone-2"]).await;
    let mut observer = station.plane.hub().subscribe();

    station
        .plane
        .add_task("alpha", survey_task("t1"))
        .await
        .unwrap();

    assert_eq!(station.store.count_of("alpha", "task-created"), 1);
    let notified: Vec<_> = station
        .bus
        .sent()
        .into_iter()
        .filter(|s| s.command.name() == "update-backlog")
        .map(|s| s.device_id)
        .collect();
    assert_eq!(notified, vec!["drone-1", "drone-2"]);

    let backlog = station.plane.get_backlog("alpha").await.unwrap();
    assert_eq!(backlog.len(), 1);
    assert_eq!(backlog[0].id, "t1");
    assert_eq!(backlog[0].status, "in-progress");

    let events = drain_events(&mut observer);
    assert_eq!(events[0]["event"], "mission-backlog-item-added");
    assert_eq!(events[0]["item_id"], "t1");
    assert_eq!(events[0]["item_priority"], 5);
}

#[tokio::test]
async fn test_unreachable_drone_does_not_block_distribution() {
    let station = Station::new();
    mission_with_drones(&station, "alpha", &["drone-1", "drone-2"]).await;

    station.bus.fail_command("update-backlog");
    station
        .plane
        .add_task("alpha", survey_task("t1"))
        .await
        .unwrap();

    // The task is committed even though no drone heard about it; the
    // next report cycle reconciles.
    let backlog = station.plane.get_backlog("alpha").await.unwrap();
    assert_eq!(backlog.len(), 1);
}

#[tokio::test]
async fn test_drone_reported_plan_reconciles_backlog() {
    let station = Station::new();
    mission_with_drones(&station, "alpha", &["drone-1"]).await;
    station
        .plane
        .add_task("alpha", survey_task("t1"))
        .await
        .unwrap();
    station
        .plane
        .add_task("alpha", survey_task("t2"))
        .await
        .unwrap();

    station
        .device_report("drone-1", "mission-plan", json!([
            { "id": "t1", "assigned_to": "drone-1", "status": "done" },
            { "id": "ghost", "assigned_to": "drone-1", "status": "done" }
        ]))
        .await;

    let backlog = station.plane.get_backlog("alpha").await.unwrap();
    let by_id = |id: &str| backlog.iter().find(|i| i.id == id).unwrap();
    assert_eq!(by_id("t1").status, "done");
    // Untouched item keeps its status, unknown ids are ignored.
    assert_eq!(by_id("t2").status, "in-progress");
    assert_eq!(backlog.len(), 2);
}

#[tokio::test]
async fn test_flight_plan_reaches_every_observer() {
    let station = Station::new();
    mission_with_drones(&station, "alpha", &["drone-1"]).await;
    let mut first = station.plane.hub().subscribe();
    let mut second = station.plane.hub().subscribe();

    station
        .device_report("drone-1", "flight-plan", json!([
            { "reached": true, "lat": 52.52, "lon": 13.40, "alt": 80.0 },
            { "reached": false, "lat": 52.53, "lon": 13.41, "alt": 85.0 }
        ]))
        .await;

    for observer in [&mut first, &mut second] {
        let events = drain_events(observer);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["event"], "flight-plan");
        assert_eq!(events[0]["drone_id"], "drone-1");
        assert_eq!(events[0]["path"].as_array().unwrap().len(), 2);
    }
}

#[tokio::test]
async fn test_backlog_of_unknown_mission_is_an_error() {
    let station = Station::new();
    assert!(matches!(
        station.plane.get_backlog("nowhere").await,
        Err(ControlError::UnknownMission(_))
    ));
    assert!(matches!(
        station.plane.add_task("nowhere", survey_task("t1")).await,
        Err(ControlError::UnknownMission(_))
    ));
}
