//! End-to-end scenarios over the full simulation loop.

use crate::bridge::{RequestBody, ResponseBody, SimRequest};
use crate::buildings::{BuildingStatus, DevelopmentState};
use crate::car_path::{MotionMode, Waypoint};
use crate::cars::{CarInfo, CarMotion};
use crate::config::BASE_CAPACITY;
use crate::grid::CityGrid;
use crate::stats::CityStats;
use crate::test_harness::TestCity;

/// A serviced block: a road row, a plant wired next to the zone, and the
/// zone lot itself.
fn serviced_block() -> TestCity {
    TestCity::new()
        .with_seed(7)
        .with_road(3, 5, 7, 5)
        .with_building(4, 4, "power-plant")
        .with_building(5, 4, "residential")
}

#[test]
fn test_road_access_in_road_block() {
    // 3x3 block of roads with a plant in the center: everything reports
    // access within the search radius.
    let mut city = TestCity::new();
    for y in 4..7 {
        for x in 4..7 {
            if (x, y) != (5, 5) {
                city = city.with_building(x, y, "road");
            }
        }
    }
    city = city.with_building(5, 5, "power-plant");
    city.tick(1);
    city.assert_road_access(5, 5, true);
}

#[test]
fn test_zone_develops_when_serviced() {
    let mut city = serviced_block();
    city.tick(3000);
    assert_eq!(city.development_state(5, 4), DevelopmentState::Developed);
    city.assert_status(5, 4, BuildingStatus::Ok);
    let zone = city.building(5, 4).zone().unwrap();
    assert!(zone.level >= 1);
}

#[test]
fn test_unpowered_zone_never_develops() {
    let mut city = TestCity::new()
        .with_seed(7)
        .with_road(3, 5, 7, 5)
        .with_building(5, 4, "residential");
    city.tick(2000);
    assert_eq!(city.development_state(5, 4), DevelopmentState::Undeveloped);
    city.assert_status(5, 4, BuildingStatus::NoPower);
}

#[test]
fn test_no_road_zone_flags_no_access() {
    let mut city = TestCity::new()
        .with_seed(7)
        .with_building(4, 4, "power-plant")
        .with_building(5, 4, "residential");
    city.tick(5);
    city.assert_status(5, 4, BuildingStatus::NoRoadAccess);
}

#[test]
fn test_occupancy_stays_bounded_every_tick() {
    let mut city = serviced_block();
    for _ in 0..300 {
        city.tick(10);
        let building = city.building(5, 4);
        let zone = building.zone().unwrap();
        let cap = BASE_CAPACITY.pow(zone.level as u32) as usize;
        match zone.state {
            DevelopmentState::Developed => assert!(zone.occupants.count() <= cap),
            _ => assert_eq!(zone.capacity(), 0),
        }
    }
}

#[test]
fn test_power_loss_leads_to_abandonment_and_reset() {
    let mut city = serviced_block();
    city.tick(3000);
    assert_eq!(city.development_state(5, 4), DevelopmentState::Developed);

    // Knock out the plant. The zone loses power, decays, and after the
    // cooldown the lot resets to an empty undeveloped state.
    city.world_mut()
        .resource_mut::<CityGrid>()
        .set_building(4, 4, None);
    city.tick(4000);

    let zone = city.building(5, 4).zone().unwrap();
    assert_eq!(zone.state, DevelopmentState::Undeveloped);
    assert_eq!(zone.level, 0);
    assert_eq!(zone.occupants.count(), 0);
}

#[test]
fn test_same_seed_same_city() {
    let build = || {
        let mut city = serviced_block();
        city.tick(800);
        city
    };
    let a = build();
    let b = build();
    assert_eq!(
        a.grid(),
        b.grid(),
        "identical seeds must produce identical cities"
    );
}

#[test]
fn test_stats_track_development() {
    let mut city = serviced_block();
    city.tick(3000);
    let stats = city.resource::<CityStats>();
    assert!(stats.buildings >= 7); // 5 road tiles + plant + zone
    assert_eq!(stats.developed_zones, 1);
    assert!(stats.population > 0, "developed home admits residents");
    assert_eq!(stats.jobs, 0, "no commercial or industrial zones placed");
}

#[test]
fn test_bridge_place_and_bulldoze() {
    let mut city = TestCity::new();
    assert!(city.submit(SimRequest {
        id: 1,
        body: RequestBody::PlaceBuilding {
            x: 3,
            y: 3,
            kind: "road".to_string(),
        },
    }));
    city.tick(1);
    let response = city.poll_response().unwrap();
    assert_eq!(response.id, 1);
    assert!(matches!(response.body, ResponseBody::Created { .. }));
    assert!(city.grid().get(3, 3).has_road());

    // Occupied tile is a recoverable miss, not an error.
    city.submit(SimRequest {
        id: 2,
        body: RequestBody::PlaceBuilding {
            x: 3,
            y: 3,
            kind: "power-plant".to_string(),
        },
    });
    // Unknown kinds from the transport are rejected the same way.
    city.submit(SimRequest {
        id: 3,
        body: RequestBody::PlaceBuilding {
            x: 4,
            y: 3,
            kind: "stadium".to_string(),
        },
    });
    city.tick(1);
    assert!(matches!(
        city.poll_response().unwrap().body,
        ResponseBody::NotCreated { .. }
    ));
    assert!(matches!(
        city.poll_response().unwrap().body,
        ResponseBody::NotCreated { .. }
    ));

    city.submit(SimRequest {
        id: 4,
        body: RequestBody::Bulldoze { x: 3, y: 3 },
    });
    city.tick(1);
    assert!(matches!(
        city.poll_response().unwrap().body,
        ResponseBody::Removed { .. }
    ));
    assert!(city.grid().get(3, 3).building.is_none());
}

#[test]
fn test_bridge_route_query() {
    let mut city = TestCity::new().with_road(2, 2, 10, 2);
    city.submit(SimRequest {
        id: 1,
        body: RequestBody::FindRoute {
            from_x: 2,
            from_y: 2,
            to_x: 10,
            to_y: 2,
        },
    });
    city.tick(1);
    let response = city.poll_response().unwrap();
    let ResponseBody::Route { complete, path } = response.body else {
        panic!("expected a route response");
    };
    assert!(complete);
    assert_eq!(path.len(), 9);
}

#[test]
fn test_bridge_answers_each_request_once() {
    let mut city = TestCity::new();
    for id in [10u64, 11, 12] {
        city.submit(SimRequest {
            id,
            body: RequestBody::QueryTile { x: 1, y: 1 },
        });
    }
    // A duplicate of an in-flight id is dropped at submission.
    assert!(!city.submit(SimRequest {
        id: 11,
        body: RequestBody::QueryTile { x: 2, y: 2 },
    }));
    city.tick(1);
    let mut answered: Vec<u64> = Vec::new();
    while let Some(response) = city.poll_response() {
        answered.push(response.id);
    }
    assert_eq!(answered, vec![10, 11, 12]);
}

#[test]
fn test_bridge_spawns_driving_car() {
    let mut city = TestCity::new();
    city.submit(SimRequest {
        id: 1,
        body: RequestBody::SpawnCar {
            info: CarInfo {
                id: 42,
                model: "sedan".to_string(),
                waypoints: vec![Waypoint::new(0.5, 0.5), Waypoint::new(8.5, 0.5)],
                motion: MotionMode::Forward,
                start_time: None,
            },
        },
    });
    city.tick(1);
    let response = city.poll_response().unwrap();
    assert!(matches!(response.body, ResponseBody::CarCreated { .. }));

    // Let a second of virtual time pass; the car should be under way.
    city.tick(10);
    let world = city.world_mut();
    let mut query = world.query::<&CarMotion>();
    let motion = query.single(world);
    assert!(motion.pose.position.x > 0.5);
}

#[test]
fn test_city_changed_announced_on_startup() {
    let mut city = TestCity::new();
    city.tick(1);
    let mut bridge = city
        .world_mut()
        .resource_mut::<crate::bridge::CityBridge>();
    let record = bridge.next_city_change().expect("startup announcement");
    assert_eq!(record.clear, Some(true));
    assert_eq!(record.width, crate::config::GRID_WIDTH);
}

#[test]
fn test_tile_changes_flow_to_outbox() {
    let mut city = TestCity::new();
    city.submit(SimRequest {
        id: 1,
        body: RequestBody::PlaceBuilding {
            x: 6,
            y: 6,
            kind: "road".to_string(),
        },
    });
    city.tick(2);
    let mut bridge = city
        .world_mut()
        .resource_mut::<crate::bridge::CityBridge>();
    let mut saw_road = false;
    while let Some(record) = bridge.next_tile_change() {
        if (record.x, record.y) == (6, 6) {
            assert_eq!(record.building.as_deref(), Some("road"));
            saw_road = true;
        }
    }
    assert!(saw_road, "placement must emit a tile change record");
}
