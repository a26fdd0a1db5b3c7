use std::collections::BTreeMap;

use firesim_sim::aircraft::{Aircraft, AircraftKind, EventKind, Status, UavAttributes, WbAttributes};
use firesim_sim::queue::FleetKind;
use firesim_sim::simulator::Simulator;
use firesim_sim::unassigned::UnassignedController;
use firesim_sim::world::World;
use firesim_structs::config::{CoordinatorKind, UnassignedConfig};
use firesim_structs::world::{Base, Strike, WaterTank};
use firesim_structs::Location;

use crate::simple::process_simple;
use crate::{build_uav_coordinator, build_wb_coordinator, PolicyParams};

fn origin() -> Location {
    Location::new(-37.0, 145.0)
}

fn loc(east_km: f64, north_km: f64) -> Location {
    origin().offset_km(east_km, north_km)
}

fn mk_uav(id: usize, at: Location, range: f64, cutoff: f64) -> Aircraft {
    Aircraft::new(
        id,
        AircraftKind::Uav(UavAttributes {
            flight_speed: 1.0, // km/min
            fuel_refill_time: 0.0,
            range,
            inspection_time: 0.0,
            pct_fuel_cutoff: cutoff,
        }),
        at,
        true,
        1.0,
    )
}

fn mk_wb(id: usize, at: Location) -> Aircraft {
    Aircraft::new(
        id,
        AircraftKind::WaterBomber(WbAttributes {
            kind_name: "helicopter".into(),
            flight_speed: 5.0,
            fuel_refill_time: 0.0,
            suppression_time: 1.0,
            water_refill_time: 5.0,
            water_per_suppression: 1.0,
            range_empty: 2000.0,
            range_under_load: 2000.0,
            water_capacity: 1.0,
            pct_fuel_cutoff: 0.0,
        }),
        at,
        true,
        1.0,
    )
}

fn mk_strike(id: usize, at: Location, spawn: f64, ignited: bool) -> Strike {
    Strike {
        id,
        loc: at,
        spawn_time: spawn,
        risk_rating: None,
        ignition_probability: None,
        ignited,
        inspection_time: None,
        suppression_time: None,
    }
}

fn mk_world(
    uavs: Vec<Aircraft>,
    water_bombers: Vec<Aircraft>,
    water_tanks: Vec<WaterTank>,
    strikes: Vec<Strike>,
) -> World {
    let base = Base { id: 0, loc: origin() };
    let mut wb_bases = BTreeMap::new();
    wb_bases.insert("helicopter".to_string(), vec![base]);
    World::new(uavs, water_bombers, vec![base], wb_bases, water_tanks, strikes)
}

fn run(world: World, kind: CoordinatorKind) -> World {
    let mut uav_coord = build_uav_coordinator(kind, PolicyParams::default());
    let mut wb_coord = build_wb_coordinator(kind, PolicyParams::default());
    let mut sim = Simulator::new(world);
    sim.run(&mut *uav_coord, &mut *wb_coord, None);
    sim.world
}

#[test]
fn one_uav_one_strike_at_spawn_point() {
    let _ = env_logger::try_init();
    let world = mk_world(
        vec![mk_uav(0, origin(), 120.0, 0.0)],
        vec![],
        vec![],
        vec![mk_strike(0, origin(), 0.0, false)],
    );
    let world = run(world, CoordinatorKind::Simple);
    assert_eq!(world.strikes[0].inspection_time, Some(0.0));
    assert_eq!(world.strikes[0].suppression_time, None);
}

#[test]
fn empty_strike_stream_is_a_no_op() {
    let _ = env_logger::try_init();
    let world = mk_world(vec![mk_uav(0, origin(), 120.0, 0.0)], vec![], vec![], vec![]);
    let world = run(world, CoordinatorKind::Insertion);
    // Only the spawn record; nothing moved.
    assert_eq!(world.uavs[0].log.len(), 1);
    assert_eq!(world.uavs[0].loc, origin());
}

#[test]
fn refuel_inserted_between_strikes() {
    let _ = env_logger::try_init();
    // After the eastern strike the tank is half empty; the western strike is
    // only reachable via a refuel at the home base, which the coordinator
    // inserts just in time.
    let world = mk_world(
        vec![mk_uav(0, origin(), 200.0, 0.0)],
        vec![],
        vec![],
        vec![
            mk_strike(0, loc(80.0, 0.0), 0.0, false),
            mk_strike(1, loc(-80.0, 0.0), 300.0, false),
        ],
    );
    let world = run(world, CoordinatorKind::Simple);
    let uav = &world.uavs[0];
    assert!(world.strikes[0].inspection_time.is_some());
    assert!(world.strikes[1].inspection_time.is_some());
    assert!(
        uav.log.iter().any(|u| u.status == Status::Refuelling),
        "expected a refuel between the strikes: {:?}",
        uav.log
    );
    // The refuel happened before the second inspection.
    let refuel_at = uav.log.iter().find(|u| u.status == Status::Refuelling).unwrap().time;
    assert!(refuel_at <= world.strikes[1].inspection_time.unwrap());
}

#[test]
fn strike_beyond_reach_is_left_uninspected() {
    let _ = env_logger::try_init();
    let world = mk_world(
        vec![mk_uav(0, origin(), 60.0, 0.0)],
        vec![],
        vec![],
        vec![mk_strike(0, loc(88.0, 0.0), 0.0, false)],
    );
    let world = run(world, CoordinatorKind::Simple);
    assert_eq!(world.strikes[0].inspection_time, None);
    // No aircraft-side fault: the UAV never moved.
    assert_eq!(world.uavs[0].log.len(), 1);
}

#[test]
fn single_reachable_aircraft_gets_the_strike() {
    let _ = env_logger::try_init();
    // Only uav 1 can reach the strike; the others stay put.
    let world = mk_world(
        vec![
            mk_uav(0, loc(-200.0, 0.0), 100.0, 0.0),
            mk_uav(1, loc(10.0, 0.0), 400.0, 0.0),
            mk_uav(2, loc(200.0, 0.0), 100.0, 0.0),
        ],
        vec![],
        vec![],
        vec![mk_strike(0, loc(40.0, 0.0), 0.0, false)],
    );
    let world = run(world, CoordinatorKind::Simple);
    assert!(world.strikes[0].inspection_time.is_some());
    assert!(world.uavs[1].log.iter().any(|u| u.status == Status::Inspecting));
    assert!(world.uavs[0].log.iter().all(|u| u.status != Status::Inspecting));
    assert!(world.uavs[2].log.iter().all(|u| u.status != Status::Inspecting));
}

#[test]
fn simple_picks_minimum_arrival_aircraft() {
    let _ = env_logger::try_init();
    let mut world = mk_world(
        vec![
            mk_uav(0, loc(30.0, 0.0), 400.0, 0.0),
            mk_uav(1, loc(10.0, 0.0), 400.0, 0.0),
            mk_uav(2, loc(50.0, 0.0), 400.0, 0.0),
        ],
        vec![],
        vec![],
        vec![mk_strike(0, origin(), 0.0, false)],
    );
    process_simple(&mut world, FleetKind::Uav, &PolicyParams::default(), 0, 0.0);
    // Arrival of the chosen aircraft is minimal over the fleet.
    assert!(!world.uavs[1].queue.is_empty());
    assert!(world.uavs[0].queue.is_empty());
    assert!(world.uavs[2].queue.is_empty());
}

#[test]
fn insertion_beats_simple_on_crossing_strikes() {
    let _ = env_logger::try_init();
    let strikes = vec![
        mk_strike(0, loc(100.0, 0.0), 0.0, false),
        mk_strike(1, loc(-10.0, 0.0), 1.0, false),
    ];
    let mk = || {
        mk_world(vec![mk_uav(0, origin(), 10_000.0, 0.0)], vec![], vec![], strikes.clone())
    };

    let simple = run(mk(), CoordinatorKind::Simple);
    let insertion = run(mk(), CoordinatorKind::Insertion);

    let total = |world: &World| -> f64 {
        world.strikes.iter().map(|s| s.inspection_time.unwrap()).sum()
    };
    // Insertion serves the near westward strike first instead of chasing the
    // eastern one across the map.
    assert!(total(&insertion) < total(&simple), "{} vs {}", total(&insertion), total(&simple));
    // And the new strike is never worse off than under Simple.
    assert!(
        insertion.strikes[1].inspection_time.unwrap()
            <= simple.strikes[1].inspection_time.unwrap()
    );
}

#[test]
fn tank_exhaustion_reroutes_to_second_tank() {
    let _ = env_logger::try_init();
    // Three ignitions, one unit of water on board across the fleet and one in
    // each tank: every drop must be spent and both tanks drained.
    let world = mk_world(
        vec![mk_uav(0, origin(), 10_000.0, 0.0)],
        vec![mk_wb(0, origin()), {
            let mut wb = mk_wb(1, origin());
            wb.water = 0.0;
            wb
        }],
        vec![
            WaterTank::new(0, loc(10.0, 0.0), 1.0),
            WaterTank::new(1, loc(15.0, 0.0), 1.0),
        ],
        vec![
            mk_strike(0, loc(30.0, 0.0), 0.0, true),
            mk_strike(1, loc(30.0, 5.0), 1.0, true),
            mk_strike(2, loc(30.0, -5.0), 2.0, true),
        ],
    );
    let world = run(world, CoordinatorKind::Simple);
    for strike in &world.strikes {
        assert!(
            strike.suppression_time.is_some(),
            "strike {} was not suppressed",
            strike.id
        );
    }
    assert_eq!(world.water_tanks[0].level, 0.0);
    assert_eq!(world.water_tanks[1].level, 0.0);
}

#[test]
fn boundary_hover_keeps_position_and_fuel() {
    let _ = env_logger::try_init();
    // Square 40 km on a side around the origin; idle UAV close to the east
    // edge with a strong attractor beyond it.
    let polygon = vec![loc(-20.0, -20.0), loc(-20.0, 20.0), loc(20.0, 20.0), loc(20.0, -20.0)];
    let cfg = UnassignedConfig {
        targets_filename: None,
        boundary_polygon_filename: String::new(),
        dt: 60.0,
        uav_repulsion_const: 0.0,
        uav_repulsion_power: 1.0,
        boundary_repulsion_const: 0.0,
        boundary_repulsion_power: 1.0,
        target_attraction_const: 100.0,
        target_attraction_power: 1.0,
        centre_lat: origin().lat,
        centre_lon: origin().lon,
        forecasting: None,
    };
    let target = firesim_structs::world::Target {
        loc: loc(50.0, 0.0),
        start_time: 0.0,
        finish_time: f64::INFINITY,
    };
    let mut controller = UnassignedController::new(cfg, polygon, vec![target]);

    let mut world =
        mk_world(vec![mk_uav(0, loc(19.5, 0.0), 400.0, 0.0)], vec![], vec![], vec![]);
    let before = world.uavs[0].loc;
    let fuel_before = world.uavs[0].fuel;

    controller.tick(&mut world, 0.0);
    assert_eq!(world.uavs[0].queue.len(), 1);
    assert_eq!(world.uavs[0].queue[0].kind, EventKind::Hover);

    let (mut strikes, mut tanks) = (vec![], vec![]);
    world.uavs[0].execute_next(&mut strikes, &mut tanks);
    assert_eq!(world.uavs[0].loc, before);
    assert_eq!(world.uavs[0].fuel, fuel_before);
}

#[test]
fn field_step_stays_inside_polygon() {
    let _ = env_logger::try_init();
    let polygon = vec![loc(-20.0, -20.0), loc(-20.0, 20.0), loc(20.0, 20.0), loc(20.0, -20.0)];
    let cfg = UnassignedConfig {
        targets_filename: None,
        boundary_polygon_filename: String::new(),
        dt: 60.0,
        uav_repulsion_const: 0.0,
        uav_repulsion_power: 1.0,
        boundary_repulsion_const: 0.0,
        boundary_repulsion_power: 1.0,
        target_attraction_const: 100.0,
        target_attraction_power: 1.0,
        centre_lat: origin().lat,
        centre_lon: origin().lon,
        forecasting: None,
    };
    let target = firesim_structs::world::Target {
        loc: loc(10.0, 0.0),
        start_time: 0.0,
        finish_time: f64::INFINITY,
    };
    let mut controller = UnassignedController::new(cfg, polygon, vec![target]);
    let mut world =
        mk_world(vec![mk_uav(0, loc(-10.0, 0.0), 400.0, 0.0)], vec![], vec![], vec![]);
    controller.tick(&mut world, 0.0);
    // Pulled east towards the target, at most one minute of flight.
    assert_eq!(world.uavs[0].queue.len(), 1);
    let planned = world.uavs[0].queue[0].loc;
    assert!(planned.lon > world.uavs[0].loc.lon);
    assert!(world.uavs[0].loc.distance(&planned) <= 1.0 + 1e-6);
}

#[test]
fn deterministic_replay_produces_identical_logs() {
    let _ = env_logger::try_init();
    let mk = || {
        let mut strikes: Vec<Strike> = (0..20)
            .map(|i| {
                mk_strike(
                    i,
                    loc((i as f64 * 7.0) % 40.0 - 20.0, (i as f64 * 3.0) % 30.0 - 15.0),
                    i as f64 * 2.0,
                    false,
                )
            })
            .collect();
        let explicit: Vec<Option<bool>> = (0..20).map(|_| None).collect();
        let mut rng = <rand_chacha::ChaCha8Rng as rand::SeedableRng>::seed_from_u64(42);
        firesim_sim::world::assign_ignitions(&mut strikes, &explicit, 0.5, &mut rng);
        mk_world(
            vec![mk_uav(0, origin(), 400.0, 0.1), mk_uav(1, loc(5.0, 5.0), 400.0, 0.1)],
            vec![mk_wb(0, origin())],
            vec![WaterTank::new(0, loc(5.0, 0.0), f64::INFINITY)],
            strikes,
        )
    };

    let a = run(mk(), CoordinatorKind::ReprocessMaxTime);
    let b = run(mk(), CoordinatorKind::ReprocessMaxTime);

    for (x, y) in a.uavs.iter().zip(&b.uavs) {
        assert_eq!(x.log, y.log);
    }
    for (x, y) in a.water_bombers.iter().zip(&b.water_bombers) {
        assert_eq!(x.log, y.log);
    }
    for (x, y) in a.strikes.iter().zip(&b.strikes) {
        assert_eq!(x.inspection_time, y.inspection_time);
        assert_eq!(x.suppression_time, y.suppression_time);
    }
}

#[test]
fn event_log_times_are_non_decreasing() {
    let _ = env_logger::try_init();
    let strikes: Vec<Strike> = (0..12)
        .map(|i| {
            mk_strike(
                i,
                loc((i as f64 * 11.0) % 30.0 - 15.0, (i as f64 * 5.0) % 20.0 - 10.0),
                i as f64 * 3.0,
                i % 3 == 0,
            )
        })
        .collect();
    let world = mk_world(
        vec![mk_uav(0, origin(), 300.0, 0.1)],
        vec![mk_wb(0, origin())],
        vec![WaterTank::new(0, loc(5.0, 0.0), f64::INFINITY)],
        strikes,
    );
    let world = run(world, CoordinatorKind::MinimiseMeanTime);
    for aircraft in world.uavs.iter().chain(&world.water_bombers) {
        for pair in aircraft.log.windows(2) {
            assert!(
                pair[0].time <= pair[1].time + 1e-9,
                "{}: log out of order",
                aircraft.name
            );
        }
        // Fuel stays within bounds everywhere (I1).
        for update in &aircraft.log {
            assert!((0.0..=1.0 + 1e-9).contains(&update.fuel));
        }
    }
}

#[test]
fn minimise_mean_time_prefers_cheaper_insertion() {
    let _ = env_logger::try_init();
    // One bunched-up queue versus an idle aircraft far away: with p = 1 the
    // idle aircraft wins because it adds no delay to scheduled strikes.
    let strikes = vec![
        mk_strike(0, loc(10.0, 0.0), 0.0, false),
        mk_strike(1, loc(12.0, 0.0), 0.0, false),
        mk_strike(2, loc(11.0, 1.0), 1.0, false),
    ];
    let world = mk_world(
        vec![mk_uav(0, origin(), 400.0, 0.0), mk_uav(1, loc(40.0, 0.0), 400.0, 0.0)],
        vec![],
        vec![],
        strikes,
    );
    let world = run(world, CoordinatorKind::MinimiseMeanTime);
    let mean = world
        .strikes
        .iter()
        .map(|s| s.inspection_time.unwrap() - s.spawn_time)
        .sum::<f64>()
        / world.strikes.len() as f64;

    // Compare against the Simple run of the same setup.
    let strikes = vec![
        mk_strike(0, loc(10.0, 0.0), 0.0, false),
        mk_strike(1, loc(12.0, 0.0), 0.0, false),
        mk_strike(2, loc(11.0, 1.0), 1.0, false),
    ];
    let world = mk_world(
        vec![mk_uav(0, origin(), 400.0, 0.0), mk_uav(1, loc(40.0, 0.0), 400.0, 0.0)],
        vec![],
        vec![],
        strikes,
    );
    let world = run(world, CoordinatorKind::Simple);
    let simple_mean = world
        .strikes
        .iter()
        .map(|s| s.inspection_time.unwrap() - s.spawn_time)
        .sum::<f64>()
        / world.strikes.len() as f64;
    assert!(mean <= simple_mean + 1e-9, "{} vs {}", mean, simple_mean);
}
