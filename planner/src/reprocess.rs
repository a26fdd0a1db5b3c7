use log::debug;

use firesim_sim::aircraft::EventKind;
use firesim_sim::queue::FleetKind;
use firesim_sim::simulator::{UavCoordinator, WbCoordinator};
use firesim_sim::world::World;
use firesim_structs::config::weighted_time;

use crate::minimise_mean::process_minimise_mean;
use crate::PolicyParams;

/// MinimiseMeanTime, followed by one corrective pass: the scheduled strike
/// with the worst response is pulled out of its plan and re-placed by the
/// same rule. At most one reprocess per new strike, so the run terminates.
pub struct ReprocessMaxTimePolicy {
    params: PolicyParams,
    /// Worst weighted response already reprocessed; only a new maximum
    /// triggers another pull.
    max_seen: f64,
}

impl ReprocessMaxTimePolicy {
    pub fn new(params: PolicyParams) -> ReprocessMaxTimePolicy {
        ReprocessMaxTimePolicy { params, max_seen: 0.0 }
    }

    fn process(&mut self, world: &mut World, fleet: FleetKind, strike: usize, now: f64) {
        process_minimise_mean(world, fleet, &self.params, strike, now);

        // Worst weighted response among everything currently scheduled.
        let mut worst: Option<(usize, usize, usize, f64)> = None;
        for (idx, aircraft) in world.fleet(fleet).iter().enumerate() {
            for (pos, event) in aircraft.queue.iter().enumerate() {
                let s = match event.kind {
                    EventKind::Inspect(s) | EventKind::Suppress(s) => s,
                    _ => continue,
                };
                let base = match fleet {
                    FleetKind::Uav => world.strikes[s].spawn_time,
                    FleetKind::WaterBomber => {
                        world.strikes[s].inspection_time.expect("uninspected ignition scheduled")
                    }
                };
                let w = weighted_time(
                    self.params.prioritisation,
                    event.end_time - base,
                    world.strikes[s].risk(),
                );
                if worst.map(|(_, _, _, bw)| w > bw).unwrap_or(true) {
                    worst = Some((idx, pos, s, w));
                }
            }
        }

        if let Some((idx, pos, s, w)) = worst {
            if w > self.max_seen {
                self.max_seen = w;
                debug!(
                    "reprocessing strike {} (weighted response {:.2}) from {}",
                    s,
                    w,
                    world.aircraft(fleet, idx).name
                );
                let tail = world.aircraft(fleet, idx).stops_from(pos + 1);
                match fleet {
                    FleetKind::Uav => world.uavs[idx].rebuild_queue(
                        pos,
                        &tail,
                        now,
                        &world.strikes,
                        &world.water_tanks,
                    ),
                    FleetKind::WaterBomber => world.water_bombers[idx].rebuild_queue(
                        pos,
                        &tail,
                        now,
                        &world.strikes,
                        &world.water_tanks,
                    ),
                }
                process_minimise_mean(world, fleet, &self.params, s, now);
            }
        }
    }
}

impl UavCoordinator for ReprocessMaxTimePolicy {
    fn process_new_strike(&mut self, world: &mut World, strike: usize, now: f64) {
        self.process(world, FleetKind::Uav, strike, now);
    }
}

impl WbCoordinator for ReprocessMaxTimePolicy {
    fn process_new_ignition(&mut self, world: &mut World, strike: usize, now: f64) {
        self.process(world, FleetKind::WaterBomber, strike, now);
    }
}
