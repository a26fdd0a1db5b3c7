use log::{debug, info};

use crate::queue::{EventQueue, FleetKind, QueueItem};
use crate::unassigned::UnassignedController;
use crate::world::World;

/// Policy deciding which UAV inspects a newly spawned strike. Invoked at the
/// strike's spawn time, after all earlier events have run.
pub trait UavCoordinator {
    fn process_new_strike(&mut self, world: &mut World, strike: usize, now: f64);
}

/// Policy deciding which water bomber suppresses an ignition. Invoked at the
/// strike's inspection time.
pub trait WbCoordinator {
    fn process_new_ignition(&mut self, world: &mut World, strike: usize, now: f64);
}

/// Discrete-event driver for one scenario. Time only advances by popping the
/// global queue, so coordinator replanning at time `t` is atomic with respect
/// to every event later than `t`.
pub struct Simulator {
    pub world: World,
    queue: EventQueue,
}

impl Simulator {
    pub fn new(world: World) -> Simulator {
        Simulator { world, queue: EventQueue::new() }
    }

    pub fn run(
        &mut self,
        uav_coordinator: &mut dyn UavCoordinator,
        wb_coordinator: &mut dyn WbCoordinator,
        mut unassigned: Option<&mut UnassignedController>,
    ) {
        let mut pending_spawns = self.world.strikes.len();
        for strike in &self.world.strikes {
            self.queue.push(strike.spawn_time, QueueItem::StrikeSpawn(strike.id));
        }
        if unassigned.is_some() {
            if let Some(first) = self.world.strikes.iter().map(|s| s.spawn_time).reduce(f64::min) {
                self.queue.push(first, QueueItem::ControllerTick);
            }
        }

        while let Some((now, item)) = self.queue.pop() {
            match item {
                QueueItem::StrikeSpawn(s) => {
                    debug!("t={:.2} strike {} spawned", now, s);
                    pending_spawns -= 1;
                    uav_coordinator.process_new_strike(&mut self.world, s, now);
                    self.world.route_home_if_needed(FleetKind::Uav, now);
                    self.world.sync_schedules(&mut self.queue);
                }
                QueueItem::AircraftReady { fleet, idx, version } => {
                    if self.world.aircraft(fleet, idx).version != version {
                        continue; // superseded by a replan
                    }
                    if self.world.aircraft(fleet, idx).queue.is_empty() {
                        continue;
                    }
                    let outcome = self.world.execute_ready(fleet, idx);
                    if let Some(s) = outcome.inspected {
                        if self.world.strikes[s].ignited {
                            debug!("t={:.2} strike {} inspected, ignition found", now, s);
                            wb_coordinator.process_new_ignition(&mut self.world, s, now);
                            self.world.refill_water_if_needed(now);
                            self.world.route_home_if_needed(FleetKind::WaterBomber, now);
                        }
                    }
                    if let Some(tank) = outcome.tank_dry {
                        self.world.handle_tank_dry(idx, tank, now);
                    } else if outcome.partial_refill {
                        self.world.replan_water_degraded(idx, now);
                    }
                    if fleet == FleetKind::WaterBomber {
                        self.world.refill_water_if_needed(now);
                    }
                    self.world.route_home_if_needed(fleet, now);
                    self.world.sync_schedules(&mut self.queue);
                }
                QueueItem::ControllerTick => {
                    if let Some(controller) = unassigned.as_deref_mut() {
                        controller.tick(&mut self.world, now);
                        self.world.route_home_if_needed(FleetKind::Uav, now);
                        self.world.sync_schedules(&mut self.queue);
                        // Ticks stop once the strike stream is exhausted.
                        if pending_spawns > 0 {
                            self.queue.push(now + controller.dt_minutes(), QueueItem::ControllerTick);
                        }
                    }
                }
            }
        }

        let uninspected =
            self.world.strikes.iter().filter(|s| s.inspection_time.is_none()).count();
        let unsuppressed = self
            .world
            .strikes
            .iter()
            .filter(|s| s.ignited && s.suppression_time.is_none())
            .count();
        info!(
            "scenario done: {} strikes, {} uninspected, {} unsuppressed",
            self.world.strikes.len(),
            uninspected,
            unsuppressed
        );
    }
}
