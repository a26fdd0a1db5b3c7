use log::{debug, error};
use ordered_float::OrderedFloat;

use firesim_sim::queue::FleetKind;
use firesim_sim::simulator::{UavCoordinator, WbCoordinator};
use firesim_sim::world::World;

use crate::candidates::{all_candidates, apply};
use crate::PolicyParams;

/// Appends each strike to the tail of whichever aircraft gets there first,
/// inserting a refuel or rearm stop just in time when needed.
pub struct SimplePolicy {
    params: PolicyParams,
}

impl SimplePolicy {
    pub fn new(params: PolicyParams) -> SimplePolicy {
        SimplePolicy { params }
    }
}

pub(crate) fn process_simple(
    world: &mut World,
    fleet: FleetKind,
    params: &PolicyParams,
    strike: usize,
    now: f64,
) {
    let candidates = all_candidates(world, fleet, params, strike, now, false);
    match candidates.iter().min_by_key(|c| OrderedFloat(c.arrival)) {
        Some(best) => {
            debug!(
                "strike {}: assigned to {} arriving t={:.2}",
                strike,
                world.aircraft(fleet, best.aircraft).name,
                best.arrival
            );
            apply(world, fleet, best, now);
        }
        None => match fleet {
            FleetKind::Uav => {
                error!("no UAV could reach strike {}; it will not be inspected", strike)
            }
            FleetKind::WaterBomber => {
                error!("no water bomber could reach strike {}; it will not be suppressed", strike)
            }
        },
    }
}

impl UavCoordinator for SimplePolicy {
    fn process_new_strike(&mut self, world: &mut World, strike: usize, now: f64) {
        process_simple(world, FleetKind::Uav, &self.params, strike, now);
    }
}

impl WbCoordinator for SimplePolicy {
    fn process_new_ignition(&mut self, world: &mut World, strike: usize, now: f64) {
        process_simple(world, FleetKind::WaterBomber, &self.params, strike, now);
    }
}
