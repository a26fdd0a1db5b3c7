use log::{debug, error};
use ordered_float::OrderedFloat;

use firesim_sim::queue::FleetKind;
use firesim_sim::simulator::{UavCoordinator, WbCoordinator};
use firesim_sim::world::World;

use crate::candidates::{all_candidates, apply};
use crate::PolicyParams;

/// Considers every position within every aircraft's plan for the new strike
/// and takes the one that serves it soonest; ties fall to the placement that
/// delays the already-scheduled strikes least, then to the lowest aircraft id.
pub struct InsertionPolicy {
    params: PolicyParams,
}

impl InsertionPolicy {
    pub fn new(params: PolicyParams) -> InsertionPolicy {
        InsertionPolicy { params }
    }
}

pub(crate) fn process_insertion(
    world: &mut World,
    fleet: FleetKind,
    params: &PolicyParams,
    strike: usize,
    now: f64,
) {
    let candidates = all_candidates(world, fleet, params, strike, now, true);
    match candidates
        .iter()
        .min_by_key(|c| (OrderedFloat(c.arrival), OrderedFloat(c.delay_sum), c.aircraft))
    {
        Some(best) => {
            debug!(
                "strike {}: inserted into {} at {} arriving t={:.2}",
                strike,
                world.aircraft(fleet, best.aircraft).name,
                best.keep,
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

impl UavCoordinator for InsertionPolicy {
    fn process_new_strike(&mut self, world: &mut World, strike: usize, now: f64) {
        process_insertion(world, FleetKind::Uav, &self.params, strike, now);
    }
}

impl WbCoordinator for InsertionPolicy {
    fn process_new_ignition(&mut self, world: &mut World, strike: usize, now: f64) {
        process_insertion(world, FleetKind::WaterBomber, &self.params, strike, now);
    }
}
