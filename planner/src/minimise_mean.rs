use log::{debug, error};
use ordered_float::OrderedFloat;

use firesim_sim::queue::FleetKind;
use firesim_sim::simulator::{UavCoordinator, WbCoordinator};
use firesim_sim::world::World;

use crate::candidates::{all_candidates, apply};
use crate::PolicyParams;

/// Chooses the feasible placement minimising `Σ Δ(w·resp)^p`. The target
/// maximum response time is a soft ceiling: placements that keep every
/// touched response under it dominate those that do not.
pub struct MinimiseMeanTimePolicy {
    params: PolicyParams,
}

impl MinimiseMeanTimePolicy {
    pub fn new(params: PolicyParams) -> MinimiseMeanTimePolicy {
        MinimiseMeanTimePolicy { params }
    }
}

/// Returns true if the strike was assigned somewhere.
pub(crate) fn process_minimise_mean(
    world: &mut World,
    fleet: FleetKind,
    params: &PolicyParams,
    strike: usize,
    now: f64,
) -> bool {
    let candidates = all_candidates(world, fleet, params, strike, now, true);
    let within_target = candidates
        .iter()
        .filter(|c| c.worst <= params.target_max_time)
        .min_by_key(|c| OrderedFloat(c.cost_mean));
    let chosen =
        within_target.or_else(|| candidates.iter().min_by_key(|c| OrderedFloat(c.cost_mean)));
    match chosen {
        Some(best) => {
            debug!(
                "strike {}: placed on {} (cost {:.3}, worst {:.2})",
                strike,
                world.aircraft(fleet, best.aircraft).name,
                best.cost_mean,
                best.worst
            );
            apply(world, fleet, best, now);
            true
        }
        None => {
            match fleet {
                FleetKind::Uav => {
                    error!("no UAV could reach strike {}; it will not be inspected", strike)
                }
                FleetKind::WaterBomber => error!(
                    "no water bomber could reach strike {}; it will not be suppressed",
                    strike
                ),
            }
            false
        }
    }
}

impl UavCoordinator for MinimiseMeanTimePolicy {
    fn process_new_strike(&mut self, world: &mut World, strike: usize, now: f64) {
        process_minimise_mean(world, FleetKind::Uav, &self.params, strike, now);
    }
}

impl WbCoordinator for MinimiseMeanTimePolicy {
    fn process_new_ignition(&mut self, world: &mut World, strike: usize, now: f64) {
        process_minimise_mean(world, FleetKind::WaterBomber, &self.params, strike, now);
    }
}
