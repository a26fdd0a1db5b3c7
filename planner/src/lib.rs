pub mod candidates;
pub mod insertion;
pub mod minimise_mean;
pub mod reprocess;
pub mod simple;

#[cfg(test)]
mod tests;

use firesim_sim::simulator::{UavCoordinator, WbCoordinator};
use firesim_structs::config::{CoordinatorKind, PrioritisationFunction};

/// Everything a policy needs beyond the world itself. Times are minutes.
#[derive(Debug, Clone)]
pub struct PolicyParams {
    pub mean_time_power: f64,
    /// Soft ceiling on the weighted response time; may be infinite.
    pub target_max_time: f64,
    pub prioritisation: Option<PrioritisationFunction>,
}

impl Default for PolicyParams {
    fn default() -> Self {
        PolicyParams { mean_time_power: 1.0, target_max_time: f64::INFINITY, prioritisation: None }
    }
}

pub fn build_uav_coordinator(
    kind: CoordinatorKind,
    params: PolicyParams,
) -> Box<dyn UavCoordinator> {
    match kind {
        CoordinatorKind::Simple => Box::new(simple::SimplePolicy::new(params)),
        CoordinatorKind::Insertion => Box::new(insertion::InsertionPolicy::new(params)),
        CoordinatorKind::MinimiseMeanTime => {
            Box::new(minimise_mean::MinimiseMeanTimePolicy::new(params))
        }
        CoordinatorKind::ReprocessMaxTime => {
            Box::new(reprocess::ReprocessMaxTimePolicy::new(params))
        }
    }
}

pub fn build_wb_coordinator(
    kind: CoordinatorKind,
    params: PolicyParams,
) -> Box<dyn WbCoordinator> {
    match kind {
        CoordinatorKind::Simple => Box::new(simple::SimplePolicy::new(params)),
        CoordinatorKind::Insertion => Box::new(insertion::InsertionPolicy::new(params)),
        CoordinatorKind::MinimiseMeanTime => {
            Box::new(minimise_mean::MinimiseMeanTimePolicy::new(params))
        }
        CoordinatorKind::ReprocessMaxTime => {
            Box::new(reprocess::ReprocessMaxTimePolicy::new(params))
        }
    }
}
