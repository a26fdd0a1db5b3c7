//! Shared placement machinery: every policy scores the same candidate set,
//! they only differ in which candidates they consider and how they rank them.

use firesim_sim::aircraft::{EventKind, PlanStop};
use firesim_sim::queue::FleetKind;
use firesim_sim::world::World;
use firesim_structs::config::weighted_time;
use firesim_structs::world::Base;

use crate::PolicyParams;

/// A feasible placement of a new strike into one aircraft's plan: keep the
/// first `keep` events and replace the rest with `stops`.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub aircraft: usize,
    pub keep: usize,
    pub stops: Vec<PlanStop>,
    /// Completion time of the new strike's service.
    pub arrival: f64,
    /// Total slip added to already-scheduled strikes.
    pub delay_sum: f64,
    /// Worst weighted response among the strikes this placement touches.
    pub worst: f64,
    /// `Σ Δ(w·resp)^p + (w·resp_new)^p`, the MinimiseMeanTime objective.
    pub cost_mean: f64,
}

/// The reference point responses are measured from: spawn for inspections,
/// inspection for suppressions.
fn response_base(world: &World, fleet: FleetKind, strike: usize) -> f64 {
    match fleet {
        FleetKind::Uav => world.strikes[strike].spawn_time,
        FleetKind::WaterBomber => world.strikes[strike]
            .inspection_time
            .expect("suppression planned before inspection"),
    }
}

fn weighted_response(
    world: &World,
    fleet: FleetKind,
    params: &PolicyParams,
    strike: usize,
    completion: f64,
) -> f64 {
    let resp = completion - response_base(world, fleet, strike);
    weighted_time(params.prioritisation, resp, world.strikes[strike].risk())
}

/// Closing leg appended to every candidate so that the plan always ends
/// within reach of a refuel base; it is evaluated but never enqueued.
fn closing_base(world: &World, fleet: FleetKind, idx: usize, stops: &[PlanStop]) -> Option<Base> {
    let last = stops.last()?;
    let loc = match last {
        PlanStop::Base(_) => return None,
        PlanStop::Strike(s) => world.strikes[*s].loc,
        PlanStop::Tank(t) => world.water_tanks[*t].loc,
        PlanStop::Point(loc, _) => *loc,
        PlanStop::Hover(_) => return None,
    };
    World::nearest_base(world.bases_for(fleet, idx), &loc)
}

fn evaluate(
    world: &World,
    fleet: FleetKind,
    params: &PolicyParams,
    strike: usize,
    idx: usize,
    keep: usize,
    stops: Vec<PlanStop>,
    now: f64,
) -> Option<Candidate> {
    let aircraft = world.aircraft(fleet, idx);
    let start = aircraft.state_at_insertion(keep, now);

    let mut full = stops.clone();
    if let Some(base) = closing_base(world, fleet, idx, &stops) {
        full.push(PlanStop::Base(base));
    }
    let eval = aircraft.evaluate_path(start, &full, &world.strikes, &world.water_tanks)?;

    // Old completion times of the strikes that get pushed back, aligned with
    // their position among the replacement stops.
    let old_completions: Vec<(usize, usize, f64)> = aircraft
        .queue
        .iter()
        .skip(keep)
        .filter(|e| !matches!(e.kind, EventKind::Hover))
        .enumerate()
        .filter_map(|(j, e)| match e.kind {
            EventKind::Inspect(s) | EventKind::Suppress(s) => Some((j, s, e.end_time)),
            _ => None,
        })
        .collect();

    let strike_pos = stops
        .iter()
        .position(|s| matches!(s, PlanStop::Strike(x) if *x == strike))
        .expect("candidate without the new strike");
    let arrival = eval.times[strike_pos];

    let new_weighted = weighted_response(world, fleet, params, strike, arrival);
    let mut delay_sum = 0.0;
    let mut worst = new_weighted;
    let mut cost_mean = new_weighted.powf(params.mean_time_power);
    // The suffix stops sit right after the inserted strike.
    let suffix_offset = strike_pos + 1;
    for (j, s, old_end) in old_completions {
        let new_end = eval.times[suffix_offset + j];
        delay_sum += new_end - old_end;
        let w_new = weighted_response(world, fleet, params, s, new_end);
        let w_old = weighted_response(world, fleet, params, s, old_end);
        worst = worst.max(w_new);
        cost_mean += w_new.powf(params.mean_time_power) - w_old.powf(params.mean_time_power);
    }

    Some(Candidate { aircraft: idx, keep, stops, arrival, delay_sum, worst, cost_mean })
}

/// Append-at-tail candidates, with just-in-time refuel (and, for bombers,
/// rearm) stops when the direct run is infeasible.
pub fn tail_candidates(
    world: &World,
    fleet: FleetKind,
    params: &PolicyParams,
    strike: usize,
    idx: usize,
    now: f64,
    out: &mut Vec<Candidate>,
) {
    let aircraft = world.aircraft(fleet, idx);
    let keep = aircraft.queue.len();
    let bases = world.bases_for(fleet, idx).to_vec();

    let has_water = match aircraft.wb_attributes() {
        Some(attrs) => aircraft.state_after_queue(now).water + 1e-9 >= attrs.water_per_suppression,
        None => true,
    };

    if has_water {
        if let Some(c) =
            evaluate(world, fleet, params, strike, idx, keep, vec![PlanStop::Strike(strike)], now)
        {
            out.push(c);
            return;
        }
        // Out of range without a top-up: try going via each refuel base.
        for base in &bases {
            if let Some(c) = evaluate(
                world,
                fleet,
                params,
                strike,
                idx,
                keep,
                vec![PlanStop::Base(*base), PlanStop::Strike(strike)],
                now,
            ) {
                out.push(c);
            }
        }
        return;
    }

    // Dry bomber: rearm at a tank on the way, with a refuel thrown in when
    // the tank alone does not work out.
    let mut direct_tank = false;
    for tank in &world.water_tanks {
        if let Some(c) = evaluate(
            world,
            fleet,
            params,
            strike,
            idx,
            keep,
            vec![PlanStop::Tank(tank.id), PlanStop::Strike(strike)],
            now,
        ) {
            out.push(c);
            direct_tank = true;
        }
    }
    if direct_tank {
        return;
    }
    for tank in &world.water_tanks {
        for base in &bases {
            for stops in [
                vec![PlanStop::Tank(tank.id), PlanStop::Base(*base), PlanStop::Strike(strike)],
                vec![PlanStop::Base(*base), PlanStop::Tank(tank.id), PlanStop::Strike(strike)],
            ] {
                if let Some(c) = evaluate(world, fleet, params, strike, idx, keep, stops, now) {
                    out.push(c);
                }
            }
        }
    }
}

/// Candidates that place the strike before each not-yet-started queue entry,
/// keeping the remainder of the plan in order.
pub fn insertion_candidates(
    world: &World,
    fleet: FleetKind,
    params: &PolicyParams,
    strike: usize,
    idx: usize,
    now: f64,
    out: &mut Vec<Candidate>,
) {
    let aircraft = world.aircraft(fleet, idx);
    for k in 0..aircraft.queue.len() {
        let mut stops = vec![PlanStop::Strike(strike)];
        stops.extend(aircraft.stops_from(k));
        if let Some(c) = evaluate(world, fleet, params, strike, idx, k, stops, now) {
            out.push(c);
        }
    }
}

pub fn all_candidates(
    world: &World,
    fleet: FleetKind,
    params: &PolicyParams,
    strike: usize,
    now: f64,
    include_insertions: bool,
) -> Vec<Candidate> {
    let mut out = Vec::new();
    for idx in 0..world.fleet(fleet).len() {
        if include_insertions {
            insertion_candidates(world, fleet, params, strike, idx, now, &mut out);
        }
        tail_candidates(world, fleet, params, strike, idx, now, &mut out);
    }
    out
}

/// Commit a candidate to its aircraft's plan.
pub fn apply(world: &mut World, fleet: FleetKind, candidate: &Candidate, now: f64) {
    match fleet {
        FleetKind::Uav => {
            world.uavs[candidate.aircraft].rebuild_queue(
                candidate.keep,
                &candidate.stops,
                now,
                &world.strikes,
                &world.water_tanks,
            );
        }
        FleetKind::WaterBomber => {
            world.water_bombers[candidate.aircraft].rebuild_queue(
                candidate.keep,
                &candidate.stops,
                now,
                &world.strikes,
                &world.water_tanks,
            );
        }
    }
}
