use std::collections::BTreeMap;

use log::{error, warn};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use firesim_structs::world::{Base, Strike, WaterTank};

use crate::aircraft::{Aircraft, AircraftKind, ExecOutcome, PlanStop};
use crate::queue::{EventQueue, FleetKind, QueueItem};

/// Everything a scenario operates on. Aircraft live in arenas indexed by id;
/// coordinators hold indices, never pointers.
#[derive(Debug)]
pub struct World {
    pub uavs: Vec<Aircraft>,
    pub water_bombers: Vec<Aircraft>,
    pub uav_bases: Vec<Base>,
    /// Admissible bases per water-bomber kind, resolved at load.
    pub wb_bases: BTreeMap<String, Vec<Base>>,
    pub water_tanks: Vec<WaterTank>,
    pub strikes: Vec<Strike>,
    /// Versions already scheduled on the global queue, per fleet.
    scheduled_uav: Vec<Option<u64>>,
    scheduled_wb: Vec<Option<u64>>,
}

impl World {
    pub fn new(
        uavs: Vec<Aircraft>,
        water_bombers: Vec<Aircraft>,
        uav_bases: Vec<Base>,
        wb_bases: BTreeMap<String, Vec<Base>>,
        water_tanks: Vec<WaterTank>,
        strikes: Vec<Strike>,
    ) -> World {
        let scheduled_uav = uavs.iter().map(|_| None).collect();
        let scheduled_wb = water_bombers.iter().map(|_| None).collect();
        World {
            uavs,
            water_bombers,
            uav_bases,
            wb_bases,
            water_tanks,
            strikes,
            scheduled_uav,
            scheduled_wb,
        }
    }

    pub fn fleet(&self, kind: FleetKind) -> &[Aircraft] {
        match kind {
            FleetKind::Uav => &self.uavs,
            FleetKind::WaterBomber => &self.water_bombers,
        }
    }

    pub fn aircraft(&self, kind: FleetKind, idx: usize) -> &Aircraft {
        &self.fleet(kind)[idx]
    }

    /// Bases this aircraft may refuel at.
    pub fn bases_for(&self, kind: FleetKind, idx: usize) -> &[Base] {
        match kind {
            FleetKind::Uav => &self.uav_bases,
            FleetKind::WaterBomber => {
                let name = match &self.water_bombers[idx].kind {
                    AircraftKind::WaterBomber(a) => &a.kind_name,
                    AircraftKind::Uav(_) => unreachable!("UAV in water bomber fleet"),
                };
                &self.wb_bases[name]
            }
        }
    }

    pub fn nearest_base(bases: &[Base], loc: &firesim_structs::Location) -> Option<Base> {
        let locs: Vec<_> = bases.iter().map(|b| b.loc).collect();
        firesim_structs::nearest(&locs, loc).map(|i| bases[i])
    }

    /// Execute the head event of an aircraft's plan.
    pub fn execute_ready(&mut self, kind: FleetKind, idx: usize) -> ExecOutcome {
        let outcome = match kind {
            FleetKind::Uav => self.uavs[idx].execute_next(&mut self.strikes, &mut self.water_tanks),
            FleetKind::WaterBomber => {
                self.water_bombers[idx].execute_next(&mut self.strikes, &mut self.water_tanks)
            }
        };
        // The consumed queue entry is gone; force a re-push of the new head.
        match kind {
            FleetKind::Uav => self.scheduled_uav[idx] = None,
            FleetKind::WaterBomber => self.scheduled_wb[idx] = None,
        }
        outcome
    }

    /// Push one `AircraftReady` entry for every aircraft whose plan changed
    /// since it was last scheduled. Superseded entries are left in the heap
    /// and discarded at pop via the version counter.
    pub fn sync_schedules(&mut self, queue: &mut EventQueue) {
        for (fleet, aircraft, scheduled) in [
            (FleetKind::Uav, &self.uavs, &mut self.scheduled_uav),
            (FleetKind::WaterBomber, &self.water_bombers, &mut self.scheduled_wb),
        ] {
            for (idx, a) in aircraft.iter().enumerate() {
                if let Some(head) = a.queue.front() {
                    if scheduled[idx] != Some(a.version) {
                        queue.push(
                            head.end_time,
                            QueueItem::AircraftReady { fleet, idx, version: a.version },
                        );
                        scheduled[idx] = Some(a.version);
                    }
                }
            }
        }
    }

    /// Send any idle aircraft home to refuel once hovering further would eat
    /// into the `pct_fuel_cutoff` reserve needed to reach a base.
    pub fn route_home_if_needed(&mut self, fleet: FleetKind, now: f64) {
        let n = self.fleet(fleet).len();
        for idx in 0..n {
            let a = self.aircraft(fleet, idx);
            if !a.is_idle() {
                continue;
            }
            let bases = self.bases_for(fleet, idx);
            let base = match Self::nearest_base(bases, &a.loc) {
                Some(b) => b,
                None => continue,
            };
            let trip = a.loc.distance(&base.loc) / a.range_km(a.water);
            if a.status == crate::aircraft::Status::Idle && trip < 1e-12 {
                continue; // already parked at a base
            }
            if a.fuel - trip >= a.pct_fuel_cutoff() + 1e-9 {
                continue; // can keep hovering on the reserve
            }
            if a.fuel < trip {
                error!("{} is stranded: cannot reach any refuel base", a.name);
                continue;
            }
            let (strikes, tanks) = (&self.strikes, &self.water_tanks);
            let stops = [PlanStop::Base(base)];
            match fleet {
                FleetKind::Uav => self.uavs[idx].rebuild_queue(0, &stops, now, strikes, tanks),
                FleetKind::WaterBomber => {
                    self.water_bombers[idx].rebuild_queue(0, &stops, now, strikes, tanks)
                }
            }
        }
    }

    /// Idle bombers that cannot cover another suppression fill up at the best
    /// reachable tank, or head home for fuel if no tank works out.
    pub fn refill_water_if_needed(&mut self, now: f64) {
        for idx in 0..self.water_bombers.len() {
            let a = &self.water_bombers[idx];
            if !a.is_idle() {
                continue;
            }
            let attrs = match a.wb_attributes() {
                Some(attrs) => attrs.clone(),
                None => continue,
            };
            if a.water + 1e-9 >= attrs.water_per_suppression {
                continue;
            }
            let bases = self.bases_for(FleetKind::WaterBomber, idx);
            let mut best: Option<(usize, f64)> = None;
            for tank in &self.water_tanks {
                if tank.level + 1e-9 < attrs.water_capacity - a.water {
                    continue;
                }
                let base = match Self::nearest_base(bases, &tank.loc) {
                    Some(b) => b,
                    None => continue,
                };
                let start = a.state_after_queue(now);
                let stops = [PlanStop::Tank(tank.id), PlanStop::Base(base)];
                if a.evaluate_path(start, &stops, &self.strikes, &self.water_tanks).is_none() {
                    continue;
                }
                let d = a.loc.distance(&tank.loc);
                if best.map(|(_, bd)| d < bd).unwrap_or(true) {
                    best = Some((tank.id, d));
                }
            }
            let stops = match best {
                Some((tank, _)) => vec![PlanStop::Tank(tank)],
                None => match Self::nearest_base(bases, &a.loc) {
                    // No water anywhere in reach: no point hovering, go refuel.
                    // Unless already topped up at that base, which would just
                    // spin on refuel events.
                    Some(b) if a.loc.distance(&b.loc) > 1e-9 || a.fuel < 1.0 - 1e-9 => {
                        vec![PlanStop::Base(b)]
                    }
                    _ => continue,
                },
            };
            let (strikes, tanks) = (&self.strikes, &self.water_tanks);
            self.water_bombers[idx].rebuild_queue(0, &stops, now, strikes, tanks);
        }
    }

    /// A refill came up short of the planned load: re-check the rest of the
    /// plan against the water actually on board, shedding suppressions that
    /// no longer fit.
    pub fn replan_water_degraded(&mut self, idx: usize, now: f64) {
        let mut remaining = self.water_bombers[idx].stops_from(0);
        loop {
            let a = &self.water_bombers[idx];
            let start = crate::aircraft::LegState {
                loc: a.loc,
                time: a.time.max(now),
                fuel: a.fuel,
                water: a.water,
            };
            if a.evaluate_path(start, &remaining, &self.strikes, &self.water_tanks).is_some() {
                break;
            }
            match remaining.iter().position(|s| matches!(s, PlanStop::Strike(_))) {
                Some(pos) => {
                    if let PlanStop::Strike(s) = remaining.remove(pos) {
                        warn!("strike {} could not be suppressed: not enough water on board", s);
                    }
                }
                None => break,
            }
        }
        let (strikes, tanks) = (&self.strikes, &self.water_tanks);
        self.water_bombers[idx].rebuild_queue(0, &remaining, now, strikes, tanks);
    }

    /// A bomber arrived at `dry_tank` and found too little water for even one
    /// suppression. Re-route to the next-nearest useful tank; times slide
    /// forward with the rebuilt plan. Strikes that can no longer be reached
    /// with water are dropped as unsuppressed.
    pub fn handle_tank_dry(&mut self, idx: usize, dry_tank: usize, now: f64) {
        let a = &self.water_bombers[idx];
        let attrs = a.wb_attributes().expect("tank refill on a UAV").clone();
        warn!("{}: tank {} is dry, re-routing", a.name, dry_tank);
        let mut remaining = a.stops_from(0);

        loop {
            let a = &self.water_bombers[idx];
            let mut candidate_tanks: Vec<(usize, f64)> = self
                .water_tanks
                .iter()
                .filter(|t| t.id != dry_tank && t.level > 1e-9)
                .filter(|t| a.water + t.level.min(attrs.water_capacity - a.water)
                    + 1e-9 >= attrs.water_per_suppression)
                .map(|t| (t.id, a.loc.distance(&t.loc)))
                .collect();
            candidate_tanks.sort_by(|x, y| x.1.partial_cmp(&y.1).unwrap().then(x.0.cmp(&y.0)));

            let start = crate::aircraft::LegState {
                loc: a.loc,
                time: a.time.max(now),
                fuel: a.fuel,
                water: a.water,
            };
            let chosen = candidate_tanks
                .iter()
                .find(|(t, _)| {
                    let mut stops = vec![PlanStop::Tank(*t)];
                    stops.extend(remaining.iter().copied());
                    a.evaluate_path(start, &stops, &self.strikes, &self.water_tanks).is_some()
                })
                .copied();

            if let Some((tank, _)) = chosen {
                let mut stops = vec![PlanStop::Tank(tank)];
                stops.extend(remaining.iter().copied());
                let (strikes, tanks) = (&self.strikes, &self.water_tanks);
                self.water_bombers[idx].rebuild_queue(0, &stops, now, strikes, tanks);
                return;
            }

            // No tank fits this plan; give up on its next suppression.
            match remaining.iter().position(|s| matches!(s, PlanStop::Strike(_))) {
                Some(pos) => {
                    if let PlanStop::Strike(s) = remaining.remove(pos) {
                        warn!("strike {} could not be suppressed: no water available", s);
                    }
                }
                None => {
                    // Nothing left that needs water; drop the refill entirely.
                    let (strikes, tanks) = (&self.strikes, &self.water_tanks);
                    let stops = remaining.clone();
                    self.water_bombers[idx].rebuild_queue(0, &stops, now, strikes, tanks);
                    return;
                }
            }
        }
    }
}

/// Resolve each strike's ignition flag: an explicit outcome wins, otherwise a
/// Bernoulli draw from the override or global probability. The PRNG is
/// seeded per scenario so replays are reproducible.
pub fn assign_ignitions(
    strikes: &mut [Strike],
    explicit: &[Option<bool>],
    global_probability: f64,
    rng: &mut ChaCha8Rng,
) {
    assert_eq!(strikes.len(), explicit.len());
    for (strike, given) in strikes.iter_mut().zip(explicit) {
        strike.ignited = match given {
            Some(flag) => *flag,
            None => {
                let p = strike.ignition_probability.unwrap_or(global_probability);
                rng.gen::<f64>() < p
            }
        };
    }
}
