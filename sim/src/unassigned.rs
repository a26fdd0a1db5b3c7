use std::collections::BTreeMap;

use log::debug;

use firesim_structs::config::UnassignedConfig;
use firesim_structs::world::Target;
use firesim_structs::{polygon_contains, Location};

use crate::aircraft::{GotoReason, PlanStop};
use crate::queue::FleetKind;
use crate::world::World;

/// Drives idle UAVs by an attraction/repulsion field inside the patrol
/// polygon. Active only when configured; re-plans every `dt` of simulated
/// time.
pub struct UnassignedController {
    cfg: UnassignedConfig,
    polygon: Vec<Location>,
    targets: Vec<Target>,
    centre: Location,
}

impl UnassignedController {
    pub fn new(cfg: UnassignedConfig, polygon: Vec<Location>, targets: Vec<Target>) -> Self {
        assert!(polygon.len() >= 3, "boundary polygon needs at least 3 vertices");
        let centre = Location::new(cfg.centre_lat, cfg.centre_lon);
        UnassignedController { cfg, polygon, targets, centre }
    }

    pub fn dt_minutes(&self) -> f64 {
        self.cfg.dt / 60.0
    }

    pub fn tick(&mut self, world: &mut World, now: f64) {
        let dt = self.dt_minutes();
        let idle: Vec<(usize, Location)> = world
            .uavs
            .iter()
            .enumerate()
            .filter(|(_, u)| u.is_idle())
            .map(|(i, u)| (i, u.loc))
            .collect();

        let mut targets: Vec<Location> = self
            .targets
            .iter()
            .filter(|t| t.active_at(now))
            .map(|t| t.loc)
            .collect();
        targets.extend(self.forecast_targets(world, now));

        let mut moves: Vec<(usize, Option<PlanStop>)> = Vec::new();
        for &(idx, loc) in &idle {
            let uav = &world.uavs[idx];
            let speed = uav.flight_speed();

            if !polygon_contains(&self.polygon, &loc) {
                // Lost outside the patrol area: head straight for the centre.
                let step_km = (speed * dt).min(loc.distance(&self.centre));
                let frac = if loc.distance(&self.centre) > 0.0 {
                    step_km / loc.distance(&self.centre)
                } else {
                    0.0
                };
                let point = loc.intermediate(&self.centre, frac);
                if self.fuel_ok(world, idx, point, now) {
                    moves.push((idx, Some(PlanStop::Point(point, GotoReason::RecallToCentre))));
                }
                continue;
            }

            let (mut fx, mut fy) = (0.0f64, 0.0f64);
            for t in &targets {
                let r = loc.distance(t);
                if r > 0.0 {
                    let (ex, ey) = loc.local_offset_km(t);
                    let mag = self.cfg.target_attraction_const * r.powf(self.cfg.target_attraction_power);
                    fx += mag * ex / r;
                    fy += mag * ey / r;
                }
            }
            for &(other, other_loc) in &idle {
                if other == idx {
                    continue;
                }
                let r = loc.distance(&other_loc);
                if r > 0.0 {
                    let (ex, ey) = loc.local_offset_km(&other_loc);
                    let mag = self.cfg.uav_repulsion_const * r.powf(self.cfg.uav_repulsion_power);
                    fx -= mag * ex / r;
                    fy -= mag * ey / r;
                }
            }
            if let Some(boundary_point) = self.closest_boundary_point(&loc) {
                let r = loc.distance(&boundary_point);
                if r > 0.0 {
                    let (ex, ey) = loc.local_offset_km(&boundary_point);
                    let mag =
                        self.cfg.boundary_repulsion_const * r.powf(self.cfg.boundary_repulsion_power);
                    fx -= mag * ex / r;
                    fy -= mag * ey / r;
                }
            }

            let step = (fx * dt, fy * dt);
            let step_len = (step.0 * step.0 + step.1 * step.1).sqrt();
            if step_len < 1e-9 {
                continue;
            }
            // Cannot outfly the airframe: clip the step to dt of flight.
            let max_step = speed * dt;
            let scale = if step_len > max_step { max_step / step_len } else { 1.0 };
            let point = loc.offset_km(step.0 * scale, step.1 * scale);

            if !polygon_contains(&self.polygon, &point) {
                // The field points out of bounds; hold position instead.
                moves.push((idx, Some(PlanStop::Hover(now + dt))));
            } else if self.fuel_ok(world, idx, point, now) {
                moves.push((idx, Some(PlanStop::Point(point, GotoReason::FieldStep))));
            }
        }

        for (idx, stop) in moves {
            if let Some(stop) = stop {
                debug!("t={:.2} field step for uav {}: {:?}", now, idx, stop);
                let (strikes, tanks) = (&world.strikes, &world.water_tanks);
                world.uavs[idx].rebuild_queue(0, &[stop], now, strikes, tanks);
            }
        }
    }

    /// Can the UAV make this step and still reach a base above its reserve?
    fn fuel_ok(&self, world: &World, idx: usize, point: Location, now: f64) -> bool {
        let uav = &world.uavs[idx];
        let bases = world.bases_for(FleetKind::Uav, idx);
        let base = match World::nearest_base(bases, &point) {
            Some(b) => b,
            None => return false,
        };
        let stops = [PlanStop::Point(point, GotoReason::FieldStep), PlanStop::Base(base)];
        uav.evaluate_path(uav.state_at_insertion(0, now), &stops, &world.strikes, &world.water_tanks)
            .is_some()
    }

    fn closest_boundary_point(&self, loc: &Location) -> Option<Location> {
        let mut best: Option<(Location, f64)> = None;
        let mut prev = *self.polygon.last()?;
        for &vertex in &self.polygon {
            let candidate = loc.closest_point_on_segment(&prev, &vertex);
            let d = loc.distance(&candidate);
            if best.map(|(_, bd)| d < bd).unwrap_or(true) {
                best = Some((candidate, d));
            }
            prev = vertex;
        }
        best.map(|(p, _)| p)
    }

    /// Grid cells holding enough recent strikes become extra targets for this
    /// tick. Cells are squares of side `radius` km anchored at the centre.
    fn forecast_targets(&self, world: &World, now: f64) -> Vec<Location> {
        let cfg = match &self.cfg.forecasting {
            Some(cfg) => cfg,
            None => return Vec::new(),
        };
        let mut cells: BTreeMap<(i64, i64), usize> = BTreeMap::new();
        for strike in &world.strikes {
            if strike.spawn_time > now || strike.spawn_time < now - cfg.look_ahead {
                continue;
            }
            let (x, y) = self.centre.local_offset_km(&strike.loc);
            let cell = ((x / cfg.radius).floor() as i64, (y / cfg.radius).floor() as i64);
            *cells.entry(cell).or_default() += 1;
        }
        cells
            .into_iter()
            .filter(|(_, count)| *count >= cfg.min_in_target)
            .map(|((cx, cy), _)| {
                self.centre
                    .offset_km((cx as f64 + 0.5) * cfg.radius, (cy as f64 + 0.5) * cfg.radius)
            })
            .collect()
    }
}
