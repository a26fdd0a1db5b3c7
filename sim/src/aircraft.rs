use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tinyvec::TinyVec;

use firesim_structs::world::{Base, Strike, WaterTank};
use firesim_structs::Location;

const FUEL_EPS: f64 = 1e-9;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UavAttributes {
    /// km/min.
    pub flight_speed: f64,
    /// Minutes.
    pub fuel_refill_time: f64,
    /// km on a full tank.
    pub range: f64,
    /// Minutes spent over a strike.
    pub inspection_time: f64,
    pub pct_fuel_cutoff: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WbAttributes {
    pub kind_name: String,
    pub flight_speed: f64,
    pub fuel_refill_time: f64,
    pub suppression_time: f64,
    pub water_refill_time: f64,
    pub water_per_suppression: f64,
    pub range_empty: f64,
    pub range_under_load: f64,
    pub water_capacity: f64,
    pub pct_fuel_cutoff: f64,
}

/// Kind-specific attribute bundle; the state machine itself is shared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AircraftKind {
    Uav(UavAttributes),
    WaterBomber(WbAttributes),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Idle,
    Travelling,
    Inspecting,
    Suppressing,
    Refuelling,
    RefillingWater,
    Hovering,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Idle => "idle",
            Status::Travelling => "travelling",
            Status::Inspecting => "inspecting",
            Status::Suppressing => "suppressing",
            Status::Refuelling => "refuelling",
            Status::RefillingWater => "refilling water",
            Status::Hovering => "hovering",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GotoReason {
    FieldStep,
    RecallToCentre,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    GoTo(GotoReason),
    Inspect(usize),
    Suppress(usize),
    RefuelAt(usize),
    RefillWaterAt(usize),
    Hover,
}

/// One entry of an aircraft's plan. The aircraft flies from wherever the
/// previous event left it to `loc`, performs the event, and is done at
/// `end_time` with the recorded end state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlannedEvent {
    pub kind: EventKind,
    pub loc: Location,
    pub start_time: f64,
    pub end_time: f64,
    pub end_fuel: f64,
    pub end_water: f64,
}

/// A stop considered during planning; maps to exactly one queue event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlanStop {
    Strike(usize),
    Base(Base),
    Tank(usize),
    Point(Location, GotoReason),
    Hover(f64),
}

impl Default for PlanStop {
    fn default() -> Self {
        PlanStop::Hover(0.0)
    }
}

/// Aircraft state at a given point of a (hypothetical) plan.
#[derive(Debug, Clone, Copy)]
pub struct LegState {
    pub loc: Location,
    pub time: f64,
    pub fuel: f64,
    pub water: f64,
}

#[derive(Debug, Clone)]
pub struct PathEval {
    /// Completion time of each stop, in order.
    pub times: TinyVec<[f64; 8]>,
    pub end: LegState,
}

/// Append-only observable log record, one per executed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateEvent {
    pub name: String,
    pub loc: Location,
    pub time: f64,
    pub status: Status,
    pub distance_travelled: f64,
    pub distance_hovered: f64,
    pub fuel: f64,
    pub current_range: f64,
    pub water: f64,
    pub next_events: String,
}

#[derive(Debug, Default)]
pub struct ExecOutcome {
    pub inspected: Option<usize>,
    pub suppressed: Option<usize>,
    /// Tank that could not supply a useful refill; the plan must re-route.
    pub tank_dry: Option<usize>,
    /// The tank held less than planned; downstream water figures are stale
    /// and the rest of the plan needs a re-check.
    pub partial_refill: bool,
}

#[derive(Debug)]
pub struct Aircraft {
    pub id: usize,
    pub name: String,
    pub kind: AircraftKind,
    pub loc: Location,
    pub fuel: f64,
    /// Litres on board; zero for UAVs.
    pub water: f64,
    /// Simulated time the state above corresponds to.
    pub time: f64,
    pub status: Status,
    pub queue: VecDeque<PlannedEvent>,
    /// Bumped on every replan; stale queue entries are discarded at pop.
    pub version: u64,
    pub idle_since: f64,
    pub log: Vec<UpdateEvent>,
    pub strikes_suppressed: Vec<usize>,
}

impl Aircraft {
    pub fn new(
        id: usize,
        kind: AircraftKind,
        loc: Location,
        starting_at_base: bool,
        initial_fuel: f64,
    ) -> Aircraft {
        assert!((0.0..=1.0).contains(&initial_fuel));
        let name = match &kind {
            AircraftKind::Uav(_) => format!("uav {}", id),
            AircraftKind::WaterBomber(a) => format!("{} {}", a.kind_name, id),
        };
        let water = match &kind {
            AircraftKind::Uav(_) => 0.0,
            AircraftKind::WaterBomber(a) => a.water_capacity,
        };
        let status = if starting_at_base { Status::Idle } else { Status::Hovering };
        let mut aircraft = Aircraft {
            id,
            name,
            kind,
            loc,
            fuel: initial_fuel,
            water,
            time: 0.0,
            status,
            queue: VecDeque::new(),
            version: 0,
            idle_since: 0.0,
            log: Vec::new(),
            strikes_suppressed: Vec::new(),
        };
        aircraft.push_log(0.0, status, 0.0, 0.0);
        aircraft
    }

    pub fn flight_speed(&self) -> f64 {
        match &self.kind {
            AircraftKind::Uav(a) => a.flight_speed,
            AircraftKind::WaterBomber(a) => a.flight_speed,
        }
    }

    pub fn fuel_refill_time(&self) -> f64 {
        match &self.kind {
            AircraftKind::Uav(a) => a.fuel_refill_time,
            AircraftKind::WaterBomber(a) => a.fuel_refill_time,
        }
    }

    pub fn service_time(&self) -> f64 {
        match &self.kind {
            AircraftKind::Uav(a) => a.inspection_time,
            AircraftKind::WaterBomber(a) => a.suppression_time,
        }
    }

    pub fn pct_fuel_cutoff(&self) -> f64 {
        match &self.kind {
            AircraftKind::Uav(a) => a.pct_fuel_cutoff,
            AircraftKind::WaterBomber(a) => a.pct_fuel_cutoff,
        }
    }

    /// Full-tank range in km given the water load carried.
    pub fn range_km(&self, water: f64) -> f64 {
        match &self.kind {
            AircraftKind::Uav(a) => a.range,
            AircraftKind::WaterBomber(a) => {
                (a.range_under_load - a.range_empty) * (water / a.water_capacity) + a.range_empty
            }
        }
    }

    pub fn wb_attributes(&self) -> Option<&WbAttributes> {
        match &self.kind {
            AircraftKind::Uav(_) => None,
            AircraftKind::WaterBomber(a) => Some(a),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    /// State the aircraft will be in once its whole plan has run, no earlier
    /// than `now`. Hovering while idle is free.
    pub fn state_after_queue(&self, now: f64) -> LegState {
        match self.queue.back() {
            Some(e) => LegState {
                loc: e.loc,
                time: e.end_time.max(now),
                fuel: e.end_fuel,
                water: e.end_water,
            },
            None => LegState {
                loc: self.loc,
                time: self.time.max(now),
                fuel: self.fuel,
                water: self.water,
            },
        }
    }

    /// State just before queue position `k` (`k == 0` is the current state).
    pub fn state_at_insertion(&self, k: usize, now: f64) -> LegState {
        if k == 0 {
            LegState {
                loc: self.loc,
                time: self.time.max(now),
                fuel: self.fuel,
                water: self.water,
            }
        } else {
            let e = &self.queue[k - 1];
            LegState { loc: e.loc, time: e.end_time, fuel: e.end_fuel, water: e.end_water }
        }
    }

    /// Walk a hypothetical plan from `start` through `stops`. Returns the
    /// completion time of every stop, or None if the fuel reserve dips below
    /// `pct_fuel_cutoff`, a suppression runs out of water, or a tank cannot
    /// provide a full refill.
    pub fn evaluate_path(
        &self,
        start: LegState,
        stops: &[PlanStop],
        strikes: &[Strike],
        tanks: &[WaterTank],
    ) -> Option<PathEval> {
        let cutoff = self.pct_fuel_cutoff();
        let mut state = start;
        let mut times: TinyVec<[f64; 8]> = TinyVec::new();
        for stop in stops {
            let target = match stop {
                PlanStop::Strike(s) => strikes[*s].loc,
                PlanStop::Base(b) => b.loc,
                PlanStop::Tank(t) => tanks[*t].loc,
                PlanStop::Point(loc, _) => *loc,
                PlanStop::Hover(_) => state.loc,
            };
            let dist = state.loc.distance(&target);
            state.fuel -= dist / self.range_km(state.water);
            if state.fuel < cutoff - FUEL_EPS {
                return None;
            }
            state.time += dist / self.flight_speed();
            state.loc = target;
            match stop {
                PlanStop::Strike(_) => {
                    if let AircraftKind::WaterBomber(a) = &self.kind {
                        state.water -= a.water_per_suppression;
                        if state.water < -FUEL_EPS {
                            return None;
                        }
                    }
                    state.time += self.service_time();
                }
                PlanStop::Base(_) => {
                    state.fuel = 1.0;
                    state.time += self.fuel_refill_time();
                }
                PlanStop::Tank(t) => {
                    let a = self.wb_attributes().expect("UAVs do not refill water");
                    let need = a.water_capacity - state.water;
                    if tanks[*t].level + FUEL_EPS < need {
                        return None;
                    }
                    state.water = a.water_capacity;
                    state.time += a.water_refill_time;
                }
                PlanStop::Point(_, _) => {}
                PlanStop::Hover(until) => {
                    state.time = state.time.max(*until);
                }
            }
            times.push(state.time);
        }
        Some(PathEval { times, end: state })
    }

    /// Replace the queue after `keep` retained events with `stops`, recomputed
    /// from the retained state. Supersedes any scheduled pop via the version
    /// counter.
    pub fn rebuild_queue(
        &mut self,
        keep: usize,
        stops: &[PlanStop],
        now: f64,
        strikes: &[Strike],
        tanks: &[WaterTank],
    ) {
        assert!(keep <= self.queue.len());
        self.queue.truncate(keep);
        let mut state = self.state_at_insertion(keep, now);
        for stop in stops {
            let (kind, target, service) = match stop {
                PlanStop::Strike(s) => match &self.kind {
                    AircraftKind::Uav(_) => (EventKind::Inspect(*s), strikes[*s].loc, self.service_time()),
                    AircraftKind::WaterBomber(_) => {
                        (EventKind::Suppress(*s), strikes[*s].loc, self.service_time())
                    }
                },
                PlanStop::Base(b) => (EventKind::RefuelAt(b.id), b.loc, self.fuel_refill_time()),
                PlanStop::Tank(t) => (
                    EventKind::RefillWaterAt(*t),
                    tanks[*t].loc,
                    self.wb_attributes().expect("UAVs do not refill water").water_refill_time,
                ),
                PlanStop::Point(loc, reason) => (EventKind::GoTo(*reason), *loc, 0.0),
                PlanStop::Hover(_) => (EventKind::Hover, state.loc, 0.0),
            };
            let dist = state.loc.distance(&target);
            let start_time = state.time;
            state.fuel -= dist / self.range_km(state.water);
            state.time += dist / self.flight_speed() + service;
            state.loc = target;
            match kind {
                EventKind::Suppress(_) => {
                    let a = self.wb_attributes().expect("suppress on a UAV");
                    state.water -= a.water_per_suppression;
                }
                EventKind::RefuelAt(_) => state.fuel = 1.0,
                EventKind::RefillWaterAt(_) => {
                    state.water = self.wb_attributes().unwrap().water_capacity;
                }
                EventKind::Hover => {
                    if let PlanStop::Hover(until) = stop {
                        state.time = state.time.max(*until);
                    }
                }
                _ => {}
            }
            assert!(state.fuel >= -FUEL_EPS, "{}: infeasible plan committed", self.name);
            self.queue.push_back(PlannedEvent {
                kind,
                loc: target,
                start_time,
                end_time: state.time,
                end_fuel: state.fuel,
                end_water: state.water,
            });
        }
        for pair in self.queue.iter().zip(self.queue.iter().skip(1)) {
            assert!(pair.0.end_time <= pair.1.end_time + FUEL_EPS);
        }
        self.version += 1;
    }

    /// The plan tail from position `k` onwards, expressed as stops so it can
    /// be re-planned. Hover padding is dropped.
    pub fn stops_from(&self, k: usize) -> Vec<PlanStop> {
        self.queue
            .iter()
            .skip(k)
            .filter_map(|e| match e.kind {
                EventKind::Inspect(s) | EventKind::Suppress(s) => Some(PlanStop::Strike(s)),
                EventKind::RefuelAt(b) => Some(PlanStop::Base(Base { id: b, loc: e.loc })),
                EventKind::RefillWaterAt(t) => Some(PlanStop::Tank(t)),
                EventKind::GoTo(reason) => Some(PlanStop::Point(e.loc, reason)),
                EventKind::Hover => None,
            })
            .collect()
    }

    /// Execute the head event of the queue. The caller has already checked
    /// the version; the queue must be non-empty.
    pub fn execute_next(
        &mut self,
        strikes: &mut [Strike],
        tanks: &mut [WaterTank],
    ) -> ExecOutcome {
        let event = self.queue.pop_front().expect("execute_next on an empty queue");
        let mut outcome = ExecOutcome::default();

        // Any gap before departure was spent hovering (fuel-free).
        let hover_gap = (event.start_time - self.time).max(0.0);
        let mut hovered =
            if self.status == Status::Hovering { hover_gap * self.flight_speed() } else { 0.0 };
        if let EventKind::Hover = event.kind {
            hovered += (event.end_time - event.start_time) * self.flight_speed();
        }

        let dist = self.loc.distance(&event.loc);
        let travel_fuel = dist / self.range_km(self.water);

        assert!((0.0..=1.0 + FUEL_EPS).contains(&self.fuel), "{}: fuel out of bounds", self.name);

        let status = match event.kind {
            EventKind::GoTo(_) => Status::Travelling,
            EventKind::Inspect(_) => Status::Inspecting,
            EventKind::Suppress(_) => Status::Suppressing,
            EventKind::RefuelAt(_) => Status::Refuelling,
            EventKind::RefillWaterAt(_) => Status::RefillingWater,
            EventKind::Hover => Status::Hovering,
        };

        match event.kind {
            EventKind::Inspect(s) => {
                self.apply_leg(&event, travel_fuel);
                strikes[s].inspected(self.time);
                outcome.inspected = Some(s);
            }
            EventKind::Suppress(s) => {
                let per_suppression =
                    self.wb_attributes().expect("suppress on a UAV").water_per_suppression;
                assert!(
                    self.water + FUEL_EPS >= per_suppression,
                    "{}: arrived at strike {} without water",
                    self.name,
                    s
                );
                self.apply_leg(&event, travel_fuel);
                self.water = (self.water - per_suppression).max(0.0);
                strikes[s].suppressed(self.time);
                self.strikes_suppressed.push(s);
                outcome.suppressed = Some(s);
            }
            EventKind::RefuelAt(_) => {
                self.apply_leg(&event, travel_fuel);
            }
            EventKind::RefillWaterAt(t) => {
                // Debit at execution time, not plan time; the tank may have
                // been drained since this event was planned.
                let a = self.wb_attributes().expect("UAVs do not refill water").clone();
                let arrival = event.start_time + dist / self.flight_speed();
                let need = a.water_capacity - self.water;
                let take = need.min(tanks[t].level);
                self.fuel -= travel_fuel;
                self.loc = event.loc;
                if self.water + take + FUEL_EPS < a.water_per_suppression {
                    // Not enough for a single drop: abandon the draw at the
                    // tank and let the caller re-route.
                    self.time = arrival;
                    outcome.tank_dry = Some(t);
                } else {
                    tanks[t].debit(take);
                    self.water += take;
                    self.time = arrival + a.water_refill_time;
                    if take + FUEL_EPS < need {
                        outcome.partial_refill = true;
                    }
                }
            }
            EventKind::GoTo(_) | EventKind::Hover => {
                self.apply_leg(&event, travel_fuel);
            }
        }

        assert!(self.fuel >= -FUEL_EPS, "{}: negative fuel after event", self.name);
        self.fuel = self.fuel.clamp(0.0, 1.0);

        self.push_log(self.time, status, dist, hovered);

        if self.queue.is_empty() {
            // Back to rest: a refuel leaves the aircraft parked at the base,
            // anything else leaves it hovering where the plan ran out.
            self.status = if matches!(event.kind, EventKind::RefuelAt(_)) {
                Status::Idle
            } else {
                Status::Hovering
            };
            self.idle_since = self.time;
        } else {
            self.status = status;
        }
        outcome
    }

    // Water is tracked from actual execution, never from the planned end
    // state: a partial tank draw upstream would make the plan's figures lie.
    fn apply_leg(&mut self, event: &PlannedEvent, travel_fuel: f64) {
        self.fuel -= travel_fuel;
        self.loc = event.loc;
        self.time = event.end_time;
        if let EventKind::RefuelAt(_) = event.kind {
            self.fuel = 1.0;
        }
    }

    fn push_log(&mut self, time: f64, status: Status, dist: f64, hovered: f64) {
        let next_events = self
            .queue
            .iter()
            .map(describe_event)
            .collect::<Vec<_>>()
            .join("; ");
        self.log.push(UpdateEvent {
            name: self.name.clone(),
            loc: self.loc,
            time,
            status,
            distance_travelled: dist,
            distance_hovered: hovered,
            fuel: self.fuel,
            current_range: self.fuel * self.range_km(self.water),
            water: self.water,
            next_events,
        });
    }
}

fn describe_event(e: &PlannedEvent) -> String {
    match e.kind {
        EventKind::GoTo(_) => format!("goto ({:.4}, {:.4})", e.loc.lat, e.loc.lon),
        EventKind::Inspect(s) => format!("inspect strike {}", s),
        EventKind::Suppress(s) => format!("suppress strike {}", s),
        EventKind::RefuelAt(b) => format!("refuel at base {}", b),
        EventKind::RefillWaterAt(t) => format!("refill water at tank {}", t),
        EventKind::Hover => "hover".to_string(),
    }
}
