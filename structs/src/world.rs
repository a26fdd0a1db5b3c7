use serde::{Deserialize, Serialize};

use crate::Location;

/// A lightning strike. Created at load, mutated exactly twice: once when
/// inspected and, if it ignited, once when suppressed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strike {
    pub id: usize,
    pub loc: Location,
    pub spawn_time: f64,
    pub risk_rating: Option<f64>,
    pub ignition_probability: Option<f64>,
    pub ignited: bool,
    pub inspection_time: Option<f64>,
    pub suppression_time: Option<f64>,
}

impl Strike {
    pub fn inspected(&mut self, time: f64) {
        assert!(self.inspection_time.is_none(), "strike {} inspected twice", self.id);
        assert!(time >= self.spawn_time);
        self.inspection_time = Some(time);
    }

    pub fn suppressed(&mut self, time: f64) {
        assert!(self.ignited, "strike {} suppressed without ignition", self.id);
        assert!(self.suppression_time.is_none(), "strike {} suppressed twice", self.id);
        assert!(time >= self.inspection_time.expect("suppressed before inspection"));
        self.suppression_time = Some(time);
    }

    /// Weight used by the prioritisation functions; unrisked strikes weigh 1.
    pub fn risk(&self) -> f64 {
        self.risk_rating.unwrap_or(1.0)
    }
}

/// A refuel site. Admission per aircraft kind is resolved at load time, so a
/// base itself is just a located id.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Base {
    pub id: usize,
    pub loc: Location,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterTank {
    pub id: usize,
    pub loc: Location,
    /// Litres; may be infinite.
    pub capacity: f64,
    pub level: f64,
}

impl WaterTank {
    pub fn new(id: usize, loc: Location, capacity: f64) -> WaterTank {
        WaterTank { id, loc, capacity, level: capacity }
    }

    pub fn debit(&mut self, amount: f64) {
        self.level -= amount;
        assert!(self.level >= -1e-9, "tank {} overdrawn", self.id);
        self.level = self.level.max(0.0);
    }
}

/// An attraction target for the idle-UAV controller, active on a time window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Target {
    pub loc: Location,
    pub start_time: f64,
    pub finish_time: f64,
}

impl Target {
    pub fn active_at(&self, time: f64) -> bool {
        time >= self.start_time && time <= self.finish_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strike() -> Strike {
        Strike {
            id: 0,
            loc: Location::new(-37.0, 145.0),
            spawn_time: 10.0,
            risk_rating: None,
            ignition_probability: None,
            ignited: true,
            inspection_time: None,
            suppression_time: None,
        }
    }

    #[test]
    fn strike_lifecycle_ordering() {
        let mut s = strike();
        s.inspected(15.0);
        s.suppressed(20.0);
        assert_eq!(s.inspection_time, Some(15.0));
        assert_eq!(s.suppression_time, Some(20.0));
    }

    #[test]
    #[should_panic]
    fn strike_suppressed_before_inspection_panics() {
        let mut s = strike();
        s.suppressed(20.0);
    }

    #[test]
    fn tank_debit_floors_at_zero() {
        let mut t = WaterTank::new(0, Location::new(0.0, 0.0), 100.0);
        t.debit(60.0);
        assert_eq!(t.level, 40.0);
        t.debit(40.0);
        assert_eq!(t.level, 0.0);
    }

    #[test]
    fn target_window() {
        let t = Target { loc: Location::new(0.0, 0.0), start_time: 5.0, finish_time: 10.0 };
        assert!(!t.active_at(4.9));
        assert!(t.active_at(7.0));
        assert!(!t.active_at(10.1));
    }
}
