//! Typed view of the JSON parameters file. Scenario sweeps substitute CSV
//! cells (strings) into arbitrary leaves of the document before it is
//! deserialized, so every numeric field accepts both forms.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

use crate::units::parse_number_or_inf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, serde::Serialize)]
pub enum CoordinatorKind {
    Simple,
    Insertion,
    MinimiseMeanTime,
    ReprocessMaxTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrioritisationFunction {
    Product,
    Sum,
    RiskOnly,
}

impl PrioritisationFunction {
    /// Combines a response time with a risk rating into the scalar the
    /// coordinators minimise.
    pub fn apply(self, time: f64, risk: f64) -> f64 {
        match self {
            PrioritisationFunction::Product => time * risk,
            PrioritisationFunction::Sum => time + risk,
            PrioritisationFunction::RiskOnly => risk,
        }
    }
}

/// Weight a response time, treating an absent prioritisation function as the
/// identity.
pub fn weighted_time(f: Option<PrioritisationFunction>, time: f64, risk: f64) -> f64 {
    match f {
        Some(f) => f.apply(time, risk),
        None => time,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub scenario_name: Option<String>,
    pub water_bomber_bases_filename: String,
    pub uav_bases_filename: String,
    pub water_tanks_filename: String,
    pub lightning_filename: String,
    pub output_folder_name: String,
    pub uav_coordinator: CoordinatorKind,
    pub wb_coordinator: CoordinatorKind,
    #[serde(default = "one", deserialize_with = "flex_f64")]
    pub uav_mean_time_power: f64,
    #[serde(default = "one", deserialize_with = "flex_f64")]
    pub wb_mean_time_power: f64,
    /// Hours; `"inf"` for no ceiling.
    #[serde(default = "inf", deserialize_with = "flex_f64")]
    pub target_maximum_inspection_time: f64,
    #[serde(default = "inf", deserialize_with = "flex_f64")]
    pub target_maximum_suppression_time: f64,
    #[serde(default = "zero", deserialize_with = "flex_f64")]
    pub ignition_probability: f64,
    #[serde(default, deserialize_with = "flex_u64")]
    pub prng_seed: u64,
    pub uavs: UavConfig,
    pub water_bombers: BTreeMap<String, WbConfig>,
    #[serde(default)]
    pub unassigned_uavs: Option<UnassignedConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UavConfig {
    pub spawn_loc_file: String,
    /// km/h.
    #[serde(deserialize_with = "flex_f64")]
    pub flight_speed: f64,
    /// Minutes.
    #[serde(deserialize_with = "flex_f64")]
    pub fuel_refill_time: f64,
    /// km on a full tank.
    #[serde(deserialize_with = "flex_f64")]
    pub range: f64,
    /// Minutes.
    #[serde(deserialize_with = "flex_f64")]
    pub inspection_time: f64,
    #[serde(deserialize_with = "flex_f64")]
    pub pct_fuel_cutoff: f64,
    #[serde(default)]
    pub prioritisation_function: Option<PrioritisationFunction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WbConfig {
    pub spawn_loc_file: String,
    #[serde(deserialize_with = "flex_f64")]
    pub flight_speed: f64,
    #[serde(deserialize_with = "flex_f64")]
    pub suppression_time: f64,
    #[serde(deserialize_with = "flex_f64")]
    pub water_refill_time: f64,
    #[serde(deserialize_with = "flex_f64")]
    pub fuel_refill_time: f64,
    /// Litres dropped on each suppression.
    #[serde(deserialize_with = "flex_f64")]
    pub water_per_suppression: f64,
    #[serde(deserialize_with = "flex_f64")]
    pub range_empty: f64,
    #[serde(deserialize_with = "flex_f64")]
    pub range_under_load: f64,
    #[serde(deserialize_with = "flex_f64")]
    pub water_capacity: f64,
    #[serde(deserialize_with = "flex_f64")]
    pub pct_fuel_cutoff: f64,
    #[serde(default)]
    pub prioritisation_function: Option<PrioritisationFunction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnassignedConfig {
    #[serde(default)]
    pub targets_filename: Option<String>,
    pub boundary_polygon_filename: String,
    /// Seconds between controller re-plans.
    #[serde(deserialize_with = "flex_f64")]
    pub dt: f64,
    #[serde(deserialize_with = "flex_f64")]
    pub uav_repulsion_const: f64,
    #[serde(deserialize_with = "flex_f64")]
    pub uav_repulsion_power: f64,
    #[serde(deserialize_with = "flex_f64")]
    pub boundary_repulsion_const: f64,
    #[serde(deserialize_with = "flex_f64")]
    pub boundary_repulsion_power: f64,
    #[serde(default = "one", deserialize_with = "flex_f64")]
    pub target_attraction_const: f64,
    #[serde(default = "one", deserialize_with = "flex_f64")]
    pub target_attraction_power: f64,
    #[serde(deserialize_with = "flex_f64")]
    pub centre_lat: f64,
    #[serde(deserialize_with = "flex_f64")]
    pub centre_lon: f64,
    #[serde(default)]
    pub forecasting: Option<ForecastConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastConfig {
    /// Grid cell side, km.
    #[serde(deserialize_with = "flex_f64")]
    pub radius: f64,
    #[serde(deserialize_with = "flex_usize")]
    pub min_in_target: usize,
    /// Minutes of trailing history considered.
    #[serde(deserialize_with = "flex_f64")]
    pub look_ahead: f64,
}

fn one() -> f64 {
    1.0
}

fn zero() -> f64 {
    0.0
}

fn inf() -> f64 {
    f64::INFINITY
}

fn flex_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(f64),
        Str(String),
    }
    match NumOrStr::deserialize(d)? {
        NumOrStr::Num(v) => Ok(v),
        NumOrStr::Str(s) => parse_number_or_inf(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("expected a number, got '{}'", s))),
    }
}

fn flex_u64<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    let v = flex_f64(d)?;
    if v < 0.0 || v.fract() != 0.0 || !v.is_finite() {
        return Err(serde::de::Error::custom(format!("expected a non-negative integer, got {}", v)));
    }
    Ok(v as u64)
}

fn flex_usize<'de, D: Deserializer<'de>>(d: D) -> Result<usize, D::Error> {
    let v = flex_f64(d)?;
    if v < 0.0 || v.fract() != 0.0 || !v.is_finite() {
        return Err(serde::de::Error::custom(format!("expected a non-negative integer, got {}", v)));
    }
    Ok(v as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinator_names_are_closed() {
        let k: CoordinatorKind = serde_json::from_str("\"MinimiseMeanTime\"").unwrap();
        assert_eq!(k, CoordinatorKind::MinimiseMeanTime);
        assert!(serde_json::from_str::<CoordinatorKind>("\"Greedy\"").is_err());
    }

    #[test]
    fn prioritisation_apply() {
        assert_eq!(PrioritisationFunction::Product.apply(10.0, 0.5), 5.0);
        assert_eq!(PrioritisationFunction::Sum.apply(10.0, 0.5), 10.5);
        assert_eq!(PrioritisationFunction::RiskOnly.apply(10.0, 0.5), 0.5);
        assert_eq!(weighted_time(None, 10.0, 0.5), 10.0);
    }

    #[test]
    fn numeric_fields_accept_strings_and_inf() {
        let json = serde_json::json!({
            "spawn_loc_file": "uavs.csv",
            "flight_speed": "140",
            "fuel_refill_time": 30,
            "range": 650.5,
            "inspection_time": "1",
            "pct_fuel_cutoff": "0.2",
        });
        let cfg: UavConfig = serde_json::from_value(json).unwrap();
        assert_eq!(cfg.flight_speed, 140.0);
        assert_eq!(cfg.pct_fuel_cutoff, 0.2);
        assert!(cfg.prioritisation_function.is_none());

        let t: f64 = {
            #[derive(Deserialize)]
            struct W(#[serde(deserialize_with = "super::flex_f64")] f64);
            serde_json::from_value::<W>(serde_json::json!("inf")).unwrap().0
        };
        assert!(t.is_infinite());
    }
}
