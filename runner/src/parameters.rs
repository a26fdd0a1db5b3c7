//! The JSON parameters file and its scenario sweeps. A base configuration may
//! set any option to `"?"`; the scenario CSV then supplies one value per row
//! from the column named by the option's `/`-joined path, and the first
//! column names each scenario.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::info;
use serde_json::Value;

use firesim_structs::config::ScenarioConfig;

use crate::read_csv::CsvTable;

pub struct Parameters {
    pub folder: PathBuf,
    pub path: PathBuf,
    pub raw: Value,
    pub scenarios: Vec<Value>,
}

impl Parameters {
    pub fn load(path: &Path) -> Result<Parameters> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read parameters file '{}'", path.display()))?;
        let raw: Value = serde_json::from_str(&text)
            .with_context(|| format!("'{}' is not valid JSON", path.display()))?;
        let folder = path.parent().unwrap_or(Path::new(".")).to_path_buf();

        let scenarios = match raw.get("scenario_parameters_filename") {
            Some(Value::String(csv_name)) => {
                let table = CsvTable::open(&folder.join(csv_name))?;
                expand_scenarios(&raw, &table)?
            }
            Some(other) => bail!("'scenario_parameters_filename' must be a string, got {}", other),
            None => vec![raw.clone()],
        };
        Ok(Parameters { folder, path: path.to_path_buf(), raw, scenarios })
    }

    pub fn scenario(&self, idx: usize) -> Result<ScenarioConfig> {
        let cfg: ScenarioConfig = serde_json::from_value(self.scenarios[idx].clone())
            .with_context(|| format!("scenario {} of '{}' is malformed", idx, self.path.display()))?;
        validate(&cfg)?;
        Ok(cfg)
    }

    pub fn output_folder(&self) -> Result<PathBuf> {
        let name = self.scenarios[0]
            .get("output_folder_name")
            .and_then(Value::as_str)
            .context("'output_folder_name' is missing")?;
        Ok(self.folder.join(name))
    }

    pub fn input_path(&self, relative: &str) -> PathBuf {
        self.folder.join(relative)
    }
}

fn validate(cfg: &ScenarioConfig) -> Result<()> {
    for (name, v) in [
        ("uavs/pct_fuel_cutoff", cfg.uavs.pct_fuel_cutoff),
        ("ignition_probability", cfg.ignition_probability),
    ] {
        if !(0.0..=1.0).contains(&v) {
            bail!("'{}' must lie in [0, 1], got {}", name, v);
        }
    }
    if cfg.uavs.flight_speed <= 0.0 || cfg.uavs.range <= 0.0 {
        bail!("'uavs': flight_speed and range must be positive");
    }
    for (kind, wb) in &cfg.water_bombers {
        if !(0.0..=1.0).contains(&wb.pct_fuel_cutoff) {
            bail!("'water_bombers/{}/pct_fuel_cutoff' must lie in [0, 1]", kind);
        }
        if wb.water_per_suppression > wb.water_capacity {
            bail!("'water_bombers/{}': water_per_suppression exceeds water_capacity", kind);
        }
        if wb.flight_speed <= 0.0
            || wb.range_empty <= 0.0
            || wb.range_under_load <= 0.0
            || wb.water_capacity <= 0.0
        {
            bail!("'water_bombers/{}': speeds, ranges and capacity must be positive", kind);
        }
    }
    if cfg.uav_mean_time_power <= 0.0 || cfg.wb_mean_time_power <= 0.0 {
        bail!("mean time powers must be positive");
    }
    Ok(())
}

/// Deep-copy the base document once per CSV row, replacing every `"?"` leaf
/// with the matching column's value for that row.
fn expand_scenarios(raw: &Value, table: &CsvTable) -> Result<Vec<Value>> {
    let mut paths: Vec<Vec<String>> = Vec::new();
    collect_question_paths(raw, &mut Vec::new(), &mut paths);

    let mut scenarios: Vec<Value> = (0..table.len()).map(|_| raw.clone()).collect();
    for path in &paths {
        let column = path.join("/");
        for (row, scenario) in scenarios.iter_mut().enumerate() {
            let cell = table.cell(&column, row)?;
            set_in(scenario, path, Value::String(cell.to_string()));
        }
    }
    let names = table.first_column();
    for (row, scenario) in scenarios.iter_mut().enumerate() {
        let name = names.get(row).cloned().unwrap_or_else(|| row.to_string());
        scenario["scenario_name"] = Value::String(name);
    }
    info!("expanded {} scenarios over {} swept options", scenarios.len(), paths.len());
    Ok(scenarios)
}

fn collect_question_paths(value: &Value, path: &mut Vec<String>, out: &mut Vec<Vec<String>>) {
    match value {
        Value::String(s) if s == "?" => out.push(path.clone()),
        Value::Object(map) => {
            for (key, child) in map {
                path.push(key.clone());
                collect_question_paths(child, path, out);
                path.pop();
            }
        }
        _ => {}
    }
}

fn set_in(value: &mut Value, path: &[String], new: Value) {
    let mut cursor = value;
    for key in &path[..path.len() - 1] {
        cursor = cursor.get_mut(key).expect("path collected from this document");
    }
    cursor[path.last().unwrap().as_str()] = new;
}

/// Confirm before clobbering a non-empty output folder, then (re)create it.
pub fn create_output_folder(folder: &Path, assume_yes: bool) -> Result<()> {
    if folder.exists() && folder.read_dir()?.next().is_some() {
        if !assume_yes && !confirm_overwrite(folder)? {
            bail!("aborted: output folder '{}' is not empty", folder.display());
        }
        std::fs::remove_dir_all(folder)
            .with_context(|| format!("cannot clear '{}'", folder.display()))?;
    }
    std::fs::create_dir_all(folder)
        .with_context(|| format!("cannot create '{}'", folder.display()))?;
    Ok(())
}

fn confirm_overwrite(folder: &Path) -> Result<bool> {
    print!(
        "Output folder '{}' already exists and is not empty, overwrite its contents? [y/N] ",
        folder.display()
    );
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn question_marks_expand_from_csv_columns() {
        let raw = json!({
            "output_folder_name": "out",
            "uav_coordinator": "?",
            "uavs": { "flight_speed": "?", "range": 600 },
        });
        let csv = "scenario_name,uav_coordinator,uavs/flight_speed\n\
                   fast,Simple,240\n\
                   slow,Insertion,60\n";
        let table = CsvTable::from_reader("scenarios", csv.as_bytes()).unwrap();
        let scenarios = expand_scenarios(&raw, &table).unwrap();
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[0]["uav_coordinator"], "Simple");
        assert_eq!(scenarios[0]["uavs"]["flight_speed"], "240");
        assert_eq!(scenarios[0]["uavs"]["range"], 600);
        assert_eq!(scenarios[1]["uav_coordinator"], "Insertion");
        assert_eq!(scenarios[1]["scenario_name"], "slow");
    }

    #[test]
    fn scenario_values_deserialize_after_substitution() {
        let raw = json!({
            "water_bomber_bases_filename": "wb_bases.csv",
            "uav_bases_filename": "uav_bases.csv",
            "water_tanks_filename": "tanks.csv",
            "lightning_filename": "lightning.csv",
            "output_folder_name": "out",
            "uav_coordinator": "Simple",
            "wb_coordinator": "MinimiseMeanTime",
            "target_maximum_inspection_time": "inf",
            "ignition_probability": 0.4,
            "uavs": {
                "spawn_loc_file": "uavs.csv",
                "flight_speed": "140",
                "fuel_refill_time": 30,
                "range": 650,
                "inspection_time": 1,
                "pct_fuel_cutoff": 0.2,
            },
            "water_bombers": {
                "helicopter": {
                    "spawn_loc_file": "helis.csv",
                    "flight_speed": 235,
                    "suppression_time": 1,
                    "water_refill_time": 5,
                    "fuel_refill_time": 30,
                    "water_per_suppression": 3000,
                    "range_empty": 650,
                    "range_under_load": 450,
                    "water_capacity": 9000,
                    "pct_fuel_cutoff": 0.3,
                }
            },
        });
        let params = Parameters {
            folder: PathBuf::from("."),
            path: PathBuf::from("parameters.json"),
            scenarios: vec![raw.clone()],
            raw,
        };
        let cfg = params.scenario(0).unwrap();
        assert_eq!(cfg.uavs.flight_speed, 140.0);
        assert!(cfg.target_maximum_inspection_time.is_infinite());
        assert_eq!(cfg.water_bombers["helicopter"].water_capacity, 9000.0);
        // Defaults kick in for the optional knobs.
        assert_eq!(cfg.uav_mean_time_power, 1.0);
        assert!(cfg.target_maximum_suppression_time.is_infinite());
        assert_eq!(cfg.prng_seed, 0);
    }

    #[test]
    fn bad_coordinator_name_is_a_schema_error() {
        let raw = json!({
            "water_bomber_bases_filename": "a", "uav_bases_filename": "b",
            "water_tanks_filename": "c", "lightning_filename": "d",
            "output_folder_name": "out",
            "uav_coordinator": "Greedy", "wb_coordinator": "Simple",
            "ignition_probability": 0.4,
            "uavs": {
                "spawn_loc_file": "u.csv", "flight_speed": 100, "fuel_refill_time": 1,
                "range": 100, "inspection_time": 1, "pct_fuel_cutoff": 0.1,
            },
            "water_bombers": {},
        });
        let params = Parameters {
            folder: PathBuf::from("."),
            path: PathBuf::from("parameters.json"),
            scenarios: vec![raw.clone()],
            raw,
        };
        assert!(params.scenario(0).is_err());
    }
}
