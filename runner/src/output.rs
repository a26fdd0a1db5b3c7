//! Result files for one run: per-strike latencies, per-aircraft event
//! traces, tank residuals, the cross-scenario summary, the gui.json pointer
//! file and the flat copy of every input.

use std::path::Path;

use anyhow::{Context, Result};
use log::warn;
use serde_json::Value;

use firesim_sim::aircraft::{Aircraft, UpdateEvent};
use firesim_sim::world::World;
use firesim_structs::config::ScenarioConfig;
use firesim_structs::units::minutes_to_hours;
use firesim_structs::world::WaterTank;

use crate::parameters::Parameters;

fn writer(path: &Path) -> Result<csv::Writer<std::fs::File>> {
    csv::Writer::from_path(path).with_context(|| format!("cannot write '{}'", path.display()))
}

/// `<prefix>simulation_output.csv`: one row per strike with response
/// latencies in hours; `N/A` where an event never happened.
pub fn write_simulation_output(folder: &Path, prefix: &str, world: &World) -> Result<()> {
    let path = folder.join(format!("{}simulation_output.csv", prefix));
    let mut w = writer(&path)?;
    w.write_record(["id", "lat", "lon", "spawn_time", "inspection_time", "suppression_time"])?;
    for strike in &world.strikes {
        let inspection = match strike.inspection_time {
            Some(t) => minutes_to_hours(t - strike.spawn_time).to_string(),
            None => {
                warn!("strike {} was not inspected", strike.id);
                "N/A".to_string()
            }
        };
        let suppression = match strike.suppression_time {
            Some(t) => minutes_to_hours(t - strike.spawn_time).to_string(),
            None => {
                if strike.ignited {
                    warn!("strike {} ignited but was not suppressed", strike.id);
                }
                "N/A".to_string()
            }
        };
        w.write_record([
            strike.id.to_string(),
            strike.loc.lat.to_string(),
            strike.loc.lon.to_string(),
            minutes_to_hours(strike.spawn_time).to_string(),
            inspection,
            suppression,
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// Event updates of one fleet, merged in global chronological order. Water
/// bomber rows carry the extra water column.
pub fn write_event_updates(
    folder: &Path,
    prefix: &str,
    file_stem: &str,
    fleet: &[Aircraft],
    with_water: bool,
) -> Result<()> {
    let path = folder.join(format!("{}{}_event_updates.csv", prefix, file_stem));
    let mut w = writer(&path)?;
    let mut header = vec![
        "aircraft_id",
        "lat",
        "lon",
        "time_min",
        "distance_travelled_km",
        "distance_hovered_km",
        "fuel_pct",
        "current_range_km",
    ];
    if with_water {
        header.push("water_capacity_L");
    }
    header.push("status");
    header.push("next_updates");
    w.write_record(&header)?;

    let mut updates: Vec<&UpdateEvent> = fleet.iter().flat_map(|a| &a.log).collect();
    updates.sort_by(|a, b| a.time.partial_cmp(&b.time).unwrap());
    for u in updates {
        let mut record = vec![
            u.name.clone(),
            u.loc.lat.to_string(),
            u.loc.lon.to_string(),
            u.time.to_string(),
            u.distance_travelled.to_string(),
            u.distance_hovered.to_string(),
            (u.fuel * 100.0).to_string(),
            u.current_range.to_string(),
        ];
        if with_water {
            record.push(u.water.to_string());
        }
        record.push(u.status.as_str().to_string());
        record.push(u.next_events.clone());
        w.write_record(&record)?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_water_tanks(folder: &Path, prefix: &str, tanks: &[WaterTank]) -> Result<()> {
    let path = folder.join(format!("{}water_tanks.csv", prefix));
    let mut w = writer(&path)?;
    w.write_record(["id", "latitude", "longitude", "initial_capacity", "remaining_capacity"])?;
    for tank in tanks {
        w.write_record([
            tank.id.to_string(),
            tank.loc.lat.to_string(),
            tank.loc.lon.to_string(),
            tank.capacity.to_string(),
            tank.level.to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

pub struct ScenarioSummary {
    pub name: String,
    pub inspections: Vec<f64>,
    pub suppressions: Vec<f64>,
}

impl ScenarioSummary {
    pub fn from_world(name: String, world: &World) -> ScenarioSummary {
        let inspections = world
            .strikes
            .iter()
            .filter_map(|s| s.inspection_time.map(|t| minutes_to_hours(t - s.spawn_time)))
            .collect();
        let suppressions = world
            .strikes
            .iter()
            .filter_map(|s| s.suppression_time.map(|t| minutes_to_hours(t - s.spawn_time)))
            .collect();
        ScenarioSummary { name, inspections, suppressions }
    }
}

fn percentile(sorted: &[f64], pct: f64) -> f64 {
    assert!(!sorted.is_empty());
    let rank = (pct / 100.0 * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

fn stats_row(name: &str, label: &str, times: &[f64]) -> Vec<String> {
    if times.is_empty() {
        return vec![name.to_string(), label.to_string(), "no strikes".to_string()];
    }
    let mut sorted = times.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;
    vec![
        name.to_string(),
        label.to_string(),
        mean.to_string(),
        sorted[sorted.len() - 1].to_string(),
        percentile(&sorted, 99.0).to_string(),
        percentile(&sorted, 90.0).to_string(),
        percentile(&sorted, 50.0).to_string(),
    ]
}

pub fn write_summary(folder: &Path, summaries: &[ScenarioSummary]) -> Result<()> {
    let path = folder.join("summary_file.csv");
    let mut w = writer(&path)?;
    w.write_record([
        "scenario",
        "",
        "mean_time_hr",
        "max_time_hr",
        "99th_percentile_hr",
        "90th_percentile_hr",
        "50th_percentile_hr",
    ])?;
    for summary in summaries {
        w.write_record(stats_row(&summary.name, "inspections", &summary.inspections))?;
        w.write_record(stats_row("", "suppressions", &summary.suppressions))?;
    }
    w.flush()?;
    Ok(())
}

/// Pointers for the visual front-end: the parameters document re-rooted at
/// the output folder.
pub fn write_gui_json(folder: &Path, params: &Parameters) -> Result<()> {
    let mut gui = params.raw.clone();
    gui["output_folder_name"] = Value::String(".".to_string());
    if let Some(Value::String(name)) = params.raw.get("scenario_parameters_filename") {
        let flat = Path::new(name).file_name().unwrap_or_default().to_string_lossy().to_string();
        gui["scenario_parameters_filename"] = Value::String(format!("simulation_input/{}", flat));
    }
    let path = folder.join("gui.json");
    std::fs::write(&path, serde_json::to_string_pretty(&gui)?)
        .with_context(|| format!("cannot write '{}'", path.display()))?;
    Ok(())
}

/// Flat copy of the parameters file and every tabular input it references.
/// Sub-directories are flattened; paths inside the copies are not rewritten.
pub fn copy_inputs(folder: &Path, params: &Parameters, cfg: &ScenarioConfig) -> Result<()> {
    let input_folder = folder.join("simulation_input");
    std::fs::create_dir_all(&input_folder)?;

    let mut sources = vec![
        params.path.clone(),
        params.input_path(&cfg.water_bomber_bases_filename),
        params.input_path(&cfg.uav_bases_filename),
        params.input_path(&cfg.water_tanks_filename),
        params.input_path(&cfg.lightning_filename),
        params.input_path(&cfg.uavs.spawn_loc_file),
    ];
    for wb in cfg.water_bombers.values() {
        sources.push(params.input_path(&wb.spawn_loc_file));
    }
    if let Some(Value::String(name)) = params.raw.get("scenario_parameters_filename") {
        sources.push(params.input_path(name));
    }
    if let Some(unassigned) = &cfg.unassigned_uavs {
        sources.push(params.input_path(&unassigned.boundary_polygon_filename));
        if let Some(targets) = &unassigned.targets_filename {
            sources.push(params.input_path(targets));
        }
    }

    for source in sources {
        let flat = source.file_name().context("input path has no file name")?;
        std::fs::copy(&source, input_folder.join(flat))
            .with_context(|| format!("cannot copy input '{}'", source.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::percentile;

    #[test]
    fn nearest_rank_percentiles() {
        let sorted: Vec<f64> = (1..=100).map(|i| i as f64).collect();
        assert_eq!(percentile(&sorted, 50.0), 50.0);
        assert_eq!(percentile(&sorted, 99.0), 99.0);
        assert_eq!(percentile(&sorted, 90.0), 90.0);
        let one = vec![7.0];
        assert_eq!(percentile(&one, 50.0), 7.0);
        assert_eq!(percentile(&one, 99.0), 7.0);
    }
}
