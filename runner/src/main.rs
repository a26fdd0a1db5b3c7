use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use firesim_planner::{build_uav_coordinator, build_wb_coordinator, PolicyParams};
use firesim_sim::aircraft::{Aircraft, AircraftKind, UavAttributes, WbAttributes};
use firesim_sim::simulator::Simulator;
use firesim_sim::unassigned::UnassignedController;
use firesim_sim::world::{assign_ignitions, World};
use firesim_structs::config::ScenarioConfig;
use firesim_structs::units::{hours_to_minutes, kmh_to_km_per_min};

pub mod output;
pub mod parameters;
pub mod read_csv;

use output::ScenarioSummary;
use parameters::{create_output_folder, Parameters};

#[derive(Parser)]
#[command(name = "firesim", about = "Aerial bushfire response dispatch simulation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every scenario of a parameters file and write the result files.
    #[command(name = "run-simulation")]
    RunSimulation {
        #[arg(default_value = "parameters.json")]
        parameters_path: PathBuf,
        /// Overwrite a non-empty output folder without prompting.
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    match Cli::parse().command {
        Command::RunSimulation { parameters_path, yes } => run_simulation(&parameters_path, yes),
    }
}

fn run_simulation(parameters_path: &Path, assume_yes: bool) -> Result<()> {
    let params = Parameters::load(parameters_path)?;
    let output_folder = params.output_folder()?;
    create_output_folder(&output_folder, assume_yes)?;

    let mut summaries = Vec::new();
    for idx in 0..params.scenarios.len() {
        let cfg = params.scenario(idx)?;
        let prefix = match &cfg.scenario_name {
            Some(name) => format!("{}_", name),
            None => String::new(),
        };
        info!("running scenario {} ({})", idx, cfg.scenario_name.as_deref().unwrap_or("unnamed"));

        let (world, unassigned) = build_world(&params, &cfg)?;
        let mut uav_coordinator = build_uav_coordinator(
            cfg.uav_coordinator,
            PolicyParams {
                mean_time_power: cfg.uav_mean_time_power,
                target_max_time: hours_to_minutes(cfg.target_maximum_inspection_time),
                prioritisation: cfg.uavs.prioritisation_function,
            },
        );
        // Bomber kinds share one policy; the prioritisation function of the
        // first kind applies fleet-wide.
        let wb_prioritisation =
            cfg.water_bombers.values().next().and_then(|wb| wb.prioritisation_function);
        let mut wb_coordinator = build_wb_coordinator(
            cfg.wb_coordinator,
            PolicyParams {
                mean_time_power: cfg.wb_mean_time_power,
                target_max_time: hours_to_minutes(cfg.target_maximum_suppression_time),
                prioritisation: wb_prioritisation,
            },
        );

        let mut simulator = Simulator::new(world);
        let mut unassigned = unassigned;
        simulator.run(&mut *uav_coordinator, &mut *wb_coordinator, unassigned.as_mut());

        let world = &simulator.world;
        output::write_simulation_output(&output_folder, &prefix, world)?;
        output::write_event_updates(&output_folder, &prefix, "uav", &world.uavs, false)?;
        output::write_event_updates(&output_folder, &prefix, "wb", &world.water_bombers, true)?;
        output::write_water_tanks(&output_folder, &prefix, &world.water_tanks)?;
        output::copy_inputs(&output_folder, &params, &cfg)?;
        summaries.push(ScenarioSummary::from_world(
            cfg.scenario_name.clone().unwrap_or_else(|| idx.to_string()),
            world,
        ));
    }

    output::write_summary(&output_folder, &summaries)?;
    output::write_gui_json(&output_folder, &params)?;
    Ok(())
}

fn build_world(
    params: &Parameters,
    cfg: &ScenarioConfig,
) -> Result<(World, Option<UnassignedController>)> {
    let uav_bases = read_csv::read_uav_bases(&params.input_path(&cfg.uav_bases_filename))?;
    let kinds: Vec<String> = cfg.water_bombers.keys().cloned().collect();
    let wb_bases =
        read_csv::read_wb_bases(&params.input_path(&cfg.water_bomber_bases_filename), &kinds)?;
    let water_tanks = read_csv::read_water_tanks(&params.input_path(&cfg.water_tanks_filename))?;

    let (mut strikes, explicit) =
        read_csv::read_lightning(&params.input_path(&cfg.lightning_filename))?;
    let mut rng = ChaCha8Rng::seed_from_u64(cfg.prng_seed);
    assign_ignitions(&mut strikes, &explicit, cfg.ignition_probability, &mut rng);

    let uav_spawns = read_csv::read_spawn_locations(&params.input_path(&cfg.uavs.spawn_loc_file))?;
    let uavs: Vec<Aircraft> = uav_spawns
        .iter()
        .enumerate()
        .map(|(i, spawn)| {
            Aircraft::new(
                i,
                AircraftKind::Uav(UavAttributes {
                    flight_speed: kmh_to_km_per_min(cfg.uavs.flight_speed),
                    fuel_refill_time: cfg.uavs.fuel_refill_time,
                    range: cfg.uavs.range,
                    inspection_time: cfg.uavs.inspection_time,
                    pct_fuel_cutoff: cfg.uavs.pct_fuel_cutoff,
                }),
                spawn.loc,
                spawn.starting_at_base,
                spawn.initial_fuel,
            )
        })
        .collect();

    let mut water_bombers = Vec::new();
    for (kind_name, wb_cfg) in &cfg.water_bombers {
        let spawns = read_csv::read_spawn_locations(&params.input_path(&wb_cfg.spawn_loc_file))?;
        for spawn in spawns {
            water_bombers.push(Aircraft::new(
                water_bombers.len(),
                AircraftKind::WaterBomber(WbAttributes {
                    kind_name: kind_name.clone(),
                    flight_speed: kmh_to_km_per_min(wb_cfg.flight_speed),
                    fuel_refill_time: wb_cfg.fuel_refill_time,
                    suppression_time: wb_cfg.suppression_time,
                    water_refill_time: wb_cfg.water_refill_time,
                    water_per_suppression: wb_cfg.water_per_suppression,
                    range_empty: wb_cfg.range_empty,
                    range_under_load: wb_cfg.range_under_load,
                    water_capacity: wb_cfg.water_capacity,
                    pct_fuel_cutoff: wb_cfg.pct_fuel_cutoff,
                }),
                spawn.loc,
                spawn.starting_at_base,
                spawn.initial_fuel,
            ));
        }
    }

    let unassigned = match &cfg.unassigned_uavs {
        Some(unassigned_cfg) => {
            let polygon = read_csv::read_polygon(
                &params.input_path(&unassigned_cfg.boundary_polygon_filename),
            )?;
            let targets = match &unassigned_cfg.targets_filename {
                Some(name) => read_csv::read_targets(&params.input_path(name))?,
                None => Vec::new(),
            };
            Some(UnassignedController::new(unassigned_cfg.clone(), polygon, targets))
        }
        None => None,
    };

    let world = World::new(uavs, water_bombers, uav_bases, wb_bases, water_tanks, strikes);
    Ok((world, unassigned))
}
