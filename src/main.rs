//! Baseline harness: runs the random and max-power policies on one
//! configuration and writes their reward logs as a label-keyed JSON object.
//!
//! Usage: `mimo-cellular-sim [config.toml] [output.json]`

use anyhow::{Context, Result};
use env_logger::Builder;
use log::{LevelFilter, info};
use std::collections::BTreeMap;
use std::path::PathBuf;

use mimo_cellular_sim::policy::{ActionSpace, MaxPowerPolicy, Policy, RandomPolicy};
use mimo_cellular_sim::{SimulationConfig, SimulationDriver};

fn main() -> Result<()> {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter(Some("mimo_cellular_sim"), LevelFilter::Debug)
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next().map(PathBuf::from) {
        Some(path) => SimulationConfig::load(&path).with_context(|| format!("loading {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    let output = args.next().map(PathBuf::from);

    let actions = ActionSpace::from_config(&config.radio);
    let slots = config.training.total_time_slot;
    info!("Starting up: {} cells, {} time slots", config.topology.cell_number, slots);

    let baselines: Vec<Box<dyn Policy>> = vec![
        Box::new(RandomPolicy::new(actions, config.topology.seed)),
        Box::new(MaxPowerPolicy::new(actions, config.topology.seed)),
    ];

    let mut export = BTreeMap::new();
    for policy in baselines {
        let label = policy.name().to_string();
        // Same seed per baseline so every policy sees the same channel realizations.
        let mut driver = SimulationDriver::new(&config, policy).context("building simulation")?;
        let log = driver.evaluate(slots).with_context(|| format!("running {}", label))?;
        info!("{}: mean reward {:.4} bit/s/Hz", label, log.mean());
        log.export_into(&label, &mut export);
    }

    let json = serde_json::to_string_pretty(&export).context("serializing reward logs")?;
    match output {
        Some(path) => {
            std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
            info!("Reward logs written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
