use std::path::PathBuf;

use clap::Args;
use flowmodoro_core::simulation::{parse_script, Simulation};
use flowmodoro_core::Config;

#[derive(Args)]
pub struct SimulateArgs {
    /// Steps separated by ';', e.g. "ratio 2; start; wait 60s; break; wait 30s"
    script: Option<String>,
    /// Read the script from a file instead
    #[arg(long, conflicts_with = "script")]
    file: Option<PathBuf>,
    /// Use built-in defaults instead of the user config
    #[arg(long)]
    no_config: bool,
    /// Include every event, not only the final snapshot and history
    #[arg(long)]
    events: bool,
}

pub fn run(args: SimulateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let script = match (&args.script, &args.file) {
        (Some(script), _) => script.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => return Err("give a script or --file".into()),
    };
    let steps = parse_script(&script)?;

    let config = if args.no_config {
        Config::default()
    } else {
        Config::load_or_default()
    };
    let mut sim = Simulation::with_lead_ms(config.engine_options(), config.alert_lead_ms());
    let report = sim.run(&steps);

    let mut json = serde_json::to_value(&report)?;
    if !args.events {
        if let Some(obj) = json.as_object_mut() {
            obj.remove("events");
        }
    }
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
