use std::path::PathBuf;

use clap::Subcommand;
use flowmodoro_core::history::RENDER_LIMIT;
use flowmodoro_core::HistoryLog;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// Print the most recent records of an exported history file
    Show {
        /// History file written by `export`
        file: PathBuf,
        /// Number of records to show
        #[arg(long, default_value_t = RENDER_LIMIT)]
        limit: usize,
        /// Print the records as JSON instead
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        HistoryAction::Show { file, limit, json } => {
            let mut log = HistoryLog::new();
            log.import_file(&file)?;
            let records = log.recent(limit);
            if json {
                println!("{}", serde_json::to_string_pretty(records)?);
            } else {
                for record in records {
                    println!("{}", record.render_line());
                }
            }
        }
    }
    Ok(())
}
