//! randwalk CLI entry point

use anyhow::{Context, Result};
use randwalk::config::{cli::Cli, toml::build_config, validator::validate_config};
use randwalk::output::{json::write_json_output, text::TextReport};
use randwalk::params::{ParameterError, ParameterSource};
use randwalk::unit::Simulation;
use std::io::{self, IsTerminal};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();

    let config = build_config(&cli)?;
    validate_config(&config).context("Configuration validation failed")?;

    let program = std::env::args()
        .next()
        .unwrap_or_else(|| "randwalk".to_string());
    let mut source = ParameterSource::new(program, cli.parameters.clone());

    let stdin = io::stdin();
    if cli.reads_stdin(stdin.is_terminal()) {
        source = source.with_input(stdin.lock());
    }

    info!(units = config.units, "starting simulation");

    let summary = match Simulation::new(config.clone()).run(source, TextReport::stdout()) {
        Ok(summary) => summary,
        Err(e) => {
            if let Some(usage) = e.downcast_ref::<ParameterError>() {
                eprintln!("{}", usage);
                std::process::exit(1);
            }
            return Err(e);
        }
    };

    if let Some(ref path) = config.json_output {
        write_json_output(path, &summary, config.json_pretty)
            .context("Failed to write JSON summary")?;
        info!(path = %path.display(), "JSON summary written");
    }

    Ok(())
}
