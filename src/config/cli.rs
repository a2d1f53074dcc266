//! CLI argument parsing using clap

use clap::Parser;
use std::path::PathBuf;

/// randwalk - bounded random walkers coordinated over a message fabric
///
/// Parameters are read from standard input as `<domain_size> <max_steps>`
/// when available, otherwise from the two positional arguments.
#[derive(Parser, Debug)]
#[command(name = "randwalk")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Domain half-width and step budget: <domain_size> <max_steps>
    ///
    /// Kept as raw strings so a malformed pair produces the usage message
    /// rather than a parser error.
    #[arg(value_name = "PARAMETER", allow_negative_numbers = true)]
    pub parameters: Vec<String>,

    /// Total number of units, coordinator included (default: CPU count)
    #[arg(short = 'n', long, env = "RANDWALK_UNITS")]
    pub units: Option<usize>,

    /// Base seed mixed with each walker's rank (default: wall clock)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Stop waiting for walker results after this many milliseconds
    #[arg(long, value_name = "MS")]
    pub collect_timeout_ms: Option<u64>,

    /// Write a JSON run summary to this path
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,

    /// Write the JSON summary on a single line
    #[arg(long)]
    pub compact_json: bool,

    /// TOML run configuration file (CLI flags take precedence)
    #[arg(short = 'c', long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Never read parameters from standard input
    #[arg(long)]
    pub no_stdin: bool,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Whether the coordinator should look at standard input
    ///
    /// Piped input is always read. A terminal is only read when no
    /// positional parameters were given, so `randwalk 10 100` never waits
    /// for typing. A terminal therefore never overrides arguments that
    /// were already given, even though piped input does.
    pub fn reads_stdin(&self, stdin_is_terminal: bool) -> bool {
        !self.no_stdin && (!stdin_is_terminal || self.parameters.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_parameters() {
        let cli = Cli::parse_from(["randwalk", "10", "100"]);
        assert_eq!(cli.parameters, vec!["10", "100"]);
        assert!(cli.units.is_none());
    }

    #[test]
    fn test_negative_parameters() {
        let cli = Cli::parse_from(["randwalk", "-3", "-1"]);
        assert_eq!(cli.parameters, vec!["-3", "-1"]);
    }

    #[test]
    fn test_flags() {
        let cli = Cli::parse_from([
            "randwalk",
            "--units",
            "6",
            "--seed",
            "9",
            "--collect-timeout-ms",
            "250",
            "--json",
            "out.json",
            "--no-stdin",
            "5",
            "50",
        ]);
        assert_eq!(cli.units, Some(6));
        assert_eq!(cli.seed, Some(9));
        assert_eq!(cli.collect_timeout_ms, Some(250));
        assert_eq!(cli.json, Some(PathBuf::from("out.json")));
        assert!(cli.no_stdin);
        assert_eq!(cli.parameters, vec!["5", "50"]);
    }

    #[test]
    fn test_stdin_policy() {
        let with_args = Cli::parse_from(["randwalk", "1", "2"]);
        assert!(with_args.reads_stdin(false));
        assert!(!with_args.reads_stdin(true));

        let bare = Cli::parse_from(["randwalk"]);
        assert!(bare.reads_stdin(true));

        let disabled = Cli::parse_from(["randwalk", "--no-stdin"]);
        assert!(!disabled.reads_stdin(false));
    }
}
