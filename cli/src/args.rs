//! Command-line arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Customer-churn workflow: explore, prepare, train, deploy and score.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "churnflow", version, about)]
pub struct Cli {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Print frequency tables, distributions and correlations
    Explore(ExploreArgs),

    /// Clean, encode and split the data; write partitions and encoder schema
    Prepare(PrepareArgs),

    /// Prepare, then train, compile, deploy and score the test partition
    Run(RunArgs),

    /// Score an unlabelled file against a running endpoint
    Score(ScoreArgs),

    /// Delete a hosted endpoint
    Teardown(TeardownArgs),

    /// Print the resolved configuration as TOML
    ShowConfig,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct ExploreArgs {
    /// Customer file
    pub data: PathBuf,

    /// Histogram bins per numeric column
    #[arg(long, default_value_t = 10)]
    pub bins: usize,

    /// Absolute correlation at which a column counts as redundant
    #[arg(long, default_value_t = 0.95)]
    pub threshold: f64,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct PrepareArgs {
    /// Customer file
    pub data: PathBuf,

    /// Overrides `storage.output_dir`
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct RunArgs {
    /// Customer file
    pub data: PathBuf,

    /// Overrides `storage.output_dir`
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Use in-process stand-in services instead of the gateway
    #[arg(long)]
    pub dry_run: bool,

    /// Skip model compilation
    #[arg(long)]
    pub no_compile: bool,

    /// Delete the endpoint after scoring
    #[arg(long)]
    pub teardown: bool,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct ScoreArgs {
    /// Unlabelled customer file
    pub data: PathBuf,

    /// Encoder schema written by `prepare`
    #[arg(short, long)]
    pub encoder: PathBuf,

    /// Overrides `hosting.endpoint_name`
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Overrides `scoring.batch_size`
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Write predictions here, one per line, instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct TeardownArgs {
    /// Overrides `hosting.endpoint_name`
    #[arg(long)]
    pub endpoint: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_with_flags() {
        let cli = Cli::try_parse_from([
            "churnflow", "-v", "run", "churn.txt", "--dry-run", "--teardown", "-c", "flow.toml",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("flow.toml")));
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.data, PathBuf::from("churn.txt"));
                assert!(args.dry_run && args.teardown && !args.no_compile);
                assert!(args.output_dir.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn explore_defaults() {
        let cli = Cli::try_parse_from(["churnflow", "explore", "churn.txt"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Explore(ExploreArgs {
                data: PathBuf::from("churn.txt"),
                bins: 10,
                threshold: 0.95,
            })
        );
    }

    #[test]
    fn score_requires_encoder() {
        assert!(Cli::try_parse_from(["churnflow", "score", "new.csv"]).is_err());
        let cli = Cli::try_parse_from([
            "churnflow", "score", "new.csv", "--encoder", "out/encoder.bin", "-b", "100",
        ])
        .unwrap();
        match cli.command {
            Command::Score(args) => {
                assert_eq!(args.batch_size, Some(100));
                assert!(args.endpoint.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn show_config_takes_no_arguments() {
        let cli = Cli::try_parse_from(["churnflow", "show-config"]).unwrap();
        assert_eq!(cli.command, Command::ShowConfig);
    }
}
