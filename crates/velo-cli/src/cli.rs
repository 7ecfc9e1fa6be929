use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI parser for the `velo` binary.
#[derive(Debug, Parser)]
#[command(name = "velo", version, about = "Road-network speed ingestion toolbox")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Reload the store from the source parquet files (destructive)
    Ingest(IngestArgs),
    /// Run verification checks against an existing store
    Verify(VerifyArgs),
}

#[derive(Debug, clap::Args)]
pub struct IngestArgs {
    /// Links dataset (parquet); overrides config
    #[arg(long)]
    pub links: Option<PathBuf>,

    /// Speed dataset (parquet); overrides config
    #[arg(long)]
    pub speeds: Option<PathBuf>,

    /// Database file; overrides config
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Source rows per chunk; overrides config
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Run verification after the load and fail on any failed check
    #[arg(long)]
    pub validate: bool,
}

#[derive(Debug, clap::Args)]
pub struct VerifyArgs {
    /// Database file; overrides config
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Speed dataset (parquet) for the mean-speed cross-check
    #[arg(long)]
    pub speeds: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use pretty_assertions::assert_eq;

    use super::{Cli, Commands};

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn ingest_args_parse() {
        let cli = Cli::try_parse_from([
            "velo",
            "ingest",
            "--links",
            "links.parquet",
            "--speeds",
            "speeds.parquet",
            "--chunk-size",
            "250",
            "--validate",
        ])
        .expect("cli should parse");

        let Commands::Ingest(args) = cli.command else {
            panic!("expected ingest");
        };
        assert_eq!(args.links.unwrap().to_string_lossy(), "links.parquet");
        assert_eq!(args.chunk_size, Some(250));
        assert!(args.validate);
        assert_eq!(args.db, None);
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["velo", "verify", "--db", "out.duckdb", "--verbose"])
            .expect("cli should parse");

        assert!(cli.verbose);
        let Commands::Verify(args) = cli.command else {
            panic!("expected verify");
        };
        assert_eq!(args.db.unwrap().to_string_lossy(), "out.duckdb");
        assert_eq!(args.speeds, None);
    }

    #[test]
    fn ingest_requires_no_flags() {
        // Paths may come entirely from config.
        let cli = Cli::try_parse_from(["velo", "ingest"]).expect("cli should parse");
        assert!(matches!(cli.command, Commands::Ingest(_)));
    }
}
