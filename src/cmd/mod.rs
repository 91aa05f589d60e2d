mod mask;

use crate::masker::{DEFAULT_COST, MAX_COST, MIN_COST};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sql-masker")]
#[command(author = "Helge Sverre <helge.sverre@gmail.com>")]
#[command(version)]
#[command(
    about = "Mask sensitive column values in MySQL dump INSERT statements",
    long_about = None
)]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// YAML masking rules: table -> column -> template
    #[arg(short, long, required = true)]
    pub config: Option<PathBuf>,

    /// Input SQL dump (default: stdin). Supports .gz, .bz2, .xz, .zst compression
    pub file: Option<PathBuf>,

    /// Output SQL file (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// bcrypt cost for {{ .Hashed }}
    #[arg(long, default_value_t = DEFAULT_COST,
          value_parser = clap::value_parser!(u32).range(MIN_COST as i64..=MAX_COST as i64))]
    pub cost: u32,

    /// Validate the config and exit without reading input
    #[arg(long)]
    pub check: bool,

    /// Do not print a notice for every INSERT statement
    #[arg(short, long)]
    pub quiet: bool,

    /// Print a summary to stderr when done
    #[arg(long)]
    pub stats: bool,

    /// Print the summary (or --check result) as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Completions { shell }) => {
            generate(shell, &mut Cli::command(), "sql-masker", &mut io::stdout());
            Ok(())
        }
        None => {
            let config = cli
                .config
                .ok_or_else(|| anyhow::anyhow!("--config is required"))?;
            mask::run(mask::MaskOptions {
                config,
                file: cli.file,
                output: cli.output,
                cost: cli.cost,
                check: cli.check,
                quiet: cli.quiet,
                stats: cli.stats,
                json: cli.json,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_mask_args() {
        let cli = Cli::try_parse_from([
            "sql-masker",
            "-c",
            "rules.yaml",
            "dump.sql.gz",
            "-o",
            "masked.sql",
            "--cost",
            "4",
            "--quiet",
        ])
        .unwrap();

        assert!(cli.command.is_none());
        assert_eq!(cli.config, Some(PathBuf::from("rules.yaml")));
        assert_eq!(cli.file, Some(PathBuf::from("dump.sql.gz")));
        assert_eq!(cli.output, Some(PathBuf::from("masked.sql")));
        assert_eq!(cli.cost, 4);
        assert!(cli.quiet);
    }

    #[test]
    fn test_default_cost() {
        let cli = Cli::try_parse_from(["sql-masker", "--config", "rules.yaml"]).unwrap();
        assert_eq!(cli.cost, DEFAULT_COST);
        assert!(cli.file.is_none());
    }

    #[test]
    fn test_config_required() {
        assert!(Cli::try_parse_from(["sql-masker", "dump.sql"]).is_err());
    }

    #[test]
    fn test_cost_out_of_range() {
        assert!(Cli::try_parse_from(["sql-masker", "-c", "r.yaml", "--cost", "3"]).is_err());
        assert!(Cli::try_parse_from(["sql-masker", "-c", "r.yaml", "--cost", "32"]).is_err());
    }

    #[test]
    fn test_completions_without_config() {
        let cli = Cli::try_parse_from(["sql-masker", "completions", "bash"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Completions { shell: Shell::Bash })
        ));
    }
}
