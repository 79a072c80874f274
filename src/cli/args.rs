//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint};

use crate::domain::{NodeId, SwitchSide, UnlockRule};

/// Enumerate and index every valid point configuration of a talent tree
#[derive(Parser, Debug)]
#[command(name = "tsolve")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub debug: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a tree file and report its size
    Check {
        #[arg(value_hint = ValueHint::FilePath)]
        tree: PathBuf,
    },

    /// Show the prerequisite graph as a tree
    Show {
        #[arg(value_hint = ValueHint::FilePath)]
        tree: PathBuf,
    },

    /// Enumerate all configurations and print per-budget counts
    Solve {
        #[arg(value_hint = ValueHint::FilePath)]
        tree: PathBuf,

        /// Highest budget to enumerate (default: every free point)
        #[arg(short, long)]
        limit: Option<u32>,

        #[command(flatten)]
        solver: SolverArgs,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Print the decoded configurations of one page of a budget
    Page {
        #[arg(value_hint = ValueHint::FilePath)]
        tree: PathBuf,

        /// Budget (points spent) to page through
        #[arg(short, long)]
        budget: u32,

        /// Zero-based page number
        #[arg(short, long, default_value_t = 0)]
        page: usize,

        /// Entries per page (default from config)
        #[arg(short = 's', long)]
        page_size: Option<usize>,

        #[command(flatten)]
        solver: SolverArgs,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show {
        /// Tree file whose directory may hold a local .tsolve.toml
        #[arg(value_hint = ValueHint::FilePath)]
        tree: Option<PathBuf>,
    },
    /// Create a config template
    Init {
        /// Write the global config instead of one in the current directory
        #[arg(short, long)]
        global: bool,
    },
    /// Show config file locations
    Path,
}

/// Overrides for the solver section of the settings.
#[derive(Args, Debug, Default, Clone)]
pub struct SolverArgs {
    /// Prerequisite rule: any-rank or maxed
    #[arg(long)]
    pub rule: Option<UnlockRule>,

    /// Worker threads (0 = one per core)
    #[arg(long)]
    pub threads: Option<usize>,
}

/// Partial constraint applied to the results.
#[derive(Args, Debug, Default, Clone)]
pub struct FilterArgs {
    /// Require a node at this rank or higher: ID=RANK
    #[arg(long = "pin", value_name = "ID=RANK", value_parser = parse_pin)]
    pub pins: Vec<(NodeId, u8)>,

    /// Require a node to stay empty
    #[arg(long = "exclude", value_name = "ID")]
    pub excludes: Vec<NodeId>,

    /// Require a switch node taken on one side: ID=first|second
    #[arg(long = "side", value_name = "ID=SIDE", value_parser = parse_side)]
    pub sides: Vec<(NodeId, SwitchSide)>,
}

impl FilterArgs {
    pub fn is_empty(&self) -> bool {
        self.pins.is_empty() && self.excludes.is_empty() && self.sides.is_empty()
    }
}

fn split_pair(s: &str) -> Result<(NodeId, &str), String> {
    let (id, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ID=VALUE, got '{s}'"))?;
    let id = id
        .trim()
        .parse()
        .map_err(|_| format!("invalid node id '{id}'"))?;
    Ok((id, value.trim()))
}

fn parse_pin(s: &str) -> Result<(NodeId, u8), String> {
    let (id, rank) = split_pair(s)?;
    let rank = rank
        .parse()
        .map_err(|_| format!("invalid rank '{rank}'"))?;
    Ok((id, rank))
}

fn parse_side(s: &str) -> Result<(NodeId, SwitchSide), String> {
    let (id, side) = split_pair(s)?;
    Ok((id, side.parse()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_pin_argument_when_parsing_then_splits_id_and_rank() {
        assert_eq!(parse_pin("12=3"), Ok((12, 3)));
        assert!(parse_pin("12").is_err());
        assert!(parse_pin("x=1").is_err());
    }

    #[test]
    fn given_side_argument_when_parsing_then_accepts_names() {
        assert_eq!(parse_side("4=second"), Ok((4, SwitchSide::Second)));
        assert!(parse_side("4=middle").is_err());
    }

    #[test]
    fn given_filter_flags_when_parsing_cli_then_collects_all() {
        let cli = Cli::try_parse_from([
            "tsolve", "solve", "tree.toml", "--pin", "1=2", "--exclude", "3", "--side", "4=first",
            "--rule", "maxed",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Solve { filter, solver, .. }) => {
                assert_eq!(filter.pins, vec![(1, 2)]);
                assert_eq!(filter.excludes, vec![3]);
                assert_eq!(filter.sides, vec![(4, SwitchSide::First)]);
                assert_eq!(solver.rule, Some(UnlockRule::Maxed));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
