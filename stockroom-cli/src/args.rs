//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "stockroom")]
#[command(version, about = "Inventory of electronic parts organised in a category tree")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Inventory database (default: the path in settings.json)
    #[arg(long, global = true, env = "STOCKROOM_DB")]
    pub db: Option<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Record kinds addressable from the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Part,
    Category,
    Package,
    Mfr,
}

impl Kind {
    /// Suffix of the per-kind command names (`get_part`, `add_mfr`, ...).
    pub fn command_suffix(self) -> &'static str {
        match self {
            Self::Part => "part",
            Self::Category => "category",
            Self::Package => "package",
            Self::Mfr => "mfr",
        }
    }

    /// The list command for this kind.
    pub fn list_command(self) -> &'static str {
        match self {
            Self::Part => "get_parts",
            Self::Category => "get_categories",
            Self::Package => "get_packages",
            Self::Mfr => "get_mfrs",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the inventory database, seeded with starter records
    Init {
        /// Skip the starter categories, packages and manufacturers
        #[arg(long)]
        empty: bool,
    },

    /// List every record of a kind
    List { kind: Kind },

    /// Show one record
    Get { kind: Kind, name: String },

    /// Add a record given as JSON
    Add { kind: Kind, json: String },

    /// Replace the record stored under ORI_NAME with JSON (may rename it)
    Update {
        kind: Kind,
        ori_name: String,
        json: String,
    },

    /// Delete a record
    Delete { kind: Kind, name: String },

    /// Show the category tree, or the subtree under ROOT
    Tree { root: Option<String> },

    /// Add stock to a part
    Restock { name: String, qty: u32 },

    /// Take stock from a part
    Use { name: String, qty: u32 },

    /// Show recent changes, newest first
    History {
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },

    /// Write every record to a backup file (YAML for .yaml/.yml, JSON otherwise)
    Export { path: PathBuf },

    /// Add the records of a JSON or YAML backup file
    Import { path: PathBuf },

    /// Run a raw dispatcher command with an optional JSON payload
    Invoke {
        command: String,
        payload: Option<String>,
    },

    /// Manage CLI settings
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the current settings
    Show,

    /// Set the default inventory database
    SetDb { path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_db_after_subcommand() {
        let cli = Cli::parse_from(["stockroom", "list", "mfr", "--db", "/tmp/x.db", "-vv"]);
        assert_eq!(cli.global.db, Some(PathBuf::from("/tmp/x.db")));
        assert_eq!(cli.global.verbose, 2);
        assert!(matches!(cli.command, Commands::List { kind: Kind::Mfr }));
    }
}
