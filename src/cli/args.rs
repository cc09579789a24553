//! Command-line arguments

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::completions::CompletionsArgs;
use crate::cli::commands::config::ConfigCommands;
use crate::cli::commands::rules::RulesArgs;
use crate::cli::commands::search::SearchArgs;
use crate::cli::commands::sync::SyncArgs;
use crate::core::config::ConfigOverrides;

#[derive(Parser, Debug)]
#[command(name = "tcbom")]
#[command(author, version, about = "Teamcenter BOM retrieval and Markdown sync")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a BOM and print it
    Search(SearchArgs),

    /// Write a BOM into a folder of Markdown notes
    Sync(SyncArgs),

    /// List the revision rules known to the server
    Rules(RulesArgs),

    /// Inspect or create the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Config file (default: platform config dir)
    #[arg(long, global = true, env = "TCBOM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Server base address, e.g. http://plm.example.com
    #[arg(long, global = true, env = "TCBOM_URL")]
    pub url: Option<String>,

    /// Web-tier port
    #[arg(long, global = true, env = "TCBOM_PORT")]
    pub port: Option<String>,

    /// Web-tier application name
    #[arg(long, global = true, env = "TCBOM_APP")]
    pub app: Option<String>,

    /// Web viewer base address used for note links
    #[arg(long, global = true, env = "TCBOM_AWC_URL")]
    pub awc_url: Option<String>,

    /// User name
    #[arg(long, global = true, env = "TCBOM_USER")]
    pub user: Option<String>,

    /// Password (prompted for when empty and running in a terminal)
    #[arg(long, global = true, env = "TCBOM_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl GlobalOpts {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            url: self.url.clone(),
            port: self.port.clone(),
            app_name: self.app.clone(),
            awc_url: self.awc_url.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
        }
    }

    /// Default log filter for the chosen verbosity
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// How a BOM is printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Indented tree
    #[default]
    Tree,
    /// One row per node with every attribute
    Table,
    Csv,
    Json,
    Yaml,
}

/// How a plain list is printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    #[default]
    Table,
    Json,
    Yaml,
}
