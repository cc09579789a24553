//! `tcbom config` command - Inspect or create the configuration file

use clap::Subcommand;
use console::style;
use miette::{miette, Result};
use std::path::PathBuf;

use crate::cli::helpers::load_config;
use crate::cli::GlobalOpts;
use crate::core::config::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write a config file with default values
    Init(InitArgs),

    /// Print the effective configuration (password hidden)
    Show,

    /// Print where the config file is read from
    Path,
}

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Init(args) => run_init(args, global),
        ConfigCommands::Show => run_show(global),
        ConfigCommands::Path => run_path(global),
    }
}

fn config_path(global: &GlobalOpts) -> Result<PathBuf> {
    global
        .config
        .clone()
        .or_else(Config::default_path)
        .ok_or_else(|| miette!("Cannot determine a config directory; pass --config"))
}

fn run_init(args: InitArgs, global: &GlobalOpts) -> Result<()> {
    let path = config_path(global)?;
    if path.exists() && !args.force {
        return Err(miette!(
            "{} already exists (use --force to overwrite)",
            path.display()
        ));
    }

    let mut config = Config::default();
    config.apply_overrides(global.overrides());
    config.save(&path)?;

    println!(
        "{} Wrote {}",
        style("✓").green(),
        style(path.display()).yellow()
    );
    Ok(())
}

fn run_show(global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    print!("{}", config.to_redacted_yaml()?);
    Ok(())
}

fn run_path(global: &GlobalOpts) -> Result<()> {
    let path = config_path(global)?;
    println!("{}", path.display());
    Ok(())
}
