//! `tcbom rules` command - List revision rules

use miette::Result;

use crate::cli::helpers::{connect, load_config};
use crate::cli::output::render_rules;
use crate::cli::{GlobalOpts, ListFormat};

#[derive(clap::Args, Debug)]
pub struct RulesArgs {
    /// Output format
    #[arg(long, short = 'f', value_enum, default_value_t = ListFormat::Table)]
    pub format: ListFormat,
}

pub async fn run(args: RulesArgs, global: &GlobalOpts) -> Result<()> {
    let mut config = load_config(global)?;
    let mut workflow = connect(&mut config)?;

    let client = workflow.client_mut();
    client.login().await?;
    let rules = client.list_revision_rules().await?;

    print!("{}", render_rules(&rules, args.format)?);
    Ok(())
}
