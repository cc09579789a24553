//! `tcbom search` command - Fetch a BOM and print it

use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::helpers::{connect, load_config, save_tree};
use crate::cli::output::render_bom;
use crate::cli::{GlobalOpts, OutputFormat};

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Item number, e.g. 1001
    pub item: String,

    /// Revision label, e.g. A
    pub revision: String,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Tree)]
    pub format: OutputFormat,

    /// Also save the tree to FILE (JSON, or YAML for .yaml/.yml) for `sync --from`
    #[arg(long, value_name = "FILE")]
    pub save: Option<PathBuf>,

    /// Revision rule uid to configure the structure with (see `tcbom rules`)
    #[arg(long, value_name = "UID")]
    pub rule: Option<String>,
}

pub async fn run(args: SearchArgs, global: &GlobalOpts) -> Result<()> {
    let mut config = load_config(global)?;
    let mut workflow = connect(&mut config)?;
    if let Some(uid) = &args.rule {
        workflow.select_revision_rule(uid).await?;
    }

    let result = workflow.search(&args.item, &args.revision).await.cloned();
    workflow.close().await;
    let tree = result?;

    print!("{}", render_bom(&tree, &config.attributes, args.format)?);

    if let Some(path) = &args.save {
        save_tree(&tree, path)?;
        eprintln!(
            "{} Saved {} node(s) to {}",
            style("✓").green(),
            style(tree.node_count()).cyan(),
            style(path.display()).yellow()
        );
    }
    Ok(())
}
