//! `tcbom sync` command - Write a BOM into a folder of Markdown notes

use miette::Result;
use std::path::PathBuf;

use crate::cli::helpers::{connect, load_config, load_tree, print_sync_report};
use crate::cli::GlobalOpts;
use crate::sync::reconcile::reconcile;
use crate::sync::store::FsStore;

#[derive(clap::Args, Debug)]
pub struct SyncArgs {
    /// Item number to fetch before syncing
    #[arg(requires = "revision")]
    pub item: Option<String>,

    /// Revision label to fetch before syncing
    pub revision: Option<String>,

    /// Sync a tree saved with `search --save` instead of fetching one
    #[arg(long, value_name = "FILE", conflicts_with = "item")]
    pub from: Option<PathBuf>,

    /// Folder the notes are written into
    #[arg(long, value_name = "DIR")]
    pub vault: PathBuf,
}

pub async fn run(args: SyncArgs, global: &GlobalOpts) -> Result<()> {
    let mut config = load_config(global)?;
    let mut store = FsStore::new(&args.vault);

    let report = match (&args.item, &args.revision, &args.from) {
        (Some(item), Some(revision), _) => {
            let mut workflow = connect(&mut config)?;
            let searched = workflow.search(item, revision).await.map(|_| ());
            workflow.close().await;
            searched?;
            workflow.sync(&mut store, &config.sync)?
        }
        (_, _, Some(path)) => {
            let tree = load_tree(path)?;
            reconcile(
                &mut store,
                Some(&tree),
                &config.attributes,
                &config.server,
                &config.sync,
            )?
        }
        _ => reconcile(
            &mut store,
            None,
            &config.attributes,
            &config.server,
            &config.sync,
        )?,
    };

    print_sync_report(&report, &args.vault, &config.sync.root_folder);
    Ok(())
}
