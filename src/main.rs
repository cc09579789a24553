use clap::Parser;
use miette::Result;
use tcbom::cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Install miette's fancy error handler for beautiful diagnostics
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.global.log_level())),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let global = &cli.global;
    match cli.command {
        Commands::Search(args) => tcbom::cli::commands::search::run(args, global).await,
        Commands::Sync(args) => tcbom::cli::commands::sync::run(args, global).await,
        Commands::Rules(args) => tcbom::cli::commands::rules::run(args, global).await,
        Commands::Config(cmd) => tcbom::cli::commands::config::run(cmd, global),
        Commands::Completions(args) => tcbom::cli::commands::completions::run(args),
    }
}
