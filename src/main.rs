use clap::Parser;
use inkpot::cli::{Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkpot=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init { path, name }) => {
            inkpot::cli::init::run(path, name).await?;
        }
        Some(Commands::Serve { host, port }) => {
            inkpot::cli::serve::run(&cli.config, host, port).await?;
        }
        Some(Commands::Migrate) => {
            inkpot::cli::migrate::run(&cli.config).await?;
        }
        Some(Commands::Author { command }) => {
            inkpot::cli::author::run(&cli.config, command).await?;
        }
        Some(Commands::Category { command }) => {
            inkpot::cli::taxonomy::run_category(&cli.config, command).await?;
        }
        Some(Commands::Tag { command }) => {
            inkpot::cli::taxonomy::run_tag(&cli.config, command).await?;
        }
        Some(Commands::Post { command }) => {
            inkpot::cli::post::run(&cli.config, command).await?;
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
        }
    }

    Ok(())
}
