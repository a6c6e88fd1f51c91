use anyhow::Context;
use bookstore_app::bootstrap::Application;
use bookstore_kernel::settings::Settings;
use clap::{Parser, Subcommand};

/// Operate the bookstore service
#[derive(Debug, Parser)]
#[command(name = "bookstore-cli", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply migrations and serve the HTTP API until Ctrl-C
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Print the effective configuration and exit
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load bookstore settings")?;

    if let Command::Config = cli.command {
        println!("{:#?}", settings);
        return Ok(());
    }

    bookstore_telemetry::init(&settings.telemetry)?;

    match cli.command {
        Command::Serve => {
            let app = Application::build(&settings).await?;
            app.serve(&settings).await
        }
        Command::Migrate => {
            // `build` applies anything pending
            let app = Application::build(&settings).await?;
            let registered = app.registry.collect_migrations().len();
            tracing::info!(registered, "database schema is current");
            println!("{} migrations registered; database is up to date", registered);
            Ok(())
        }
        Command::Config => Ok(()),
    }
}
