mod api;
mod gateway;

use clap::{Parser, Subcommand};
use solace_channels::email::HttpMailer;
use solace_core::{
    config,
    traits::{Generator, Mailer},
};
use solace_memory::Store;
use solace_providers::openai::OpenAiGenerator;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(
    name = "solace",
    version,
    about = "Solace — proactive wellness companion service"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Solace service.
    Start,
    /// Check config, database, and generator availability.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;

    match cli.command {
        Commands::Start => {
            let _log_guard = init_logging(&cfg)?;

            let generator: Arc<dyn Generator> = Arc::new(OpenAiGenerator::from_config(
                cfg.provider.base_url.clone(),
                cfg.provider.api_key.clone(),
                cfg.provider.model.clone(),
            ));
            if !generator.is_available().await {
                anyhow::bail!(
                    "generator '{}' is not available. Check provider.api_key in {}.",
                    generator.name(),
                    cli.config
                );
            }

            let mailer: Arc<dyn Mailer> = Arc::new(HttpMailer::from_config(
                cfg.mail.base_url.clone(),
                cfg.mail.api_key.clone(),
                cfg.mail.from_address.clone(),
            ));

            let memory = Store::new(&cfg.memory).await?;

            println!("Solace — starting service...");
            let gw = gateway::Gateway::new(
                generator,
                mailer,
                memory,
                cfg.scheduler.clone(),
                cfg.api.clone(),
            );
            gw.run().await?;
        }
        Commands::Status => {
            println!("Solace — Status Check\n");
            println!("Config: {}", cli.config);
            println!("Database: {}", cfg.memory.db_path);
            println!("Model: {}", cfg.provider.model);
            println!();

            let generator = OpenAiGenerator::from_config(
                cfg.provider.base_url.clone(),
                cfg.provider.api_key.clone(),
                cfg.provider.model.clone(),
            );
            println!(
                "  generator: {}",
                if generator.is_available().await {
                    "available"
                } else {
                    "not available"
                }
            );
            println!(
                "  mail: {}",
                if cfg.mail.api_key.is_empty() {
                    "missing api_key"
                } else {
                    "configured"
                }
            );
            println!(
                "  scheduler: {}{}",
                if cfg.scheduler.enabled {
                    "enabled"
                } else {
                    "disabled"
                },
                if cfg.scheduler.fast_mode {
                    " (fast mode)"
                } else {
                    ""
                }
            );
        }
    }

    Ok(())
}

/// Log to stdout and a daily-rotated file under `<data_dir>/logs`.
///
/// The returned guard must stay alive for the file writer to flush.
fn init_logging(
    cfg: &config::Config,
) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    let logs_dir = PathBuf::from(config::shellexpand(&cfg.app.data_dir)).join("logs");
    std::fs::create_dir_all(&logs_dir)?;

    let file_appender = tracing_appender::rolling::daily(&logs_dir, "solace.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.app.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .init();

    Ok(guard)
}
