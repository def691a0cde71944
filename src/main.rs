use std::sync::Arc;

use aa_sandbox::{settings, storage, web};
use clap::Parser;
use miette::Result;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "aa-sandbox",
    version,
    about = "Account Aggregator consent and data-fetch sandbox"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    let settings = settings::Settings::load(&cli.config)?;
    tracing::info!(?settings, "Loaded configuration");

    // connect and migrate
    let store = storage::init(&settings.database).await?;

    web::serve(settings, Arc::new(store)).await?;
    Ok(())
}
