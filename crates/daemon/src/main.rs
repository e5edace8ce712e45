use std::path::PathBuf;

use anyhow::bail;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pipeline::LineSink;
use thermo_daemon::app::{self, Outcome};
use thermo_daemon::cli;
use thermo_daemon::config::load_config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "thermo_daemon=info,pipeline=info,boards=info,thermo_sensor=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Temperature classifier starting...");

    // --- Argument Parsing ---
    let matches = cli::command().get_matches();

    let mut config = load_config(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
    cli::apply_overrides(&matches, &mut config);

    if matches.get_flag("print-config") {
        print!("{}", serde_yaml::to_string(&config)?);
        return Ok(());
    }

    let options = cli::run_options(&matches);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let summary = app::run(config, LineSink::stdout(), options, shutdown).await?;
    if let Outcome::Halted { stage, reason } = summary.outcome {
        bail!("stage '{}' halted: {}", stage, reason);
    }

    tracing::info!("Temperature classifier stopped gracefully.");
    Ok(())
}
