//! Transport, process wiring, and observability for the blocks-world
//! simulator. `blocksworld-core` knows nothing of HTTP, tokio, or terminal
//! I/O; this crate is where all three live (SPEC_FULL §2).

pub mod bridge;
pub mod config;
pub mod http;
pub mod interactive;
pub mod render;

use std::sync::Arc;

use anyhow::{Context, Result};
use blocksworld_core::{Sim, ScenarioRegistry};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub use config::{LogFormat, ServerConfig};

/// Initialises the global `tracing` subscriber in the format `config`
/// requests. Structured JSON is for production deployments behind a log
/// aggregator; text is for a developer's terminal. `RUST_LOG` always wins
/// over `verbose` when set.
pub fn init_tracing(format: LogFormat, verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    match format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }
}

/// Builds the scenario registry per `config.scenario_dir`: an unset
/// directory starts with an empty registry rather than erroring, matching a
/// fresh install with no authored scenarios yet.
pub fn load_scenarios(config: &ServerConfig) -> Result<ScenarioRegistry> {
    match &config.scenario_dir {
        Some(dir) => ScenarioRegistry::load_dir(dir)
            .with_context(|| format!("failed to load scenarios from {}", dir.display())),
        None => Ok(ScenarioRegistry::empty()),
    }
}

/// Starts the tick loop and serves HTTP until a `Quit` action is dispatched
/// or the process receives Ctrl+C, whichever comes first.
pub async fn run(config: ServerConfig) -> Result<()> {
    let scenarios = load_scenarios(&config)?;
    let scenarios_for_listing = Arc::new(scenarios.clone());

    let sim = Sim::new(scenarios, config.to_sim_config());
    let interactive: Box<dyn interactive::InteractiveIngest> = if config.interactive {
        Box::new(interactive::StdinIngest::spawn())
    } else {
        Box::new(interactive::NullInteractiveIngest)
    };
    let renderer: Box<dyn render::Renderer> = Box::new(render::LoggingRenderer);

    let bridge = bridge::spawn(sim, interactive, renderer);
    let state = http::app_state(bridge.inbound, scenarios_for_listing);
    let app = http::router(state);

    let listener = TcpListener::bind(config.http_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.http_addr))?;
    info!(
        addr = %config.http_addr,
        started_at = %chrono::Local::now().to_rfc3339(),
        "blocksworld-server listening"
    );

    let quit_rx = bridge.quit_rx;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = quit_rx => {}
                _ = tokio::signal::ctrl_c() => {}
            }
        })
        .await
        .context("HTTP server error")?;

    Ok(())
}
