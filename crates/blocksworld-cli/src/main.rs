//! Command-line entry point: loads configuration, wires up tracing, and
//! runs the HTTP/interactive server until a `Quit` action or Ctrl+C stops
//! it.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use blocksworld_server::config::ServerConfig;
use clap::Parser;

#[derive(Parser)]
#[command(name = "blocksworld")]
#[command(about = "Blocks-world simulator: HTTP and interactive command surfaces", version)]
struct Cli {
    /// Path to a YAML config file. Defaults built into `ServerConfig` are
    /// used if omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the config's HTTP bind address.
    #[arg(long)]
    http_addr: Option<SocketAddr>,

    /// Directory of `*.json` scenario files, loaded at startup.
    #[arg(long)]
    scenario_dir: Option<PathBuf>,

    /// Enables the stdin-line interactive surface alongside HTTP.
    #[arg(long)]
    interactive: bool,

    /// Verbose (debug) logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ServerConfig::load_optional(cli.config.as_deref())?;
    blocksworld_server::init_tracing(config.log_format, cli.verbose);

    if let Some(addr) = cli.http_addr {
        config.http_addr = addr;
    }
    if let Some(dir) = cli.scenario_dir {
        config.scenario_dir = Some(dir);
    }
    if cli.interactive {
        config.interactive = true;
    }

    if let Err(err) = blocksworld_server::run(config).await {
        tracing::error!(error = %err, "blocksworld-server exited with an error");
        std::process::exit(1);
    }

    Ok(())
}
