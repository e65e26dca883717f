use anyhow::Result;
use clap::Parser;

use formwizard::config::Config;
use formwizard::logging::init_logging;
use formwizard::rest::{self, AppState};

#[derive(Parser)]
#[command(name = "formwizard")]
#[command(about = "Demo checkout wizard server")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Force debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let _logging = init_logging(&config, cli.debug)?;
    tracing::debug!(?config, "configuration loaded");

    let port = config.server.port;
    let state = AppState::new(&config);
    rest::serve(state, port).await
}
