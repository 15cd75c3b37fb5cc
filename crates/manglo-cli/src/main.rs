//! manglo: terminal chat client for the mango disease assistant

mod config;
mod ui;

use std::sync::Arc;

use clap::Parser;
use manglo_api::AssistantClient;
use manglo_chat::{ChatSession, ClientTransport};
use manglo_tui::Theme;

use config::Config;

#[derive(Parser)]
#[command(
    name = "manglo",
    version,
    about = "Chat with the mango disease assistant"
)]
struct Cli {
    /// Base URL of the assistant service
    #[arg(long)]
    server: Option<String>,

    /// Run in plain stdin/stdout mode instead of the TUI
    #[arg(long)]
    plain: bool,

    /// Log filter (tracing env-filter syntax)
    #[arg(long)]
    log_filter: Option<String>,

    /// Write an example config file and exit
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.init_config {
        let path = Config::config_path();
        if path.exists() {
            println!("Config already exists at {}", path.display());
        } else {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            std::fs::write(&path, config::example_config())?;
            println!("Wrote {}", path.display());
        }
        return Ok(());
    }

    let config = Config::load();
    let filter = cli.log_filter.unwrap_or_else(|| config.log_filter.clone());
    init_logging(&filter)?;

    let server = cli.server.unwrap_or_else(|| config.server_url.clone());
    tracing::info!(server = %server, "starting manglo");

    let client = AssistantClient::new(server);
    let transport = Arc::new(ClientTransport::new(client));
    let mut session = ChatSession::new(transport);

    // One auth probe at mount gates whether sending is permitted.
    if !session.check_auth().await {
        tracing::warn!("not authenticated; sending is disabled");
    }

    if cli.plain || !config.tui {
        ui::run_plain(&mut session).await
    } else {
        let theme = if config.light_theme {
            Theme::light()
        } else {
            Theme::dark()
        };
        ui::run_tui(&mut session, theme).await
    }
}

/// Log to a file in the config dir so the TUI screen stays clean
fn init_logging(filter: &str) -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    let dir = Config::config_dir();
    std::fs::create_dir_all(&dir)?;
    let file = std::fs::File::create(dir.join("manglo.log"))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter)?)
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
