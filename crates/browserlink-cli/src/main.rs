use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use browserlink_client::RemoteBrowser;
use browserlink_core::config::Config;
use browserlink_engine::BrowserEngine;
use browserlink_server::{ServerState, start_server};

#[derive(Parser)]
#[command(
    name = "browserlink",
    about = "Serve a browser over WebSocket, or drive a remote one",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the browser server
    Serve {
        /// Port to listen on (default from config: 8765)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Navigate the remote browser to a URL
    Goto {
        url: String,

        #[arg(long, default_value = "ws://127.0.0.1:8765/ws")]
        server_url: String,
    },

    /// Print the remote page's markup
    Content {
        #[arg(long, default_value = "ws://127.0.0.1:8765/ws")]
        server_url: String,
    },

    /// Print the remote page snapshot as JSON
    State {
        #[arg(long, default_value = "ws://127.0.0.1:8765/ws")]
        server_url: String,
    },

    /// Ask a hosting server to run its agent
    Run {
        /// Override the server's bound task
        #[arg(long)]
        task: Option<String>,

        #[arg(long)]
        max_steps: Option<u32>,

        #[arg(long, default_value = "ws://127.0.0.1:8765/ws")]
        server_url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from("browserlink.json5"));
    let config = Config::load(&config_path)?;

    match cli.command {
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.server.port);
            let addr = format!("{}:{port}", config.server.bind);

            let engine = build_engine(&config).await?;
            let state = Arc::new(ServerState::new(config, engine));
            let handle = start_server(state, &addr).await?;

            tokio::signal::ctrl_c().await?;
            tracing::info!("Shutdown signal received");
            handle.shutdown().await;
        }
        Commands::Goto { url, server_url } => {
            let mut browser = RemoteBrowser::new(server_url);
            browser.navigate(&url).await?;
            println!("navigated to {url}");
            browser.close().await;
        }
        Commands::Content { server_url } => {
            let mut browser = RemoteBrowser::new(server_url);
            let content = browser.page_content().await?;
            println!("{content}");
            browser.close().await;
        }
        Commands::State { server_url } => {
            let mut browser = RemoteBrowser::new(server_url);
            let state = browser.browser_state().await?;
            println!("{}", serde_json::to_string_pretty(&state)?);
            browser.close().await;
        }
        Commands::Run {
            task,
            max_steps,
            server_url,
        } => {
            let mut browser = RemoteBrowser::new(server_url);
            let outcome = browser.run_agent(task.as_deref(), max_steps).await?;
            println!(
                "done: {} ({} errors)",
                outcome.is_done,
                outcome.errors.len()
            );
            if let Some(result) = outcome.final_result {
                println!("{result}");
            }
            for error in outcome.errors {
                eprintln!("error: {error}");
            }
            browser.close().await;
        }
    }

    Ok(())
}

#[cfg(feature = "cdp")]
async fn build_engine(config: &Config) -> anyhow::Result<Arc<dyn BrowserEngine>> {
    let engine = browserlink_engine::CdpEngine::launch(&config.browser).await?;
    Ok(Arc::new(engine))
}

#[cfg(not(feature = "cdp"))]
async fn build_engine(_config: &Config) -> anyhow::Result<Arc<dyn BrowserEngine>> {
    tracing::warn!("Built without the `cdp` feature, serving the in-memory engine");
    Ok(Arc::new(browserlink_engine::StubEngine::new()))
}
