use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use ellen_chat::auth::LoggingAuthHandoff;
use ellen_chat::channels::CliChannel;
use ellen_chat::chat::state::fields;
use ellen_chat::chat::{ChatDeps, ChatRouteState, ChatSession, FlowKind, SessionHub, chat_routes};
use ellen_chat::config::ChatConfig;
use ellen_chat::llm::create_service;
use ellen_chat::scripts;
use ellen_chat::store::{LibSqlSessionStore, SessionStore};

#[derive(Parser)]
#[command(name = "ellen-chat", version, about = "Guided mortgage chat")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Chat in the terminal
    Chat {
        /// Flow slug, e.g. `ellen`, `ellen-refinance`, `first-time-buyer`
        #[arg(default_value = "ellen")]
        flow: String,
        /// First name; required to start a flow that greets by name
        #[arg(long)]
        first_name: Option<String>,
        /// Print messages without reveal delays
        #[arg(long)]
        no_pacing: bool,
    },
    /// Serve the chat REST API
    Serve {
        /// Overrides ELLEN_HTTP_PORT
        #[arg(long)]
        port: Option<u16>,
    },
    /// List the available flows
    Flows,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ChatConfig::from_env();

    match cli.command {
        Command::Flows => {
            for flow in scripts::all_flows() {
                println!("{flow}");
            }
            Ok(())
        }
        Command::Chat {
            flow,
            first_name,
            no_pacing,
        } => {
            let flow: FlowKind = flow.parse()?;
            let mut seed = BTreeMap::new();
            if let Some(name) = first_name {
                seed.insert(fields::FIRST_NAME.to_string(), name);
            }

            let deps = build_deps(&config).await?;
            eprintln!("Ellen v{} ({flow})", env!("CARGO_PKG_VERSION"));
            eprintln!("   Database: {}", config.db_path.display());
            eprintln!("   Type a number to press a button. /reset to start over, /quit to exit.\n");

            let session = ChatSession::open(flow, seed, deps).await?;
            CliChannel::new(config.pacing && !no_pacing)
                .run(&session)
                .await?;
            Ok(())
        }
        Command::Serve { port } => {
            let port = port.unwrap_or(config.http_port);
            let deps = build_deps(&config).await?;
            let app = chat_routes(ChatRouteState {
                hub: Arc::new(SessionHub::new(deps)),
            });

            let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
                .await
                .with_context(|| format!("Failed to bind port {port}"))?;
            eprintln!("Ellen v{}", env!("CARGO_PKG_VERSION"));
            eprintln!("   Chat API: http://0.0.0.0:{port}/api/chat/{{visitor}}/{{flow}}");
            tracing::info!(port, "Chat server started");
            axum::serve(listener, app).await.context("Chat server failed")?;
            Ok(())
        }
    }
}

async fn build_deps(config: &ChatConfig) -> anyhow::Result<ChatDeps> {
    let store: Arc<dyn SessionStore> = Arc::new(
        LibSqlSessionStore::new_local(&config.db_path)
            .await
            .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?,
    );
    let completions = create_service(config)?;
    tracing::info!(service = completions.name(), "Completion service ready");

    Ok(ChatDeps {
        store,
        completions,
        auth: Arc::new(LoggingAuthHandoff),
    })
}
