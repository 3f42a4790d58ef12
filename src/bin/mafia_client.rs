use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

use mafia_client::client::SessionClient;
use mafia_client::config::ClientConfig;
use mafia_client::connection::{ReconnectPolicy, WsConnector};
use mafia_client::lobby::LobbyClient;
use mafia_client::ui::{self, UserCommand};

const LOG_TARGET: &str = "bin::mafia_client";
const DEFAULT_SERVER: &str = "http://127.0.0.1:8080/";

#[derive(Debug, Parser)]
#[command(name = "mafia_client")]
#[command(about = "Join a mafia session from the terminal", long_about = None)]
struct Args {
    /// HTTP base URL of the session controller
    #[arg(long, env = "MAFIA_SERVER_URL", default_value = DEFAULT_SERVER)]
    server: Url,

    /// Display name shown to other participants
    #[arg(long, env = "MAFIA_NAME")]
    name: String,

    /// Join an existing session; a new one is created when omitted
    #[arg(long, env = "MAFIA_SESSION_ID")]
    session: Option<String>,

    #[arg(long, env = "MAFIA_HANDSHAKE_TIMEOUT_SECS", default_value_t = 10)]
    handshake_timeout_secs: u64,

    #[arg(long, env = "MAFIA_HEARTBEAT_SECS", default_value_t = 15)]
    heartbeat_secs: u64,

    /// Consecutive failed connection attempts before giving up (0 = never)
    #[arg(long, env = "MAFIA_MAX_RECONNECTS", default_value_t = 8)]
    max_reconnects: u32,

    /// Toggle structured (JSON) logs
    #[arg(long, env = "MAFIA_LOG_JSON", default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    let args = Args::parse();
    init_tracing(args.json)?;
    let config = build_config(args);
    run(config).await
}

fn load_dotenv() {
    let manifest_env_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(".env");
    dotenv::from_filename(manifest_env_path).ok();
    dotenv::dotenv().ok();
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = fmt::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().flatten_event(true).init();
    } else {
        builder.compact().init();
    }

    Ok(())
}

fn build_config(args: Args) -> ClientConfig {
    let reconnect = ReconnectPolicy {
        max_attempts: (args.max_reconnects > 0).then_some(args.max_reconnects),
        ..ReconnectPolicy::default()
    };
    let config = ClientConfig::new(args.server, args.name)
        .with_handshake_timeout(Duration::from_secs(args.handshake_timeout_secs))
        .with_heartbeat_interval(Duration::from_secs(args.heartbeat_secs.max(1)))
        .with_reconnect(reconnect);
    match args.session {
        Some(session) => config.with_session_id(session),
        None => config,
    }
}

async fn run(config: ClientConfig) -> Result<()> {
    let lobby = LobbyClient::new(config.server_url.clone()).context("invalid server url")?;
    let session_id = match &config.session_id {
        Some(id) => id.clone(),
        None => {
            let id = lobby
                .create_session()
                .await
                .context("failed to create session")?;
            println!("🎲 Created session {id}; others can join with --session {id}");
            id
        }
    };
    let ticket = lobby
        .join_session(&session_id, &config.display_name)
        .await
        .context("failed to join session")?;
    info!(target = LOG_TARGET, url = %ticket.channel_url, "connecting");

    let connector = WsConnector::new(ticket.channel_url.clone(), config.handshake_timeout);
    let client = SessionClient::spawn(&config, ticket.identity.clone(), connector);
    let mut snapshots = client.snapshots();
    let mut status = client.status();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{}", ui::HELP);
    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                print!("{}", ui::render(&snapshot));
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                println!("🔌 {}", ui::status_line(&current));
                if current.is_terminal() {
                    break;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                let snapshot = client.snapshot();
                match ui::parse(&line, &snapshot) {
                    Ok(UserCommand::Intent(intent)) => {
                        if let Err(err) = client.submit(intent).await {
                            println!("❌ {err}");
                        }
                    }
                    Ok(UserCommand::Help) => println!("{}", ui::HELP),
                    Ok(UserCommand::Quit) => break,
                    Err(err) => println!("❌ {err}"),
                }
            }
        }
    }

    if let Err(err) = tokio::time::timeout(Duration::from_secs(5), client.leave()).await {
        warn!(target = LOG_TARGET, error = %err, "leave did not finish in time");
    }
    Ok(())
}
