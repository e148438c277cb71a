//! DuckChat command-line client.
//!
//! # Usage
//!
//! ```bash
//! # List the signed-in user's rooms
//! duckchat --user 65f0 rooms
//!
//! # Chat in a room: stdin lines are sent, /refresh reloads history,
//! # /leave or EOF leaves
//! duckchat --user 65f0 chat 65f1 general
//! ```

use std::{io::Write, path::PathBuf};

use clap::{Parser, Subcommand};
use duckchat_app::{RoomCommand, RoomDirectory, RoomUpdate, Runtime, open_room};
use duckchat_client::{ClientConfig, RestClient, SocketIoDriver, SystemEnv};
use duckchat_core::{Room, StreamEvent, UserId, resolve_identity};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// DuckChat room client
#[derive(Parser, Debug)]
#[command(name = "duckchat")]
#[command(about = "Real-time chat rooms from the terminal")]
#[command(version)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// REST API base URL (overrides config)
    #[arg(long)]
    api_url: Option<String>,

    /// Live channel base URL (overrides config)
    #[arg(long)]
    socket_url: Option<String>,

    /// Signed-in user id (overrides config)
    #[arg(short, long)]
    user: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the signed-in user's rooms
    Rooms,

    /// Join a room and chat
    Chat {
        /// Room id
        room_id: String,
        /// Room name
        room_name: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mut config = match &args.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    if let Some(url) = args.api_url {
        config.api_url = url;
    }
    if let Some(url) = args.socket_url {
        config.socket_url = url;
    }
    if let Some(user) = args.user {
        config.user = Some(user);
    }

    let rest = RestClient::new(&config)?;

    match args.command {
        Command::Rooms => list_rooms(&rest).await,
        Command::Chat { room_id, room_name } => {
            chat(&config, rest, Room::new(room_id, room_name)).await
        },
    }
}

async fn list_rooms(rest: &RestClient) -> Result<(), Box<dyn std::error::Error>> {
    let identity = resolve_identity(rest).await?;
    let rooms = rest.list_rooms(identity.id()).await?;

    let mut out = std::io::stdout().lock();
    for room in rooms {
        writeln!(out, "{}\t{}", room.id, room.name)?;
    }
    Ok(())
}

async fn chat(
    config: &ClientConfig,
    rest: RestClient,
    room: Room,
) -> Result<(), Box<dyn std::error::Error>> {
    let identity = open_room(&rest, &rest, &room).await?;
    let endpoint = config.socket_endpoint()?;
    tracing::info!(room = %room.id, %endpoint, "opening room");

    let me = identity.id().clone();
    let env = SystemEnv::new();
    let driver = SocketIoDriver::new(env, config.reconnect_policy());
    let runtime = Runtime::new(driver, rest, env, room, identity, endpoint.as_str());

    let (commands_tx, commands_rx) = mpsc::channel(32);
    let (updates_tx, mut updates_rx) = mpsc::unbounded_channel();

    let input = tokio::spawn(read_commands(commands_tx));
    let output = tokio::spawn(async move {
        while let Some(update) = updates_rx.recv().await {
            if let Err(e) = render(&update, &me) {
                tracing::warn!(error = %e, "stdout closed");
                break;
            }
        }
    });

    let result = runtime.run(commands_rx, updates_tx).await;
    input.abort();
    let _ = output.await;

    Ok(result?)
}

/// Translate stdin lines into room commands until `/leave` or EOF.
async fn read_commands(commands: mpsc::Sender<RoomCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let command = match lines.next_line().await {
            Ok(Some(line)) if line.trim() == "/leave" => RoomCommand::Leave,
            Ok(Some(line)) if line.trim() == "/refresh" => RoomCommand::RefreshHistory,
            Ok(Some(line)) => RoomCommand::Send(line),
            Ok(None) => RoomCommand::Leave,
            Err(e) => {
                tracing::warn!(error = %e, "stdin read failed");
                RoomCommand::Leave
            },
        };

        let leaving = command == RoomCommand::Leave;
        if commands.send(command).await.is_err() || leaving {
            return;
        }
    }
}

fn render(update: &RoomUpdate, me: &UserId) -> std::io::Result<()> {
    let mut out = std::io::stdout().lock();

    match update {
        RoomUpdate::Stream(StreamEvent::Appended { message, .. }) => {
            let marker = if message.is_from(me) { " (you)" } else { "" };
            writeln!(out, "[{}{marker}] {}", message.author_name, message.body)
        },
        RoomUpdate::Stream(StreamEvent::HistoryUnavailable { reason }) => {
            writeln!(out, "! history unavailable, showing live messages only: {reason}")
        },
        RoomUpdate::Connection(change) => writeln!(out, "* connection {:?}", change.to),
        RoomUpdate::Status(status) => writeln!(out, "* room {status:?}"),
        RoomUpdate::SendFailed { reason } => writeln!(out, "! not sent: {reason}"),
    }
}
