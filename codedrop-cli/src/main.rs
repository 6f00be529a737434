use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use codedrop_client::{
    CancelHandle, ConnectionCoordinator, CoordinatorConfig, MAX_PAYLOAD_SIZE, TransportConfig,
    TransportEvent, WebRtcTransport, WsSignalingChannel,
};
use codedrop_core::{Code, TransferPayload};
use codedrop_server::{DEFAULT_BIND, RelayConfig, run_relay};
use colored::*;
use dialoguer::Input;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_RELAY_URL: &str = "ws://127.0.0.1:3001/ws";

/// How long the sender keeps the link open for the receiver to drain it.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(name = "codedrop", version, about = "Send text and files peer to peer with a 6-digit code")]
struct Cli {
    /// Log filter, e.g. `info` or `codedrop_client=debug`
    #[arg(long, global = true, env = "CODEDROP_LOG", default_value = "info")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay
    Serve {
        #[arg(long, env = "CODEDROP_BIND", default_value = DEFAULT_BIND)]
        bind: SocketAddr,

        /// Seconds before an unanswered code expires
        #[arg(long, env = "CODEDROP_SESSION_MAX_AGE_SECS", default_value_t = 300)]
        session_max_age: u64,

        #[arg(long, env = "CODEDROP_SWEEP_INTERVAL_SECS", default_value_t = 30)]
        sweep_interval: u64,
    },

    /// Publish a code and send text or a file to whoever enters it
    Send {
        #[arg(long, env = "CODEDROP_RELAY_URL", default_value = DEFAULT_RELAY_URL)]
        relay: String,

        #[arg(long, conflicts_with = "file")]
        text: Option<String>,

        #[arg(long)]
        file: Option<PathBuf>,

        /// MIME type of `--file`; guessed from the extension when omitted
        #[arg(long, requires = "file")]
        mime: Option<String>,
    },

    /// Enter a code and receive what the sender offers
    Receive {
        #[arg(long, env = "CODEDROP_RELAY_URL", default_value = DEFAULT_RELAY_URL)]
        relay: String,

        /// Prompted for when omitted
        #[arg(long)]
        code: Option<String>,

        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Serve {
            bind,
            session_max_age,
            sweep_interval,
        } => {
            let config = RelayConfig {
                bind,
                session_max_age: Duration::from_secs(session_max_age),
                sweep_interval: Duration::from_secs(sweep_interval.max(1)),
                ..RelayConfig::default()
            };
            println!("{}", format!("📡 Relay starting on {}", bind).green().bold());
            run_relay(config).await
        }
        Commands::Send {
            relay,
            text,
            file,
            mime,
        } => {
            let payload = load_payload(text, file, mime)?;
            send(&relay, payload).await
        }
        Commands::Receive {
            relay,
            code,
            out_dir,
        } => receive(&relay, code, &out_dir).await,
    }
}

fn load_payload(
    text: Option<String>,
    file: Option<PathBuf>,
    mime: Option<String>,
) -> Result<TransferPayload> {
    match (text, file) {
        (Some(text), None) => Ok(TransferPayload::text(text)),
        (None, Some(path)) => {
            let size = fs::metadata(&path)
                .with_context(|| format!("failed to stat {}", path.display()))?
                .len();
            ensure_sendable(size)?;
            let content =
                fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .context("file path has no file name")?;
            let mime = mime.or_else(|| guess_mime(&path).map(str::to_owned));
            Ok(TransferPayload::file(name, mime, content))
        }
        _ => bail!("pass exactly one of --text or --file"),
    }
}

fn ensure_sendable(size: u64) -> Result<()> {
    if size > MAX_PAYLOAD_SIZE as u64 {
        bail!(
            "file is {} bytes, the most a transfer can carry is {}",
            size,
            MAX_PAYLOAD_SIZE
        );
    }
    Ok(())
}

fn guess_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        _ => return None,
    };
    Some(mime)
}

/// Ctrl-C cancels the running coordinator.
fn cancel_on_ctrl_c(cancel: CancelHandle) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("{}", "Cancelling...".yellow());
            cancel.cancel();
        }
    });
}

async fn connect(
    relay: &str,
) -> Result<(ConnectionCoordinator, WebRtcTransport, mpsc::Receiver<TransportEvent>)> {
    let channel = Arc::new(WsSignalingChannel::connect(relay).await?);
    let transport_config = TransportConfig::with_ice_servers(channel.ice_servers().to_vec());
    let (transport, events) = WebRtcTransport::new(transport_config).await?;
    let coordinator = ConnectionCoordinator::new(channel, CoordinatorConfig::default());
    cancel_on_ctrl_c(coordinator.cancel_handle());
    Ok((coordinator, transport, events))
}

async fn send(relay: &str, payload: TransferPayload) -> Result<()> {
    let (coordinator, transport, events) = connect(relay).await?;

    let mut link = coordinator
        .run_initiator(transport, events, |code| {
            println!("{}", "🔑 Share this code with the receiver:".cyan());
            println!("   {}", code.as_str().bold());
        })
        .await?;

    println!("{}", "🔗 Connected, sending...".green());
    link.send(&payload).await?;

    // the receiver closes the link once it has the payload
    match tokio::time::timeout(DRAIN_TIMEOUT, link.recv()).await {
        Ok(Some(unexpected)) => debug!("Ignoring {} payload from receiver", unexpected.kind()),
        Ok(None) => {}
        Err(_) => info!("Receiver did not close the link in time"),
    }

    link.close().await?;
    println!("{}", "✨ Sent.".green().bold());
    Ok(())
}

async fn receive(relay: &str, code: Option<String>, out_dir: &Path) -> Result<()> {
    let code = match code {
        Some(code) => code,
        None => Input::<String>::new()
            .with_prompt("Code")
            .interact_text()
            .context("failed to read code")?,
    };
    let code: Code = code.parse()?;

    let (coordinator, transport, events) = connect(relay).await?;
    let mut link = coordinator.run_responder(code, transport, events).await?;
    println!("{}", "🔗 Connected, waiting for data...".green());

    let payload = link.recv().await;
    link.close().await?;

    match payload {
        Some(TransferPayload::Text { content }) => {
            println!("{}", "📝 Received text:".cyan());
            println!("{}", content);
        }
        Some(TransferPayload::File {
            name,
            mime_type,
            size,
            content,
        }) => {
            let path = out_dir.join(safe_file_name(&name));
            fs::write(&path, &content)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!(
                "{} {} ({} bytes, {})",
                "📂 Saved".green().bold(),
                path.display(),
                size,
                mime_type.as_deref().unwrap_or("unknown type")
            );
        }
        None => bail!("peer closed the link before sending anything"),
    }
    Ok(())
}

/// Keep only the final path component of a name chosen by the peer.
fn safe_file_name(name: &str) -> String {
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "received.bin".to_owned())
}
