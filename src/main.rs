use anyhow::Context;
use clap::Parser;
use minecraft_endpoint::{auth::MojangAuthenticator, keys::ServerKeys, server};
use std::sync::Arc;
use tokio::{net::TcpListener, select};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Port to listen on.
    #[arg(long, default_value_t = 25565)]
    port: u16,

    /// Whether verbose logging should be enabled.
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let keys = Arc::new(ServerKeys::generate()?);
    let authenticator = Arc::new(MojangAuthenticator::new());

    let listener = TcpListener::bind(("127.0.0.1", args.port))
        .await
        .with_context(|| format!("failed to listen on port {}", args.port))?;
    info!(port = args.port, "listening");

    let shutdown = CancellationToken::new();
    select! {
        result = server::run(listener, keys, authenticator, shutdown.clone()) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
            shutdown.cancel();
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "minecraft_endpoint=debug"
    } else {
        "minecraft_endpoint=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}
