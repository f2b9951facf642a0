//! TCP accept loop.

use crate::{auth::Authenticator, connection::Connection, keys::ServerKeys, stream::ConnectionClosed};
use anyhow::Context;
use socket2::SockRef;
use std::{io, sync::Arc};
use tokio::{
    net::{TcpListener, TcpStream},
    select,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

/// Accepts connections until `shutdown` fires, handing each socket to
/// its own connection task.
pub async fn run<A: Authenticator>(
    listener: TcpListener,
    keys: Arc<ServerKeys>,
    authenticator: Arc<A>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = select! {
            _ = shutdown.cancelled() => {
                info!("no longer accepting connections");
                return Ok(());
            }
            accepted = listener.accept() => {
                accepted.context("failed to accept next connection")?
            }
        };

        if let Err(e) = prepare_socket(&socket) {
            warn!(%peer, "failed to set socket options: {e:#}");
        }
        info!(%peer, "new connection");

        let connection = Connection::new(
            Arc::clone(&keys),
            Arc::clone(&authenticator),
            shutdown.child_token(),
        );
        tokio::spawn(
            async move {
                match connection.run(socket).await {
                    Ok(()) => info!("connection finished"),
                    Err(e) if e.downcast_ref::<ConnectionClosed>().is_some() => {
                        info!("connection closed by peer")
                    }
                    Err(e) => info!("connection lost: {e:#}"),
                }
            }
            .instrument(info_span!("connection", %peer)),
        );
    }
}

fn prepare_socket(socket: &TcpStream) -> io::Result<()> {
    socket.set_nodelay(true)?;
    SockRef::from(socket).set_keepalive(true)?;
    Ok(())
}
