//! Per-connection protocol state machine.
//!
//! Drives a single accepted socket through the handshake and then
//! either the status exchange or the login and configuration phases.
//! The wire phase is encoded in the packet stream's type; this module
//! additionally tracks the finer-grained progression used to gate
//! transitions and disconnect notifications.

use crate::{
    auth::{self, AuthError, Authenticator, GameProfile},
    keepalive::KeepAlive,
    keys::ServerKeys,
    protocol::{
        cfb8::EncryptionKey,
        packet::{client, server, side, state},
        DecodeError,
    },
    status,
    stream::PacketStream,
    text::TextComponent,
};
use anyhow::{anyhow, Context};
use rand::RngCore;
use std::sync::Arc;
use tokio::{net::TcpStream, select};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Sent in the encryption request and hashed into the session digest.
/// Empty for this server.
const SERVER_ID: &str = "";

/// Connection progression. Totally ordered: a connection that has
/// advanced past a state never re-enters it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ServerState {
    PreHandshake,
    ClientRequestingStatus,
    ClientRequestingLogin,
    EncryptionRequested,
    LoginCompletePendingAcknowledgement,
    LoginComplete,
    ConfigurationComplete,
}

type ServerStream<State> = PacketStream<side::Server, State>;

pub struct Connection<A> {
    state: ServerState,
    keys: Arc<ServerKeys>,
    authenticator: Arc<A>,
    cancel: CancellationToken,
    /// Echoed back RSA-encrypted by the client during the key
    /// exchange. Always four bytes.
    verify_token: [u8; 4],
}

impl<A: Authenticator> Connection<A> {
    pub fn new(keys: Arc<ServerKeys>, authenticator: Arc<A>, cancel: CancellationToken) -> Self {
        let mut verify_token = [0u8; 4];
        rand::rngs::OsRng.fill_bytes(&mut verify_token);

        Self {
            state: ServerState::PreHandshake,
            keys,
            authenticator,
            cancel,
            verify_token,
        }
    }

    /// Runs the connection to completion: until the configuration
    /// phase finishes, the peer disconnects, or an error occurs.
    pub async fn run(mut self, socket: TcpStream) -> anyhow::Result<()> {
        let stream: ServerStream<state::Handshake> = PacketStream::new(socket);

        let handshake = loop {
            let packet = select! {
                _ = self.cancel.cancelled() => return Ok(()),
                packet = stream.recv_packet() => packet,
            };
            if let Some(client::handshake::Packet::Handshake(handshake)) = Self::check(packet)? {
                break handshake;
            }
        };
        debug!(
            protocol = handshake.protocol_version,
            address = %handshake.server_address,
            port = handshake.server_port,
            next = ?handshake.next_state,
            "received handshake"
        );

        match handshake.next_state {
            client::handshake::NextState::Status => {
                self.advance(ServerState::ClientRequestingStatus);
                self.serve_status(stream.switch_state(), handshake.protocol_version)
                    .await
            }
            client::handshake::NextState::Login => {
                self.advance(ServerState::ClientRequestingLogin);
                let (stream, profile) = self.serve_login(stream.switch_state()).await?;
                self.serve_configuration(stream.switch_state(), profile).await
            }
        }
    }

    /// Answers status and ping requests until the client hangs up.
    async fn serve_status(
        &mut self,
        stream: ServerStream<state::Status>,
        protocol_version: i32,
    ) -> anyhow::Result<()> {
        loop {
            let packet = select! {
                _ = self.cancel.cancelled() => return Ok(()),
                packet = stream.recv_packet() => packet,
            };
            match Self::check(packet)? {
                Some(client::status::Packet::StatusRequest) => {
                    let json = status::response(protocol_version)
                        .context("failed to build status response")?;
                    stream
                        .send_packet(server::status::Packet::StatusResponse(
                            server::status::StatusResponse { json },
                        ))
                        .await?;
                    debug!("wrote status response");
                }
                Some(client::status::Packet::PingRequest(ping)) => {
                    stream
                        .send_packet(server::status::Packet::PingResponse(
                            server::status::PingResponse {
                                payload: ping.payload,
                            },
                        ))
                        .await?;
                    debug!("wrote ping response");
                }
                None => {}
            }
        }
    }

    /// Performs the login exchange, returning the now-encrypted
    /// stream and the authenticated profile.
    async fn serve_login(
        &mut self,
        mut stream: ServerStream<state::Login>,
    ) -> anyhow::Result<(ServerStream<state::Login>, GameProfile)> {
        let login_start = loop {
            match Self::check(stream.recv_packet().await)? {
                Some(client::login::Packet::LoginStart(start)) => break start,
                Some(other) => Self::drop_packet(self.state, other.as_ref()),
                None => {}
            }
        };
        info!(player = %login_start.player_name, uuid = %login_start.player_uuid, "login requested");

        stream
            .send_packet(server::login::Packet::EncryptionRequest(
                server::login::EncryptionRequest {
                    server_id: SERVER_ID.to_owned(),
                    public_key: self.keys.public_key_der().to_vec(),
                    verify_token: self.verify_token.to_vec(),
                },
            ))
            .await?;
        debug!("wrote encryption request");
        self.advance(ServerState::EncryptionRequested);

        let response = loop {
            match Self::check(stream.recv_packet().await)? {
                Some(client::login::Packet::EncryptionResponse(response)) => break response,
                Some(other) => Self::drop_packet(self.state, other.as_ref()),
                None => {}
            }
        };

        let shared_secret = self
            .keys
            .decrypt(&response.shared_secret)
            .context("failed to decrypt shared secret")?;
        let shared_secret: [u8; 16] = shared_secret
            .as_slice()
            .try_into()
            .map_err(|_| anyhow!("shared secret must be 16 bytes, got {}", shared_secret.len()))?;

        let verify_token = self
            .keys
            .decrypt(&response.verify_token)
            .context("failed to decrypt verify token")?;
        if verify_token != self.verify_token {
            return Err(AuthError::VerifyTokenMismatch.into());
        }

        let server_hash = auth::server_hash(SERVER_ID, &shared_secret, self.keys.public_key_der());
        let profile = self
            .authenticator
            .has_joined(&login_start.player_name, &server_hash)
            .await?;
        if profile.id != login_start.player_uuid
            || !profile.name.eq_ignore_ascii_case(&login_start.player_name)
        {
            return Err(AuthError::ProfileMismatch {
                id: profile.id,
                name: profile.name,
                expected_id: login_start.player_uuid,
                expected_name: login_start.player_name,
            }
            .into());
        }
        debug!(player = %profile.name, "session service confirmed login");

        // Promote both directions before the login success goes out:
        // the client flips its own reader as soon as it sends the
        // encryption response, so this is already an encrypted frame.
        stream.enable_encryption(EncryptionKey::new(shared_secret));
        stream
            .send_packet(server::login::Packet::LoginSuccess(
                server::login::LoginSuccess {
                    uuid: login_start.player_uuid,
                    username: login_start.player_name.clone(),
                    properties: Vec::new(),
                    strict_error_handling: false,
                },
            ))
            .await?;
        debug!("wrote login success");
        self.advance(ServerState::LoginCompletePendingAcknowledgement);

        loop {
            match Self::check(stream.recv_packet().await)? {
                Some(client::login::Packet::LoginAcknowledged) => break,
                Some(other) => Self::drop_packet(self.state, other.as_ref()),
                None => {}
            }
        }
        self.advance(ServerState::LoginComplete);

        Ok((stream, profile))
    }

    /// Runs the configuration phase with keepalive probing until the
    /// client acknowledges that configuration is finished.
    async fn serve_configuration(
        &mut self,
        stream: ServerStream<state::Configuration>,
        profile: GameProfile,
    ) -> anyhow::Result<()> {
        use client::configuration::Packet;

        let stream = Arc::new(stream);

        let keepalive_cancel = self.cancel.child_token();
        let mut keep_alive = KeepAlive::start(Arc::clone(&stream), keepalive_cancel.clone());
        // Stops both keepalive tasks however this phase exits.
        let _keepalive_guard = keepalive_cancel.drop_guard();

        loop {
            let packet = select! {
                _ = self.cancel.cancelled() => return Ok(()),
                _ = keep_alive.timed_out() => {
                    self.disconnect(&stream, "Timeout - failed to respond to keepalive").await;
                    return Err(anyhow!("client failed to respond to a keepalive in time"));
                }
                packet = stream.recv_packet() => packet,
            };

            match Self::check(packet)? {
                Some(Packet::ClientInformation(information)) => {
                    debug!(
                        locale = %information.locale,
                        view_distance = information.view_distance,
                        chat_mode = ?information.chat_mode,
                        "received client information"
                    );
                }
                Some(Packet::PluginMessage(message)) => {
                    debug!(len = message.data.len(), "ignoring plugin message");
                }
                Some(Packet::KeepAlive(keep_alive_response)) => {
                    keep_alive.receive(keep_alive_response.id);
                }
                Some(Packet::Pong(pong)) => {
                    debug!(id = pong.id, "received pong");
                }
                Some(Packet::ResourcePackResponse(response)) => {
                    debug!(result = ?response.result, "received resource pack response");
                }
                Some(Packet::AcknowledgeFinishConfiguration) => {
                    self.advance(ServerState::ConfigurationComplete);
                    info!(player = %profile.name, "configuration complete");
                    return Ok(());
                }
                None => {}
            }
        }
    }

    /// Notifies the client before closing. Only phases at or past
    /// LoginComplete get a notification; earlier phases just see the
    /// socket close.
    async fn disconnect(&self, stream: &ServerStream<state::Configuration>, reason: &str) {
        debug_assert!(
            self.state >= ServerState::LoginComplete
                && self.state < ServerState::ConfigurationComplete
        );

        let reason = match serde_json::to_string(&TextComponent::from(reason)) {
            Ok(reason) => reason,
            Err(e) => {
                warn!("failed to encode disconnect reason: {e:#}");
                return;
            }
        };
        if let Err(e) = stream
            .send_packet(server::configuration::Packet::Disconnect(
                server::configuration::Disconnect { reason },
            ))
            .await
        {
            warn!("failed to write disconnect packet: {e:#}");
        }
    }

    fn advance(&mut self, next: ServerState) {
        debug_assert!(next > self.state, "connection state may only move forward");
        debug!(from = ?self.state, to = ?next, "state transition");
        self.state = next;
    }

    /// Filters a receive result: a frame with an id the current phase
    /// does not know is a protocol error, logged and dropped without
    /// killing the connection. Everything else is fatal.
    fn check<P>(packet: anyhow::Result<P>) -> anyhow::Result<Option<P>> {
        match packet {
            Ok(packet) => Ok(Some(packet)),
            Err(e) => match e.downcast_ref::<DecodeError>() {
                Some(DecodeError::UnknownPacketId(id)) => {
                    warn!(id = *id, "dropping packet with unknown id");
                    Ok(None)
                }
                _ => Err(e),
            },
        }
    }

    /// A well-formed packet that the transition table does not accept
    /// in the current state is likewise logged and dropped.
    fn drop_packet(state: ServerState, name: &str) {
        warn!(packet = name, state = ?state, "dropping packet not accepted in current state");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_are_totally_ordered() {
        use ServerState::*;
        let progression = [
            PreHandshake,
            ClientRequestingStatus,
            ClientRequestingLogin,
            EncryptionRequested,
            LoginCompletePendingAcknowledgement,
            LoginComplete,
            ConfigurationComplete,
        ];
        for window in progression.windows(2) {
            assert!(window[0] < window[1]);
        }
    }
}
