//! Packet-level IO over a TCP connection.

use crate::protocol::{
    cfb8::EncryptionKey,
    codec::PacketCodec,
    packet,
    packet::ProtocolState,
};
use anyhow::Context;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream,
    },
    sync::Mutex,
};

/// The peer closed its end of the connection.
#[derive(Debug, thiserror::Error)]
#[error("connection closed by peer")]
pub struct ConnectionClosed;

/// Sends and receives packets of the current protocol phase over a
/// TCP stream.
///
/// Sends from concurrent tasks are serialized by the writer lock, so
/// keepalive probes and handler responses never interleave within a
/// frame.
pub struct PacketStream<Side: packet::Side, State: ProtocolState> {
    send_stream: Mutex<OwnedWriteHalf>,
    recv_stream: Mutex<OwnedReadHalf>,
    send_codec: Mutex<PacketCodec<Side, State>>,
    recv_codec: Mutex<PacketCodec<Side, State>>,
}

impl<Side, State> PacketStream<Side, State>
where
    Side: packet::Side,
    State: ProtocolState,
{
    pub fn new(stream: TcpStream) -> Self {
        let (recv_stream, send_stream) = stream.into_split();
        Self {
            send_stream: Mutex::new(send_stream),
            recv_stream: Mutex::new(recv_stream),
            send_codec: Mutex::new(PacketCodec::new()),
            recv_codec: Mutex::new(PacketCodec::new()),
        }
    }

    /// Promotes both directions to AES-CFB8.
    ///
    /// The cipher sits directly above the socket bytes; input that was
    /// read ahead of the promotion is re-interpreted as ciphertext by
    /// the codec, so nothing is lost or double-encrypted.
    pub fn enable_encryption(&mut self, key: EncryptionKey) {
        self.send_codec.get_mut().enable_encryption(key);
        self.recv_codec.get_mut().enable_encryption(key);
    }

    /// Moves the connection into the next phase. Only the
    /// progressions the protocol defines are accepted.
    pub fn switch_state<NewState: ProtocolState>(self) -> PacketStream<Side, NewState>
    where
        State: packet::SwitchesTo<NewState>,
    {
        PacketStream {
            send_stream: self.send_stream,
            recv_stream: self.recv_stream,
            send_codec: Mutex::new(self.send_codec.into_inner().switch_state()),
            recv_codec: Mutex::new(self.recv_codec.into_inner().switch_state()),
        }
    }

    /// Encodes and writes one packet as a single frame.
    pub async fn send_packet(&self, packet: Side::SendPacket<State>) -> anyhow::Result<()> {
        let bytes = {
            let mut codec = self.send_codec.lock().await;
            codec.encode_packet(&packet)?
        };
        let mut stream = self.send_stream.lock().await;
        stream.write_all(&bytes).await?;
        Ok(())
    }

    /// Reads the next packet.
    ///
    /// Cancellation-safe: if this future is dropped, no received
    /// bytes are lost, so it can be used in a `select!` loop.
    pub async fn recv_packet(&self) -> anyhow::Result<Side::RecvPacket<State>> {
        let mut buffer = [0u8; 256];
        loop {
            // Both locks must be taken here to ensure cancellation safety.
            let mut codec = self.recv_codec.lock().await;
            let mut stream = self.recv_stream.lock().await;

            if let Some(packet) = codec
                .decode_packet()
                .with_context(|| format!("failed to decode {} packet", State::NAME))?
            {
                return Ok(packet);
            }

            let bytes_read = stream.read(&mut buffer).await?;
            if bytes_read == 0 {
                return Err(ConnectionClosed.into());
            }
            codec.give_data(&mut buffer[..bytes_read]);
        }
    }
}
