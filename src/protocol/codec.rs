//! Codec for the framed packet stream. Supports CFB8 encryption.
//!
//! Compression is never negotiated by this server, so the codec only
//! deals with the plain `{length, id, payload}` envelope.

use super::BUFFER_LIMIT;
use crate::protocol::{
    cfb8::{Cfb8Decryptor, Cfb8Encryptor, EncryptionKey},
    encoder::var_int_size,
    packet,
    packet::ProtocolState,
    Decode, DecodeError, Decoder, Encode, Encoder,
};
use anyhow::bail;
use std::marker::PhantomData;

/// Codec state.
pub struct PacketCodec<Side, State> {
    /// Buffered incoming bytes. Already decrypted once
    /// encryption is enabled.
    read_buffer: Vec<u8>,
    encryption_state: Option<EncryptionState>,
    _marker: PhantomData<(Side, State)>,
}

impl<Side, State> PacketCodec<Side, State>
where
    Side: packet::Side,
    State: ProtocolState,
{
    pub fn new() -> Self {
        Self {
            read_buffer: Vec::new(),
            encryption_state: None,
            _marker: PhantomData,
        }
    }

    /// Carries the buffers and cipher state into the next phase.
    /// Only the progressions the protocol defines are accepted.
    pub fn switch_state<NewState: ProtocolState>(self) -> PacketCodec<Side, NewState>
    where
        State: packet::SwitchesTo<NewState>,
    {
        PacketCodec {
            read_buffer: self.read_buffer,
            encryption_state: self.encryption_state,
            _marker: PhantomData,
        }
    }

    /// Promotes the stream to AES-CFB8.
    ///
    /// Everything encoded from now on is encrypted. Bytes that were
    /// already buffered arrived after the handshake frame that
    /// triggered the promotion, so they are ciphertext; they are
    /// decrypted here so that no read-ahead input is lost.
    pub fn enable_encryption(&mut self, key: EncryptionKey) {
        assert!(
            self.encryption_state.is_none(),
            "called enable_encryption() multiple times"
        );
        let mut state = EncryptionState {
            encryptor: Cfb8Encryptor::new(key),
            decryptor: Cfb8Decryptor::new(key),
        };
        state.decryptor.decrypt(&mut self.read_buffer);
        self.encryption_state = Some(state);
    }

    /// Encodes a packet to a stream of bytes in the protocol format.
    ///
    /// The returned buffer is one complete frame; writing it with a
    /// single call keeps partial frames from ever becoming visible.
    pub fn encode_packet(&mut self, packet: &Side::SendPacket<State>) -> anyhow::Result<Vec<u8>> {
        let mut plain_buf = Vec::new();
        packet.encode(&mut Encoder::new(&mut plain_buf))?;

        let length = i32::try_from(plain_buf.len())?;
        let mut buf = Vec::with_capacity(var_int_size(length) + plain_buf.len());
        let mut encoder = Encoder::new(&mut buf);
        encoder.write_var_int(length);
        encoder.write_slice(&plain_buf);

        if let Some(EncryptionState { encryptor, .. }) = &mut self.encryption_state {
            encryptor.encrypt(&mut buf);
        }

        Ok(buf)
    }

    /// Gives data to the internal read buffer.
    ///
    /// `data` will be modified in-place and its contents
    /// after calling this function are unspecified.
    ///
    /// Call `decode_packet` to get a packet.
    pub fn give_data(&mut self, mut data: impl AsMut<[u8]>) {
        let data = data.as_mut();
        if let Some(EncryptionState { decryptor, .. }) = &mut self.encryption_state {
            decryptor.decrypt(data);
        }

        self.read_buffer.extend_from_slice(data);
    }

    /// Attempts to decode a packet.
    /// This should be called in a loop after any call to `give_data`
    /// until this function returns `None`.
    ///
    /// * If not enough data is available, returns `Ok(None)`.
    /// * If a packet was read, returns `Ok(Some(packet))`. More packets may be available.
    /// * If an error occurs, returns `Err(e)`. The offending frame has been
    ///   consumed, so an unknown-id error leaves the stream usable.
    pub fn decode_packet(&mut self) -> anyhow::Result<Option<Side::RecvPacket<State>>> {
        loop {
            // Note: data in the read buffer is already decrypted.
            let mut decoder = Decoder::new(&self.read_buffer);
            let length = match decoder.read_var_int() {
                Ok(x) => x,
                Err(DecodeError::ShortRead(_)) => return Ok(None),
                Err(e) => return Err(e.into()),
            };
            let header_size = self.read_buffer.len() - decoder.buffer().len();
            let length = usize::try_from(length)?;

            if length > BUFFER_LIMIT {
                bail!("packet length of {length} exceeds maximum allowed");
            }

            // A zero-length frame is a keepalive null; discard it.
            if length == 0 {
                self.read_buffer.drain(..header_size);
                continue;
            }

            let packet_contents = match decoder.consume_slice(length) {
                Ok(x) => x,
                Err(DecodeError::ShortRead(_)) => return Ok(None),
                Err(e) => return Err(e.into()),
            };

            let packet = Side::RecvPacket::<State>::decode(&mut Decoder::new(packet_contents));
            self.read_buffer.drain(..header_size + length);
            return packet.map(Some).map_err(Into::into);
        }
    }
}

struct EncryptionState {
    encryptor: Cfb8Encryptor,
    decryptor: Cfb8Decryptor,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::packet::{client, server, side, state};

    fn client_codec<State: ProtocolState>() -> PacketCodec<side::Client, State> {
        PacketCodec::new()
    }

    fn server_codec<State: ProtocolState>() -> PacketCodec<side::Server, State> {
        PacketCodec::new()
    }

    #[test]
    fn ping_response_frame_bytes() {
        let mut codec = server_codec::<state::Status>();
        let frame = codec
            .encode_packet(&server::status::Packet::PingResponse(
                server::status::PingResponse { payload: 6837160 },
            ))
            .unwrap();

        assert_eq!(
            frame,
            [0x09, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x68, 0x53, 0xa8]
        );
    }

    #[test]
    fn frame_length_counts_id_and_payload() {
        let mut codec = client_codec::<state::Handshake>();
        let frame = codec
            .encode_packet(&client::handshake::Packet::Handshake(
                client::handshake::Handshake {
                    protocol_version: 765,
                    server_address: "127.0.0.1".to_owned(),
                    server_port: 25565,
                    next_state: client::handshake::NextState::Status,
                },
            ))
            .unwrap();

        let mut decoder = Decoder::new(&frame);
        let length = decoder.read_var_int().unwrap() as usize;
        assert_eq!(length, decoder.buffer().len());
        // id (1) + protocol (2) + address (10) + port (2) + next state (1)
        assert_eq!(length, var_int_size(0x00) + 15);
    }

    #[test]
    fn roundtrip_through_opposite_side() {
        let mut client = client_codec::<state::Status>();
        let mut server = server_codec::<state::Status>();

        let frame = client
            .encode_packet(&client::status::Packet::PingRequest(
                client::status::PingRequest { payload: -42 },
            ))
            .unwrap();

        server.give_data(frame);
        match server.decode_packet().unwrap() {
            Some(client::status::Packet::PingRequest(ping)) => assert_eq!(ping.payload, -42),
            other => panic!("unexpected decode result: {other:?}"),
        }
        assert!(server.decode_packet().unwrap().is_none());
    }

    #[test]
    fn partial_frames_need_more_data() {
        let mut client = client_codec::<state::Status>();
        let mut server = server_codec::<state::Status>();

        let frame = client
            .encode_packet(&client::status::Packet::PingRequest(
                client::status::PingRequest { payload: 1 },
            ))
            .unwrap();

        for byte in &frame[..frame.len() - 1] {
            server.give_data([*byte]);
            assert!(server.decode_packet().unwrap().is_none());
        }
        server.give_data([frame[frame.len() - 1]]);
        assert!(server.decode_packet().unwrap().is_some());
    }

    #[test]
    fn zero_length_frame_is_discarded() {
        let mut client = client_codec::<state::Status>();
        let mut server = server_codec::<state::Status>();

        let mut bytes = vec![0x00]; // keepalive null
        bytes.extend(
            client
                .encode_packet(&client::status::Packet::StatusRequest)
                .unwrap(),
        );

        server.give_data(bytes);
        assert!(matches!(
            server.decode_packet().unwrap(),
            Some(client::status::Packet::StatusRequest)
        ));
    }

    #[test]
    fn unknown_id_reports_error_but_keeps_stream() {
        let mut server = server_codec::<state::Status>();

        // id 0x63 does not exist in the status state
        server.give_data([0x01, 0x63]);
        let err = server.decode_packet().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DecodeError>(),
            Some(DecodeError::UnknownPacketId(0x63))
        ));

        let mut client = client_codec::<state::Status>();
        server.give_data(
            client
                .encode_packet(&client::status::Packet::StatusRequest)
                .unwrap(),
        );
        assert!(server.decode_packet().unwrap().is_some());
    }

    #[test]
    fn encrypted_roundtrip() {
        let key = EncryptionKey::new([7; 16]);
        let mut client = client_codec::<state::Configuration>();
        let mut server = server_codec::<state::Configuration>();
        client.enable_encryption(key);
        server.enable_encryption(key);

        for id in [1i64, 2, 3] {
            let frame = client
                .encode_packet(&client::configuration::Packet::KeepAlive(
                    client::configuration::KeepAlive { id },
                ))
                .unwrap();
            server.give_data(frame);
            match server.decode_packet().unwrap() {
                Some(client::configuration::Packet::KeepAlive(packet)) => {
                    assert_eq!(packet.id, id)
                }
                other => panic!("unexpected decode result: {other:?}"),
            }
        }
    }

    #[test]
    fn enable_encryption_recovers_buffered_ciphertext() {
        let key = EncryptionKey::new([42; 16]);
        let mut client = client_codec::<state::Login>();
        let mut server = server_codec::<state::Login>();
        client.enable_encryption(key);

        // Ciphertext reaches the server before it promotes its own
        // side of the stream, as happens when the client acknowledges
        // the login immediately.
        let frame = client
            .encode_packet(&client::login::Packet::LoginAcknowledged)
            .unwrap();
        server.give_data(frame);

        server.enable_encryption(key);
        assert!(matches!(
            server.decode_packet().unwrap(),
            Some(client::login::Packet::LoginAcknowledged)
        ));
    }
}
