use minecraft_endpoint_macros::{Decode, Encode};

#[derive(Debug, Clone, Encode, Decode, strum::AsRefStr)]
#[encoding(discriminant = "varint")]
pub enum Packet {
    #[encoding(id = 0x01)]
    Disconnect(Disconnect),
    #[encoding(id = 0x02)]
    FinishConfiguration,
    #[encoding(id = 0x03)]
    KeepAlive(KeepAlive),
    #[encoding(id = 0x04)]
    Ping(Ping),
}

/// Tells the client to disconnect.
#[derive(Debug, Clone, Encode, Decode)]
pub struct Disconnect {
    /// A JSON-encoded text component with the reason.
    pub reason: String,
}

/// Liveness probe; the client must respond with the same id within
/// 5 seconds or be disconnected.
#[derive(Debug, Clone, Encode, Decode)]
pub struct KeepAlive {
    pub id: i64,
}

/// The client responds with a pong carrying the same id.
#[derive(Debug, Clone, Encode, Decode)]
pub struct Ping {
    pub id: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{codec::PacketCodec, packet::side, packet::state};

    #[test]
    fn keep_alive_frame_is_nine_bytes_long() {
        let mut codec = PacketCodec::<side::Server, state::Configuration>::new();
        let frame = codec
            .encode_packet(&Packet::KeepAlive(KeepAlive {
                id: 776627963145224191,
            }))
            .unwrap();

        // length 9 = id (1 byte) + long (8 bytes)
        assert_eq!(frame[0], 0x09);
        assert_eq!(frame[1], 0x03);
        assert_eq!(frame.len(), 10);
        assert_eq!(
            i64::from_be_bytes(frame[2..].try_into().unwrap()),
            776627963145224191
        );
    }
}
