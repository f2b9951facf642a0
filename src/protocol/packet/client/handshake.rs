use minecraft_endpoint_macros::{Decode, Encode};

#[derive(Debug, Clone, Encode, Decode, strum::AsRefStr)]
#[encoding(discriminant = "varint")]
pub enum Packet {
    #[encoding(id = 0x00)]
    Handshake(Handshake),
}

/// Initial packet establishing the connection and choosing the
/// next phase.
#[derive(Debug, Clone, Encode, Decode)]
pub struct Handshake {
    /// The version the client plans on using. By convention -1 when
    /// the client is pinging to determine what version to use.
    #[encoding(varint)]
    pub protocol_version: i32,
    /// Hostname or IP that was used to connect.
    pub server_address: String,
    /// The Notchian server does not use this information.
    pub server_port: u16,
    pub next_state: NextState,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Encode, Decode)]
#[encoding(discriminant = "varint")]
pub enum NextState {
    #[encoding(id = 1)]
    Status,
    #[encoding(id = 2)]
    Login,
}
