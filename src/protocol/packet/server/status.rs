use minecraft_endpoint_macros::{Decode, Encode};

#[derive(Debug, Clone, Encode, Decode, strum::AsRefStr)]
#[encoding(discriminant = "varint")]
pub enum Packet {
    #[encoding(id = 0x00)]
    StatusResponse(StatusResponse),
    #[encoding(id = 0x01)]
    PingResponse(PingResponse),
}

/// The server-list document, see [`crate::status`] for its contents.
#[derive(Debug, Clone, Encode, Decode)]
pub struct StatusResponse {
    pub json: String,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct PingResponse {
    /// The number received in the ping request.
    pub payload: i64,
}
