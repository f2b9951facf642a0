use minecraft_endpoint_macros::{Decode, Encode};

#[derive(Debug, Clone, Encode, Decode, strum::AsRefStr)]
#[encoding(discriminant = "varint")]
pub enum Packet {
    #[encoding(id = 0x00)]
    StatusRequest,
    #[encoding(id = 0x01)]
    PingRequest(PingRequest),
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct PingRequest {
    /// An arbitrary number echoed back verbatim.
    pub payload: i64,
}
