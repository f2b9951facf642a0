use minecraft_endpoint_macros::{Decode, Encode};
use uuid::Uuid;

#[derive(Debug, Clone, Encode, Decode, strum::AsRefStr)]
#[encoding(discriminant = "varint")]
pub enum Packet {
    #[encoding(id = 0x00)]
    LoginStart(LoginStart),
    #[encoding(id = 0x01)]
    EncryptionResponse(EncryptionResponse),
    #[encoding(id = 0x03)]
    LoginAcknowledged,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct LoginStart {
    pub player_name: String,
    pub player_uuid: Uuid,
}

/// Both fields are encrypted under the server's RSA public key.
#[derive(Debug, Clone, Encode, Decode)]
pub struct EncryptionResponse {
    #[encoding(length_prefix = "varint")]
    pub shared_secret: Vec<u8>,
    #[encoding(length_prefix = "varint")]
    pub verify_token: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Decode, Decoder, Encode, Encoder};

    #[test]
    fn login_start_roundtrip() {
        let start = LoginStart {
            player_name: "airfors".to_owned(),
            player_uuid: uuid::uuid!("8996cb86-cb63-4c2d-8b45-7cdfd7b542c8"),
        };

        let mut buffer = Vec::new();
        start.encode(&mut Encoder::new(&mut buffer)).unwrap();
        assert_eq!(buffer.len(), 1 + 7 + 16);

        let decoded = LoginStart::decode(&mut Decoder::new(&buffer)).unwrap();
        assert_eq!(decoded.player_name, start.player_name);
        assert_eq!(decoded.player_uuid, start.player_uuid);
    }
}
