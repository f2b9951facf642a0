use minecraft_endpoint_macros::{Decode, Encode};
use uuid::Uuid;

#[derive(Debug, Clone, Encode, Decode, strum::AsRefStr)]
#[encoding(discriminant = "varint")]
pub enum Packet {
    #[encoding(id = 0x01)]
    EncryptionRequest(EncryptionRequest),
    #[encoding(id = 0x02)]
    LoginSuccess(LoginSuccess),
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct EncryptionRequest {
    /// Empty for this server; only kept for the session hash.
    pub server_id: String,
    /// The server's public key as a PKIX SubjectPublicKeyInfo
    /// (ASN.1 DER) structure.
    #[encoding(length_prefix = "varint")]
    pub public_key: Vec<u8>,
    /// Random bytes the client must echo back, RSA-encrypted.
    #[encoding(length_prefix = "varint")]
    pub verify_token: Vec<u8>,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct LoginSuccess {
    pub uuid: Uuid,
    pub username: String,
    /// Skin/signature properties; this server sends none.
    #[encoding(length_prefix = "varint")]
    pub properties: Vec<LoginProperty>,
    pub strict_error_handling: bool,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct LoginProperty {
    pub name: String,
    pub value: String,
    #[encoding(bool_prefixed)]
    pub signature: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{codec::PacketCodec, packet::side, packet::state};

    #[test]
    fn encryption_request_frame_bytes() {
        let mut codec = PacketCodec::<side::Server, state::Login>::new();
        let frame = codec
            .encode_packet(&Packet::EncryptionRequest(EncryptionRequest {
                server_id: String::new(),
                public_key: vec![0x01, 0x02, 0x03],
                verify_token: vec![0x01, 0x02, 0x03, 0x04, 0x05],
            }))
            .unwrap();

        assert_eq!(
            frame,
            [
                0x0c, 0x01, // header
                0x00, // server id
                0x03, 0x01, 0x02, 0x03, // public key
                0x05, 0x01, 0x02, 0x03, 0x04, 0x05, // verify token
            ]
        );
    }

    #[test]
    fn login_success_roundtrip() {
        use crate::protocol::{Decode, Decoder, Encode, Encoder};

        let success = LoginSuccess {
            uuid: uuid::uuid!("8996cb86-cb63-4c2d-8b45-7cdfd7b542c8"),
            username: "airfors".to_owned(),
            properties: Vec::new(),
            strict_error_handling: false,
        };

        let mut buffer = Vec::new();
        success.encode(&mut Encoder::new(&mut buffer)).unwrap();
        // uuid + name + empty property list + bool
        assert_eq!(buffer.len(), 16 + 8 + 1 + 1);

        let decoded = LoginSuccess::decode(&mut Decoder::new(&buffer)).unwrap();
        assert_eq!(decoded.uuid, success.uuid);
        assert_eq!(decoded.username, success.username);
        assert!(decoded.properties.is_empty());
        assert!(!decoded.strict_error_handling);
    }
}
