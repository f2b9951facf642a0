//! Session authentication against the Mojang session service.

use num_bigint::BigInt;
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::future::Future;
use uuid::Uuid;

const HAS_JOINED_URL: &str = "https://sessionserver.mojang.com/session/minecraft/hasJoined";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("session service request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("session service answered with status {0}")]
    Status(reqwest::StatusCode),
    #[error("session profile has malformed id {0:?}")]
    MalformedId(String),
    #[error("returned verify token does not match the token sent")]
    VerifyTokenMismatch,
    #[error("session profile {name} ({id}) does not match login start {expected_name} ({expected_id})")]
    ProfileMismatch {
        id: Uuid,
        name: String,
        expected_id: Uuid,
        expected_name: String,
    },
}

/// The authenticated identity confirmed by the session service.
#[derive(Debug, Clone)]
pub struct GameProfile {
    pub id: Uuid,
    pub name: String,
}

/// Confirms that a client has completed authentication against a
/// specific server hash.
pub trait Authenticator: Send + Sync + 'static {
    fn has_joined(
        &self,
        username: &str,
        server_hash: &str,
    ) -> impl Future<Output = Result<GameProfile, AuthError>> + Send;
}

/// [`Authenticator`] backed by the Mojang `hasJoined` endpoint.
pub struct MojangAuthenticator {
    client: reqwest::Client,
}

impl MojangAuthenticator {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for MojangAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

impl Authenticator for MojangAuthenticator {
    async fn has_joined(&self, username: &str, server_hash: &str) -> Result<GameProfile, AuthError> {
        let response = self
            .client
            .get(HAS_JOINED_URL)
            .query(&[("username", username), ("serverId", server_hash)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AuthError::Status(response.status()));
        }

        let profile: HasJoinedResponse = response.json().await?;
        let id =
            Uuid::parse_str(&profile.id).map_err(|_| AuthError::MalformedId(profile.id.clone()))?;
        Ok(GameProfile {
            id,
            name: profile.name,
        })
    }
}

/// Body of a successful `hasJoined` response.
#[derive(Debug, Deserialize)]
struct HasJoinedResponse {
    /// Player's identifier, dash-less.
    id: String,
    name: String,
    /// Normally one entry carrying the player's skin blob; unused here.
    #[serde(default)]
    #[allow(dead_code)]
    properties: Vec<ProfileProperty>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct ProfileProperty {
    name: String,
    value: String,
    signature: Option<String>,
}

/// Computes the digest reported to the session service: SHA-1 over
/// the ASCII server id, the shared secret, and the PKIX public key.
pub fn server_hash(server_id: &str, shared_secret: &[u8], public_key_der: &[u8]) -> String {
    let mut hash = Sha1::new();
    hash.update(ascii_bytes(server_id));
    hash.update(shared_secret);
    hash.update(public_key_der);
    minecraft_digest(&hash.finalize())
}

/// Renders a digest in Minecraft's signed-hex convention: the bytes
/// are a big-endian two's-complement integer, hex-encoded with
/// leading zeros stripped and a `-` prefix when negative.
fn minecraft_digest(digest: &[u8]) -> String {
    format!("{:x}", BigInt::from_signed_bytes_be(digest))
}

/// Converts a UTF-8 string to ASCII, substituting `?` for anything
/// outside the ASCII range.
fn ascii_bytes(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest_of(name: &str) -> String {
        let mut hash = Sha1::new();
        hash.update(name.as_bytes());
        minecraft_digest(&hash.finalize())
    }

    #[test]
    fn digest_fixtures() {
        assert_eq!(digest_of("Notch"), "4ed1f46bbe04bc756bcb17c0c7ce3e4632f06a48");
        assert_eq!(digest_of("jeb_"), "-7c9d5b0044c130109a5d7b5fb5c317c02b4e28c1");
        assert_eq!(digest_of("simon"), "88e16a1019277b15d58faf0541e11910eb756f6");
    }

    #[test]
    fn non_ascii_is_substituted() {
        assert_eq!(ascii_bytes("héllo"), b"h?llo");
        assert_eq!(ascii_bytes(""), b"");
    }

    #[test]
    fn server_hash_covers_all_inputs() {
        let a = server_hash("", &[1; 16], &[2; 16]);
        let b = server_hash("", &[1; 16], &[3; 16]);
        let c = server_hash("x", &[1; 16], &[2; 16]);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
