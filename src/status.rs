//! Builds the server-list status document.

use crate::text::TextComponent;
use serde::Serialize;

const GAME_VERSION: &str = "1.20.4";
const MAX_PLAYERS: u32 = 34;
const ONLINE_PLAYERS: u32 = 12;
const DESCRIPTION: &str = "The Minecraft client-server protocol kinda sucks ngl";

/// 64x64 PNG shown next to the listing, as a data URI.
const FAVICON: &str = concat!(
    "data:image/png;base64,",
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg=="
);

/// Composes the JSON document answering a status request. The only
/// variable input is the protocol version, which is echoed back from
/// the handshake.
pub fn response(protocol_version: i32) -> serde_json::Result<String> {
    serde_json::to_string(&StatusDocument {
        version: Version {
            name: GAME_VERSION,
            protocol: protocol_version,
        },
        players: Players {
            max: MAX_PLAYERS,
            online: ONLINE_PLAYERS,
            sample: None,
        },
        description: TextComponent::from(DESCRIPTION),
        favicon: FAVICON,
        enforces_secure_chat: false,
        previews_chat: false,
    })
}

/// Field order is part of the contract: the reference client expects
/// `version`, `players`, `description`, `favicon`,
/// `enforcesSecureChat`, `previewsChat`.
#[derive(Debug, Serialize)]
struct StatusDocument {
    version: Version,
    players: Players,
    description: TextComponent,
    favicon: &'static str,
    #[serde(rename = "enforcesSecureChat")]
    enforces_secure_chat: bool,
    #[serde(rename = "previewsChat")]
    previews_chat: bool,
}

#[derive(Debug, Serialize)]
struct Version {
    name: &'static str,
    protocol: i32,
}

#[derive(Debug, Serialize)]
struct Players {
    max: u32,
    online: u32,
    sample: Option<Vec<PlayerSample>>,
}

#[derive(Debug, Serialize)]
#[allow(dead_code)]
struct PlayerSample {
    name: String,
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_shape_and_key_order() {
        let json = response(765).unwrap();

        assert!(json.starts_with(
            r#"{"version":{"name":"1.20.4","protocol":765},"players":{"max":34,"online":12,"sample":null},"description":{"text":"The Minecraft client-server protocol kinda sucks ngl"},"favicon":"data:image/png;base64,"#
        ));
        assert!(json.ends_with(r#","enforcesSecureChat":false,"previewsChat":false}"#));
    }

    #[test]
    fn echoes_requested_protocol() {
        assert!(response(-1).unwrap().contains(r#""protocol":-1"#));
    }
}
