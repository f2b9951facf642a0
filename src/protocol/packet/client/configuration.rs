use minecraft_endpoint_macros::{Decode, Encode};
use uuid::Uuid;

#[derive(Debug, Clone, Encode, Decode, strum::AsRefStr)]
#[encoding(discriminant = "varint")]
pub enum Packet {
    #[encoding(id = 0x00)]
    ClientInformation(ClientInformation),
    #[encoding(id = 0x01)]
    PluginMessage(PluginMessage),
    #[encoding(id = 0x02)]
    AcknowledgeFinishConfiguration,
    #[encoding(id = 0x03)]
    KeepAlive(KeepAlive),
    #[encoding(id = 0x04)]
    Pong(Pong),
    #[encoding(id = 0x05)]
    ResourcePackResponse(ResourcePackResponse),
}

/// The client's settings, sent once configuration starts.
#[derive(Debug, Clone, Encode, Decode)]
pub struct ClientInformation {
    /// e.g. "en_GB".
    pub locale: String,
    /// Client-side render distance, in chunks.
    pub view_distance: u8,
    pub chat_mode: ChatMode,
    /// "Colors" multiplayer setting, whether chat can be colored.
    pub chat_colors: bool,
    /// Bit 0: cape, bit 1: jacket, bit 2: left sleeve, bit 3: right
    /// sleeve, bit 4: left pants leg, bit 5: right pants leg,
    /// bit 6: hat. Bit 7 is unused.
    pub displayed_skin_parts: u8,
    pub main_hand: MainHand,
    /// Filtering of text on signs and written book titles.
    pub enable_text_filtering: bool,
    /// Whether the player should show up in server listings.
    pub allow_server_listings: bool,
}

impl ClientInformation {
    pub fn cape_enabled(&self) -> bool {
        self.displayed_skin_parts & 0x01 != 0
    }

    pub fn jacket_enabled(&self) -> bool {
        self.displayed_skin_parts & 0x02 != 0
    }

    pub fn hat_enabled(&self) -> bool {
        self.displayed_skin_parts & 0x40 != 0
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Encode, Decode)]
#[encoding(discriminant = "varint")]
pub enum ChatMode {
    #[encoding(id = 0)]
    Enabled,
    #[encoding(id = 1)]
    CommandsOnly,
    #[encoding(id = 2)]
    Hidden,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Encode, Decode)]
#[encoding(discriminant = "varint")]
pub enum MainHand {
    #[encoding(id = 0)]
    Left,
    #[encoding(id = 1)]
    Right,
}

/// Mod/plugin channel data; opaque to this server.
#[derive(Debug, Clone, Encode, Decode)]
pub struct PluginMessage {
    #[encoding(length_prefix = "inferred")]
    pub data: Vec<u8>,
}

/// Response to a clientbound keep alive carrying the same id.
#[derive(Debug, Clone, Encode, Decode)]
pub struct KeepAlive {
    pub id: i64,
}

/// Response to a clientbound ping carrying the same id.
#[derive(Debug, Clone, Encode, Decode)]
pub struct Pong {
    pub id: i32,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct ResourcePackResponse {
    pub pack: Uuid,
    pub result: ResourcePackResult,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Encode, Decode)]
#[encoding(discriminant = "varint")]
pub enum ResourcePackResult {
    #[encoding(id = 0)]
    SuccessfullyDownloaded,
    #[encoding(id = 1)]
    Declined,
    #[encoding(id = 2)]
    FailedToDownload,
    #[encoding(id = 3)]
    Accepted,
    #[encoding(id = 4)]
    Downloaded,
    #[encoding(id = 5)]
    InvalidUrl,
    #[encoding(id = 6)]
    FailedToReload,
    #[encoding(id = 7)]
    Discarded,
}
