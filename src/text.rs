//! Text components used in JSON-encoded packet fields.

use serde::{Deserialize, Serialize};

/// The subset of the text component format this server emits, e.g.
/// in disconnect reasons and the status description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextComponent {
    pub text: String,
}

impl From<&str> for TextComponent {
    fn from(text: &str) -> Self {
        Self {
            text: text.to_owned(),
        }
    }
}
