//! Implements the Minecraft protocol.

pub const PROTOCOL_VERSION: i32 = 765; // 1.20.4

pub mod cfb8;
pub mod codec;
pub mod decoder;
pub mod encoder;
pub mod packet;

pub use decoder::{Decode, DecodeError, Decoder};
pub use encoder::{Encode, EncodeError, Encoder};

/// Limit to avoid out-of-memory DOS.
const BUFFER_LIMIT: usize = 1024 * 1024; // 1 MiB

/// Maximum byte length of a wire string: 32767 UTF-16 code units of
/// up to three UTF-8 bytes, plus three.
pub const MAX_STRING_LENGTH: usize = 32767 * 3 + 3;
