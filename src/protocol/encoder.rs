use crate::protocol::MAX_STRING_LENGTH;
use uuid::Uuid;

/// An error while encoding packets.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("string of {len} bytes exceeds max allowed length {MAX_STRING_LENGTH}")]
    StringTooLong { len: usize },
}

pub type Result<T, E = EncodeError> = std::result::Result<T, E>;

/// A raw encoder for a Minecraft bitstream.
#[derive(Debug)]
pub struct Encoder<'a> {
    buffer: &'a mut Vec<u8>,
}

impl<'a> Encoder<'a> {
    /// Creates an encoder that will append to the provided
    /// byte buffer.
    ///
    /// Any existing contents of `buffer` are left untouched.
    pub fn new(buffer: &'a mut Vec<u8>) -> Self {
        Self { buffer }
    }

    /// Writes an unsigned byte to the stream.
    pub fn write_u8(&mut self, x: u8) {
        self.buffer.push(x);
    }

    /// Writes an unsigned short to the stream.
    pub fn write_u16(&mut self, x: u16) {
        self.buffer.extend(x.to_be_bytes());
    }

    /// Writes a signed int to the stream.
    pub fn write_i32(&mut self, x: i32) {
        self.buffer.extend(x.to_be_bytes());
    }

    /// Writes a signed long to the stream.
    pub fn write_i64(&mut self, x: i64) {
        self.buffer.extend(x.to_be_bytes());
    }

    /// Writes a boolean to the stream.
    pub fn write_bool(&mut self, x: bool) {
        self.write_u8(if x { 0x01 } else { 0x00 });
    }

    /// Writes a series of bytes to the stream. Does not write
    /// any sort of length prefix.
    pub fn write_slice(&mut self, slice: &[u8]) {
        self.buffer.extend_from_slice(slice);
    }

    /// Writes a VarInt to the stream. Returns the number of bytes written.
    pub fn write_var_int(&mut self, x: i32) -> usize {
        let mut x: u32 = bytemuck::cast(x);
        let mut bytes_written = 0;
        loop {
            let mut temp = (x & 0b0111_1111) as u8;
            x >>= 7;
            if x != 0 {
                temp |= 0b1000_0000;
            }

            self.buffer.push(temp);
            bytes_written += 1;

            if x == 0 {
                break bytes_written;
            }
        }
    }

    /// Writes a varint-prefixed string to the stream.
    pub fn write_string(&mut self, x: &str) -> Result<()> {
        let len = x.len();
        if len > MAX_STRING_LENGTH {
            return Err(EncodeError::StringTooLong { len });
        }
        self.write_var_int(len.try_into().unwrap_or(i32::MAX));
        self.buffer.extend_from_slice(x.as_bytes());
        Ok(())
    }
}

/// Returns the serialized byte length of a VarInt.
pub fn var_int_size(x: i32) -> usize {
    Encoder::new(&mut Vec::new()).write_var_int(x)
}

/// A type that can be written to an [`Encoder`].
pub trait Encode {
    fn encode(&self, encoder: &mut Encoder) -> Result<()>;
}

impl Encode for u8 {
    fn encode(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.write_u8(*self);
        Ok(())
    }
}

impl Encode for u16 {
    fn encode(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.write_u16(*self);
        Ok(())
    }
}

impl Encode for i32 {
    fn encode(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.write_i32(*self);
        Ok(())
    }
}

impl Encode for i64 {
    fn encode(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.write_i64(*self);
        Ok(())
    }
}

impl Encode for bool {
    fn encode(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.write_bool(*self);
        Ok(())
    }
}

impl Encode for String {
    fn encode(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.write_string(self)
    }
}

impl Encode for Uuid {
    fn encode(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.write_slice(self.as_bytes());
        Ok(())
    }
}

impl Encode for () {
    fn encode(&self, _encoder: &mut Encoder) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn var_int_vectors() {
        let cases: &[(i32, &[u8])] = &[
            (0, &[0x00]),
            (1, &[0x01]),
            (127, &[0x7f]),
            (128, &[0x80, 0x01]),
            (255, &[0xff, 0x01]),
            (25565, &[0xdd, 0xc7, 0x01]),
            (i32::MAX, &[0xff, 0xff, 0xff, 0xff, 0x07]),
            (-1, &[0xff, 0xff, 0xff, 0xff, 0x0f]),
            (i32::MIN, &[0x80, 0x80, 0x80, 0x80, 0x08]),
        ];

        for (value, want) in cases {
            let mut buffer = Vec::new();
            let written = Encoder::new(&mut buffer).write_var_int(*value);
            assert_eq!(&buffer, want, "value {value}");
            assert_eq!(written, want.len());
        }
    }

    #[test]
    fn var_int_roundtrip() {
        for value in [0, 1, -1, 127, 128, 255, 25565, 6837160, i32::MAX, i32::MIN] {
            let mut buffer = Vec::new();
            Encoder::new(&mut buffer).write_var_int(value);
            let decoded = crate::protocol::Decoder::new(&buffer)
                .read_var_int()
                .unwrap();
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn empty_string_is_single_zero_byte() {
        let mut buffer = Vec::new();
        Encoder::new(&mut buffer).write_string("").unwrap();
        assert_eq!(buffer, [0x00]);
    }

    #[test]
    fn string_too_long_is_rejected() {
        let oversized = "x".repeat(MAX_STRING_LENGTH + 1);
        let mut buffer = Vec::new();
        assert!(matches!(
            Encoder::new(&mut buffer).write_string(&oversized),
            Err(EncodeError::StringTooLong { .. })
        ));
        assert!(buffer.is_empty());
    }
}
