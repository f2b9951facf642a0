//! AES-128 in cipher feedback mode with a feedback size of 8 bits.
//!
//! The protocol encrypts each stream byte individually: the shift
//! register starts as the shared secret (IV == key), and every
//! processed byte is AES-encrypted against the register, XORed with
//! the first keystream byte, and fed back into the register.

use aes::{
    cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit},
    Aes128, Block,
};

pub const BLOCK_SIZE: usize = 16;

/// Key used for encryption. The protocol also uses it as the IV.
#[derive(Copy, Clone)]
pub struct EncryptionKey([u8; BLOCK_SIZE]);

impl EncryptionKey {
    pub fn new(bytes: [u8; BLOCK_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.0
    }
}

/// CFB8 keystream state shared by the encrypting and decrypting
/// directions; they differ only in which byte feeds back into the
/// shift register.
struct Cfb8 {
    cipher: Aes128,
    // The shift register plus three blocks of runway. Instead of
    // shifting the register on every byte, an index slides over the
    // buffer and the final block is moved back to the front when the
    // runway is exhausted, amortizing the shift cost.
    sr: [u8; BLOCK_SIZE * 4],
    sr_pos: usize,
    decrypt: bool,
}

impl Cfb8 {
    fn new(key: EncryptionKey, decrypt: bool) -> Self {
        let cipher = Aes128::new(GenericArray::from_slice(&key.0));
        let mut sr = [0u8; BLOCK_SIZE * 4];
        sr[..BLOCK_SIZE].copy_from_slice(&key.0);
        Self {
            cipher,
            sr,
            sr_pos: 0,
            decrypt,
        }
    }

    fn xor_key_stream(&mut self, data: &mut [u8]) {
        for byte in data {
            let mut block =
                Block::clone_from_slice(&self.sr[self.sr_pos..self.sr_pos + BLOCK_SIZE]);
            self.cipher.encrypt_block(&mut block);
            let keystream = block[0];

            // Decryption feeds the incoming cipher byte back into the
            // register; encryption feeds the produced cipher byte.
            let feedback = if self.decrypt {
                let cipher_byte = *byte;
                *byte ^= keystream;
                cipher_byte
            } else {
                *byte ^= keystream;
                *byte
            };

            self.sr[self.sr_pos + BLOCK_SIZE] = feedback;
            self.sr_pos += 1;

            if self.sr_pos + BLOCK_SIZE == self.sr.len() {
                self.sr.copy_within(self.sr_pos.., 0);
                self.sr_pos = 0;
            }
        }
    }
}

/// Encrypts outgoing bytes in place.
pub struct Cfb8Encryptor(Cfb8);

impl Cfb8Encryptor {
    pub fn new(key: EncryptionKey) -> Self {
        Self(Cfb8::new(key, false))
    }

    pub fn encrypt(&mut self, data: &mut [u8]) {
        self.0.xor_key_stream(data);
    }
}

/// Decrypts incoming bytes in place.
pub struct Cfb8Decryptor(Cfb8);

impl Cfb8Decryptor {
    pub fn new(key: EncryptionKey) -> Self {
        Self(Cfb8::new(key, true))
    }

    pub fn decrypt(&mut self, data: &mut [u8]) {
        self.0.xor_key_stream(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: EncryptionKey = EncryptionKey([
        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, //
        0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f,
    ]);

    #[test]
    fn roundtrip() {
        let plaintext: Vec<u8> = (0..=255).collect();

        let mut data = plaintext.clone();
        Cfb8Encryptor::new(KEY).encrypt(&mut data);
        assert_ne!(data, plaintext);

        Cfb8Decryptor::new(KEY).decrypt(&mut data);
        assert_eq!(data, plaintext);
    }

    #[test]
    fn byte_at_a_time_matches_whole_buffer() {
        // 200 bytes forces several slides of the register window.
        let plaintext: Vec<u8> = (0..200u16).map(|x| (x % 251) as u8).collect();

        let mut whole = plaintext.clone();
        Cfb8Encryptor::new(KEY).encrypt(&mut whole);

        let mut split = plaintext.clone();
        let mut encryptor = Cfb8Encryptor::new(KEY);
        for byte in split.iter_mut() {
            encryptor.encrypt(std::slice::from_mut(byte));
        }

        assert_eq!(whole, split);

        let mut decrypted = whole;
        let mut decryptor = Cfb8Decryptor::new(KEY);
        for byte in decrypted.iter_mut() {
            decryptor.decrypt(std::slice::from_mut(byte));
        }
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn distinct_keys_produce_distinct_streams() {
        let other = EncryptionKey([0xff; BLOCK_SIZE]);

        let mut a = vec![0u8; 32];
        let mut b = vec![0u8; 32];
        Cfb8Encryptor::new(KEY).encrypt(&mut a);
        Cfb8Encryptor::new(other).encrypt(&mut b);
        assert_ne!(a, b);
    }
}
