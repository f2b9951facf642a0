//! Process-wide RSA key material.

use anyhow::Context;
use rsa::{pkcs8::EncodePublicKey, Pkcs1v15Encrypt, RsaPrivateKey};

/// Key size used by the reference server. Historically compatible,
/// cryptographically weak.
const KEY_BITS: usize = 1024;

/// The key pair shared by every connection, generated once at startup
/// and immutable afterwards.
pub struct ServerKeys {
    private_key: RsaPrivateKey,
    public_key_der: Vec<u8>,
}

impl ServerKeys {
    pub fn generate() -> anyhow::Result<Self> {
        let private_key = RsaPrivateKey::new(&mut rand::rngs::OsRng, KEY_BITS)
            .context("failed to generate RSA key pair")?;
        let public_key_der = private_key
            .to_public_key()
            .to_public_key_der()
            .context("failed to encode public key as PKIX DER")?
            .as_bytes()
            .to_vec();

        Ok(Self {
            private_key,
            public_key_der,
        })
    }

    /// The public key as a PKIX SubjectPublicKeyInfo (ASN.1 DER)
    /// structure, sent verbatim in every encryption request.
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key_der
    }

    /// Decrypts a client payload with the private key (PKCS#1 v1.5).
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, rsa::Error> {
        self.private_key.decrypt(Pkcs1v15Encrypt, data)
    }
}
