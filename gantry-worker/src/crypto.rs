//! Credential cipher capability
//!
//! Stored credentials (cluster kubeconfigs, generated admin passwords) are
//! protected by an external encryption helper. It is consumed here as an
//! opaque encrypt/decrypt capability injected into the handler context, so
//! the core stays testable without ambient key material.

/// Opaque encrypt/decrypt capability for stored credentials
pub trait CredentialCipher: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> anyhow::Result<Vec<u8>>;
    fn decrypt(&self, ciphertext: &[u8]) -> anyhow::Result<Vec<u8>>;
}

/// Pass-through cipher for stores holding unencrypted credentials
/// (local development). Production deployments inject the platform cipher.
pub struct IdentityCipher;

impl CredentialCipher for IdentityCipher {
    fn encrypt(&self, plaintext: &[u8]) -> anyhow::Result<Vec<u8>> {
        Ok(plaintext.to_vec())
    }

    fn decrypt(&self, ciphertext: &[u8]) -> anyhow::Result<Vec<u8>> {
        Ok(ciphertext.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_cipher_roundtrip() {
        let cipher = IdentityCipher;
        let encrypted = cipher.encrypt(b"secret").unwrap();
        assert_eq!(cipher.decrypt(&encrypted).unwrap(), b"secret");
    }
}
