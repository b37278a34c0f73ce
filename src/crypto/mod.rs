/// At-rest decryption capability, supplied by the host.
///
/// Key derivation and the on-disk ciphertext format live outside this
/// engine; all the indexer needs is a buffer-in, buffer-out call that
/// fails on authentication failure or a malformed header.
pub trait VaultCipher: Send + Sync {
    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, String>;
}

/// Outcome of reading one document through the decryption seam.
pub struct DecodedContent {
    pub text: String,
    /// True when decryption failed and the raw bytes were interpreted as
    /// plaintext instead. Surfaced so a UI can warn about ciphertext
    /// leaking into the graph and search index as garbage text.
    pub fell_back_to_plaintext: bool,
}

/// Decrypt `raw` when a cipher is configured, degrading to a plaintext
/// interpretation of the raw bytes when decryption fails. A single corrupt
/// or transiently-unreadable file must never halt a whole indexing pass.
pub fn decode_content(
    doc_id: &str,
    raw: Vec<u8>,
    cipher: Option<&dyn VaultCipher>,
) -> DecodedContent {
    match cipher {
        Some(cipher) => match cipher.decrypt(&raw) {
            Ok(plain) => DecodedContent {
                text: String::from_utf8_lossy(&plain).into_owned(),
                fell_back_to_plaintext: false,
            },
            Err(e) => {
                log::warn!(
                    "[Indexer] Decryption failed for {}, treating raw bytes as plaintext: {}",
                    doc_id,
                    e
                );
                DecodedContent {
                    text: String::from_utf8_lossy(&raw).into_owned(),
                    fell_back_to_plaintext: true,
                }
            }
        },
        None => DecodedContent {
            text: String::from_utf8_lossy(&raw).into_owned(),
            fell_back_to_plaintext: false,
        },
    }
}
