//! On-disk `.rec` record framing: a fixed JSON header line followed by an
//! optionally compressed, optionally AEAD-encrypted payload.
//!
//! Dispatch is on the header's `compressed`/`encrypted` flags rather than on
//! a polymorphic record type: mixed records (some compressed, some not) can
//! coexist on disk across a config change because each record carries its
//! own flags.

use crate::error::{Error, Result};
use crate::security::context::EncryptionContext;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

const RECORD_VERSION: u32 = 1;
const NONCE_LEN: usize = 12;

/// 256-bit AES-GCM key used for encryption at rest. Accepted as opaque
/// externally-provided bytes — leaves key management out of scope.
#[derive(Clone, Copy)]
pub struct EncryptionKey(pub [u8; 32]);

/// Fixed JSON header preceding every record's payload bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RecordHeader {
    version: u32,
    compressed: bool,
    encrypted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    nonce: Option<String>,
}

fn gzip_compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn gzip_decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder
    .read_to_end(&mut out)
    .map_err(|e| Error::Corrupted(format!("gzip decompression failed: {e}")))?;
    Ok(out)
}

/// Encodes `plaintext` into the on-disk record format: header line, then
/// payload. `compress` and `encrypt` are independent per-write choices so a
/// config flip mid-lifetime only affects new writes.
pub fn encode_record(
    plaintext: &[u8],
    compress: bool,
    encrypt: Option<(&EncryptionKey, &EncryptionContext)>,
) -> Result<Vec<u8>> {
    let mut payload = if compress {
        gzip_compress(plaintext)?
    } else {
        plaintext.to_vec()
    };

    let mut nonce_hex = None;
    if let Some((key, context)) = encrypt {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key.0));
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = cipher
        .encrypt(
            nonce,
            Payload {
                msg: &payload,
                aad: context.as_bytes(),
            },
        )
        .map_err(|_| Error::Internal("AEAD encryption failed".into()))?;
        payload = ciphertext;
        nonce_hex = Some(hex_encode(&nonce_bytes));
    }

    let header = RecordHeader {
        version: RECORD_VERSION,
        compressed: compress,
        encrypted: encrypt.is_some(),
        nonce: nonce_hex,
    };
    let mut header_line = serde_json::to_vec(&header)?;
    header_line.push(b'\n');

    let mut out = Vec::with_capacity(header_line.len() + payload.len());
    out.extend_from_slice(&header_line);
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Decodes a record previously produced by [`encode_record`]. The
/// encryption context is re-derived by the caller (it is never
/// stored alongside the ciphertext) and supplied here for AEAD
/// verification.
pub fn decode_record(
    bytes: &[u8],
    decrypt_key: Option<(&EncryptionKey, &EncryptionContext)>,
) -> Result<Vec<u8>> {
    let newline = bytes
    .iter()
    .position(|&b| b == b'\n')
    .ok_or_else(|| Error::Corrupted("missing record header".into()))?;
    let header: RecordHeader = serde_json::from_slice(&bytes[..newline])
    .map_err(|e| Error::Corrupted(format!("invalid record header: {e}")))?;
    let mut payload = bytes[newline + 1..].to_vec();

    if header.encrypted {
        let (key, context) = decrypt_key
        .ok_or_else(|| Error::DecryptFailure("record is encrypted but no key was supplied".into()))?;
        let nonce_hex = header
        .nonce
        .as_ref()
        .ok_or_else(|| Error::Corrupted("encrypted record missing nonce".into()))?;
        let nonce_bytes = hex_decode(nonce_hex)
        .map_err(|e| Error::Corrupted(format!("invalid nonce encoding: {e}")))?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(Error::Corrupted("nonce has unexpected length".into()));
        }
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key.0));
        let nonce = Nonce::from_slice(&nonce_bytes);
        payload = cipher
        .decrypt(
            nonce,
            Payload {
                msg: &payload,
                aad: context.as_bytes(),
            },
        )
        .map_err(|_| Error::DecryptFailure("AEAD tag verification failed".into()))?;
    }

    if header.compressed {
        payload = gzip_decompress(&payload)?;
    }

    Ok(payload)
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hex_decode(s: &str) -> std::result::Result<Vec<u8>, String> {
    if s.len() % 2 != 0 {
        return Err("odd-length hex string".to_string());
    }
    (0..s.len())
    .step_by(2)
    .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|e| e.to_string()))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> EncryptionContext {
        EncryptionContext::for_project(&"proj-1".into())
    }

    #[test]
    fn round_trips_plain_record() {
        let encoded = encode_record(b"hello world", false, None).expect("encode");
        let decoded = decode_record(&encoded, None).expect("decode");
        assert_eq!(decoded, b"hello world");
    }

    #[test]
    fn round_trips_compressed_record() {
        let data = b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
        let encoded = encode_record(data, true, None).expect("encode");
        let decoded = decode_record(&encoded, None).expect("decode");
        assert_eq!(decoded, data);
    }

    #[test]
    fn round_trips_encrypted_record() {
        let key = EncryptionKey([7u8; 32]);
        let context = ctx();
        let encoded =
        encode_record(b"secret payload", true, Some((&key, &context))).expect("encode");
        let decoded = decode_record(&encoded, Some((&key, &context))).expect("decode");
        assert_eq!(decoded, b"secret payload");
    }

    #[test]
    fn wrong_context_fails_to_decrypt() {
        let key = EncryptionKey([7u8; 32]);
        let encoded =
        encode_record(b"secret payload", false, Some((&key, &ctx()))).expect("encode");
        let wrong_context = EncryptionContext::for_project(&"proj-2".into());
        let result = decode_record(&encoded, Some((&key, &wrong_context)));
        assert!(matches!(result, Err(Error::DecryptFailure(_))));
    }

    #[test]
    fn tampered_ciphertext_fails_checksum() {
        let key = EncryptionKey([7u8; 32]);
        let context = ctx();
        let mut encoded =
        encode_record(b"secret payload", false, Some((&key, &context))).expect("encode");
        let last = encoded.len() - 1;
        encoded[last] ^= 0xFF;
        let result = decode_record(&encoded, Some((&key, &context)));
        assert!(result.is_err());
    }
}
