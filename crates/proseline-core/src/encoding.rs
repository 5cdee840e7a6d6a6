//! Fixed-length binary-to-text codecs.
//!
//! Every binary field on the wire (keys, signatures, nonces, digests,
//! ciphertexts) is carried as text. A deployment picks one encoding and
//! uses it everywhere; the schema enforces the exact character length
//! implied by the field's byte size.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Text encoding for binary fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryEncoding {
    /// Lowercase hexadecimal, two characters per byte.
    #[default]
    Hex,
    /// Standard base64 with padding.
    Base64,
}

impl BinaryEncoding {
    /// Number of characters used to encode `byte_len` bytes.
    pub const fn encoded_len(self, byte_len: usize) -> usize {
        match self {
            BinaryEncoding::Hex => byte_len * 2,
            BinaryEncoding::Base64 => (byte_len + 2) / 3 * 4,
        }
    }

    /// Encode bytes to text.
    pub fn encode(self, bytes: &[u8]) -> String {
        match self {
            BinaryEncoding::Hex => hex::encode(bytes),
            BinaryEncoding::Base64 => STANDARD.encode(bytes),
        }
    }

    /// Decode text of any non-empty length.
    pub fn decode(self, text: &str) -> Result<Vec<u8>, EncodingError> {
        if text.is_empty() {
            return Err(EncodingError::Empty);
        }
        match self {
            BinaryEncoding::Hex => {
                if !is_lower_hex(text) {
                    return Err(EncodingError::Alphabet { encoding: self });
                }
                hex::decode(text).map_err(|_| EncodingError::Alphabet { encoding: self })
            }
            BinaryEncoding::Base64 => {
                if text.len() % 4 != 0 {
                    return Err(EncodingError::Alphabet { encoding: self });
                }
                STANDARD
                    .decode(text)
                    .map_err(|_| EncodingError::Alphabet { encoding: self })
            }
        }
    }

    /// Decode text that must encode exactly `N` bytes.
    pub fn decode_exact<const N: usize>(self, text: &str) -> Result<[u8; N], EncodingError> {
        self.check_len(text, N)?;
        let bytes = self.decode(text)?;
        bytes.try_into().map_err(|v: Vec<u8>| EncodingError::Length {
            expected: self.encoded_len(N),
            actual: self.encoded_len(v.len()),
        })
    }

    /// Check that `text` is a well-formed encoding of exactly `byte_len` bytes.
    pub fn check_exact(self, text: &str, byte_len: usize) -> Result<(), EncodingError> {
        self.check_len(text, byte_len)?;
        let decoded = self.decode(text)?;
        if decoded.len() != byte_len {
            return Err(EncodingError::Length {
                expected: self.encoded_len(byte_len),
                actual: self.encoded_len(decoded.len()),
            });
        }
        Ok(())
    }

    fn check_len(self, text: &str, byte_len: usize) -> Result<(), EncodingError> {
        let expected = self.encoded_len(byte_len);
        if text.len() != expected {
            return Err(EncodingError::Length {
                expected,
                actual: text.len(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for BinaryEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryEncoding::Hex => f.write_str("hex"),
            BinaryEncoding::Base64 => f.write_str("base64"),
        }
    }
}

fn is_lower_hex(text: &str) -> bool {
    text.len() % 2 == 0 && text.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Errors from decoding binary fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("expected {expected} characters, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("not valid {encoding} text")]
    Alphabet { encoding: BinaryEncoding },

    #[error("empty binary field")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encoded_lengths() {
        assert_eq!(BinaryEncoding::Hex.encoded_len(32), 64);
        assert_eq!(BinaryEncoding::Hex.encoded_len(64), 128);
        assert_eq!(BinaryEncoding::Base64.encoded_len(32), 44);
        assert_eq!(BinaryEncoding::Base64.encoded_len(64), 88);
        assert_eq!(BinaryEncoding::Base64.encoded_len(24), 32);
        assert_eq!(BinaryEncoding::Base64.encoded_len(4), 8);
    }

    #[test]
    fn test_encoded_len_matches_output() {
        for len in 0..70 {
            let bytes = vec![0xa5u8; len];
            for encoding in [BinaryEncoding::Hex, BinaryEncoding::Base64] {
                assert_eq!(encoding.encode(&bytes).len(), encoding.encoded_len(len));
            }
        }
    }

    #[test]
    fn test_hex_rejects_uppercase() {
        let text = "AB".repeat(32);
        assert_eq!(
            BinaryEncoding::Hex.decode_exact::<32>(&text),
            Err(EncodingError::Alphabet {
                encoding: BinaryEncoding::Hex
            })
        );
    }

    #[test]
    fn test_exact_length_enforced() {
        let short = BinaryEncoding::Hex.encode(&[1u8; 31]);
        assert!(matches!(
            BinaryEncoding::Hex.decode_exact::<32>(&short),
            Err(EncodingError::Length {
                expected: 64,
                actual: 62
            })
        ));

        let b64 = BinaryEncoding::Base64.encode(&[7u8; 24]);
        assert!(BinaryEncoding::Base64.check_exact(&b64, 24).is_ok());
        assert!(BinaryEncoding::Base64.check_exact(&b64, 32).is_err());
    }

    #[test]
    fn test_base64_rejects_bad_alphabet() {
        let mut text = BinaryEncoding::Base64.encode(&[9u8; 32]);
        text.replace_range(0..1, "*");
        assert!(BinaryEncoding::Base64.decode_exact::<32>(&text).is_err());
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(BinaryEncoding::Hex.decode(""), Err(EncodingError::Empty));
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(bytes in prop::collection::vec(any::<u8>(), 1..96)) {
            for encoding in [BinaryEncoding::Hex, BinaryEncoding::Base64] {
                let text = encoding.encode(&bytes);
                prop_assert_eq!(text.len(), encoding.encoded_len(bytes.len()));
                prop_assert_eq!(encoding.decode(&text), Ok(bytes.clone()));
                prop_assert!(encoding.check_exact(&text, bytes.len()).is_ok());
            }
        }
    }
}
