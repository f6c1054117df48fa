//! Diagram source <-> URL-safe share token.
//!
//! Tokens are the zlib-deflated UTF-8 source in URL-safe base64 without
//! padding. Decoding also accepts the standard alphabet, padding, and tokens
//! that were never compressed.

use std::io::Write;

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("share token is empty")]
    Empty,
    #[error("share token is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("share token does not hold UTF-8 text")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Encode diagram source into a share token.
pub fn encode(source: &str) -> String {
    let bytes = source.as_bytes();
    // An uncompressed token is still decodable, so a deflate failure degrades
    // to the legacy form instead of failing.
    let payload = deflate(bytes).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "deflate failed, sharing uncompressed");
        bytes.to_vec()
    });
    URL_SAFE_NO_PAD.encode(payload)
}

/// Encode without compression in the standard alphabet.
///
/// This is the form handed to external tools that only know plain base64;
/// [`decode`] accepts it.
pub fn encode_plain(source: &str) -> String {
    STANDARD.encode(source.as_bytes())
}

/// Decode a share token back into diagram source.
///
/// # Errors
///
/// Returns [`CodecError`] for an empty token, invalid base64, or a payload
/// that is not UTF-8 text.
pub fn decode(token: &str) -> Result<String, CodecError> {
    let normalized = normalize(token);
    if normalized.is_empty() {
        return Err(CodecError::Empty);
    }
    let bytes = URL_SAFE_NO_PAD.decode(normalized.as_bytes())?;
    let text = inflate(&bytes).unwrap_or(bytes);
    Ok(String::from_utf8(text)?)
}

/// Map the standard alphabet onto the URL-safe one and drop padding.
///
/// A space stands for `+`: query strings decode an unescaped `+` to a space,
/// including a trailing one. Only tabs and line breaks are dropped.
fn normalize(token: &str) -> String {
    token
        .chars()
        .filter_map(|c| match c {
            '+' | ' ' => Some('-'),
            '/' => Some('_'),
            '=' => None,
            c if c.is_whitespace() => None,
            c => Some(c),
        })
        .collect()
}

fn deflate(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()
}

/// Inflate a complete zlib stream.
///
/// `None` unless the whole input is one stream whose checksum matches, so raw
/// text that happens to start like a zlib header is left alone.
fn inflate(bytes: &[u8]) -> Option<Vec<u8>> {
    let mut decompress = Decompress::new(true);
    let mut out = Vec::with_capacity(bytes.len().saturating_mul(4).max(64));
    loop {
        let consumed = usize::try_from(decompress.total_in()).ok()?;
        let status = decompress
            .decompress_vec(&bytes[consumed..], &mut out, FlushDecompress::Finish)
            .ok()?;
        match status {
            Status::StreamEnd => {
                let total = usize::try_from(decompress.total_in()).ok()?;
                return (total == bytes.len()).then_some(out);
            }
            Status::Ok | Status::BufError if out.len() == out.capacity() => {
                out.reserve(out.capacity());
            }
            Status::Ok | Status::BufError => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_flowchart() {
        let source = "graph TD\n    A[开始] --> B{判断}";
        assert_eq!(decode(&encode(source)).unwrap(), source);
    }

    #[test]
    fn test_token_is_url_safe() {
        let token = encode(&"x".repeat(500));
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_plain_base64_decodes() {
        // "graph TD\nA-->B" without compression.
        assert_eq!(decode("Z3JhcGggVEQKQS0tPkI=").unwrap(), "graph TD\nA-->B");
        assert_eq!(decode(&encode_plain("pie\n\"a\": 1")).unwrap(), "pie\n\"a\": 1");
    }

    #[test]
    fn test_standard_alphabet_and_padding_are_accepted() {
        let token = encode("sequenceDiagram\nA->>B: hello?");
        let standard = token.replace('-', "+").replace('_', "/");
        let padded = format!("{standard}{}", "=".repeat((4 - standard.len() % 4) % 4));
        assert_eq!(decode(&padded).unwrap(), "sequenceDiagram\nA->>B: hello?");
    }

    #[test]
    fn test_space_is_read_as_plus() {
        let token = encode_plain("~~~>>>");
        assert!(token.contains('+'));
        assert_eq!(decode(&token.replace('+', " ")).unwrap(), "~~~>>>");
    }

    #[test]
    fn test_trailing_plus_survives_query_decoding() {
        let token = encode_plain("~~~>>>");
        assert_eq!(token, "fn5+Pj4+");
        assert_eq!(decode("fn5 Pj4 ").unwrap(), "~~~>>>");
        assert_eq!(decode("fn5-Pj4-\r\n").unwrap(), "~~~>>>");
    }

    #[test]
    fn test_empty_token_is_rejected() {
        assert!(matches!(decode(""), Err(CodecError::Empty)));
        assert!(matches!(decode("\n==\t"), Err(CodecError::Empty)));
    }

    #[test]
    fn test_invalid_base64_is_rejected() {
        assert!(matches!(decode("!!!"), Err(CodecError::Base64(_))));
    }

    #[test]
    fn test_non_utf8_payload_is_rejected() {
        let token = URL_SAFE_NO_PAD.encode([0xff, 0xfe, 0xfd]);
        assert!(matches!(decode(&token), Err(CodecError::Utf8(_))));
    }

    #[test]
    fn test_empty_source_round_trips() {
        assert_eq!(decode(&encode("")).unwrap(), "");
    }

    mod property_tests {
        use crate::share::codec::{decode, encode, encode_plain};
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn decode_inverts_encode(source in "\\PC{0,400}") {
                prop_assert_eq!(decode(&encode(&source)).unwrap(), source);
            }

            #[test]
            fn uncompressed_tokens_decode(source in "[a-zA-Z0-9 >\\-\\n]{1,200}") {
                prop_assert_eq!(decode(&encode_plain(&source)).unwrap(), source);
            }
        }
    }
}
