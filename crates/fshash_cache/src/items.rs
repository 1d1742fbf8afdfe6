//! Type-tagged item streams for the raw and gzip sidecar sections.
//!
//! Both sections share one layout: a concatenation of items, each a 1-byte
//! type tag, a 4-byte little-endian payload length, and the payload. The
//! stream distinguishes "null" from "absent" so callers round-trip optional
//! values faithfully.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::CacheError;

/// Item type tags as stored on disk.
const TAG_BYTES: u8 = 0;
const TAG_TEXT: u8 = 1;
const TAG_JSON: u8 = 2;
const TAG_NULL: u8 = 3;
const TAG_ABSENT: u8 = 4;

/// Size of the tag + length prefix preceding each payload.
const ITEM_HEADER_LEN: usize = 5;

/// An opaque caller payload carried in a sidecar data section.
#[derive(Clone, Debug, PartialEq)]
pub enum DataItem {
    /// An opaque byte string.
    Bytes(Vec<u8>),
    /// UTF-8 text.
    Text(String),
    /// A structured value, stored as JSON.
    Json(serde_json::Value),
    /// An explicit null.
    Null,
    /// An absent value, distinct from null.
    Absent,
}

/// Marker for a truncated or malformed item stream. Never crosses the crate
/// boundary: readers degrade it to an empty item list.
#[derive(Debug)]
pub(crate) struct CorruptStream;

/// Serializes items into a stream. Fails with
/// [`CacheError::NotSerializable`] when a structured value cannot be
/// JSON-encoded and with [`CacheError::TooLarge`] when a payload exceeds the
/// 4-byte length field.
pub(crate) fn serialize_items(items: &[DataItem]) -> Result<Vec<u8>, CacheError> {
    let mut out = Vec::new();
    for item in items {
        let (tag, payload) = match item {
            DataItem::Bytes(bytes) => (TAG_BYTES, bytes.clone()),
            DataItem::Text(text) => (TAG_TEXT, text.clone().into_bytes()),
            DataItem::Json(value) => (
                TAG_JSON,
                serde_json::to_vec(value).map_err(|e| CacheError::NotSerializable {
                    reason: e.to_string(),
                })?,
            ),
            DataItem::Null => (TAG_NULL, Vec::new()),
            DataItem::Absent => (TAG_ABSENT, Vec::new()),
        };
        let len = u32::try_from(payload.len())
            .map_err(|_| CacheError::TooLarge { what: "item payload" })?;
        out.push(tag);
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&payload);
    }
    Ok(out)
}

/// Parses an item stream. Truncated items, unknown tags, and malformed
/// payloads all report a corrupt stream.
pub(crate) fn parse_items(buf: &[u8]) -> Result<Vec<DataItem>, CorruptStream> {
    let mut items = Vec::new();
    let mut pos = 0usize;
    while pos < buf.len() {
        if buf.len() - pos < ITEM_HEADER_LEN {
            return Err(CorruptStream);
        }
        let tag = buf[pos];
        let len = u32::from_le_bytes(
            buf[pos + 1..pos + 5].try_into().map_err(|_| CorruptStream)?,
        ) as usize;
        pos += ITEM_HEADER_LEN;
        if buf.len() - pos < len {
            return Err(CorruptStream);
        }
        let payload = &buf[pos..pos + len];
        pos += len;

        let item = match tag {
            TAG_BYTES => DataItem::Bytes(payload.to_vec()),
            TAG_TEXT => DataItem::Text(
                String::from_utf8(payload.to_vec()).map_err(|_| CorruptStream)?,
            ),
            TAG_JSON => {
                DataItem::Json(serde_json::from_slice(payload).map_err(|_| CorruptStream)?)
            }
            TAG_NULL if len == 0 => DataItem::Null,
            TAG_ABSENT if len == 0 => DataItem::Absent,
            _ => return Err(CorruptStream),
        };
        items.push(item);
    }
    Ok(items)
}

/// Gzip-compresses `data` at the given level (already validated to 1..=9).
pub(crate) fn gzip_compress(data: &[u8], level: u32) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::new(level));
    encoder.write_all(data)?;
    encoder.finish()
}

/// Inflates a gzip blob whose uncompressed size is known exactly.
///
/// The expected size bounds the read, and a blob inflating to any other
/// length is rejected. Returns `None` on any decompression failure.
pub(crate) fn gzip_decompress(data: &[u8], expected_len: usize) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(expected_len);
    let mut decoder = GzDecoder::new(data).take(expected_len as u64 + 1);
    decoder.read_to_end(&mut out).ok()?;
    (out.len() == expected_len).then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serialize_empty_is_empty() {
        assert!(serialize_items(&[]).unwrap().is_empty());
        assert!(parse_items(b"").unwrap().is_empty());
    }

    #[test]
    fn roundtrip_all_variants() {
        let items = vec![
            DataItem::Bytes(vec![0, 1, 2, 255]),
            DataItem::Text("hello".to_string()),
            DataItem::Json(json!({"exportNames": ["foo", "bar"], "n": 3})),
            DataItem::Null,
            DataItem::Absent,
        ];
        let stream = serialize_items(&items).unwrap();
        assert_eq!(parse_items(&stream).unwrap(), items);
    }

    #[test]
    fn null_and_absent_stay_distinct() {
        let stream = serialize_items(&[DataItem::Null, DataItem::Absent]).unwrap();
        let back = parse_items(&stream).unwrap();
        assert_eq!(back, vec![DataItem::Null, DataItem::Absent]);
        assert_ne!(back[0], back[1]);
    }

    #[test]
    fn wire_layout() {
        let stream = serialize_items(&[DataItem::Text("ab".to_string())]).unwrap();
        assert_eq!(stream, vec![1, 2, 0, 0, 0, b'a', b'b']);
    }

    #[test]
    fn empty_payload_items_are_five_bytes() {
        let stream = serialize_items(&[DataItem::Null]).unwrap();
        assert_eq!(stream, vec![3, 0, 0, 0, 0]);
    }

    #[test]
    fn truncated_header_is_corrupt() {
        assert!(parse_items(&[1, 2, 0]).is_err());
    }

    #[test]
    fn truncated_payload_is_corrupt() {
        // Claims 10 payload bytes, provides 2.
        assert!(parse_items(&[0, 10, 0, 0, 0, 1, 2]).is_err());
    }

    #[test]
    fn unknown_tag_is_corrupt() {
        assert!(parse_items(&[9, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn nonempty_null_payload_is_corrupt() {
        assert!(parse_items(&[3, 1, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn invalid_utf8_text_is_corrupt() {
        assert!(parse_items(&[1, 2, 0, 0, 0, 0xFF, 0xFE]).is_err());
    }

    #[test]
    fn invalid_json_is_corrupt() {
        assert!(parse_items(&[2, 3, 0, 0, 0, b'{', b'{', b'{']).is_err());
    }

    #[test]
    fn json_preserves_structure() {
        let value = json!({"a": [1, 2.5, null, "s"], "b": {"nested": true}});
        let stream = serialize_items(&[DataItem::Json(value.clone())]).unwrap();
        match &parse_items(&stream).unwrap()[0] {
            DataItem::Json(back) => assert_eq!(back, &value),
            other => panic!("expected Json, got {other:?}"),
        }
    }

    #[test]
    fn gzip_roundtrip_all_levels() {
        let data: Vec<u8> = b"code".repeat(100);
        for level in 1..=9 {
            let compressed = gzip_compress(&data, level).unwrap();
            let back = gzip_decompress(&compressed, data.len()).unwrap();
            assert_eq!(back, data, "level {level}");
        }
    }

    #[test]
    fn gzip_empty_roundtrip() {
        let compressed = gzip_compress(b"", 1).unwrap();
        assert_eq!(gzip_decompress(&compressed, 0).unwrap(), b"");
    }

    #[test]
    fn gzip_wrong_expected_len_rejected() {
        let compressed = gzip_compress(b"payload", 1).unwrap();
        assert!(gzip_decompress(&compressed, 6).is_none());
        assert!(gzip_decompress(&compressed, 8).is_none());
        assert!(gzip_decompress(&compressed, 7).is_some());
    }

    #[test]
    fn gzip_garbage_rejected() {
        assert!(gzip_decompress(b"not gzip at all", 100).is_none());
    }
}
