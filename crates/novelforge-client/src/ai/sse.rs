//! SSE (Server-Sent Events) decoding for generation streams
//!
//! Turns raw response bytes into discrete event records, independent of how
//! the network layer chunks them.

use bytes::Bytes;
use serde_json::Value;
use tracing::warn;

/// One blank-line-delimited unit of the event-stream wire format.
#[derive(Debug, Clone, PartialEq)]
pub struct SseRecord {
    /// Event name from the `event:` line
    pub event: Option<String>,
    /// Payload from the `data:` line - JSON when it parses, raw text otherwise
    pub data: Value,
    /// Optional id from the `id:` line
    pub id: Option<String>,
}

impl SseRecord {
    /// Parse one record from its raw lines.
    ///
    /// Returns `None` for structurally empty records (no `data:` line).
    fn parse(raw: &str) -> Option<Self> {
        let mut event = None;
        let mut data = None;
        let mut id = None;

        for line in raw.lines() {
            if line.trim().is_empty() {
                continue;
            }
            // Lines without a colon (and comment lines, whose field name is
            // empty) carry nothing we recognize
            let Some(colon) = line.find(':') else {
                continue;
            };
            let field = line[..colon].trim();
            let value = line[colon + 1..].trim();
            match field {
                "event" => event = Some(value.to_string()),
                "data" => {
                    data = Some(
                        serde_json::from_str::<Value>(value)
                            .unwrap_or_else(|_| Value::String(value.to_string())),
                    );
                }
                "id" => id = Some(value.to_string()),
                _ => {}
            }
        }

        data.map(|data| Self { event, data, id })
    }
}

/// Incremental decoder from raw bytes to complete SSE records.
///
/// Carries incomplete multi-byte characters and incomplete records across
/// reads, so callers can feed chunks at arbitrary byte boundaries: a
/// character split between two reads is never corrupted, and a record is
/// only surfaced once its terminating blank line has arrived.
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Incomplete UTF-8 suffix from the previous read
    pending: Vec<u8>,
    /// Decoded text not yet terminated by a blank line
    buffer: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of bytes, returning every record it completes.
    pub fn feed(&mut self, bytes: Bytes) -> Vec<SseRecord> {
        self.decode(&bytes);
        self.drain_records()
    }

    /// Decode bytes into the text buffer, keeping incomplete sequences.
    fn decode(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    self.pending.clear();
                    return;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    if let Ok(text) = std::str::from_utf8(&self.pending[..valid]) {
                        self.buffer.push_str(text);
                    }
                    match err.error_len() {
                        // Invalid sequence: substitute and keep decoding
                        Some(len) => {
                            warn!("invalid UTF-8 in event stream, substituting");
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                        // Incomplete multi-byte suffix: carry to the next read
                        None => {
                            self.pending.drain(..valid);
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Extract every complete (blank-line-terminated) record from the buffer.
    fn drain_records(&mut self) -> Vec<SseRecord> {
        let mut records = Vec::new();
        while let Some(end) = self.buffer.find("\n\n") {
            let raw: String = self.buffer.drain(..end + 2).collect();
            if let Some(record) = SseRecord::parse(&raw) {
                records.push(record);
            }
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CHAT_PAYLOAD: &[u8] = b"event: progress\ndata: {\"current\":1,\"total\":2,\"percent\":50,\"message\":\"thinking\"}\n\nevent: chunk\ndata: {\"content\":\"Hello\"}\n\nevent: chunk\ndata: {\"content\":\" world\"}\n\nevent: complete\ndata: {\"tokens\":2}\n\n";

    #[test]
    fn test_single_read_parses_all_records() {
        let mut decoder = SseDecoder::new();
        let records = decoder.feed(Bytes::from_static(CHAT_PAYLOAD));

        assert_eq!(records.len(), 4);
        assert_eq!(records[0].event.as_deref(), Some("progress"));
        assert_eq!(records[1].data, json!({"content": "Hello"}));
        assert_eq!(records[2].data, json!({"content": " world"}));
        assert_eq!(records[3].event.as_deref(), Some("complete"));
        assert_eq!(records[3].data, json!({"tokens": 2}));
    }

    #[test]
    fn test_records_are_split_insensitive() {
        let expected = SseDecoder::new().feed(Bytes::from_static(CHAT_PAYLOAD));

        for split in 1..CHAT_PAYLOAD.len() {
            let mut decoder = SseDecoder::new();
            let mut records = decoder.feed(Bytes::copy_from_slice(&CHAT_PAYLOAD[..split]));
            records.extend(decoder.feed(Bytes::copy_from_slice(&CHAT_PAYLOAD[split..])));
            assert_eq!(records, expected, "split at byte {split}");
        }
    }

    #[test]
    fn test_multibyte_character_split_across_reads() {
        let payload = "event: chunk\ndata: {\"content\":\"你好\"}\n\n".as_bytes();
        // Split inside the first three-byte character
        let pivot = payload.iter().position(|b| *b > 0x7f).unwrap() + 1;

        let mut decoder = SseDecoder::new();
        let mut records = decoder.feed(Bytes::copy_from_slice(&payload[..pivot]));
        records.extend(decoder.feed(Bytes::copy_from_slice(&payload[pivot..])));

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].data["content"], "你好");
    }

    #[test]
    fn test_invalid_byte_is_substituted() {
        let mut payload = b"data: he".to_vec();
        payload.push(0xff);
        payload.extend_from_slice(b"llo\n\n");

        let mut decoder = SseDecoder::new();
        let records = decoder.feed(Bytes::from(payload));

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].data, Value::String("he\u{fffd}llo".to_string()));
    }

    #[test]
    fn test_non_json_data_kept_as_raw_text() {
        let mut decoder = SseDecoder::new();
        let records = decoder.feed(Bytes::from_static(b"event: chunk\ndata: plain words\n\n"));

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].data, Value::String("plain words".to_string()));
    }

    #[test]
    fn test_empty_and_comment_records_ignored() {
        let mut decoder = SseDecoder::new();
        let records = decoder.feed(Bytes::from_static(
            b": keepalive\n\nevent: chunk\n\nretry: 500\ndata: 1\n\n",
        ));

        // The comment-only and data-less records vanish; the last one counts
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event, None);
        assert_eq!(records[0].data, json!(1));
    }

    #[test]
    fn test_trailing_partial_record_stays_buffered() {
        let mut decoder = SseDecoder::new();
        let records = decoder.feed(Bytes::from_static(
            b"data: {\"content\":\"a\"}\n\ndata: {\"con",
        ));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].data["content"], "a");

        let records = decoder.feed(Bytes::from_static(b"tent\":\"b\"}\n\n"));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].data["content"], "b");
    }

    #[test]
    fn test_id_field_captured() {
        let mut decoder = SseDecoder::new();
        let records = decoder.feed(Bytes::from_static(b"id: 7\nevent: chunk\ndata: \"x\"\n\n"));

        assert_eq!(records[0].id.as_deref(), Some("7"));
        assert_eq!(records[0].data, Value::String("x".to_string()));
    }
}
