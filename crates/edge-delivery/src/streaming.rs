//! Reassembly of streamed response records.
//!
//! Streamed bodies look like `RS record LF RS record LF ...`. Chunks can end
//! anywhere, including inside a record or a multi-byte character, so the
//! assembler works on bytes and only converts complete records.

use crate::hit::StreamingSettings;
use crate::response_handler::NetworkResponseHandler;
use edge_network::ResponseSink;
use serde::de::IgnoredAny;
use std::sync::Arc;
use tracing::debug;

/// Splits a chunked byte stream into records.
#[derive(Debug)]
pub struct RecordAssembler {
    separator: Vec<u8>,
    line_feed: Vec<u8>,
    buffer: Vec<u8>,
}

impl RecordAssembler {
    pub fn new(settings: &StreamingSettings) -> Self {
        Self {
            separator: settings.record_separator.as_bytes().to_vec(),
            line_feed: settings.line_feed.as_bytes().to_vec(),
            buffer: Vec::new(),
        }
    }

    /// Append `chunk` and return every record it completed.
    ///
    /// A record is complete when the next separator arrives, or when the
    /// buffered bytes end with the line feed and form a whole JSON document.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut records = Vec::new();

        if self.separator.is_empty() {
            return records;
        }

        while let Some(pos) = find(&self.buffer, &self.separator) {
            let record: Vec<u8> = self.buffer.drain(..pos + self.separator.len()).take(pos).collect();
            if let Some(record) = self.finish_record(&record) {
                records.push(record);
            }
        }

        if !self.buffer.is_empty()
            && !self.line_feed.is_empty()
            && self.buffer.ends_with(&self.line_feed)
        {
            let body = &self.buffer[..self.buffer.len() - self.line_feed.len()];
            if serde_json::from_slice::<IgnoredAny>(body).is_ok() {
                let record = std::mem::take(&mut self.buffer);
                if let Some(record) = self.finish_record(&record) {
                    records.push(record);
                }
            }
        }

        records
    }

    /// Whatever is left once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        let residual = std::mem::take(&mut self.buffer);
        self.finish_record(&residual)
    }

    fn finish_record(&self, raw: &[u8]) -> Option<String> {
        let mut raw = raw;
        if !self.line_feed.is_empty() {
            while raw.ends_with(&self.line_feed) {
                raw = &raw[..raw.len() - self.line_feed.len()];
            }
        }
        let text = String::from_utf8_lossy(raw);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// [`ResponseSink`] that hands every completed record to the handler.
///
/// Without streaming settings the whole body is one document, handled
/// on [`complete`](Self::complete).
pub struct StreamingResponseSink {
    handler: Arc<NetworkResponseHandler>,
    request_id: String,
    assembler: Option<RecordAssembler>,
    body: Vec<u8>,
}

impl StreamingResponseSink {
    pub fn new(
        handler: Arc<NetworkResponseHandler>,
        request_id: impl Into<String>,
        streaming: Option<&StreamingSettings>,
    ) -> Self {
        Self {
            handler,
            request_id: request_id.into(),
            assembler: streaming.map(RecordAssembler::new),
            body: Vec::new(),
        }
    }

    /// Flush the residual record and release the request's waiting events.
    pub fn complete(mut self) {
        let residual = match self.assembler.as_mut() {
            Some(assembler) => assembler.finish(),
            None => {
                let body = String::from_utf8_lossy(&self.body).trim().to_string();
                (!body.is_empty()).then_some(body)
            }
        };
        if let Some(record) = residual {
            self.handler.process_response(&self.request_id, &record);
        }
        self.handler.remove_waiting_events(&self.request_id);
        debug!(request_id = %self.request_id, "Response stream closed");
    }
}

impl ResponseSink for StreamingResponseSink {
    fn on_chunk(&mut self, chunk: &[u8]) {
        match self.assembler.as_mut() {
            Some(assembler) => {
                for record in assembler.feed(chunk) {
                    self.handler.process_response(&self.request_id, &record);
                }
            }
            None => self.body.extend_from_slice(chunk),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembler() -> RecordAssembler {
        RecordAssembler::new(&StreamingSettings::default())
    }

    #[test]
    fn splits_records_on_separator() {
        let mut assembler = assembler();
        let records = assembler.feed(b"\x00{\"a\":1}\n\x00{\"b\":2}\n");
        assert_eq!(records, vec!["{\"a\":1}", "{\"b\":2}"]);
        assert!(assembler.finish().is_none());
    }

    #[test]
    fn record_split_across_chunks() {
        let mut assembler = assembler();
        assert!(assembler.feed(b"\x00{\"handle\":[{\"ty").is_empty());
        assert!(assembler.feed(b"pe\":\"x\"").is_empty());
        let records = assembler.feed(b"}]}\n");
        assert_eq!(records, vec!["{\"handle\":[{\"type\":\"x\"}]}"]);
    }

    #[test]
    fn line_feed_inside_incomplete_json_does_not_close_record() {
        let mut assembler = assembler();
        assert!(assembler.feed(b"\x00{\"a\":\n").is_empty());
        let records = assembler.feed(b"1}\n");
        assert_eq!(records.len(), 1);
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&records[0]).unwrap()["a"],
            1
        );
    }

    #[test]
    fn multibyte_character_split_between_chunks() {
        let mut assembler = assembler();
        let body = "\u{0000}{\"title\":\"café\"}\n".as_bytes().to_vec();
        let split = body.len() - 4;
        assert!(assembler.feed(&body[..split]).is_empty());
        assert_eq!(assembler.feed(&body[split..]), vec!["{\"title\":\"café\"}"]);
    }

    #[test]
    fn finish_returns_unterminated_residual() {
        let mut assembler = assembler();
        assert!(assembler.feed(b"\x00{\"a\":1}").is_empty());
        assert_eq!(assembler.finish().as_deref(), Some("{\"a\":1}"));
        assert!(assembler.finish().is_none());
    }

    #[test]
    fn separator_split_across_chunks() {
        let settings = StreamingSettings {
            record_separator: "<RS>".to_string(),
            line_feed: "\n".to_string(),
        };
        let mut assembler = RecordAssembler::new(&settings);
        assert!(assembler.feed(b"<RS>{\"a\":1}<R").is_empty());
        assert_eq!(assembler.feed(b"S>{\"b\":2}\n"), vec!["{\"a\":1}", "{\"b\":2}"]);
    }
}
