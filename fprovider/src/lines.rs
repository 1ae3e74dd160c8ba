//! Incremental line splitting for `data:` framed response bodies.
//!
//! ```rust
//! use fprovider::{LineDecoder, event_payload};
//!
//! let mut decoder = LineDecoder::new();
//! assert!(decoder.feed(b"data: {\"a\"").expect("utf8").is_empty());
//! let lines = decoder.feed(b":1}\n\n").expect("utf8");
//! assert_eq!(lines, vec!["data: {\"a\":1}".to_string(), String::new()]);
//! assert_eq!(event_payload(&lines[0]), Some("{\"a\":1}"));
//! ```

use crate::ProviderError;

pub const EVENT_MARKER: &str = "data:";
pub const DONE_SENTINEL: &str = "[DONE]";

/// Buffers raw bytes until a full line is available.
///
/// Chunk boundaries may split lines and multi-byte characters; only completed lines are
/// decoded. A trailing `\r` is stripped.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<String>, ProviderError> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line = self.buffer.drain(..=newline).collect::<Vec<_>>();
            lines.push(decode_line(&line[..line.len() - 1])?);
        }

        Ok(lines)
    }

    /// Drains an unterminated final line, if any.
    pub fn finish(&mut self) -> Result<Option<String>, ProviderError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest).map(Some)
    }
}

fn decode_line(bytes: &[u8]) -> Result<String, ProviderError> {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8(bytes.to_vec()).map_err(|err| {
        ProviderError::invalid_response(format!("response line is not valid UTF-8: {err}"))
    })
}

/// Returns the payload of an event line, or `None` for lines without the event marker.
pub fn event_payload(line: &str) -> Option<&str> {
    line.trim_start()
        .strip_prefix(EVENT_MARKER)
        .map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderErrorKind;

    #[test]
    fn reassembles_lines_split_across_chunks() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.feed(b"data: hel").expect("feed").is_empty());
        assert_eq!(
            decoder.feed(b"lo\r\ndata: two\n").expect("feed"),
            vec!["data: hello".to_string(), "data: two".to_string()]
        );
        assert_eq!(decoder.finish().expect("finish"), None);
    }

    #[test]
    fn reassembles_multibyte_characters_split_across_chunks() {
        let bytes = "data: caf\u{e9}\n".as_bytes();
        let split = bytes.len() - 2;
        let mut decoder = LineDecoder::new();

        assert!(decoder.feed(&bytes[..split]).expect("feed").is_empty());
        assert_eq!(
            decoder.feed(&bytes[split..]).expect("feed"),
            vec!["data: caf\u{e9}".to_string()]
        );
    }

    #[test]
    fn flushes_trailing_unterminated_line() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.feed(b"data: [DONE]").expect("feed").is_empty());
        assert_eq!(
            decoder.finish().expect("finish").as_deref(),
            Some("data: [DONE]")
        );
    }

    #[test]
    fn rejects_invalid_utf8_lines() {
        let mut decoder = LineDecoder::new();
        let error = decoder
            .feed(&[b'd', 0xff, 0xfe, b'\n'])
            .expect_err("invalid utf8 should fail");
        assert_eq!(error.kind, ProviderErrorKind::InvalidResponse);
    }

    #[test]
    fn event_payload_requires_the_marker() {
        assert_eq!(event_payload("data: {}"), Some("{}"));
        assert_eq!(event_payload("data:{}"), Some("{}"));
        assert_eq!(event_payload("event: message_start"), None);
        assert_eq!(event_payload(": keep-alive"), None);
        assert_eq!(event_payload(""), None);
    }
}
