//! Framing for the newline-delimited event protocol
//!
//! The streaming endpoint answers with a byte stream of event-data lines,
//! each either `data: {"content": "<delta>"}` or the literal `data: [DONE]`.
//! Network reads can cut a line (or a multi-byte character) anywhere, so
//! framing is done incrementally: [`LineDecoder`] buffers raw bytes and only
//! surfaces complete lines, and [`Frame::parse`] decodes one line at a time.

use serde::Deserialize;

/// Prefix of an event-data line
pub const DATA_PREFIX: &str = "data: ";

/// Literal payload marking the end of a stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// Incremental byte-to-line framer.
///
/// Bytes are accumulated until a `\n` is seen; the partial tail (including
/// any split UTF-8 sequence) is carried to the next push, so lines are
/// always decoded from complete byte runs. A trailing `\r` is trimmed.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: Vec<u8>,
}

impl LineDecoder {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, returning every line it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop(); // the newline itself
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Flush a trailing line that was never newline-terminated
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let mut tail = std::mem::take(&mut self.buf);
        if tail.last() == Some(&b'\r') {
            tail.pop();
        }
        Some(String::from_utf8_lossy(&tail).into_owned())
    }

    /// Whether a partial line is currently buffered
    pub fn has_partial(&self) -> bool {
        !self.buf.is_empty()
    }
}

/// A parsed event-data frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// An incremental fragment of assistant text
    Delta(String),
    /// The completion sentinel
    Done,
}

/// JSON envelope carried by a delta frame
#[derive(Debug, Deserialize)]
struct DeltaEnvelope {
    content: Option<String>,
}

impl Frame {
    /// Parse one complete line.
    ///
    /// Lines without the event-data prefix, envelopes without a `content`
    /// field, and malformed JSON all yield `None`: a bad frame is skipped,
    /// never fatal to the stream.
    pub fn parse(line: &str) -> Option<Frame> {
        let payload = line.strip_prefix(DATA_PREFIX)?;
        if payload == DONE_SENTINEL {
            return Some(Frame::Done);
        }
        match serde_json::from_str::<DeltaEnvelope>(payload) {
            Ok(envelope) => envelope.content.map(Frame::Delta),
            Err(e) => {
                tracing::trace!("skipping malformed frame: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- LineDecoder ---

    #[test]
    fn test_single_complete_line() {
        let mut decoder = LineDecoder::new();
        assert_eq!(decoder.push(b"hello\n"), vec!["hello"]);
        assert!(!decoder.has_partial());
    }

    #[test]
    fn test_line_split_across_chunks() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(b"data: {\"con").is_empty());
        assert!(decoder.has_partial());
        assert_eq!(
            decoder.push(b"tent\": \"hi\"}\n"),
            vec!["data: {\"content\": \"hi\"}"]
        );
    }

    #[test]
    fn test_multiple_lines_in_one_chunk() {
        let mut decoder = LineDecoder::new();
        let lines = decoder.push(b"one\ntwo\nthree");
        assert_eq!(lines, vec!["one", "two"]);
        assert_eq!(decoder.finish().as_deref(), Some("three"));
    }

    #[test]
    fn test_crlf_trimmed() {
        let mut decoder = LineDecoder::new();
        assert_eq!(decoder.push(b"data: [DONE]\r\n"), vec!["data: [DONE]"]);
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        // "é" is 0xC3 0xA9; split it between reads
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(b"caf\xc3").is_empty());
        assert_eq!(decoder.push(b"\xa9\n"), vec!["café"]);
    }

    #[test]
    fn test_finish_empty_buffer() {
        let mut decoder = LineDecoder::new();
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_finish_consumes_tail() {
        let mut decoder = LineDecoder::new();
        decoder.push(b"tail");
        assert_eq!(decoder.finish().as_deref(), Some("tail"));
        assert_eq!(decoder.finish(), None);
    }

    // --- Frame parsing ---

    #[test]
    fn test_parse_delta() {
        assert_eq!(
            Frame::parse(r#"data: {"content": "Hel"}"#),
            Some(Frame::Delta("Hel".to_string()))
        );
    }

    #[test]
    fn test_parse_done_sentinel() {
        assert_eq!(Frame::parse("data: [DONE]"), Some(Frame::Done));
    }

    #[test]
    fn test_parse_skips_malformed_json() {
        assert_eq!(Frame::parse("data: {not json"), None);
    }

    #[test]
    fn test_parse_skips_envelope_without_content() {
        assert_eq!(Frame::parse(r#"data: {"other": 1}"#), None);
    }

    #[test]
    fn test_parse_ignores_non_data_lines() {
        assert_eq!(Frame::parse(": keep-alive"), None);
        assert_eq!(Frame::parse(""), None);
        assert_eq!(Frame::parse("event: message"), None);
    }
}
