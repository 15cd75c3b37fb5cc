//! Streaming event types and the byte-stream adapter

use crate::wire::{Frame, LineDecoder};
use async_stream::stream;
use futures::StreamExt;
use std::pin::Pin;
use tokio_stream::Stream;

/// Events emitted while consuming a streamed reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// An incremental fragment of assistant text
    Delta { text: String },
    /// Stream completed; carries the full accumulated text
    Done { text: String },
    /// The transport failed, or the stream ended without the sentinel
    Error { message: String },
}

impl StreamEvent {
    /// Check if this is a terminal event (Done or Error)
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done { .. } | StreamEvent::Error { .. })
    }
}

/// A stream of reply events
pub type DeltaStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Adapt a stream of byte chunks into [`StreamEvent`]s.
///
/// Chunks are reassembled into lines by [`LineDecoder`], event-data frames
/// are decoded one line at a time (malformed frames skipped), and deltas are
/// accumulated so `Done` carries the complete reply text. Events are yielded
/// in byte-arrival order. A stream that ends without the completion sentinel
/// terminates with `Error`; the sentinel is the only completion signal the
/// contract defines.
pub fn delta_stream<S, E>(chunks: S) -> impl Stream<Item = StreamEvent>
where
    S: Stream<Item = std::result::Result<bytes::Bytes, E>>,
    E: std::fmt::Display,
{
    stream! {
        let mut decoder = LineDecoder::new();
        let mut full = String::new();
        let mut chunks = std::pin::pin!(chunks);

        while let Some(chunk) = chunks.next().await {
            let chunk = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    yield StreamEvent::Error { message: e.to_string() };
                    return;
                }
            };
            for line in decoder.push(&chunk) {
                match Frame::parse(&line) {
                    Some(Frame::Delta(text)) => {
                        full.push_str(&text);
                        yield StreamEvent::Delta { text };
                    }
                    Some(Frame::Done) => {
                        yield StreamEvent::Done { text: std::mem::take(&mut full) };
                        return;
                    }
                    None => {}
                }
            }
        }

        // The connection closed; the sentinel may sit in an unterminated tail.
        if let Some(line) = decoder.finish() {
            if Frame::parse(&line) == Some(Frame::Done) {
                yield StreamEvent::Done { text: std::mem::take(&mut full) };
                return;
            }
        }
        yield StreamEvent::Error {
            message: "stream ended before completion sentinel".to_string(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    type ChunkResult = std::result::Result<Bytes, std::io::Error>;

    fn ok_chunks(chunks: &[&str]) -> Vec<ChunkResult> {
        chunks
            .iter()
            .map(|c| Ok(Bytes::copy_from_slice(c.as_bytes())))
            .collect()
    }

    async fn collect(chunks: Vec<ChunkResult>) -> Vec<StreamEvent> {
        let stream = delta_stream(tokio_stream::iter(chunks));
        let stream = std::pin::pin!(stream);
        stream.collect().await
    }

    #[tokio::test]
    async fn test_hello_frames_accumulate() {
        let events = collect(ok_chunks(&[
            "data: {\"content\":\"Hel\"}\n",
            "data: {\"content\":\"lo\"}\n",
            "data: [DONE]\n",
        ]))
        .await;
        assert_eq!(
            events,
            vec![
                StreamEvent::Delta { text: "Hel".into() },
                StreamEvent::Delta { text: "lo".into() },
                StreamEvent::Done { text: "Hello".into() },
            ]
        );
    }

    #[tokio::test]
    async fn test_frame_split_across_chunks() {
        let events = collect(ok_chunks(&[
            "data: {\"con",
            "tent\":\"Hi\"}\ndata: [DO",
            "NE]\n",
        ]))
        .await;
        assert_eq!(
            events,
            vec![
                StreamEvent::Delta { text: "Hi".into() },
                StreamEvent::Done { text: "Hi".into() },
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_frame_skipped() {
        let events = collect(ok_chunks(&[
            "data: {broken\n",
            "data: {\"content\":\"ok\"}\n",
            "data: [DONE]\n",
        ]))
        .await;
        assert_eq!(
            events,
            vec![
                StreamEvent::Delta { text: "ok".into() },
                StreamEvent::Done { text: "ok".into() },
            ]
        );
    }

    #[tokio::test]
    async fn test_non_data_lines_ignored() {
        let events = collect(ok_chunks(&[
            ": ping\n",
            "data: {\"content\":\"x\"}\n",
            "data: [DONE]\n",
        ]))
        .await;
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn test_unterminated_sentinel_flushed_at_eof() {
        let events = collect(ok_chunks(&["data: {\"content\":\"x\"}\n", "data: [DONE]"])).await;
        assert_eq!(
            events.last(),
            Some(&StreamEvent::Done { text: "x".into() })
        );
    }

    #[tokio::test]
    async fn test_eof_without_sentinel_is_error() {
        let events = collect(ok_chunks(&["data: {\"content\":\"partial\"}\n"])).await;
        assert!(matches!(
            events.last(),
            Some(StreamEvent::Error { .. })
        ));
    }

    #[tokio::test]
    async fn test_transport_error_terminates_stream() {
        let chunks: Vec<ChunkResult> = vec![
            Ok(Bytes::from_static(b"data: {\"content\":\"a\"}\n")),
            Err(std::io::Error::other("connection reset")),
        ];
        let events = collect(chunks).await;
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[1],
            StreamEvent::Error { message } if message.contains("connection reset")
        ));
    }
}
