//! Newline-delimited JSON processing for streaming responses.
//!
//! Ollama streams chat replies as one JSON object per line.  This module turns
//! the raw byte stream of an HTTP response into a stream of parsed
//! [`ChatResponse`] objects, buffering partial lines across chunk boundaries.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::observability::{STREAM_BYTES, STREAM_ERRORS};
use crate::{ChatResponse, Error, Result};

/// Process a stream of bytes into a stream of chat response objects.
///
/// Bytes are buffered until a full line is available, so a line split across
/// chunks, even in the middle of a multi-byte character, is decoded whole.
/// A trailing line without a newline is decoded when the byte stream ends.
pub fn process_ndjson<S, E>(byte_stream: S) -> impl Stream<Item = Result<ChatResponse>>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    // Convert transport errors to our error type
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });

    let buffer: Vec<u8> = Vec::new();

    stream::unfold(
        (stream, buffer, false),
        move |(mut stream, mut buffer, finished)| async move {
            loop {
                // First check if we have a complete line in the buffer
                if let Some(line) = take_line(&mut buffer) {
                    match parse_line(&line) {
                        Some(item) => return Some((item, (stream, buffer, finished))),
                        None => continue,
                    }
                }

                if finished {
                    return None;
                }

                // Read more data
                match stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_BYTES.count(bytes.len() as u64);
                        buffer.extend_from_slice(&bytes);
                    }
                    Some(Err(e)) => {
                        STREAM_ERRORS.click();
                        return Some((Err(e), (stream, buffer, true)));
                    }
                    None => {
                        // End of stream; whatever is left is the last line
                        let rest = std::mem::take(&mut buffer);
                        if let Some(item) = parse_line(&rest) {
                            return Some((item, (stream, buffer, true)));
                        }
                        return None;
                    }
                }
            }
        },
    )
}

/// Remove and return the first complete line in the buffer, without its
/// terminator.
fn take_line(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let newline = buffer.iter().position(|b| *b == b'\n')?;
    let mut line: Vec<u8> = buffer.drain(..=newline).collect();
    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Some(line)
}

/// Parse one line.  Blank lines yield nothing.
fn parse_line(line: &[u8]) -> Option<Result<ChatResponse>> {
    let text = match std::str::from_utf8(line) {
        Ok(text) => text,
        Err(e) => {
            STREAM_ERRORS.click();
            return Some(Err(Error::encoding(
                format!("Invalid UTF-8 in stream: {e}"),
                Some(Box::new(e)),
            )));
        }
    };
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match serde_json::from_str::<ChatResponse>(text) {
        Ok(response) => Some(Ok(response)),
        Err(e) => {
            STREAM_ERRORS.click();
            Some(Err(Error::serialization(
                format!("Failed to parse stream line '{text}': {e}"),
                Some(Box::new(e)),
            )))
        }
    }
}
