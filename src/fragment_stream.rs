//! Text fragments of a streamed chat reply.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use futures::{Stream, StreamExt};

use crate::observability::{STREAM_ERRORS, STREAM_FIRST_FRAGMENT, STREAM_FRAGMENTS};
use crate::{ChatCompletion, ChatResponse, ClientLogger, Error, Result, Usage};

/// A finite, non-restartable sequence of text fragments.
///
/// Wraps the parsed chunk stream of a streaming `/api/chat` call and yields
/// only the text each chunk carries.  Concatenating the fragments in arrival
/// order gives the full reply.  The stream ends after the chunk marked
/// `done`; its usage counters are then available from [`FragmentStream::usage`].
/// Once it has ended or failed it yields nothing further, so a retry needs a
/// new request.
pub struct FragmentStream {
    inner: Pin<Box<dyn Stream<Item = Result<ChatResponse>> + Send>>,
    model: String,
    logger: Option<Arc<dyn ClientLogger>>,
    usage: Option<Usage>,
    done_reason: Option<String>,
    finished: bool,
    started: Instant,
    seen_fragment: bool,
}

impl FragmentStream {
    /// Wraps a stream of parsed chunks for the given model.
    pub fn new<S>(stream: S, model: impl Into<String>) -> Self
    where
        S: Stream<Item = Result<ChatResponse>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
            model: model.into(),
            logger: None,
            usage: None,
            done_reason: None,
            finished: false,
            started: Instant::now(),
            seen_fragment: false,
        }
    }

    /// Attaches a logger that sees every chunk.
    pub fn with_logger(mut self, logger: Option<Arc<dyn ClientLogger>>) -> Self {
        self.logger = logger;
        self
    }

    /// Usage counters from the final chunk, once the stream has completed.
    pub fn usage(&self) -> Option<Usage> {
        self.usage
    }

    /// Why generation stopped, once the stream has completed.
    pub fn done_reason(&self) -> Option<&str> {
        self.done_reason.as_deref()
    }

    /// True once the stream has ended, successfully or not.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Drains the remaining fragments and concatenates them.
    pub async fn collect_text(&mut self) -> Result<String> {
        let mut text = String::new();
        while let Some(fragment) = self.next().await {
            text.push_str(&fragment?);
        }
        Ok(text)
    }

    /// Drains the stream into a [`ChatCompletion`].
    pub async fn into_completion(mut self) -> Result<ChatCompletion> {
        let text = self.collect_text().await?;
        Ok(ChatCompletion {
            text,
            usage: self.usage.unwrap_or_default(),
        })
    }

    fn fail(&mut self, err: Error) -> Poll<Option<Result<String>>> {
        STREAM_ERRORS.click();
        self.finished = true;
        Poll::Ready(Some(Err(err)))
    }

    fn note_fragment(&mut self) {
        STREAM_FRAGMENTS.click();
        if !self.seen_fragment {
            self.seen_fragment = true;
            STREAM_FIRST_FRAGMENT.add(self.started.elapsed().as_secs_f64());
        }
    }
}

impl std::fmt::Debug for FragmentStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentStream")
            .field("model", &self.model)
            .field("usage", &self.usage)
            .field("done_reason", &self.done_reason)
            .field("finished", &self.finished)
            .field("seen_fragment", &self.seen_fragment)
            .finish_non_exhaustive()
    }
}

impl Stream for FragmentStream {
    type Item = Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if self.finished {
                return Poll::Ready(None);
            }
            match self.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(mut chunk))) => {
                    if let Some(logger) = &self.logger {
                        logger.log_stream_chunk(&chunk);
                    }
                    if let Some(message) = chunk.error.take() {
                        let err = match Error::from_server(500, &self.model, message) {
                            Error::InternalServer { message } => Error::streaming(message, None),
                            other => other,
                        };
                        return self.fail(err);
                    }
                    let text = chunk.text().to_string();
                    if chunk.done {
                        self.finished = true;
                        self.usage = Some(chunk.usage);
                        self.done_reason = chunk.done_reason;
                        if text.is_empty() {
                            return Poll::Ready(None);
                        }
                        self.note_fragment();
                        return Poll::Ready(Some(Ok(text)));
                    }
                    if text.is_empty() {
                        continue;
                    }
                    self.note_fragment();
                    return Poll::Ready(Some(Ok(text)));
                }
                Poll::Ready(Some(Err(err))) => return self.fail(err),
                Poll::Ready(None) => {
                    return self.fail(Error::streaming(
                        "stream ended before the final chunk",
                        None,
                    ));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// What a chat call produced: the whole reply, or a stream of its fragments.
pub enum ChatReply {
    /// The server answered in one piece.
    Complete(ChatCompletion),

    /// The server is streaming the answer.
    Streaming(FragmentStream),
}

impl ChatReply {
    /// Resolves the reply to its full text, draining the stream if needed.
    pub async fn into_text(self) -> Result<String> {
        Ok(self.into_completion().await?.text)
    }

    /// Resolves the reply to a [`ChatCompletion`], draining the stream if needed.
    pub async fn into_completion(self) -> Result<ChatCompletion> {
        match self {
            ChatReply::Complete(completion) => Ok(completion),
            ChatReply::Streaming(stream) => stream.into_completion().await,
        }
    }
}

impl std::fmt::Debug for ChatReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatReply::Complete(completion) => f.debug_tuple("Complete").field(completion).finish(),
            ChatReply::Streaming(_) => f.debug_tuple("Streaming").finish(),
        }
    }
}
