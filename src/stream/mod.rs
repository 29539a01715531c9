pub mod sse;
pub mod transcoder;

pub use sse::{RawFrame, SseFrameSplitter};
pub use transcoder::{StreamTranscoder, TranscoderState};

use std::collections::VecDeque;
use std::fmt::Display;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::{Sink, SinkExt, Stream, StreamExt};

use crate::error::ProxyError;

/// One-shot producer binding an upstream body to a [`StreamTranscoder`].
///
/// Consume it either as a pull-based byte stream ([`SseProducer::into_stream`])
/// or by pushing into a sink ([`SseProducer::drive`]). At most one upstream
/// chunk is read ahead of what the consumer has taken, and dropping the
/// producer or its stream drops the upstream body.
pub struct SseProducer {
    upstream: BoxStream<'static, Result<Bytes, ProxyError>>,
    transcoder: StreamTranscoder,
}

impl SseProducer {
    pub fn new<S, E>(upstream: S, transcoder: StreamTranscoder) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let upstream = upstream
            .map(|item| item.map_err(|err| ProxyError::Transport(err.to_string())))
            .boxed();
        Self {
            upstream,
            transcoder,
        }
    }

    /// Translated SSE bytes, one frame per item.
    pub fn into_stream(self) -> impl Stream<Item = Bytes> + Send + 'static {
        futures_util::stream::unfold(
            (
                self.upstream,
                self.transcoder,
                VecDeque::<Bytes>::with_capacity(8),
                Vec::<Bytes>::with_capacity(8),
            ),
            |(mut upstream, mut transcoder, mut pending, mut scratch)| async move {
                loop {
                    if let Some(frame) = pending.pop_front() {
                        return Some((frame, (upstream, transcoder, pending, scratch)));
                    }
                    if transcoder.is_closed() {
                        return None;
                    }

                    match upstream.next().await {
                        Some(Ok(chunk)) => transcoder.push_chunk_into(&chunk, &mut scratch),
                        Some(Err(err)) => {
                            tracing::warn!(error = %err, "upstream stream failed");
                            transcoder.fail_into(&err.client_message(), &mut scratch);
                        }
                        None => transcoder.finish_into(&mut scratch),
                    }
                    pending.extend(scratch.drain(..));
                }
            },
        )
    }

    /// Push every translated frame into `sink`, then close it.
    ///
    /// # Errors
    ///
    /// Returns the sink's error as soon as a send fails; the upstream is
    /// dropped without being read further.
    pub async fn drive<K>(self, mut sink: K) -> Result<(), K::Error>
    where
        K: Sink<Bytes> + Unpin,
    {
        let stream = self.into_stream();
        let mut stream = std::pin::pin!(stream);
        while let Some(frame) = stream.next().await {
            sink.send(frame).await?;
        }
        sink.close().await
    }
}

impl std::fmt::Debug for SseProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SseProducer")
            .field("state", &self.transcoder.state())
            .finish_non_exhaustive()
    }
}
