use bytes::{Bytes, BytesMut};

use super::sse::{
    data_frame_with_fields, data_payload, done_frame, error_frame, frame_lines, is_done_payload,
    line_frame,
};
use super::sse::{RawFrame, SseFrameSplitter};
use crate::protocol::grok::stream::{encode_chunk, ChunkIdentity, StreamKind};
use crate::util::{timestamp_id, unix_now_secs};

/// Lifecycle of a [`StreamTranscoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscoderState {
    /// Consuming upstream chunks.
    Running,
    /// Upstream ended; flushing buffered frames and the terminal `[DONE]`.
    Draining,
    /// Nothing more will be emitted.
    Closed,
}

/// Re-encodes an upstream SSE byte stream into `OpenAI` chunk frames.
///
/// Frames are emitted in the order they complete. Upstream `[DONE]` markers
/// are swallowed; exactly one `[DONE]` is written when the upstream ends
/// normally, and none when it fails.
pub struct StreamTranscoder {
    kind: StreamKind,
    identity: ChunkIdentity,
    splitter: SseFrameSplitter,
    state: TranscoderState,
}

impl StreamTranscoder {
    /// New transcoder with a fresh `<prefix>-<millis>` id and the current
    /// time as `created`, both fixed for the life of the stream.
    #[must_use]
    pub fn new(kind: StreamKind, model: impl Into<String>) -> Self {
        let identity = ChunkIdentity {
            id: timestamp_id(kind.id_prefix()),
            created: unix_now_secs(),
            model: model.into(),
        };
        Self::with_identity(kind, identity)
    }

    #[must_use]
    pub fn with_identity(kind: StreamKind, identity: ChunkIdentity) -> Self {
        Self {
            kind,
            identity,
            splitter: SseFrameSplitter::new(),
            state: TranscoderState::Running,
        }
    }

    #[must_use]
    pub fn state(&self) -> TranscoderState {
        self.state
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state == TranscoderState::Closed
    }

    /// Feed one upstream chunk, appending every frame it completes to `out`.
    /// Ignored once the upstream has ended.
    pub fn push_chunk_into(&mut self, chunk: &[u8], out: &mut Vec<Bytes>) {
        if self.state != TranscoderState::Running {
            return;
        }
        self.splitter.push(chunk);
        self.drain_complete_frames(out);
    }

    #[must_use]
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        let mut out = Vec::new();
        self.push_chunk_into(chunk, &mut out);
        out
    }

    /// Upstream ended normally: flush, drop any unterminated tail and emit
    /// the terminal `[DONE]`.
    pub fn finish_into(&mut self, out: &mut Vec<Bytes>) {
        if self.state != TranscoderState::Running {
            return;
        }
        self.state = TranscoderState::Draining;
        self.drain_complete_frames(out);
        if let Some(tail) = self.splitter.take_remainder() {
            tracing::warn!(
                bytes = tail.len(),
                "upstream stream ended inside an unterminated frame; discarding it"
            );
        }
        out.push(done_frame());
        self.state = TranscoderState::Closed;
    }

    #[must_use]
    pub fn finish(&mut self) -> Vec<Bytes> {
        let mut out = Vec::new();
        self.finish_into(&mut out);
        out
    }

    /// Upstream read failed: emit one error frame and close. No `[DONE]`
    /// follows.
    pub fn fail_into(&mut self, message: &str, out: &mut Vec<Bytes>) {
        if self.state == TranscoderState::Closed {
            return;
        }
        let _ = self.splitter.take_remainder();
        out.push(error_frame(message));
        self.state = TranscoderState::Closed;
    }

    fn drain_complete_frames(&mut self, out: &mut Vec<Bytes>) {
        while let Some(frame) = self.splitter.next_frame() {
            self.translate_frame(frame, out);
        }
    }

    /// Translate one complete upstream event.
    ///
    /// Each `data:` line is handled on its own: `[DONE]` is dropped, JSON is
    /// re-encoded as a chunk and anything unparseable is forwarded as is.
    /// Other field lines (`event:`, `id:`, comments) travel in front of the
    /// first frame the event produces. Events without any `data:` line pass
    /// through byte for byte.
    fn translate_frame(&self, frame: RawFrame, out: &mut Vec<Bytes>) {
        let body = frame.body();
        if !frame_lines(body).any(|line| data_payload(line).is_some()) {
            if !body.trim_ascii().is_empty() {
                out.push(frame.into_raw());
            }
            return;
        }

        let mut fields = BytesMut::new();
        for line in frame_lines(body) {
            if !line.trim_ascii().is_empty() && data_payload(line).is_none() {
                fields.extend_from_slice(line);
                fields.extend_from_slice(b"\n");
            }
        }

        for line in frame_lines(body) {
            let Some(payload) = data_payload(line) else {
                continue;
            };
            if is_done_payload(payload) {
                continue;
            }
            let prefix = fields.split().freeze();
            out.push(self.translate_data_line(&prefix, line, payload));
        }
    }

    fn translate_data_line(&self, fields: &[u8], line: &[u8], payload: &[u8]) -> Bytes {
        let parsed = match serde_json::from_slice::<serde_json::Value>(payload) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::debug!(error = %err, "passing through unparseable stream frame");
                return line_frame(fields, line);
            }
        };
        match encode_chunk(self.kind, &self.identity, &parsed) {
            Ok(json) => data_frame_with_fields(fields, &json),
            Err(err) => {
                tracing::debug!(error = %err, "failed to encode stream chunk; passing through");
                line_frame(fields, line)
            }
        }
    }
}
