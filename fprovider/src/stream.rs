//! Streaming response decoding shared by both wire dialects.
//!
//! ```rust
//! use fprovider::{ProviderId, StreamDecoder, StreamProgress};
//!
//! let mut seen = Vec::new();
//! let mut decoder = StreamDecoder::new(ProviderId::OpenAi);
//! let progress = decoder
//!     .feed(
//!         b"data: {\"choices\":[{\"delta\":{\"content\":\"A\"}}]}\n\
//!           data: {\"choices\":[{\"delta\":{\"content\":\"B\"}}]}\n\
//!           data: [DONE]\n",
//!         &mut |text: &str| seen.push(text.to_string()),
//!     )
//!     .expect("stream should decode");
//!
//! assert_eq!(progress, StreamProgress::Done);
//! assert_eq!(seen, vec!["A", "AB"]);
//! ```

use crate::adapters::{anthropic, openai};
use crate::{
    CompletionResult, DONE_SENTINEL, LineDecoder, ProviderError, ProviderId, WireFormat, catalog,
    event_payload,
};

/// Running totals for one streamed completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamAccumulator {
    pub text: String,
    pub stop_reason: Option<String>,
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
}

impl StreamAccumulator {
    /// Appends a non-empty delta. Returns whether the total changed.
    pub fn push_text(&mut self, delta: &str) -> bool {
        if delta.is_empty() {
            return false;
        }

        self.text.push_str(delta);
        true
    }

    pub fn into_result(self) -> CompletionResult {
        CompletionResult {
            text: self.text,
            stop_reason: self.stop_reason,
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamProgress {
    Continue,
    /// The terminator payload arrived. Remaining bytes are ignored.
    Done,
}

/// Turns body chunks into callback invocations and a final [`CompletionResult`].
///
/// The callback receives the cumulative text after every text-bearing event and is never
/// called with an empty string. Payloads that fail to parse are logged and skipped; an
/// error event reported by the provider fails the stream.
#[derive(Debug)]
pub struct StreamDecoder {
    provider: ProviderId,
    wire: WireFormat,
    lines: LineDecoder,
    accumulator: StreamAccumulator,
    done: bool,
    skipped_events: u32,
}

impl StreamDecoder {
    pub fn new(provider: ProviderId) -> Self {
        Self {
            provider,
            wire: catalog::profile(provider).wire,
            lines: LineDecoder::new(),
            accumulator: StreamAccumulator::default(),
            done: false,
            skipped_events: 0,
        }
    }

    pub fn feed<F>(&mut self, bytes: &[u8], on_text: &mut F) -> Result<StreamProgress, ProviderError>
    where
        F: FnMut(&str) + ?Sized,
    {
        if self.done {
            return Ok(StreamProgress::Done);
        }

        for line in self.lines.feed(bytes)? {
            if self.process_line(&line, on_text)? == StreamProgress::Done {
                return Ok(StreamProgress::Done);
            }
        }

        Ok(StreamProgress::Continue)
    }

    /// Consumes the decoder at end of body, processing any unterminated final line.
    pub fn finish<F>(mut self, on_text: &mut F) -> Result<CompletionResult, ProviderError>
    where
        F: FnMut(&str) + ?Sized,
    {
        if !self.done {
            if let Some(line) = self.lines.finish()? {
                self.process_line(&line, on_text)?;
            }
        }

        Ok(self.accumulator.into_result())
    }

    pub fn skipped_events(&self) -> u32 {
        self.skipped_events
    }

    pub fn text(&self) -> &str {
        &self.accumulator.text
    }

    fn process_line<F>(
        &mut self,
        line: &str,
        on_text: &mut F,
    ) -> Result<StreamProgress, ProviderError>
    where
        F: FnMut(&str) + ?Sized,
    {
        let Some(payload) = event_payload(line) else {
            return Ok(StreamProgress::Continue);
        };

        if payload == DONE_SENTINEL {
            self.done = true;
            return Ok(StreamProgress::Done);
        }

        if payload.is_empty() {
            return Ok(StreamProgress::Continue);
        }

        // Undecodable payloads are skipped; a decoded error event fails the stream.
        let appended = match self.wire {
            WireFormat::Messages => anthropic::decode_event(payload)
                .map(|event| anthropic::apply_event(event, &mut self.accumulator)),
            WireFormat::ChatCompletions => openai::decode_chunk(payload)
                .map(|chunk| openai::apply_chunk(chunk, &mut self.accumulator)),
        };

        match appended {
            Ok(applied) => {
                if applied? {
                    on_text(&self.accumulator.text);
                }
            }
            Err(error) => {
                self.skipped_events += 1;
                tracing::warn!(
                    phase = "provider",
                    event = "stream_event_skipped",
                    provider = %self.provider,
                    error = %error
                );
            }
        }

        Ok(StreamProgress::Continue)
    }
}
