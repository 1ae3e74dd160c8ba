//! OpenAI-compatible Chat Completions request construction and chunk decoding.

use serde::{Deserialize, Serialize};

use crate::{CompletionRequest, HttpRequest, ProviderError, Role, StreamAccumulator};

#[derive(Debug, Serialize)]
struct ChatCompletionsBody<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

pub fn build_request(
    endpoint: &str,
    request: &CompletionRequest,
) -> Result<HttpRequest, ProviderError> {
    let config = &request.config;
    let system_prompt = request.system_prompt.trim();

    let mut messages = Vec::new();
    if !system_prompt.is_empty() {
        messages.push(WireMessage {
            role: Role::System.as_str(),
            content: system_prompt,
        });
    }
    messages.extend(request.conversation().map(|message| WireMessage {
        role: message.role.as_str(),
        content: &message.content,
    }));

    let body = ChatCompletionsBody {
        model: config.effective_model(),
        max_tokens: config.max_tokens,
        messages,
        stream: true,
    };

    let body = serde_json::to_value(&body)
        .map_err(|err| ProviderError::invalid_request(err.to_string()))?;

    Ok(
        HttpRequest::post_json(format!("{endpoint}/v1/chat/completions"), body).with_header(
            "authorization",
            format!("Bearer {}", config.credential.expose()),
        ),
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(default)]
    pub usage: Option<ChunkUsage>,
    /// Present when the upstream failed after the 2xx status was already sent.
    #[serde(default)]
    pub error: Option<ChunkError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ChunkError {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ChunkUsage {
    #[serde(default)]
    pub prompt_tokens: Option<u32>,
    #[serde(default)]
    pub completion_tokens: Option<u32>,
}

pub fn decode_chunk(payload: &str) -> Result<ChatCompletionChunk, serde_json::Error> {
    serde_json::from_str(payload)
}

/// Folds one chunk into the running result. Returns true when text was appended.
///
/// A chunk carrying a top-level `error` object ends the stream with a protocol error.
pub fn apply_chunk(
    chunk: ChatCompletionChunk,
    accumulator: &mut StreamAccumulator,
) -> Result<bool, ProviderError> {
    if let Some(error) = chunk.error {
        return Err(ProviderError::stream_error(
            error.kind.as_deref().unwrap_or_default(),
            &error.message,
        ));
    }

    let mut appended = false;

    if let Some(choice) = chunk.choices.into_iter().next() {
        if let Some(content) = choice.delta.content {
            appended = accumulator.push_text(&content);
        }
        if choice.finish_reason.is_some() {
            accumulator.stop_reason = choice.finish_reason;
        }
    }

    if let Some(usage) = chunk.usage {
        if usage.prompt_tokens.is_some() {
            accumulator.input_tokens = usage.prompt_tokens;
        }
        if usage.completion_tokens.is_some() {
            accumulator.output_tokens = usage.completion_tokens;
        }
    }

    Ok(appended)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Message, ProviderConfig, ProviderId};

    #[test]
    fn builds_chat_completions_request_with_leading_system_message() {
        let request = CompletionRequest::new(
            vec![
                Message::new(Role::User, "hi"),
                Message::new(Role::Assistant, "hello"),
            ],
            ProviderConfig::for_provider(ProviderId::OpenAi)
                .with_model("gpt-test")
                .with_credential("sk-1")
                .with_max_tokens(64),
        )
        .with_system_prompt("be brief");

        let http = build_request("https://api.openai.com", &request).expect("request");

        assert_eq!(http.url, "https://api.openai.com/v1/chat/completions");
        assert_eq!(http.header("authorization"), Some("Bearer sk-1"));
        assert_eq!(http.header("x-api-key"), None);
        assert_eq!(
            http.body,
            serde_json::json!({
                "model": "gpt-test",
                "max_tokens": 64,
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "hi"},
                    {"role": "assistant", "content": "hello"}
                ],
                "stream": true
            })
        );
    }

    #[test]
    fn usage_only_chunks_have_no_choices() {
        let chunk = decode_chunk(
            r#"{"id":"c1","object":"chat.completion.chunk","choices":[],"usage":{"prompt_tokens":9,"completion_tokens":4,"total_tokens":13}}"#,
        )
        .expect("chunk should decode");

        let mut accumulator = StreamAccumulator::default();
        assert!(!apply_chunk(chunk, &mut accumulator).expect("chunk applies"));

        let result = accumulator.into_result();
        assert_eq!(result.input_tokens, Some(9));
        assert_eq!(result.output_tokens, Some(4));
    }

    #[test]
    fn content_and_finish_reason_may_share_a_chunk() {
        let chunk = decode_chunk(
            r#"{"choices":[{"index":0,"delta":{"role":"assistant","content":"ok"},"finish_reason":"stop"}]}"#,
        )
        .expect("chunk should decode");

        let mut accumulator = StreamAccumulator::default();
        assert!(apply_chunk(chunk, &mut accumulator).expect("chunk applies"));

        let result = accumulator.into_result();
        assert_eq!(result.text, "ok");
        assert_eq!(result.stop_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn error_objects_fail_the_stream() {
        let chunk = decode_chunk(
            r#"{"id":"gen-1","error":{"message":"Provider returned error","code":502}}"#,
        )
        .expect("error chunk should decode");

        let mut accumulator = StreamAccumulator::default();
        let error = apply_chunk(chunk, &mut accumulator).expect_err("error chunk should fail");

        assert_eq!(error.kind, crate::ProviderErrorKind::Protocol);
        assert_eq!(error.message, "Provider returned error");
        assert!(accumulator.text.is_empty());
    }
}
