//! Anthropic Messages API request construction and stream event decoding.

use serde::{Deserialize, Serialize};

use crate::{CompletionRequest, HttpRequest, ProviderError, StreamAccumulator};

pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const API_KEY_HEADER: &str = "x-api-key";
pub const VERSION_HEADER: &str = "anthropic-version";

#[derive(Debug, Serialize)]
struct MessagesBody<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "str::is_empty")]
    system: &'a str,
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
    let body = MessagesBody {
        model: config.effective_model(),
        max_tokens: config.max_tokens,
        system: request.system_prompt.trim(),
        messages: request
            .conversation()
            .map(|message| WireMessage {
                role: message.role.as_str(),
                content: &message.content,
            })
            .collect(),
        stream: true,
    };

    let body = serde_json::to_value(&body)
        .map_err(|err| ProviderError::invalid_request(err.to_string()))?;

    Ok(
        HttpRequest::post_json(format!("{endpoint}/v1/messages"), body)
            .with_header(API_KEY_HEADER, config.credential.expose())
            .with_header(VERSION_HEADER, ANTHROPIC_VERSION),
    )
}

/// Stream events this client acts on. Every other `type` decodes as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicEvent {
    MessageStart {
        message: MessageStartBody,
    },
    ContentBlockDelta {
        delta: ContentDelta,
    },
    MessageDelta {
        #[serde(default)]
        delta: MessageDeltaBody,
        #[serde(default)]
        usage: Option<OutputUsage>,
    },
    Error {
        error: ErrorBody,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageStartBody {
    #[serde(default)]
    pub usage: Option<InputUsage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InputUsage {
    #[serde(default)]
    pub input_tokens: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentDelta {
    TextDelta {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct MessageDeltaBody {
    #[serde(default)]
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutputUsage {
    #[serde(default)]
    pub output_tokens: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub message: String,
}

pub fn decode_event(payload: &str) -> Result<AnthropicEvent, serde_json::Error> {
    serde_json::from_str(payload)
}

/// Folds one event into the running result. Returns true when text was appended.
///
/// An `error` event ends the stream with a protocol error.
pub fn apply_event(
    event: AnthropicEvent,
    accumulator: &mut StreamAccumulator,
) -> Result<bool, ProviderError> {
    let appended = match event {
        AnthropicEvent::MessageStart { message } => {
            if let Some(tokens) = message.usage.and_then(|usage| usage.input_tokens) {
                accumulator.input_tokens = Some(tokens);
            }
            false
        }
        AnthropicEvent::ContentBlockDelta {
            delta: ContentDelta::TextDelta { text },
        } => accumulator.push_text(&text),
        AnthropicEvent::ContentBlockDelta {
            delta: ContentDelta::Other,
        } => false,
        AnthropicEvent::MessageDelta { delta, usage } => {
            if delta.stop_reason.is_some() {
                accumulator.stop_reason = delta.stop_reason;
            }
            if let Some(tokens) = usage.and_then(|usage| usage.output_tokens) {
                accumulator.output_tokens = Some(tokens);
            }
            false
        }
        AnthropicEvent::Error { error } => {
            return Err(ProviderError::stream_error(&error.kind, &error.message));
        }
        AnthropicEvent::Other => false,
    };
    Ok(appended)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Message, ProviderConfig, ProviderId, Role};

    fn request() -> CompletionRequest {
        CompletionRequest::new(
            vec![
                Message::new(Role::User, "hi"),
                Message::new(Role::Assistant, "hello"),
                Message::new(Role::User, "how are you?"),
            ],
            ProviderConfig::for_provider(ProviderId::Anthropic)
                .with_model("claude-test")
                .with_credential("sk-ant-1")
                .with_max_tokens(256),
        )
        .with_system_prompt("be brief")
    }

    #[test]
    fn builds_messages_request_with_headers_and_body() {
        let http = build_request("https://api.anthropic.com", &request()).expect("request");

        assert_eq!(http.url, "https://api.anthropic.com/v1/messages");
        assert_eq!(http.header("x-api-key"), Some("sk-ant-1"));
        assert_eq!(http.header("anthropic-version"), Some(ANTHROPIC_VERSION));
        assert_eq!(http.header("content-type"), Some("application/json"));
        assert_eq!(
            http.body,
            serde_json::json!({
                "model": "claude-test",
                "max_tokens": 256,
                "system": "be brief",
                "messages": [
                    {"role": "user", "content": "hi"},
                    {"role": "assistant", "content": "hello"},
                    {"role": "user", "content": "how are you?"}
                ],
                "stream": true
            })
        );
    }

    #[test]
    fn decodes_known_events_and_tolerates_unknown_fields() {
        let event = decode_event(
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi"}}"#,
        )
        .expect("delta should decode");
        assert_eq!(
            event,
            AnthropicEvent::ContentBlockDelta {
                delta: ContentDelta::TextDelta {
                    text: "Hi".to_string()
                }
            }
        );

        let ping = decode_event(r#"{"type":"ping"}"#).expect("ping should decode");
        assert_eq!(ping, AnthropicEvent::Other);

        let json_delta = decode_event(
            r#"{"type":"content_block_delta","index":1,"delta":{"type":"input_json_delta","partial_json":"{"}}"#,
        )
        .expect("json delta should decode");
        assert_eq!(
            json_delta,
            AnthropicEvent::ContentBlockDelta {
                delta: ContentDelta::Other
            }
        );
    }

    #[test]
    fn captures_usage_and_stop_reason() {
        let mut accumulator = StreamAccumulator::default();
        let start = decode_event(
            r#"{"type":"message_start","message":{"id":"msg_1","usage":{"input_tokens":12,"output_tokens":1}}}"#,
        )
        .expect("start");
        let end = decode_event(
            r#"{"type":"message_delta","delta":{"stop_reason":"end_turn","stop_sequence":null},"usage":{"output_tokens":7}}"#,
        )
        .expect("end");

        assert!(!apply_event(start, &mut accumulator).expect("start applies"));
        assert!(!apply_event(end, &mut accumulator).expect("end applies"));

        let result = accumulator.into_result();
        assert_eq!(result.input_tokens, Some(12));
        assert_eq!(result.output_tokens, Some(7));
        assert_eq!(result.stop_reason.as_deref(), Some("end_turn"));
    }

    #[test]
    fn error_events_fail_the_stream() {
        let event = decode_event(
            r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#,
        )
        .expect("error event should decode");

        let mut accumulator = StreamAccumulator::default();
        let error = apply_event(event, &mut accumulator).expect_err("error event should fail");

        assert_eq!(error.kind, crate::ProviderErrorKind::Protocol);
        assert_eq!(error.message, "overloaded_error: Overloaded");
    }
}
