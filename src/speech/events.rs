//! # Speech Service Events
//!
//! The JSON vocabulary exchanged with the Gemini Live endpoint. Every
//! message on the wire is an object with a single key naming the event
//! kind, which maps directly onto externally tagged serde enums in
//! camelCase. Only the subset this backend actually exchanges is modeled;
//! unknown inbound events fail deserialization and are logged and dropped
//! by the client's read loop.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// Name of the function the speech model calls to drive the form tracker.
pub const FORM_TOOL_NAME: &str = "handle_form_command";

/// Events this backend sends to the speech service.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientEvent {
    /// Session configuration, sent once right after connecting
    Setup(Setup),

    /// Streaming microphone audio
    RealtimeInput(RealtimeInput),

    /// Result of a tool call the model asked for
    ToolResponse(ToolResponse),
}

/// Session configuration payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
    pub tools: Vec<Tool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl Setup {
    /// Session setup for the form-filling agent: audio responses plus the
    /// single form-command tool the model dispatches transcribed intents to.
    pub fn form_filling(model: &str) -> Self {
        Self {
            model: format!("models/{}", model),
            generation_config: GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
            },
            tools: vec![Tool {
                function_declarations: vec![FunctionDeclaration {
                    name: FORM_TOOL_NAME.to_string(),
                    description: "Relay a spoken form-filling command, verbatim, \
                                  to the form tracker."
                        .to_string(),
                    parameters: json!({
                        "type": "object",
                        "properties": {
                            "command": {
                                "type": "string",
                                "description": "The user's utterance as transcribed text"
                            }
                        },
                        "required": ["command"]
                    }),
                }],
            }],
        }
    }
}

/// Streaming input payload: one or more base64 media chunks.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<MediaChunk>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaChunk {
    pub mime_type: String,
    pub data: String,
}

impl RealtimeInput {
    pub fn audio_chunk(mime_type: String, data: String) -> Self {
        Self {
            media_chunks: vec![MediaChunk { mime_type, data }],
        }
    }
}

/// Tool call results sent back to the model.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub function_responses: Vec<FunctionResponse>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub response: serde_json::Value,
}

/// Events the speech service sends to this backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ServerEvent {
    /// Acknowledges the setup message; the session is ready for input
    SetupComplete(serde_json::Value),

    /// A piece of the model's turn: text, inline audio, or turn completion
    ServerContent(ServerContent),

    /// The model wants one or more functions invoked
    ToolCall(ToolCall),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default)]
    pub model_turn: Option<ModelTurn>,
    #[serde(default)]
    pub turn_complete: Option<bool>,
    #[serde(default)]
    pub interrupted: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelTurn {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    #[serde(default)]
    pub function_calls: Vec<FunctionCall>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCall {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

impl FunctionCall {
    /// The command text for a form-tool invocation, if present.
    pub fn command(&self) -> Option<&str> {
        self.args.get("command").and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_serializes_externally_tagged() {
        let event = ClientEvent::Setup(Setup::form_filling("gemini-1.5-flash-latest"));
        let value = serde_json::to_value(&event).unwrap();

        let setup = value.get("setup").expect("setup key");
        assert_eq!(
            setup.get("model").and_then(|v| v.as_str()),
            Some("models/gemini-1.5-flash-latest")
        );
        assert_eq!(
            setup["generationConfig"]["responseModalities"][0],
            serde_json::json!("AUDIO")
        );
        assert_eq!(
            setup["tools"][0]["functionDeclarations"][0]["name"],
            serde_json::json!(FORM_TOOL_NAME)
        );
    }

    #[test]
    fn test_realtime_input_chunk_shape() {
        let event = ClientEvent::RealtimeInput(RealtimeInput::audio_chunk(
            "audio/pcm;rate=16000".to_string(),
            "AAAA".to_string(),
        ));
        let value = serde_json::to_value(&event).unwrap();

        let chunk = &value["realtimeInput"]["mediaChunks"][0];
        assert_eq!(chunk["mimeType"], serde_json::json!("audio/pcm;rate=16000"));
        assert_eq!(chunk["data"], serde_json::json!("AAAA"));
    }

    #[test]
    fn test_tool_call_deserializes() {
        let raw = r#"{
            "toolCall": {
                "functionCalls": [
                    {"id": "call-1", "name": "handle_form_command",
                     "args": {"command": "my name is John"}}
                ]
            }
        }"#;

        let event: ServerEvent = serde_json::from_str(raw).unwrap();
        match event {
            ServerEvent::ToolCall(call) => {
                assert_eq!(call.function_calls.len(), 1);
                assert_eq!(call.function_calls[0].name, FORM_TOOL_NAME);
                assert_eq!(call.function_calls[0].command(), Some("my name is John"));
            }
            other => panic!("expected ToolCall, got {:?}", other),
        }
    }

    #[test]
    fn test_server_content_with_audio_part() {
        let raw = r#"{
            "serverContent": {
                "modelTurn": {
                    "parts": [
                        {"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": "UklGRg=="}}
                    ]
                },
                "turnComplete": true
            }
        }"#;

        let event: ServerEvent = serde_json::from_str(raw).unwrap();
        match event {
            ServerEvent::ServerContent(content) => {
                assert_eq!(content.turn_complete, Some(true));
                let parts = content.model_turn.unwrap().parts;
                let inline = parts[0].inline_data.as_ref().unwrap();
                assert_eq!(inline.mime_type, "audio/pcm;rate=24000");
            }
            other => panic!("expected ServerContent, got {:?}", other),
        }
    }

    #[test]
    fn test_setup_complete_deserializes() {
        let event: ServerEvent = serde_json::from_str(r#"{"setupComplete": {}}"#).unwrap();
        assert!(matches!(event, ServerEvent::SetupComplete(_)));
    }
}
