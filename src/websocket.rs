//! # WebSocket Session Transport
//!
//! Bridges one browser connection to the speech service and the form
//! tracker. Clients connect to `/ws`, stream raw microphone audio as
//! binary frames, and receive form actions as JSON text frames.
//!
//! ## WebSocket Protocol:
//! - **Client → Server (binary)**: raw 32-bit float LE samples, forwarded
//!   to the speech service as PCM media chunks
//! - **Client → Server (text)**: command text, run through the interpreter
//!   directly (no speech service involved)
//! - **Server → Client (text)**: one JSON action per interpreted command,
//!   e.g. `{"action":"open_form","form":"default"}`
//! - **Server → Client (binary)**: synthesized speech audio from the model
//!
//! Each connection owns its own [`FormSession`], so concurrent users can
//! never see each other's half-filled forms.

use crate::config::AppConfig;
use crate::form::{handle_command, Action, FormSession};
use crate::speech;
use crate::speech::events::{
    ClientEvent, FunctionResponse, RealtimeInput, ServerEvent, ToolResponse, FORM_TOOL_NAME,
};
use crate::state::AppState;

use actix::prelude::*;
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use actix_web_actors::ws;
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// How often the server pings an idle connection.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// How long a client may stay silent before the connection is dropped.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

/// WebSocket actor for one form-filling conversation.
pub struct FormWebSocket {
    /// Connection identifier, for log correlation only
    session_id: String,

    /// This conversation's form-filling state
    form: FormSession,

    /// Live speech service connection, once established
    speech: Option<speech::SpeechClient>,

    /// Shared application state (metrics, config)
    app_state: web::Data<AppState>,

    /// Configuration snapshot taken at connection time
    config: AppConfig,

    /// Last time the client gave any sign of life
    last_heartbeat: Instant,
}

impl FormWebSocket {
    pub fn new(app_state: web::Data<AppState>) -> Self {
        let config = app_state.get_config();
        Self {
            session_id: Uuid::new_v4().to_string(),
            form: FormSession::new(),
            speech: None,
            app_state,
            config,
            last_heartbeat: Instant::now(),
        }
    }

    /// Interpret one command, publish the action to the browser, and
    /// return it for any further relaying (tool responses).
    fn apply_command(&mut self, command: &str, ctx: &mut ws::WebsocketContext<Self>) -> Action {
        let started = Instant::now();

        let action = handle_command(&mut self.form, command);
        self.app_state.record_form_action(&action);

        match serde_json::to_string(&action) {
            Ok(json) => ctx.text(json),
            Err(e) => error!("failed to serialize action: {}", e),
        }

        let latency_ms = started.elapsed().as_millis() as u64;
        self.app_state.observe_voice_latency(latency_ms);

        match &action {
            Action::SubmitForm { data } => {
                info!(
                    session_id = %self.session_id,
                    fields = data.len(),
                    "Form submitted"
                );
            }
            Action::Noop => {
                debug!(session_id = %self.session_id, command = %command, "Command ignored");
            }
            _ => {
                debug!(session_id = %self.session_id, action = ?action, "Form action");
            }
        }

        action
    }

    /// Forward one microphone frame to the speech service.
    fn handle_audio_frame(&mut self, data: &[u8]) -> Result<(), String> {
        let event = media_chunk_event(data, self.config.audio.sample_rate)?;

        let Some(client) = &self.speech else {
            debug!(
                session_id = %self.session_id,
                "Audio frame dropped, speech service not connected yet"
            );
            return Ok(());
        };

        client
            .sender()
            .try_send(event)
            .map_err(|e| format!("speech service backlog: {}", e))
    }

    /// Relay one speech-service event to the browser and/or interpreter.
    fn handle_speech_event(&mut self, event: ServerEvent, ctx: &mut ws::WebsocketContext<Self>) {
        match event {
            ServerEvent::SetupComplete(_) => {
                debug!(session_id = %self.session_id, "Speech session ready");
            }
            ServerEvent::ServerContent(content) => {
                if let Some(turn) = content.model_turn {
                    for part in turn.parts {
                        if let Some(text) = part.text {
                            self.apply_command(&text, ctx);
                        }
                        if let Some(inline) = part.inline_data {
                            match speech::audio::decode_audio_payload(&inline.data) {
                                Ok(bytes) => ctx.binary(bytes),
                                Err(e) => warn!("bad audio payload from speech service: {}", e),
                            }
                        }
                    }
                }
                if content.turn_complete == Some(true) {
                    debug!(session_id = %self.session_id, "Model turn complete");
                }
            }
            ServerEvent::ToolCall(call) => {
                for function_call in call.function_calls {
                    if function_call.name != FORM_TOOL_NAME {
                        warn!(
                            session_id = %self.session_id,
                            name = %function_call.name,
                            "Unknown tool call from speech service"
                        );
                        continue;
                    }

                    let Some(command) = function_call.command().map(str::to_owned) else {
                        warn!(session_id = %self.session_id, "Tool call without command text");
                        continue;
                    };

                    let action = self.apply_command(&command, ctx);
                    self.send_tool_response(function_call.id, &action);
                }
            }
        }
    }

    /// Report a tool call's result back to the speech model so it can
    /// narrate the outcome.
    fn send_tool_response(&self, call_id: Option<String>, action: &Action) {
        let Some(client) = &self.speech else {
            return;
        };

        let response = match serde_json::to_value(action) {
            Ok(value) => value,
            Err(e) => {
                error!("failed to serialize tool response: {}", e);
                return;
            }
        };

        let event = ClientEvent::ToolResponse(ToolResponse {
            function_responses: vec![FunctionResponse {
                id: call_id,
                name: FORM_TOOL_NAME.to_string(),
                response,
            }],
        });

        if let Err(e) = client.sender().try_send(event) {
            warn!("failed to queue tool response: {}", e);
        }
    }

    fn send_error(&self, ctx: &mut ws::WebsocketContext<Self>, code: &str, message: &str) {
        let error_msg = json!({
            "action": "error",
            "code": code,
            "message": message,
        });
        ctx.text(error_msg.to_string());

        warn!(session_id = %self.session_id, code = %code, "WebSocket error: {}", message);
    }
}

/// Build a `realtimeInput` event from one raw browser audio frame.
fn media_chunk_event(data: &[u8], sample_rate: u32) -> Result<ClientEvent, String> {
    let pcm = speech::audio::float32le_to_pcm16(data)?;
    Ok(ClientEvent::RealtimeInput(RealtimeInput::audio_chunk(
        speech::audio::pcm_mime_type(sample_rate),
        speech::audio::encode_pcm_chunk(&pcm),
    )))
}

/// Speech connection established for this session.
#[derive(Message)]
#[rtype(result = "()")]
struct SpeechConnected {
    client: speech::SpeechClient,
}

/// One event received from the speech service.
#[derive(Message)]
#[rtype(result = "()")]
struct SpeechEvent(ServerEvent);

/// The speech connection could not be established.
#[derive(Message)]
#[rtype(result = "()")]
struct SpeechUnavailable(String);

impl Actor for FormWebSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(session_id = %self.session_id, "WebSocket connection started");
        self.app_state.increment_active_sessions();

        // Heartbeat: ping on an interval, drop the connection when the
        // client stops answering.
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > CLIENT_TIMEOUT {
                warn!(session_id = %act.session_id, "WebSocket heartbeat timeout, closing");
                ctx.stop();
            } else {
                ctx.ping(b"");
            }
        });

        // Connect to the speech service off the actor thread and pump its
        // events back in through the mailbox.
        let addr = ctx.address();
        let speech_config = self.config.speech.clone();
        let session_id = self.session_id.clone();

        tokio::spawn(async move {
            match speech::connect(&speech_config).await {
                Ok(client) => {
                    let mut events = client.subscribe();
                    addr.do_send(SpeechConnected { client });

                    loop {
                        match events.recv().await {
                            Ok(event) => addr.do_send(SpeechEvent(event)),
                            Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                                warn!(
                                    session_id = %session_id,
                                    skipped = n,
                                    "Speech event relay lagged"
                                );
                            }
                            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                        }
                    }

                    debug!(session_id = %session_id, "Speech event relay finished");
                }
                Err(e) => {
                    addr.do_send(SpeechUnavailable(e.to_string()));
                }
            }
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        info!(session_id = %self.session_id, "WebSocket connection stopped");
        self.app_state.decrement_active_sessions();

        if let Some(client) = self.speech.take() {
            client.close();
        }
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for FormWebSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => {
                self.last_heartbeat = Instant::now();
                self.apply_command(&text, ctx);
            }
            Ok(ws::Message::Binary(data)) => {
                self.last_heartbeat = Instant::now();
                if let Err(err) = self.handle_audio_frame(&data) {
                    self.send_error(ctx, "audio_error", &err);
                }
            }
            Ok(ws::Message::Ping(data)) => {
                ctx.pong(&data);
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Close(reason)) => {
                info!(session_id = %self.session_id, "WebSocket closed: {:?}", reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) => {
                warn!("Received unexpected continuation frame");
            }
            Ok(ws::Message::Nop) => {}
            Err(err) => {
                error!("WebSocket protocol error: {}", err);
                ctx.stop();
            }
        }
    }
}

impl Handler<SpeechConnected> for FormWebSocket {
    type Result = ();

    fn handle(&mut self, msg: SpeechConnected, _ctx: &mut Self::Context) {
        info!(session_id = %self.session_id, "Speech service connected");
        self.speech = Some(msg.client);
    }
}

impl Handler<SpeechEvent> for FormWebSocket {
    type Result = ();

    fn handle(&mut self, msg: SpeechEvent, ctx: &mut Self::Context) {
        self.handle_speech_event(msg.0, ctx);
    }
}

impl Handler<SpeechUnavailable> for FormWebSocket {
    type Result = ();

    fn handle(&mut self, msg: SpeechUnavailable, ctx: &mut Self::Context) {
        // The interpreter keeps working over text frames; only the audio
        // path is down.
        error!(session_id = %self.session_id, "Speech service unavailable: {}", msg.0);
        self.send_error(ctx, "speech_unavailable", &msg.0);
    }
}

/// WebSocket endpoint handler.
///
/// Upgrades the HTTP request and hands the connection to a fresh
/// [`FormWebSocket`] actor, enforcing the concurrent session limit first.
pub async fn form_websocket(
    req: HttpRequest,
    stream: web::Payload,
    app_state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    info!(
        "New WebSocket connection request from: {:?}",
        req.connection_info().peer_addr()
    );

    let max_sessions = app_state.get_config().performance.max_concurrent_sessions;
    let active = app_state.get_metrics_snapshot().active_sessions as usize;
    if active >= max_sessions {
        warn!(active, max_sessions, "Rejecting connection, session limit reached");
        return Ok(HttpResponse::ServiceUnavailable().json(json!({
            "error": {
                "type": "session_limit",
                "message": format!("Maximum concurrent sessions ({}) reached", max_sessions),
            }
        })));
    }

    ws::start(FormWebSocket::new(app_state), &req, stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_chunk_event_shape() {
        // Two f32 samples, little-endian
        let mut frame = Vec::new();
        frame.extend_from_slice(&0.5f32.to_le_bytes());
        frame.extend_from_slice(&(-0.5f32).to_le_bytes());

        let event = media_chunk_event(&frame, 16_000).unwrap();
        let value = serde_json::to_value(&event).unwrap();

        let chunk = &value["realtimeInput"]["mediaChunks"][0];
        assert_eq!(chunk["mimeType"], json!("audio/pcm;rate=16000"));
        assert!(chunk["data"].as_str().unwrap().len() > 0);
    }

    #[test]
    fn test_media_chunk_event_rejects_misaligned_frame() {
        assert!(media_chunk_event(&[0u8; 5], 16_000).is_err());
    }

    #[test]
    fn test_error_message_wire_format() {
        let error_msg = json!({
            "action": "error",
            "code": "audio_error",
            "message": "bad frame",
        });

        let text = error_msg.to_string();
        assert!(text.contains("audio_error"));
        assert!(text.contains("\"action\":\"error\""));
    }
}
