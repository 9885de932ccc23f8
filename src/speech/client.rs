//! # Speech Service Client
//!
//! Connection plumbing for the Gemini Live WebSocket endpoint. The socket
//! is split on connect: a writer task drains an mpsc channel of
//! [`ClientEvent`]s, and a reader task decodes inbound JSON into
//! [`ServerEvent`]s fanned out on a broadcast channel. Callers keep a
//! clonable sender for upstream traffic and subscribe for downstream
//! events; neither side blocks the other.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::config::SpeechConfig;
use crate::speech::events::{ClientEvent, ServerEvent, Setup};

/// Environment variable holding the speech service API key.
const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Capacity of both the outbound and the fan-out channels.
const CHANNEL_CAPACITY: usize = 1024;

/// Clonable handle for sending events to the speech service.
pub type SpeechTx = tokio::sync::mpsc::Sender<ClientEvent>;

/// Subscription to events received from the speech service.
pub type SpeechEventRx = tokio::sync::broadcast::Receiver<ServerEvent>;

/// A live connection to the speech service.
///
/// Dropping the client does not tear the socket down; call [`close`] to
/// stop both pump tasks. The writer task also exits on its own once every
/// [`SpeechTx`] clone has been dropped.
///
/// [`close`]: SpeechClient::close
pub struct SpeechClient {
    c_tx: SpeechTx,
    s_tx: tokio::sync::broadcast::Sender<ServerEvent>,
    send_handle: tokio::task::JoinHandle<()>,
    recv_handle: tokio::task::JoinHandle<()>,
}

impl SpeechClient {
    /// Clonable sender for outbound events.
    pub fn sender(&self) -> SpeechTx {
        self.c_tx.clone()
    }

    /// Subscribe to inbound events. Each subscriber sees every event from
    /// the moment it subscribes.
    pub fn subscribe(&self) -> SpeechEventRx {
        self.s_tx.subscribe()
    }

    /// Send one event to the speech service.
    pub async fn send(&self, event: ClientEvent) -> Result<()> {
        self.c_tx
            .send(event)
            .await
            .map_err(|_| anyhow!("speech service writer task is gone"))
    }

    /// Stop both pump tasks and abandon the socket.
    pub fn close(&self) {
        self.send_handle.abort();
        self.recv_handle.abort();
    }
}

/// Connect to the speech service and configure the form-filling session.
///
/// ## What this does:
/// 1. Reads the API key from `GEMINI_API_KEY`
/// 2. Opens the WebSocket within the configured connect timeout
/// 3. Splits the socket and starts the writer/reader pump tasks
/// 4. Sends the `setup` event (model, audio responses, form tool)
pub async fn connect(config: &SpeechConfig) -> Result<SpeechClient> {
    let api_key = api_key_from_env()?;
    let request = build_request(config, &api_key)?;

    let connect_timeout = Duration::from_millis(config.connect_timeout_ms);
    let (ws_stream, _) = tokio::time::timeout(
        connect_timeout,
        tokio_tungstenite::connect_async(request),
    )
    .await
    .map_err(|_| {
        anyhow!(
            "speech service connect timed out after {}ms",
            config.connect_timeout_ms
        )
    })?
    .context("speech service handshake failed")?;

    let (mut write, mut read) = ws_stream.split();

    let (c_tx, mut c_rx) = tokio::sync::mpsc::channel::<ClientEvent>(CHANNEL_CAPACITY);
    let (s_tx, _) = tokio::sync::broadcast::channel::<ServerEvent>(CHANNEL_CAPACITY);

    let send_handle = tokio::spawn(async move {
        while let Some(event) = c_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(text) => {
                    if let Err(e) = write.send(Message::Text(text)).await {
                        error!("failed to send speech event: {}", e);
                        break;
                    }
                }
                Err(e) => {
                    error!("failed to serialize speech event: {}", e);
                }
            }
        }
    });

    let events_tx = s_tx.clone();
    let recv_handle = tokio::spawn(async move {
        while let Some(message) = read.next().await {
            let message = match message {
                Ok(message) => message,
                Err(e) => {
                    error!("speech service read failed: {}", e);
                    break;
                }
            };

            // The service delivers JSON in both text and binary frames.
            let payload = match message {
                Message::Text(text) => text.into_bytes(),
                Message::Binary(bin) => bin,
                Message::Close(reason) => {
                    info!("speech service closed connection: {:?}", reason);
                    break;
                }
                _ => continue,
            };

            match serde_json::from_slice::<ServerEvent>(&payload) {
                Ok(event) => {
                    if events_tx.send(event).is_err() {
                        debug!("no subscribers for speech event, dropping");
                    }
                }
                Err(e) => {
                    warn!(
                        "undecodable speech event ({}): {}",
                        e,
                        String::from_utf8_lossy(&payload)
                    );
                }
            }
        }
    });

    let client = SpeechClient {
        c_tx,
        s_tx,
        send_handle,
        recv_handle,
    };

    client
        .send(ClientEvent::Setup(Setup::form_filling(&config.model)))
        .await?;

    Ok(client)
}

/// Open and immediately close a speech session so the first real user
/// connection does not pay the TLS and setup handshake.
pub async fn prewarm(config: &SpeechConfig) -> Result<()> {
    let client = connect(config).await?;
    let mut events = client.subscribe();

    // Give the service a moment to acknowledge setup; a timeout here is
    // not fatal, the handshake itself was the expensive part.
    let acknowledged = tokio::time::timeout(Duration::from_secs(5), async {
        while let Ok(event) = events.recv().await {
            if matches!(event, ServerEvent::SetupComplete(_)) {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false);

    client.close();
    info!(acknowledged, "speech service pre-warm complete");
    Ok(())
}

fn api_key_from_env() -> Result<SecretString> {
    std::env::var(API_KEY_ENV)
        .map(SecretString::from)
        .with_context(|| format!("{} is not set", API_KEY_ENV))
}

fn build_request(config: &SpeechConfig, api_key: &SecretString) -> Result<Request> {
    let url = format!("{}?key={}", config.base_url, api_key.expose_secret());
    url.into_client_request()
        .context("invalid speech service URL")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_appends_key() {
        let config = SpeechConfig {
            model: "gemini-1.5-flash-latest".to_string(),
            base_url: "wss://example.test/live".to_string(),
            connect_timeout_ms: 5000,
            prewarm: true,
        };
        let key = SecretString::from("secret-key".to_string());

        let request = build_request(&config, &key).unwrap();
        assert_eq!(request.uri().path(), "/live");
        assert_eq!(request.uri().query(), Some("key=secret-key"));
    }
}
