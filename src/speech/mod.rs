//! # Speech Service Module
//!
//! Thin client for the hosted real-time conversational speech API
//! (Gemini Live over WebSocket). The server streams microphone audio up
//! and receives transcribed intents back; everything meaningful the model
//! does for us arrives as either a tool call carrying command text or a
//! model turn carrying synthesized audio.
//!
//! ## Key Components:
//! - **Client**: connection lifecycle, outbound event channel, inbound
//!   event fan-out, startup pre-warm
//! - **Events**: the JSON vocabulary exchanged with the service
//! - **Audio**: browser float samples → 16-bit PCM → base64 media chunks

pub mod audio;
pub mod client;
pub mod events;

pub use client::{connect, prewarm, SpeechClient};
