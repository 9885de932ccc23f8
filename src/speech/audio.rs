//! # Audio Format Conversion
//!
//! The browser captures microphone audio as 32-bit float samples and sends
//! the raw `Float32Array` buffer over the WebSocket; the speech service
//! wants 16-bit little-endian PCM wrapped in base64 media chunks. This
//! module does that conversion and nothing else; resampling and channel
//! mixing are the capture side's job.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

/// Convert a raw little-endian f32 sample buffer to 16-bit PCM bytes.
///
/// Samples are expected in [-1.0, 1.0]; out-of-range values are clamped
/// rather than wrapped so clipping stays audible instead of becoming noise.
///
/// ## Returns:
/// - **Ok(bytes)**: PCM16 little-endian data, half the input length
/// - **Err(message)**: input length is not a multiple of 4
pub fn float32le_to_pcm16(data: &[u8]) -> Result<Vec<u8>, String> {
    if data.is_empty() {
        return Err("Audio frame is empty".to_string());
    }

    if data.len() % 4 != 0 {
        return Err(format!(
            "Audio frame length {} is not a multiple of 4 (expected f32 samples)",
            data.len()
        ));
    }

    let mut cursor = Cursor::new(data);
    let mut pcm = Vec::with_capacity(data.len() / 2);

    while let Ok(sample) = cursor.read_f32::<LittleEndian>() {
        let scaled = (sample * 32768.0).clamp(-32768.0, 32767.0) as i16;
        pcm.write_i16::<LittleEndian>(scaled)
            .map_err(|e| format!("PCM write failed: {}", e))?;
    }

    Ok(pcm)
}

/// Base64-encode a PCM chunk for transport inside a JSON media chunk.
pub fn encode_pcm_chunk(pcm: &[u8]) -> String {
    BASE64.encode(pcm)
}

/// Decode a base64 audio payload received from the speech service.
pub fn decode_audio_payload(data: &str) -> Result<Vec<u8>, String> {
    BASE64
        .decode(data)
        .map_err(|e| format!("Invalid base64 audio payload: {}", e))
}

/// MIME type for raw PCM at the given sample rate, as the speech service
/// expects it on media chunks.
pub fn pcm_mime_type(sample_rate: u32) -> String {
    format!("audio/pcm;rate={}", sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float_bytes(samples: &[f32]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for s in samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn test_float_conversion_scales_and_clamps() {
        let input = float_bytes(&[0.0, 0.5, -0.5, 1.5, -1.5]);
        let pcm = float32le_to_pcm16(&input).unwrap();

        let mut cursor = Cursor::new(pcm.as_slice());
        assert_eq!(cursor.read_i16::<LittleEndian>().unwrap(), 0);
        assert_eq!(cursor.read_i16::<LittleEndian>().unwrap(), 16384);
        assert_eq!(cursor.read_i16::<LittleEndian>().unwrap(), -16384);
        // Out-of-range samples clamp to the PCM16 extremes
        assert_eq!(cursor.read_i16::<LittleEndian>().unwrap(), 32767);
        assert_eq!(cursor.read_i16::<LittleEndian>().unwrap(), -32768);
    }

    #[test]
    fn test_misaligned_frame_is_rejected() {
        assert!(float32le_to_pcm16(&[0u8; 6]).is_err());
        assert!(float32le_to_pcm16(&[]).is_err());
    }

    #[test]
    fn test_base64_round_trip() {
        let pcm = vec![1u8, 2, 3, 4, 255];
        let encoded = encode_pcm_chunk(&pcm);
        assert_eq!(decode_audio_payload(&encoded).unwrap(), pcm);
    }

    #[test]
    fn test_mime_type() {
        assert_eq!(pcm_mime_type(16000), "audio/pcm;rate=16000");
    }
}
