//! Normalization of `/generate_speech` responses.
//!
//! The endpoint either streams encoded audio directly or answers with JSON
//! `{ "audio": <base64>, "mime_type": ... }`. The response `Content-Type`
//! decides which.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use debate_core::SynthesizedAudio;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::http::RawResponse;

#[derive(Debug, Deserialize)]
struct EncodedAudio {
    audio: String,
    #[serde(default)]
    mime_type: Option<String>,
}

fn is_json(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|ct| {
            let ct = ct.trim();
            ct.eq_ignore_ascii_case("application/json") || ct.ends_with("+json")
        })
}

/// Turn a speech response body into audio bytes.
pub(crate) fn normalize_speech(response: RawResponse) -> ApiResult<SynthesizedAudio> {
    let audio = if is_json(response.content_type.as_deref()) {
        let encoded: EncodedAudio = serde_json::from_slice(&response.bytes)?;
        let bytes = STANDARD.decode(encoded.audio.trim())?;
        SynthesizedAudio::new(bytes, encoded.mime_type)
    } else {
        let mime = response
            .content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_string())
            .filter(|ct| !ct.is_empty() && ct != "application/octet-stream");
        SynthesizedAudio::new(response.bytes, mime)
    };

    if audio.is_empty() {
        return Err(ApiError::InvalidResponse {
            message: "speech response contained no audio".to_string(),
        });
    }
    Ok(audio)
}
