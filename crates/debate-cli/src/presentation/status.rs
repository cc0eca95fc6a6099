use std::fmt::Write as _;

use debate_core::ChatSnapshot;
use debate_voice::{AdapterKind, ServiceHealth, VoiceStatus};

fn adapter_or_none(kind: Option<AdapterKind>) -> String {
    kind.map_or_else(|| "none".to_string(), |k| k.to_string())
}

fn health_line(name: &str, supported: bool, health: &ServiceHealth) -> String {
    format!(
        "    {name:<6} supported={supported:<5} state={:?} errors={}",
        health.state, health.consecutive_errors
    )
}

/// Multi-line `/status` report.
pub fn render_status(chat: &ChatSnapshot, voice: &VoiceStatus) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "  language:     {}", chat.language);
    if let Some(topic) = &chat.topic {
        let _ = writeln!(out, "  topic:        {topic}");
    }
    let _ = writeln!(out, "  messages:     {}", chat.message_count);
    let _ = writeln!(out, "  muted:        {}", chat.muted);
    let _ = writeln!(
        out,
        "  voice:        {} (preferred {}, next {})",
        if voice.available { "available" } else { "unavailable" },
        voice.preferred_adapter,
        adapter_or_none(voice.next_adapter),
    );
    let _ = writeln!(
        out,
        "  playback:     {:?}, {} queued{}",
        voice.phase,
        voice.pending_audio,
        if voice.user_interacted { "" } else { ", waiting for first input" },
    );
    if let Some(error) = &voice.last_error {
        let _ = writeln!(out, "  last error:   {error}");
    }
    let _ = writeln!(out, "  health:");
    let _ = writeln!(
        out,
        "{}",
        health_line("cloud", voice.cloud_supported, &voice.health.cloud)
    );
    out.push_str(&health_line(
        "local",
        voice.local_supported,
        &voice.health.local,
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use debate_core::Language;
    use debate_voice::{HealthBook, PlaybackPhase};

    #[test]
    fn test_status_mentions_gate_and_errors() {
        let chat = ChatSnapshot {
            messages: vec![],
            thinking: false,
            language: Language::German,
            topic: Some("Energy".into()),
            recommended_answers: vec![],
            message_count: 3,
            muted: false,
            session_id: "s".into(),
        };
        let mut health = HealthBook::default();
        health.cloud.record_failure();
        let voice = VoiceStatus {
            available: true,
            preferred_adapter: AdapterKind::Cloud,
            current_adapter: None,
            next_adapter: Some(AdapterKind::Cloud),
            cloud_supported: true,
            local_supported: false,
            user_interacted: false,
            pending_audio: 2,
            is_playing: false,
            phase: PlaybackPhase::Idle,
            last_error: Some("no adapter available".into()),
            health,
        };

        let report = render_status(&chat, &voice);
        assert!(report.contains("topic:        Energy"));
        assert!(report.contains("2 queued, waiting for first input"));
        assert!(report.contains("last error:   no adapter available"));
        assert!(report.contains("state=Degraded errors=1"));
    }
}
