//! System notices that must never be spoken.
//!
//! Language-switch notices are posted into the transcript as ordinary text,
//! so the filter recognises them by content as well as by sender.

use debate_core::{Language, SYSTEM_SENDER};

const NOTICE_PREFIXES: [&str; 2] = ["Language switched to", "Sprache auf"];

/// Whether an utterance is a local system notice.
pub fn is_system_notice(text: &str, sender: &str) -> bool {
    if sender.trim().eq_ignore_ascii_case(SYSTEM_SENDER) {
        return true;
    }
    let text = text.trim();
    [Language::English, Language::German]
        .iter()
        .any(|lang| text == lang.switch_notice())
        || NOTICE_PREFIXES.iter().any(|p| text.starts_with(p))
}
