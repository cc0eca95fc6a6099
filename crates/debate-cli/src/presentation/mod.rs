//! Terminal rendering of chat state and voice status.

mod status;

pub use status::render_status;

use debate_core::{ChatMessage, ChatSnapshot, MessageKind, RecommendedAnswer};

/// Prints messages that have not been shown yet.
///
/// Chat state is append-only except for a reset, which empties it; the
/// cursor follows it back to zero.
#[derive(Debug, Default)]
pub struct Transcript {
    shown: usize,
}

impl Transcript {
    /// Lines for every message added since the last call.
    pub fn catch_up(&mut self, snapshot: &ChatSnapshot) -> Vec<String> {
        if snapshot.messages.len() < self.shown {
            self.shown = 0;
        }
        let lines = snapshot.messages[self.shown..]
            .iter()
            .filter(|m| m.kind != MessageKind::User)
            .map(format_message)
            .collect();
        self.shown = snapshot.messages.len();
        lines
    }
}

/// One transcript line.
pub fn format_message(message: &ChatMessage) -> String {
    match message.kind {
        MessageKind::System => format!("  * {}", message.text),
        MessageKind::User => format!("> {}", message.text),
        MessageKind::Partner | MessageKind::Moderator => {
            format!("{}: {}", message.sender, message.text)
        }
    }
}

/// Numbered suggestion list.
pub fn format_suggestions(answers: &[RecommendedAnswer]) -> String {
    if answers.is_empty() {
        return "  (no suggestions)".to_string();
    }
    answers
        .iter()
        .enumerate()
        .map(|(i, a)| format!("  {}. {}", i + 1, a.text))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use debate_core::Language;

    fn snapshot(messages: Vec<ChatMessage>) -> ChatSnapshot {
        ChatSnapshot {
            messages,
            thinking: false,
            language: Language::English,
            topic: None,
            recommended_answers: vec![],
            message_count: 0,
            muted: false,
            session_id: "s".into(),
        }
    }

    #[test]
    fn test_catch_up_prints_only_new_bot_and_system_lines() {
        let mut transcript = Transcript::default();
        let first = vec![ChatMessage::partner("Opening.")];
        assert_eq!(
            transcript.catch_up(&snapshot(first.clone())),
            vec!["Debate Partner: Opening."]
        );

        let mut second = first;
        second.push(ChatMessage::user("Reply."));
        second.push(ChatMessage::system("Connection problem."));
        assert_eq!(
            transcript.catch_up(&snapshot(second)),
            vec!["  * Connection problem."]
        );
    }

    #[test]
    fn test_catch_up_restarts_after_reset() {
        let mut transcript = Transcript::default();
        transcript.catch_up(&snapshot(vec![
            ChatMessage::partner("a"),
            ChatMessage::partner("b"),
        ]));
        assert!(transcript.catch_up(&snapshot(vec![])).is_empty());
        assert_eq!(
            transcript.catch_up(&snapshot(vec![ChatMessage::partner("c")])),
            vec!["Debate Partner: c"]
        );
    }

    #[test]
    fn test_suggestions_are_numbered_from_one() {
        let answers = vec![
            RecommendedAnswer {
                id: "1".into(),
                text: "Yes".into(),
            },
            RecommendedAnswer {
                id: "2".into(),
                text: "No".into(),
            },
        ];
        assert_eq!(format_suggestions(&answers), "  1. Yes\n  2. No");
        assert_eq!(format_suggestions(&[]), "  (no suggestions)");
    }
}
