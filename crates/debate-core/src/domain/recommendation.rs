//! Suggested replies offered to the user.

use serde::{Deserialize, Serialize};

/// A reply suggestion returned by the conversation API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendedAnswer {
    pub id: String,
    pub text: String,
}

impl RecommendedAnswer {
    /// Drop suggestions with blank text and trim the rest.
    pub fn sanitize(answers: Vec<Self>) -> Vec<Self> {
        answers
            .into_iter()
            .filter_map(|a| {
                let text = a.text.trim();
                if text.is_empty() {
                    None
                } else {
                    Some(Self {
                        id: a.id,
                        text: text.to_string(),
                    })
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_drops_blank_entries() {
        let answers = vec![
            RecommendedAnswer {
                id: "1".into(),
                text: "  Borders matter.  ".into(),
            },
            RecommendedAnswer {
                id: "2".into(),
                text: "   ".into(),
            },
        ];
        let cleaned = RecommendedAnswer::sanitize(answers);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].text, "Borders matter.");
    }
}
