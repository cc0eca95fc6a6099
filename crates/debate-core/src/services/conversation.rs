//! Conversation controller.
//!
//! Owns chat state, talks to the conversation API and decides which bot
//! messages get announced through the [`SpeechRequestPort`].
//!
//! Chat state sits behind a plain `std::sync::Mutex` that is never held
//! across an `.await`. A separate async lock serializes API operations so a
//! second turn cannot start while the first is still thinking.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{ChatMessage, Language, MessageId, MessageKind, RawMessage, RecommendedAnswer};
use crate::ports::{
    ApiPortError, ConversationApiPort, CoreError, HistoryEntry, MessageRequest,
    RecommendationRequest, SpeechRequestPort, StartRequest,
};

/// Read-only copy of chat state for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSnapshot {
    pub messages: Vec<ChatMessage>,
    pub thinking: bool,
    pub language: Language,
    pub topic: Option<String>,
    pub recommended_answers: Vec<RecommendedAnswer>,
    pub message_count: u32,
    pub muted: bool,
    pub session_id: String,
}

impl ChatSnapshot {
    /// Newest message from one of the bots.
    #[must_use]
    pub fn last_bot_message(&self) -> Option<&ChatMessage> {
        self.messages.iter().rev().find(|m| m.is_bot())
    }
}

#[derive(Debug)]
struct ChatState {
    messages: Vec<ChatMessage>,
    thinking: bool,
    language: Language,
    topic: Option<String>,
    recommended: Vec<RecommendedAnswer>,
    message_count: u32,
    muted: bool,
    session_id: String,
    /// Ids already handed to the voice layer.
    spoken: HashSet<MessageId>,
    /// Language active when each bot message arrived.
    received_in: HashMap<MessageId, Language>,
}

impl ChatState {
    /// Append bot replies, remembering the language they were written in.
    fn accept(&mut self, messages: &[ChatMessage]) {
        for msg in messages {
            self.received_in.insert(msg.id, self.language);
        }
        self.messages.extend(messages.iter().cloned());
    }

    /// Bot messages in `messages` that may be announced now, each with the
    /// language it arrived in.
    ///
    /// Marks them spoken, so a message id leaves here at most once.
    fn claim_announcements(&mut self, ids: &[MessageId]) -> Vec<(ChatMessage, Language)> {
        if self.muted {
            return Vec::new();
        }
        let mut out = Vec::new();
        for id in ids {
            let Some(msg) = self.messages.iter().find(|m| m.id == *id) else {
                continue;
            };
            if msg.is_bot() && self.spoken.insert(msg.id) {
                let language = self.received_in.get(&msg.id).copied().unwrap_or(self.language);
                out.push((msg.clone(), language));
            }
        }
        out
    }
}

/// Controller for one debate session.
pub struct ConversationService {
    api: Arc<dyn ConversationApiPort>,
    voice: Arc<dyn SpeechRequestPort>,
    state: Mutex<ChatState>,
    op_lock: tokio::sync::Mutex<()>,
}

impl ConversationService {
    /// Create a controller with a fresh session id.
    pub fn new(
        api: Arc<dyn ConversationApiPort>,
        voice: Arc<dyn SpeechRequestPort>,
        language: Language,
        muted: bool,
    ) -> Self {
        Self {
            api,
            voice,
            state: Mutex::new(ChatState {
                messages: Vec::new(),
                thinking: false,
                language,
                topic: None,
                recommended: Vec::new(),
                message_count: 0,
                muted,
                session_id: Uuid::new_v4().to_string(),
                spoken: HashSet::new(),
                received_in: HashMap::new(),
            }),
            op_lock: tokio::sync::Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current chat state.
    pub fn snapshot(&self) -> ChatSnapshot {
        let s = self.lock();
        ChatSnapshot {
            messages: s.messages.clone(),
            thinking: s.thinking,
            language: s.language,
            topic: s.topic.clone(),
            recommended_answers: s.recommended.clone(),
            message_count: s.message_count,
            muted: s.muted,
            session_id: s.session_id.clone(),
        }
    }

    /// Forward a user gesture to the voice layer (opens the interaction gate).
    pub fn user_gesture(&self) {
        self.voice.set_user_interacted();
    }

    /// Open the debate and append the opening message.
    pub async fn start(&self) -> Result<ChatMessage, CoreError> {
        let _op = self.op_lock.lock().await;
        let request = {
            let mut s = self.lock();
            s.thinking = true;
            StartRequest {
                language: s.language,
                session_id: s.session_id.clone(),
            }
        };

        let result = self.api.start(&request).await;

        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                self.fail_turn(&e, Vec::new());
                return Err(e.into());
            }
        };

        let opening = match RawMessage::partner(reply.opening_message).validate() {
            Ok(msg) => msg,
            Err(e) => {
                warn!(error = %e, "Rejected opening message");
                self.lock().thinking = false;
                return Err(e.into());
            }
        };

        let announce = {
            let mut s = self.lock();
            s.thinking = false;
            if let Some(lang) = reply.language {
                s.language = lang;
            }
            s.topic = reply.topic;
            s.message_count = reply.message_count;
            s.recommended = RecommendedAnswer::sanitize(reply.recommended_answers);
            s.accept(std::slice::from_ref(&opening));
            s.claim_announcements(&[opening.id])
        };
        info!(session = %request.session_id, "Debate started");
        self.announce(announce);
        Ok(opening)
    }

    /// Send one user turn and append the bot replies.
    ///
    /// Returns the bot messages that entered chat state. On failure a system
    /// notice is appended and the error is returned; input is re-enabled
    /// either way.
    pub async fn send(&self, text: &str) -> Result<Vec<ChatMessage>, CoreError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CoreError::Validation("Message cannot be empty".into()));
        }

        let _op = self.op_lock.lock().await;
        let request = {
            let mut s = self.lock();
            s.messages.push(ChatMessage::user(text));
            s.thinking = true;
            MessageRequest {
                message: text.to_string(),
                language: s.language,
                session_id: s.session_id.clone(),
            }
        };

        let reply = match self.api.send_message(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                let fallback = e.fallback_replies();
                self.fail_turn(&e, fallback);
                return Err(e.into());
            }
        };

        let accepted: Vec<ChatMessage> = reply
            .raw_messages()
            .iter()
            .filter_map(|raw| match raw.validate() {
                Ok(msg) => Some(msg),
                Err(e) => {
                    warn!(error = %e, sender = ?raw.sender, "Rejected bot reply");
                    None
                }
            })
            .collect();

        let announce = {
            let mut s = self.lock();
            s.thinking = false;
            s.message_count = reply.message_count;
            if reply.topic.is_some() {
                s.topic = reply.topic;
            }
            s.recommended = RecommendedAnswer::sanitize(reply.recommended_answers);
            s.accept(&accepted);
            let ids: Vec<MessageId> = accepted.iter().map(|m| m.id).collect();
            s.claim_announcements(&ids)
        };
        debug!(
            replies = accepted.len(),
            announced = announce.len(),
            "Turn complete"
        );
        self.announce(announce);
        Ok(accepted)
    }

    /// Clear server-side history for the session and local chat state.
    pub async fn reset(&self) -> Result<(), CoreError> {
        self.voice.stop();
        let _op = self.op_lock.lock().await;
        let session_id = self.lock().session_id.clone();

        if let Err(e) = self.api.reset(&session_id).await {
            self.fail_turn(&e, Vec::new());
            return Err(e.into());
        }

        let mut s = self.lock();
        s.messages.clear();
        s.topic = None;
        s.recommended.clear();
        s.message_count = 0;
        s.thinking = false;
        s.spoken.clear();
        s.received_in.clear();
        info!(session = %session_id, "Conversation reset");
        Ok(())
    }

    /// Switch the debate language.
    ///
    /// Posts a local notice in the new language and stops current speech.
    /// Returns `false` when `language` was already active.
    pub fn set_language(&self, language: Language) -> bool {
        {
            let mut s = self.lock();
            if s.language == language {
                return false;
            }
            s.language = language;
            s.messages.push(ChatMessage::system(language.switch_notice()));
        }
        self.voice.stop();
        info!(%language, "Language changed");
        true
    }

    /// Mute or unmute speech.
    ///
    /// Unmuting announces the newest bot message if it was never spoken.
    pub fn set_muted(&self, muted: bool) {
        if muted {
            self.lock().muted = true;
            self.voice.stop();
            debug!("Speech muted");
            return;
        }

        let announce = {
            let mut s = self.lock();
            s.muted = false;
            match s.messages.iter().rev().find(|m| m.is_bot()).map(|m| m.id) {
                Some(id) => s.claim_announcements(&[id]),
                None => Vec::new(),
            }
        };
        debug!(announced = announce.len(), "Speech unmuted");
        self.announce(announce);
    }

    /// Ask the API for reply suggestions based on the conversation so far.
    pub async fn recommend(&self) -> Result<Vec<RecommendedAnswer>, CoreError> {
        let request = {
            let s = self.lock();
            let conversation_history = s
                .messages
                .iter()
                .filter(|m| m.kind != MessageKind::System)
                .map(|m| HistoryEntry {
                    sender: m.sender.clone(),
                    message: m.text.clone(),
                })
                .collect();
            let user_input = s
                .messages
                .iter()
                .rev()
                .find(|m| m.kind == MessageKind::User)
                .map(|m| m.text.clone())
                .unwrap_or_default();
            RecommendationRequest {
                user_input,
                conversation_history,
                language: s.language,
                session_id: s.session_id.clone(),
            }
        };

        let reply = self.api.recommend(&request).await?;
        let answers = RecommendedAnswer::sanitize(reply.recommended_answers);
        self.lock().recommended.clone_from(&answers);
        Ok(answers)
    }

    /// Record a failed call: clear thinking and post notices.
    ///
    /// Replies embedded in the error body are shown as notices; without any,
    /// a generic notice derived from the error is posted.
    fn fail_turn(&self, error: &ApiPortError, fallback: Vec<RawMessage>) {
        warn!(error = %error, "Conversation request failed");
        let mut notices: Vec<ChatMessage> = fallback
            .iter()
            .filter_map(|raw| raw.validate().ok())
            .map(|m| ChatMessage::system(m.text))
            .collect();
        if notices.is_empty() {
            notices.push(ChatMessage::system(error.user_notice()));
        }

        let mut s = self.lock();
        s.thinking = false;
        s.messages.extend(notices);
    }

    fn announce(&self, messages: Vec<(ChatMessage, Language)>) {
        for (msg, language) in messages {
            debug!(id = %msg.id, sender = %msg.sender, "Announcing message");
            self.voice.speak(&msg.text, &msg.sender, language);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::conversation_api::MockConversationApiPort;
    use crate::ports::speech::MockSpeechRequestPort;
    use crate::ports::{MessageReply, RecommendationReply, StartReply};

    fn start_reply(text: &str) -> StartReply {
        StartReply {
            opening_message: text.to_string(),
            message_count: 1,
            topic: Some("EU sovereignty".into()),
            language: None,
            recommended_answers: vec![],
        }
    }

    fn spoken_log(voice: &mut MockSpeechRequestPort) -> Arc<Mutex<Vec<String>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        voice
            .expect_speak()
            .returning(move |text, _, _| sink.lock().unwrap().push(text.to_string()));
        log
    }

    fn service(api: MockConversationApiPort, voice: MockSpeechRequestPort) -> ConversationService {
        ConversationService::new(Arc::new(api), Arc::new(voice), Language::English, false)
    }

    #[tokio::test]
    async fn test_start_announces_opening() {
        let mut api = MockConversationApiPort::new();
        api.expect_start()
            .withf(|req| req.language == Language::English)
            .times(1)
            .returning(|_| Ok(start_reply("Nations must stay sovereign.")));
        let mut voice = MockSpeechRequestPort::new();
        let log = spoken_log(&mut voice);

        let svc = service(api, voice);
        let opening = svc.start().await.unwrap();

        assert_eq!(opening.sender, "Debate Partner");
        let snap = svc.snapshot();
        assert_eq!(snap.messages.len(), 1);
        assert_eq!(snap.topic.as_deref(), Some("EU sovereignty"));
        assert!(!snap.thinking);
        assert_eq!(*log.lock().unwrap(), vec!["Nations must stay sovereign."]);
    }

    #[tokio::test]
    async fn test_send_appends_all_speakers_and_skips_system() {
        let mut api = MockConversationApiPort::new();
        api.expect_send_message().times(1).returning(|_| {
            Ok(MessageReply {
                responses: vec![
                    RawMessage {
                        sender: Some("Debate Partner".into()),
                        message: Some("No.".into()),
                        kind: Some("partner".into()),
                        timestamp: None,
                    },
                    RawMessage {
                        sender: Some("Philosopher Moderator".into()),
                        message: Some("Define sovereignty.".into()),
                        kind: Some("moderator".into()),
                        timestamp: None,
                    },
                    RawMessage {
                        sender: Some("System".into()),
                        message: Some("Topic changed.".into()),
                        kind: Some("system".into()),
                        timestamp: None,
                    },
                ],
                message_count: 4,
                ..Default::default()
            })
        });
        let mut voice = MockSpeechRequestPort::new();
        let log = spoken_log(&mut voice);

        let svc = service(api, voice);
        let replies = svc.send("  The EU is good.  ").await.unwrap();

        assert_eq!(replies.len(), 3);
        let snap = svc.snapshot();
        assert_eq!(snap.messages[0].text, "The EU is good.");
        assert_eq!(snap.messages[0].kind, MessageKind::User);
        assert_eq!(snap.message_count, 4);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["No.", "Define sovereignty."]
        );
    }

    #[tokio::test]
    async fn test_invalid_replies_never_enter_state() {
        let mut api = MockConversationApiPort::new();
        api.expect_send_message().returning(|_| {
            Ok(MessageReply {
                responses: vec![
                    RawMessage {
                        sender: Some("Debate Partner".into()),
                        message: None,
                        kind: None,
                        timestamp: None,
                    },
                    RawMessage {
                        sender: Some("Debate Partner".into()),
                        message: Some("Valid.".into()),
                        kind: None,
                        timestamp: Some("not a time".into()),
                    },
                ],
                ..Default::default()
            })
        });
        let mut voice = MockSpeechRequestPort::new();
        voice.expect_speak().never();

        let svc = service(api, voice);
        let replies = svc.send("hi").await.unwrap();

        assert!(replies.is_empty());
        assert_eq!(svc.snapshot().messages.len(), 1);
    }

    #[tokio::test]
    async fn test_send_rejects_blank_input() {
        let api = MockConversationApiPort::new();
        let voice = MockSpeechRequestPort::new();
        let svc = service(api, voice);

        let err = svc.send("   ").await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(svc.snapshot().messages.is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_posts_notice() {
        let mut api = MockConversationApiPort::new();
        api.expect_send_message()
            .returning(|_| Err(ApiPortError::Transport("connection refused".into())));
        let mut voice = MockSpeechRequestPort::new();
        voice.expect_speak().never();

        let svc = service(api, voice);
        let err = svc.send("hello").await.unwrap_err();

        assert!(matches!(err, CoreError::Api(ApiPortError::Transport(_))));
        let snap = svc.snapshot();
        assert!(!snap.thinking);
        let notice = snap.messages.last().unwrap();
        assert_eq!(notice.kind, MessageKind::System);
        assert!(notice.text.starts_with("Connection problem"));
    }

    #[tokio::test]
    async fn test_error_body_replies_become_notices() {
        let mut api = MockConversationApiPort::new();
        api.expect_send_message().returning(|_| {
            Err(ApiPortError::Http {
                status: 500,
                body: r#"{"error":"boom","responses":[{"sender":"System","message":"Sorry, there was an error.","type":"system"}]}"#.into(),
            })
        });
        let mut voice = MockSpeechRequestPort::new();
        voice.expect_speak().never();

        let svc = service(api, voice);
        assert!(svc.send("hello").await.is_err());

        let snap = svc.snapshot();
        assert_eq!(snap.messages.len(), 2);
        assert_eq!(snap.messages[1].text, "Sorry, there was an error.");
        assert_eq!(snap.messages[1].kind, MessageKind::System);
    }

    #[tokio::test]
    async fn test_muted_messages_spoken_once_on_unmute() {
        let mut api = MockConversationApiPort::new();
        api.expect_send_message().returning(|req| {
            Ok(MessageReply {
                response: Some(format!("Re: {}", req.message)),
                ..Default::default()
            })
        });
        let mut voice = MockSpeechRequestPort::new();
        voice.expect_stop().return_const(());
        let log = spoken_log(&mut voice);

        let svc = service(api, voice);
        svc.set_muted(true);
        svc.send("one").await.unwrap();
        svc.send("two").await.unwrap();
        assert!(log.lock().unwrap().is_empty());

        svc.set_muted(false);
        svc.set_muted(false);
        assert_eq!(*log.lock().unwrap(), vec!["Re: two"]);

        svc.set_muted(true);
        svc.set_muted(false);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_language_switch_posts_notice_and_stops() {
        let mut api = MockConversationApiPort::new();
        api.expect_send_message()
            .withf(|req| req.language == Language::German)
            .times(1)
            .returning(|_| Ok(MessageReply::default()));
        let mut voice = MockSpeechRequestPort::new();
        voice.expect_stop().times(1).return_const(());
        voice.expect_speak().never();

        let svc = service(api, voice);
        assert!(svc.set_language(Language::German));
        assert!(!svc.set_language(Language::German));

        let snap = svc.snapshot();
        assert_eq!(snap.language, Language::German);
        assert_eq!(snap.messages[0].text, "Sprache auf Deutsch umgestellt.");
        assert_eq!(snap.messages[0].kind, MessageKind::System);

        svc.send("Hallo").await.unwrap();
    }

    #[tokio::test]
    async fn test_unmute_speaks_in_the_language_the_reply_arrived_in() {
        let mut api = MockConversationApiPort::new();
        api.expect_send_message().returning(|_| {
            Ok(MessageReply {
                response: Some("Borders matter.".into()),
                ..Default::default()
            })
        });
        let mut voice = MockSpeechRequestPort::new();
        voice.expect_stop().return_const(());
        let heard = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&heard);
        voice
            .expect_speak()
            .returning(move |text, _, language| sink.lock().unwrap().push((text.to_string(), language)));

        let svc = service(api, voice);
        svc.set_muted(true);
        tokio_test::assert_ok!(svc.send("hi").await);
        svc.set_language(Language::German);
        svc.set_muted(false);

        assert_eq!(
            *heard.lock().unwrap(),
            vec![("Borders matter.".to_string(), Language::English)]
        );
    }

    #[tokio::test]
    async fn test_reset_clears_state() {
        let mut api = MockConversationApiPort::new();
        api.expect_start()
            .returning(|_| Ok(start_reply("Opening.")));
        api.expect_reset().times(1).returning(|_| Ok(()));
        let mut voice = MockSpeechRequestPort::new();
        voice.expect_stop().times(1).return_const(());
        let log = spoken_log(&mut voice);

        let svc = service(api, voice);
        svc.start().await.unwrap();
        let session = svc.snapshot().session_id;
        svc.reset().await.unwrap();

        let snap = svc.snapshot();
        assert!(snap.messages.is_empty());
        assert!(snap.topic.is_none());
        assert_eq!(snap.message_count, 0);
        assert_eq!(snap.session_id, session);

        // Same text after a reset is a new message and gets announced again.
        svc.start().await.unwrap();
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_recommend_sends_history() {
        let mut api = MockConversationApiPort::new();
        api.expect_send_message().returning(|_| {
            Ok(MessageReply {
                response: Some("Disagree.".into()),
                ..Default::default()
            })
        });
        api.expect_recommend()
            .withf(|req| {
                req.user_input == "Borders matter."
                    && req.conversation_history.len() == 2
                    && req.conversation_history[1].sender == "Debate Partner"
            })
            .times(1)
            .returning(|_| {
                Ok(RecommendationReply {
                    recommended_answers: vec![
                        RecommendedAnswer {
                            id: "a".into(),
                            text: "Why?".into(),
                        },
                        RecommendedAnswer {
                            id: "b".into(),
                            text: " ".into(),
                        },
                    ],
                })
            });
        let mut voice = MockSpeechRequestPort::new();
        let _log = spoken_log(&mut voice);

        let svc = service(api, voice);
        svc.send("Borders matter.").await.unwrap();
        let answers = svc.recommend().await.unwrap();

        assert_eq!(answers.len(), 1);
        assert_eq!(svc.snapshot().recommended_answers, answers);
    }

    #[test]
    fn test_user_gesture_reaches_voice() {
        let api = MockConversationApiPort::new();
        let mut voice = MockSpeechRequestPort::new();
        voice.expect_set_user_interacted().times(1).return_const(());

        let svc = service(api, voice);
        svc.user_gesture();
    }
}
