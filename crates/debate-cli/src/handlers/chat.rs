//! Interactive chat loop.
//!
//! Reads lines from stdin, turns them into [`ChatCommand`]s and prints new
//! transcript lines after every command. Any line counts as the user
//! gesture that opens the voice gate.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Result;
use debate_core::{ConversationService, CoreError};
use debate_voice::VoiceCoordinator;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::bootstrap::CliContext;
use crate::commands::{ChatCommand, Help};
use crate::presentation::{Transcript, format_suggestions, render_status};

/// Whether the loop keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// One terminal conversation.
///
/// Generic over the output so tests can capture what would be printed.
pub struct ChatSession<W: Write> {
    conversation: Arc<ConversationService>,
    voice: VoiceCoordinator,
    transcript: Transcript,
    out: W,
}

impl<W: Write> ChatSession<W> {
    pub fn new(conversation: Arc<ConversationService>, voice: VoiceCoordinator, out: W) -> Self {
        Self {
            conversation,
            voice,
            transcript: Transcript::default(),
            out,
        }
    }

    /// Start the debate and print the opening message.
    pub async fn open(&mut self) -> io::Result<()> {
        if let Err(e) = self.conversation.start().await {
            self.report(&e)?;
        }
        self.catch_up()
    }

    /// Handle one input line.
    pub async fn handle_line(&mut self, line: &str) -> io::Result<Flow> {
        let command = match ChatCommand::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(Flow::Continue),
            Err(e) => {
                writeln!(self.out, "  {e}")?;
                return Ok(Flow::Continue);
            }
        };
        debug!(?command, "Chat command");

        match command {
            ChatCommand::Say(text) => self.say(&text).await?,
            ChatCommand::Language(language) => {
                if !self.conversation.set_language(language) {
                    writeln!(self.out, "  Already debating in {language}.")?;
                }
            }
            ChatCommand::Mute => {
                self.conversation.set_muted(true);
                writeln!(self.out, "  Speech muted.")?;
            }
            ChatCommand::Unmute => {
                self.conversation.set_muted(false);
                writeln!(self.out, "  Speech unmuted.")?;
            }
            ChatCommand::Voice(kind) => {
                self.voice.set_preferred_adapter(kind);
                writeln!(self.out, "  Preferring {kind} speech.")?;
            }
            ChatCommand::Status => {
                let report = render_status(&self.conversation.snapshot(), &self.voice.status());
                writeln!(self.out, "{report}")?;
            }
            ChatCommand::HealthReset => {
                self.voice.reset_health();
                writeln!(self.out, "  Speech health reset.")?;
            }
            ChatCommand::Suggest => match self.conversation.recommend().await {
                Ok(answers) => writeln!(self.out, "{}", format_suggestions(&answers))?,
                Err(e) => self.report(&e)?,
            },
            ChatCommand::UseSuggestion(n) => {
                let chosen = self
                    .conversation
                    .snapshot()
                    .recommended_answers
                    .get(n - 1)
                    .map(|a| a.text.clone());
                match chosen {
                    Some(text) => {
                        writeln!(self.out, "> {text}")?;
                        self.say(&text).await?;
                    }
                    None => writeln!(self.out, "  No suggestion {n}; try /suggest.")?,
                }
            }
            ChatCommand::Reset => match self.conversation.reset().await {
                Ok(()) => {
                    self.catch_up()?;
                    writeln!(self.out, "  Conversation reset.")?;
                    self.open().await?;
                }
                Err(e) => self.report(&e)?,
            },
            ChatCommand::Stop => self.voice.stop(),
            ChatCommand::Help => write!(self.out, "{}", Help)?,
            ChatCommand::Quit => return Ok(Flow::Quit),
        }

        self.catch_up()?;
        Ok(Flow::Continue)
    }

    async fn say(&mut self, text: &str) -> io::Result<()> {
        self.conversation.user_gesture();
        if let Err(e) = self.conversation.send(text).await {
            self.report(&e)?;
        }
        Ok(())
    }

    /// API failures already left a notice in the transcript; anything else
    /// is printed here.
    fn report(&mut self, error: &CoreError) -> io::Result<()> {
        match error {
            CoreError::Api(e) => {
                debug!(error = %e, "Conversation request failed");
                Ok(())
            }
            other => writeln!(self.out, "  {other}"),
        }
    }

    fn catch_up(&mut self) -> io::Result<()> {
        for line in self.transcript.catch_up(&self.conversation.snapshot()) {
            writeln!(self.out, "{line}")?;
        }
        self.out.flush()
    }
}

/// Run the chat loop on stdin/stdout until `/quit` or end of input.
pub async fn execute(ctx: &CliContext) -> Result<()> {
    let mut session = ChatSession::new(ctx.conversation.clone(), ctx.voice.clone(), io::stdout());
    println!(
        "Debating in {}. Type a message, or /help for commands.",
        ctx.settings.effective_language()
    );
    session.open().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        if session.handle_line(&line).await? == Flow::Quit {
            break;
        }
    }
    Ok(())
}
