//! Turn segmentation engine
//!
//! A single-writer actor per capture session: it owns the `Segmenter`
//! buffers, the conversation turn list, and the one inactivity deadline.
//! Because every mutation happens inside the actor loop, a firing timer and
//! an arriving event can never race, and rearming the deadline is atomic.

use super::segmenter::Segmenter;
use super::turn::{Conversation, Speaker, Turn};
use crate::config::TurnSettings;
use crate::relay::wire::RecognitionEvent;
use crate::suggest::{heuristics, Suggester, Suggestions};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Default quiet interval before buffered speech commits as a turn.
pub const DEFAULT_INACTIVITY: Duration = Duration::from_millis(1500);

// Placeholder deadline while no timer is armed; never polled in that state.
const IDLE_PARK: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct TurnEngineConfig {
    pub inactivity: Duration,
}

impl Default for TurnEngineConfig {
    fn default() -> Self {
        Self {
            inactivity: DEFAULT_INACTIVITY,
        }
    }
}

impl From<&TurnSettings> for TurnEngineConfig {
    fn from(settings: &TurnSettings) -> Self {
        Self {
            inactivity: Duration::from_millis(settings.inactivity_ms),
        }
    }
}

enum Command {
    Observe(RecognitionEvent),
    ForceCommit(oneshot::Sender<Option<Turn>>),
    AddLocalTurn(String),
    CancelTimer,
    Turns(oneshot::Sender<Vec<Turn>>),
    Preview(oneshot::Sender<String>),
    Clear,
}

/// Cheap clonable handle to a running engine actor. Dropping every handle
/// stops the actor.
#[derive(Clone)]
pub struct TurnEngineHandle {
    commands: mpsc::Sender<Command>,
    suggestions: watch::Receiver<Suggestions>,
}

impl TurnEngineHandle {
    /// Feed one recognition event into segmentation.
    pub async fn observe(&self, event: RecognitionEvent) {
        let _ = self.commands.send(Command::Observe(event)).await;
    }

    /// Commit any pending transcript text immediately, bypassing the timer.
    /// Returns the appended turn, if the commit produced one.
    pub async fn force_commit(&self) -> Option<Turn> {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::ForceCommit(tx)).await.is_err() {
            return None;
        }
        rx.await.ok().flatten()
    }

    /// Append a turn spoken/typed by the local user (speaker A), with the
    /// same consecutive-duplicate suppression as transcribed turns.
    pub async fn add_local_turn(&self, text: String) {
        let _ = self.commands.send(Command::AddLocalTurn(text)).await;
    }

    /// Drop any pending inactivity deadline without committing.
    pub async fn cancel_timer(&self) {
        let _ = self.commands.send(Command::CancelTimer).await;
    }

    /// Snapshot of the conversation so far.
    pub async fn turns(&self) -> Vec<Turn> {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Turns(tx)).await.is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    /// The live (uncommitted) transcript text, for display.
    pub async fn preview(&self) -> String {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Preview(tx)).await.is_err() {
            return String::new();
        }
        rx.await.unwrap_or_default()
    }

    /// Reset the conversation and every segmentation buffer.
    pub async fn clear(&self) {
        let _ = self.commands.send(Command::Clear).await;
    }

    /// Watch the suggestion sets refreshed after each committed turn.
    pub fn suggestions(&self) -> watch::Receiver<Suggestions> {
        self.suggestions.clone()
    }
}

pub struct TurnEngine;

impl TurnEngine {
    pub fn spawn(config: TurnEngineConfig, suggester: Arc<dyn Suggester>) -> TurnEngineHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let (sugg_tx, sugg_rx) = watch::channel(Suggestions::default());
        tokio::spawn(run(config, suggester, cmd_rx, Arc::new(sugg_tx)));
        TurnEngineHandle {
            commands: cmd_tx,
            suggestions: sugg_rx,
        }
    }
}

async fn run(
    config: TurnEngineConfig,
    suggester: Arc<dyn Suggester>,
    mut commands: mpsc::Receiver<Command>,
    suggestions: Arc<watch::Sender<Suggestions>>,
) {
    let mut segmenter = Segmenter::new();
    let mut conversation = Conversation::default();
    let refresh_inflight = Arc::new(AtomicBool::new(false));

    let deadline = tokio::time::sleep(IDLE_PARK);
    tokio::pin!(deadline);
    let mut armed = false;

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                match command {
                    Command::Observe(event) => {
                        if segmenter.observe(event.is_final, &event.transcript) {
                            // Cancel-and-reschedule in one step; at most one
                            // pending deadline exists per session.
                            deadline.as_mut().reset(Instant::now() + config.inactivity);
                            armed = true;
                        }
                    }
                    Command::ForceCommit(reply) => {
                        armed = false;
                        deadline.as_mut().reset(Instant::now() + IDLE_PARK);
                        let turn = segmenter.force_take().and_then(|text| {
                            commit(&mut conversation, text, &suggester, &suggestions, &refresh_inflight)
                        });
                        let _ = reply.send(turn);
                    }
                    Command::AddLocalTurn(text) => {
                        let trimmed = text.trim();
                        if !trimmed.is_empty() {
                            conversation.push_deduped(Turn::ended(Speaker::A, trimmed.to_string()));
                        }
                    }
                    Command::CancelTimer => {
                        armed = false;
                        deadline.as_mut().reset(Instant::now() + IDLE_PARK);
                    }
                    Command::Turns(reply) => {
                        let _ = reply.send(conversation.turns().to_vec());
                    }
                    Command::Preview(reply) => {
                        let _ = reply.send(segmenter.preview());
                    }
                    Command::Clear => {
                        armed = false;
                        deadline.as_mut().reset(Instant::now() + IDLE_PARK);
                        segmenter.reset();
                        conversation.clear();
                    }
                }
            }
            _ = &mut deadline, if armed => {
                armed = false;
                deadline.as_mut().reset(Instant::now() + IDLE_PARK);
                if let Some(text) = segmenter.take_pending() {
                    commit(&mut conversation, text, &suggester, &suggestions, &refresh_inflight);
                }
            }
        }
    }

    debug!("turn engine stopped");
}

/// Append a committed turn (speaker B) and kick off a suggestion refresh.
fn commit(
    conversation: &mut Conversation,
    text: String,
    suggester: &Arc<dyn Suggester>,
    suggestions: &Arc<watch::Sender<Suggestions>>,
    inflight: &Arc<AtomicBool>,
) -> Option<Turn> {
    let turn = Turn::ended(Speaker::B, text);
    if !conversation.push_deduped(turn.clone()) {
        return None;
    }
    info!(text = %turn.text, "committed turn");

    refresh_suggestions(
        conversation.turns().to_vec(),
        Arc::clone(suggester),
        Arc::clone(suggestions),
        Arc::clone(inflight),
    );
    Some(turn)
}

/// Refresh both suggestion sets in the background. A refresh already in
/// flight wins; the next commit will pick up the newer context.
fn refresh_suggestions(
    turns: Vec<Turn>,
    suggester: Arc<dyn Suggester>,
    suggestions: Arc<watch::Sender<Suggestions>>,
    inflight: Arc<AtomicBool>,
) {
    if inflight.swap(true, Ordering::SeqCst) {
        return;
    }

    tokio::spawn(async move {
        let sentences = match suggester.full_responses(&turns, None).await {
            Ok(sentences) if !sentences.is_empty() => sentences,
            Ok(_) => heuristics::fallback_sentences(),
            Err(err) => {
                warn!(error = %err, "full response generation failed, using fallback");
                heuristics::fallback_sentences()
            }
        };
        let words = match suggester.word_grid(&turns, "").await {
            Ok(words) if !words.is_empty() => words,
            _ => heuristics::next_words(""),
        };

        let _ = suggestions.send(Suggestions { sentences, words });
        inflight.store(false, Ordering::SeqCst);
    });
}
