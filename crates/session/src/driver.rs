//! Async shell around the reducer.
//!
//! The driver is an actor: host events and internal events (timer
//! fired, round finished) funnel through one loop, so the reducer sees
//! a single serialized event order — the same single-threaded model the
//! hosting editor lives in. Work that suspends (fetch rounds, the
//! debounce timer, server-side completion) runs in spawned tasks that
//! report back as events.

use crate::replace::apply_replacement;
use crate::state::{Autocomplete, AutocompleteState, Effect, Event, RoundResult};
use assist_catalog::Orchestrator;
use assist_grammar::Grammar;
use assist_protocol::{CompleteRequest, CompletionItem, QueryContext, Replacement};
use assist_suggest::suggest;
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub debounce: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce: Autocomplete::DEFAULT_DEBOUNCE,
        }
    }
}

/// Factory for a running autocomplete session.
pub struct Session;

impl Session {
    /// Spawn the driver loop; it lives until the handle is dropped.
    #[must_use]
    pub fn spawn(
        grammar: Grammar,
        orchestrator: Arc<Orchestrator>,
        config: SessionConfig,
    ) -> SessionHandle {
        let (host_tx, host_rx) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(AutocompleteState::default());
        let (replacement_tx, replacement_rx) = mpsc::unbounded_channel();

        let driver = Driver {
            machine: Autocomplete::new(grammar, config.debounce),
            orchestrator,
            host_rx,
            internal_tx,
            internal_rx,
            state_tx,
            replacement_tx,
            debounce_task: None,
        };
        tokio::spawn(driver.run());

        SessionHandle {
            events: host_tx,
            state: state_rx,
            replacements: replacement_rx,
        }
    }
}

/// Host-facing side of a session: event submission, state observation,
/// committed replacements.
pub struct SessionHandle {
    events: mpsc::UnboundedSender<Event>,
    state: watch::Receiver<AutocompleteState>,
    replacements: mpsc::UnboundedReceiver<Replacement>,
}

impl SessionHandle {
    pub fn text_changed(&self, text: impl Into<String>, cursor: usize) {
        self.send(Event::TextChanged {
            text: text.into(),
            cursor,
        });
    }

    pub fn move_down(&self) {
        self.send(Event::MoveDown);
    }

    pub fn move_up(&self) {
        self.send(Event::MoveUp);
    }

    pub fn hover(&self, index: usize) {
        self.send(Event::Hover(index));
    }

    pub fn commit(&self) {
        self.send(Event::Commit);
    }

    pub fn dismiss_error(&self) {
        self.send(Event::DismissError);
    }

    pub fn escape(&self) {
        self.send(Event::Escape);
    }

    pub fn blur(&self) {
        self.send(Event::FocusLost);
    }

    /// Latest published state.
    #[must_use]
    pub fn state(&self) -> AutocompleteState {
        self.state.borrow().clone()
    }

    /// Wait for the next state publication and return it.
    pub async fn changed(&mut self) -> AutocompleteState {
        let _ = self.state.changed().await;
        self.state.borrow_and_update().clone()
    }

    /// Next committed replacement, if the session is still alive.
    pub async fn next_replacement(&mut self) -> Option<Replacement> {
        self.replacements.recv().await
    }

    fn send(&self, event: Event) {
        // A dropped driver means the session is shutting down; events
        // are then no-ops by design.
        let _ = self.events.send(event);
    }
}

struct Driver {
    machine: Autocomplete,
    orchestrator: Arc<Orchestrator>,
    host_rx: mpsc::UnboundedReceiver<Event>,
    internal_tx: mpsc::UnboundedSender<Event>,
    internal_rx: mpsc::UnboundedReceiver<Event>,
    state_tx: watch::Sender<AutocompleteState>,
    replacement_tx: mpsc::UnboundedSender<Replacement>,
    debounce_task: Option<JoinHandle<()>>,
}

impl Driver {
    async fn run(mut self) {
        loop {
            let event = tokio::select! {
                host = self.host_rx.recv() => match host {
                    Some(event) => event,
                    // Handle dropped: the session is over.
                    None => break,
                },
                internal = self.internal_rx.recv() => match internal {
                    Some(event) => event,
                    None => break,
                },
            };
            for effect in self.machine.handle(event) {
                self.execute(effect);
            }
            let _ = self.state_tx.send(self.machine.state().clone());
        }
        if let Some(task) = self.debounce_task.take() {
            task.abort();
        }
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::CancelDebounce => {
                if let Some(task) = self.debounce_task.take() {
                    task.abort();
                }
            }
            Effect::StartDebounce(delay) => {
                let tx = self.internal_tx.clone();
                self.debounce_task = Some(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(Event::DebounceElapsed);
                }));
            }
            Effect::LaunchRound { round, context } => {
                let orchestrator = self.orchestrator.clone();
                let tx = self.internal_tx.clone();
                tokio::spawn(async move {
                    let result = match orchestrator.candidates_for(&context).await {
                        Ok(outcome) => RoundResult::Suggestions {
                            groups: suggest(&context, &outcome.candidates),
                            degraded: outcome
                                .failures
                                .iter()
                                .map(|f| format!("lookup {} failed: {}", f.field, f.error))
                                .collect(),
                        },
                        Err(error) => RoundResult::Failed(error.to_string()),
                    };
                    let _ = tx.send(Event::RoundFinished { round, result });
                });
            }
            Effect::ComputeReplacement {
                text,
                cursor,
                item,
                context,
            } => {
                let orchestrator = self.orchestrator.clone();
                let tx = self.replacement_tx.clone();
                tokio::spawn(async move {
                    let replacement =
                        resolve_replacement(&orchestrator, &text, cursor, &item, &context).await;
                    let _ = tx.send(replacement);
                });
            }
        }
    }
}

/// Server-side replacement when the catalog offers it, local rules
/// otherwise.
async fn resolve_replacement(
    orchestrator: &Orchestrator,
    text: &str,
    cursor: usize,
    item: &CompletionItem,
    context: &QueryContext,
) -> Replacement {
    let request = CompleteRequest {
        query: text.to_string(),
        cursor_offset: cursor,
        insert_text: item.insert_text.clone(),
        item_kind: item.kind,
    };
    match orchestrator.complete(&request).await {
        Ok(response) => {
            debug!("replacement delegated to the catalog");
            response.into()
        }
        Err(error) => {
            debug!("server-side complete unavailable ({error}); applying local rule");
            apply_replacement(text, cursor, item, context)
        }
    }
}
