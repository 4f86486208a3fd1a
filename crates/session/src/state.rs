//! The autocomplete reducer.
//!
//! One machine per hosted input. All UI-observable state lives in
//! [`AutocompleteState`] and changes only inside [`Autocomplete::handle`],
//! which keeps the invariants checkable in one place:
//!
//! - `selected_index < items.len()` whenever `items` is non-empty;
//! - `is_open` with empty `items` only in the `ErrorShown` phase (the
//!   popover stays visible to show the error banner).

use assist_grammar::Grammar;
use assist_protocol::{CompletionItem, QueryContext, SuggestionGroup};
use assist_suggest::flatten;
use log::debug;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    PendingDebounce,
    Loading,
    Open,
    ErrorShown,
}

/// UI-observable snapshot, published after every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutocompleteState {
    pub phase: Phase,
    pub is_open: bool,
    pub items: Vec<CompletionItem>,
    pub groups: Vec<SuggestionGroup>,
    pub selected_index: usize,
    pub hovered_index: Option<usize>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub validation_warning: Option<String>,
}

impl Default for AutocompleteState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            is_open: false,
            items: Vec::new(),
            groups: Vec::new(),
            selected_index: 0,
            hovered_index: None,
            is_loading: false,
            error: None,
            validation_warning: None,
        }
    }
}

/// What happened. Host events and driver-internal events share the one
/// enum so the reducer is the single authority on ordering.
#[derive(Debug, Clone)]
pub enum Event {
    TextChanged { text: String, cursor: usize },
    DebounceElapsed,
    RoundFinished { round: u64, result: RoundResult },
    MoveDown,
    MoveUp,
    Hover(usize),
    Commit,
    DismissError,
    Escape,
    FocusLost,
}

#[derive(Debug, Clone)]
pub enum RoundResult {
    /// The round resolved; `degraded` lists per-field failure messages
    /// (partial failures still open the menu when items exist).
    Suggestions {
        groups: Vec<SuggestionGroup>,
        degraded: Vec<String>,
    },
    /// The whole round failed (auth, or the only lookup degraded).
    Failed(String),
}

/// Instructions to the driver. The reducer never touches a timer or the
/// network itself.
#[derive(Debug, Clone)]
pub enum Effect {
    CancelDebounce,
    StartDebounce(Duration),
    LaunchRound { round: u64, context: QueryContext },
    ComputeReplacement {
        text: String,
        cursor: usize,
        item: CompletionItem,
        context: QueryContext,
    },
}

pub struct Autocomplete {
    grammar: Grammar,
    debounce: Duration,
    state: AutocompleteState,
    text: String,
    cursor: usize,
    /// Latest issued round id; results for any other id are stale.
    round: u64,
    /// Context the latest round was launched for.
    context: Option<QueryContext>,
}

impl Autocomplete {
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(400);

    #[must_use]
    pub fn new(grammar: Grammar, debounce: Duration) -> Self {
        Self {
            grammar,
            debounce,
            state: AutocompleteState::default(),
            text: String::new(),
            cursor: 0,
            round: 0,
            context: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> &AutocompleteState {
        &self.state
    }

    /// Apply one event; returns the effects the driver must execute, in
    /// order.
    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        let effects = self.transition(event);
        debug_assert!(
            self.state.items.is_empty() || self.state.selected_index < self.state.items.len()
        );
        debug_assert!(
            !self.state.is_open
                || !self.state.items.is_empty()
                || self.state.phase == Phase::ErrorShown
        );
        effects
    }

    fn transition(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::TextChanged { text, cursor } => self.on_text_changed(text, cursor),
            Event::DebounceElapsed => self.on_debounce_elapsed(),
            Event::RoundFinished { round, result } => self.on_round_finished(round, result),
            Event::MoveDown => {
                self.move_selection(1);
                vec![]
            }
            Event::MoveUp => {
                self.move_selection(-1);
                vec![]
            }
            Event::Hover(index) => {
                if self.navigable() && index < self.state.items.len() {
                    self.state.hovered_index = Some(index);
                    self.state.selected_index = index;
                }
                vec![]
            }
            Event::Commit => self.on_commit(),
            Event::DismissError => {
                self.state.error = None;
                if self.state.phase == Phase::ErrorShown {
                    if self.state.items.is_empty() {
                        self.close();
                    } else {
                        self.state.phase = Phase::Open;
                    }
                }
                vec![]
            }
            Event::Escape => {
                self.close();
                vec![Effect::CancelDebounce]
            }
            Event::FocusLost => {
                self.close();
                self.state.validation_warning = None;
                vec![Effect::CancelDebounce]
            }
        }
    }

    fn on_text_changed(&mut self, text: String, cursor: usize) -> Vec<Effect> {
        self.state.validation_warning = first_warning(self.grammar, &text);
        self.text = text;
        self.cursor = cursor;

        if self.text.trim().is_empty() {
            // Cleared query: drop everything, including a pending timer.
            self.close();
            return vec![Effect::CancelDebounce];
        }

        self.close();
        self.state.phase = Phase::PendingDebounce;
        vec![Effect::CancelDebounce, Effect::StartDebounce(self.debounce)]
    }

    fn on_debounce_elapsed(&mut self) -> Vec<Effect> {
        if self.state.phase != Phase::PendingDebounce {
            return vec![];
        }
        self.round += 1;
        let context = self.grammar.parse(&self.text, self.cursor);
        self.context = Some(context.clone());
        self.state.phase = Phase::Loading;
        self.state.is_loading = true;
        debug!("round {} launched ({:?})", self.round, context.kind);
        vec![Effect::LaunchRound {
            round: self.round,
            context,
        }]
    }

    fn on_round_finished(&mut self, round: u64, result: RoundResult) -> Vec<Effect> {
        // Results apply only to the round the machine is still waiting
        // for. A keystroke after launch (PendingDebounce) supersedes the
        // round even though its id is current.
        if round != self.round || self.state.phase != Phase::Loading {
            debug!("round {round} is stale (latest {}), dropped", self.round);
            return vec![];
        }
        self.state.is_loading = false;

        match result {
            RoundResult::Suggestions { groups, degraded } => {
                let items = flatten(&groups);
                if items.is_empty() && degraded.is_empty() {
                    self.close();
                    return vec![];
                }
                self.state.error = (!degraded.is_empty()).then(|| degraded.join("; "));
                if items.is_empty() {
                    // Nothing to show except the failure banner.
                    self.state.items = Vec::new();
                    self.state.groups = Vec::new();
                    self.state.phase = Phase::ErrorShown;
                    self.state.is_open = true;
                    return vec![];
                }
                self.state.items = items;
                self.state.groups = groups;
                self.state.selected_index = 0;
                self.state.hovered_index = None;
                self.state.phase = if self.state.error.is_some() {
                    Phase::ErrorShown
                } else {
                    Phase::Open
                };
                self.state.is_open = true;
            }
            RoundResult::Failed(message) => {
                self.state.error = Some(message);
                self.state.items = Vec::new();
                self.state.groups = Vec::new();
                self.state.phase = Phase::ErrorShown;
                self.state.is_open = true;
            }
        }
        vec![]
    }

    fn on_commit(&mut self) -> Vec<Effect> {
        if !self.navigable() || self.state.items.is_empty() {
            return vec![];
        }
        let item = self.state.items[self.state.selected_index].clone();
        let Some(context) = self.context.clone() else {
            return vec![];
        };
        let effect = Effect::ComputeReplacement {
            text: self.text.clone(),
            cursor: self.cursor,
            item,
            context,
        };
        self.close();
        vec![effect]
    }

    /// Keyboard/mouse interaction is live while the popover shows items,
    /// error banner or not.
    fn navigable(&self) -> bool {
        matches!(self.state.phase, Phase::Open | Phase::ErrorShown)
    }

    fn move_selection(&mut self, delta: isize) {
        if !self.navigable() || self.state.items.is_empty() {
            return;
        }
        let len = self.state.items.len() as isize;
        let current = self.state.selected_index as isize;
        self.state.selected_index = ((current + delta).rem_euclid(len)) as usize;
    }

    /// Back to `Idle`, discarding suggestions and any error banner.
    fn close(&mut self) {
        self.state.phase = Phase::Idle;
        self.state.is_open = false;
        self.state.items = Vec::new();
        self.state.groups = Vec::new();
        self.state.selected_index = 0;
        self.state.hovered_index = None;
        self.state.is_loading = false;
        self.state.error = None;
    }
}

fn first_warning(grammar: Grammar, text: &str) -> Option<String> {
    grammar
        .validate(text)
        .into_iter()
        .next()
        .map(|w| w.to_string())
}
