//! TutorialCoordinator: drives the feedback tour for one review session.
//!
//! Owns the state machine, the two scheduled actions (auto-start and the
//! step-0 advance), highlight targeting and the seen flag.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info};

use crate::config::TutorialConfig;
use crate::review::model::{Criterion, ReviewMode};

use super::gate::PersistenceGate;
use super::state::{Transition, TutorialPhase, TutorialState};
use super::steps::{Anchor, TutorialStep};
use super::targeting::{HighlightPosition, StepTargeter};
use super::timer::PendingTimer;

const EVENT_CAPACITY: usize = 64;

/// Why the tutorial ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Skipped,
    Completed,
}

/// What the tutorial card shows for the active step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TutorialCard {
    pub step: TutorialStep,
    /// 1-based position, for the "n / total" footer.
    pub number: usize,
    pub total: usize,
    pub show_next: bool,
    /// "Skip", or "Finish" on the last step.
    pub dismiss_label: &'static str,
}

/// Tutorial events pushed to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TutorialEvent {
    TutorialStarted { card: TutorialCard },
    TutorialStep { card: TutorialCard },
    TutorialHighlight {
        step: usize,
        position: Option<HighlightPosition>,
    },
    TutorialFinished {
        reason: FinishReason,
        at_step: Option<usize>,
    },
}

/// Point-in-time view of the tutorial.
#[derive(Debug, Clone, Serialize)]
pub struct TutorialSnapshot {
    #[serde(flatten)]
    pub phase: TutorialPhase,
    pub visible: bool,
    pub seen: bool,
    pub card: Option<TutorialCard>,
    pub highlight: Option<HighlightPosition>,
}

struct Inner {
    state: TutorialState,
    auto_start_attempted: bool,
    pending_start: Option<PendingTimer>,
    pending_advance: Option<PendingTimer>,
    highlight: Option<HighlightPosition>,
    ended: bool,
}

struct Shared {
    steps: Vec<TutorialStep>,
    gate: PersistenceGate,
    targeter: StepTargeter,
    config: TutorialConfig,
    inner: Mutex<Inner>,
    events: broadcast::Sender<TutorialEvent>,
}

/// Cheap to clone; clones share one session's tutorial.
#[derive(Clone)]
pub struct TutorialCoordinator {
    shared: Arc<Shared>,
}

impl TutorialCoordinator {
    /// Begin a review session. Reads the seen flag once.
    pub async fn start_session(
        steps: Vec<TutorialStep>,
        gate: PersistenceGate,
        targeter: StepTargeter,
        config: TutorialConfig,
    ) -> Self {
        let seen = gate.has_seen().await;
        debug!(browser = %gate.browser_id(), seen, "Tutorial session started");
        let (events, _rx) = broadcast::channel(EVENT_CAPACITY);
        let state = TutorialState::new(steps.len(), seen);
        Self {
            shared: Arc::new(Shared {
                steps,
                gate,
                targeter,
                config,
                inner: Mutex::new(Inner {
                    state,
                    auto_start_attempted: false,
                    pending_start: None,
                    pending_advance: None,
                    highlight: None,
                    ended: false,
                }),
                events,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TutorialEvent> {
        self.shared.events.subscribe()
    }

    pub async fn phase(&self) -> TutorialPhase {
        self.shared.inner.lock().await.state.phase()
    }

    pub async fn snapshot(&self) -> TutorialSnapshot {
        let inner = self.shared.inner.lock().await;
        TutorialSnapshot {
            phase: inner.state.phase(),
            visible: inner.state.visible(),
            seen: inner.state.seen(),
            card: self.card(&inner.state),
            highlight: inner.highlight,
        }
    }

    /// The anchor of the active step, if any.
    pub async fn current_anchor(&self) -> Option<Anchor> {
        let inner = self.shared.inner.lock().await;
        let step = inner.state.phase().step()?;
        self.shared.steps.get(step).map(|s| s.anchor)
    }

    /// A result became available. Schedules the one auto-start attempt of
    /// this session when the result has feedback and the tutorial is unseen.
    /// Returns whether a start was scheduled.
    pub async fn on_result_available(&self, has_feedback: bool, mode: ReviewMode) -> bool {
        if !has_feedback || mode == ReviewMode::Export {
            return false;
        }
        let mut inner = self.shared.inner.lock().await;
        if inner.ended || inner.auto_start_attempted {
            return false;
        }
        inner.auto_start_attempted = true;
        if inner.state.seen() || inner.state.phase() != TutorialPhase::Idle {
            debug!("Tutorial already seen, not auto-starting");
            return false;
        }

        let this = self.clone();
        inner.pending_start = Some(PendingTimer::spawn(
            "tutorial-start",
            self.shared.config.start_fallback,
            move || async move { this.fire_start().await },
        ));
        true
    }

    /// The results view finished its layout pass.
    pub async fn layout_ready(&self) {
        if let Some(timer) = &self.shared.inner.lock().await.pending_start {
            timer.signal_ready();
        }
    }

    /// Details for `criterion` were opened. For the primary criterion while
    /// the intro step is showing, schedules the advance to step 1.
    pub async fn on_details_opened(&self, criterion: Criterion) -> bool {
        if !criterion.is_primary() {
            return false;
        }
        let mut inner = self.shared.inner.lock().await;
        if inner.ended
            || inner.state.seen()
            || inner.state.phase() != TutorialPhase::Active(0)
            || inner.pending_advance.is_some()
        {
            return false;
        }

        let this = self.clone();
        inner.pending_advance = Some(PendingTimer::spawn(
            "tutorial-intro-advance",
            self.shared.config.details_fallback,
            move || async move { this.fire_intro_advance().await },
        ));
        true
    }

    /// The details view finished opening.
    pub async fn details_ready(&self) {
        if let Some(timer) = &self.shared.inner.lock().await.pending_advance {
            timer.signal_ready();
        }
    }

    /// The details view closed before the advance fired.
    pub async fn on_details_closed(&self) {
        if let Some(timer) = self.shared.inner.lock().await.pending_advance.take() {
            timer.cancel();
        }
    }

    /// In-overlay "Next". Past the last step this finishes the tour.
    pub async fn next(&self) -> Transition {
        let mut inner = self.shared.inner.lock().await;
        let transition = inner.state.advance();
        self.settle(&mut inner, transition, FinishReason::Completed)
            .await
    }

    /// The user clicked `anchor`. Advances when it is the active step's
    /// section; the intro card is handled by opening details instead.
    pub async fn anchor_activated(&self, anchor: Anchor) -> Transition {
        let mut inner = self.shared.inner.lock().await;
        let Some(step) = inner.state.phase().step() else {
            return Transition::Unchanged;
        };
        let matches_step = self.shared.steps.get(step).map(|s| s.anchor) == Some(anchor);
        if !matches_step || !matches!(anchor, Anchor::Section { .. }) {
            return Transition::Unchanged;
        }
        let transition = inner.state.advance();
        self.settle(&mut inner, transition, FinishReason::Completed)
            .await
    }

    /// Skip (or Finish on the last step).
    pub async fn skip(&self) -> Transition {
        let mut inner = self.shared.inner.lock().await;
        let reason = if inner.state.is_last_step() {
            FinishReason::Completed
        } else {
            FinishReason::Skipped
        };
        let transition = inner.state.finish();
        self.settle(&mut inner, transition, reason).await
    }

    /// Re-measure the active step's anchor (e.g. it just mounted).
    pub async fn refresh_highlight(&self) {
        let step = self.shared.inner.lock().await.state.phase().step();
        if let Some(step) = step {
            self.retarget(step).await;
        }
    }

    /// The review session ended: pending actions never fire.
    pub async fn shutdown(&self) {
        let mut inner = self.shared.inner.lock().await;
        inner.ended = true;
        cancel_pending(&mut inner);
    }

    async fn fire_start(&self) {
        let step = {
            let mut inner = self.shared.inner.lock().await;
            inner.pending_start = None;
            if inner.ended || inner.state.start() != Transition::Started {
                return;
            }
            info!(browser = %self.shared.gate.browser_id(), "Tutorial started");
            if let Some(card) = self.card(&inner.state) {
                self.emit(TutorialEvent::TutorialStarted { card });
            }
            0
        };
        self.retarget(step).await;
    }

    async fn fire_intro_advance(&self) {
        let mut inner = self.shared.inner.lock().await;
        inner.pending_advance = None;
        if inner.ended {
            return;
        }
        let transition = inner.state.advance_from_intro();
        self.settle(&mut inner, transition, FinishReason::Completed)
            .await;
    }

    /// Publish the effects of a transition. Finishing cancels pending
    /// actions and writes the seen flag before returning.
    async fn settle(
        &self,
        inner: &mut Inner,
        transition: Transition,
        reason: FinishReason,
    ) -> Transition {
        match transition {
            Transition::Advanced { from, to } => {
                debug!(from, to, "Tutorial advanced");
                inner.highlight = None;
                if let Some(card) = self.card(&inner.state) {
                    self.emit(TutorialEvent::TutorialStep { card });
                }
                let this = self.clone();
                tokio::spawn(async move { this.retarget(to).await });
            }
            Transition::Finished { from } => {
                cancel_pending(inner);
                inner.highlight = None;
                self.shared.gate.mark_seen().await;
                info!(
                    browser = %self.shared.gate.browser_id(),
                    ?reason,
                    at_step = ?from,
                    "Tutorial finished"
                );
                self.emit(TutorialEvent::TutorialFinished {
                    reason,
                    at_step: from,
                });
            }
            Transition::Started | Transition::Unchanged => {}
        }
        transition
    }

    async fn retarget(&self, step: usize) {
        let Some(target) = self.shared.steps.get(step) else {
            return;
        };
        let position = self.shared.targeter.resolve(target).await;

        let mut inner = self.shared.inner.lock().await;
        if inner.state.phase() != TutorialPhase::Active(step) {
            return;
        }
        inner.highlight = position;
        self.emit(TutorialEvent::TutorialHighlight { step, position });
    }

    fn card(&self, state: &TutorialState) -> Option<TutorialCard> {
        let index = state.phase().step()?;
        let step = self.shared.steps.get(index)?.clone();
        Some(TutorialCard {
            step,
            number: index + 1,
            total: state.step_count(),
            show_next: state.shows_next(),
            dismiss_label: if state.is_last_step() { "Finish" } else { "Skip" },
        })
    }

    fn emit(&self, event: TutorialEvent) {
        // No subscribers is fine
        let _ = self.shared.events.send(event);
    }
}

fn cancel_pending(inner: &mut Inner) {
    if let Some(timer) = inner.pending_start.take() {
        timer.cancel();
    }
    if let Some(timer) = inner.pending_advance.take() {
        timer.cancel();
    }
}
