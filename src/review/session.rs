//! ReviewSession: one open result-review screen.
//!
//! Owns the loaded result, the details view, the anchor registry and the
//! tutorial for one client connection, and applies client actions to them.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock, broadcast};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::TutorialConfig;
use crate::error::{Error, SessionError};
use crate::store::KeyValueStore;
use crate::tutorial::{
    Anchor, AnchorRegistry, PersistenceGate, Rect, StepTargeter, TutorialCoordinator,
    TutorialSnapshot, Viewport, feedback_tour,
};

use super::modal::{ClickRoute, ClickTarget, ModalCoordinator, StackedLayer, route_click};
use super::model::{Criterion, FeedbackSelection, ReviewMode, ScoreResult};
use super::scoring::ScoringClient;

const EVENT_CAPACITY: usize = 64;

/// Actions sent by the client over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReviewAction {
    /// Show an already-scored result.
    LoadResult { result: ScoreResult },
    /// Score an essay, then show the result.
    SubmitEssay { prompt: String, essay: String },
    /// The results view finished its layout pass.
    LayoutReady,
    OpenDetails { criterion: Criterion },
    CloseDetails,
    /// The details view finished opening.
    DetailsReady,
    Click { target: ClickTarget },
    Next,
    Skip,
    AnchorMounted { anchor: Anchor, rect: Rect },
    AnchorUnmounted { anchor: Anchor },
    Viewport { viewport: Viewport },
}

/// Review events pushed to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReviewEvent {
    SessionSync { snapshot: Box<SessionSnapshot> },
    ResultLoaded {
        result: ScoreResult,
        processing_time: String,
    },
    DetailsOpened { selection: FeedbackSelection },
    DetailsClosed,
    Layers { layers: Vec<StackedLayer> },
    Error { message: String },
}

/// Full state of a session, sent on connect.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub mode: ReviewMode,
    pub result: Option<ScoreResult>,
    pub processing_time: Option<String>,
    pub details: Option<FeedbackSelection>,
    pub layers: Vec<StackedLayer>,
    pub tutorial: TutorialSnapshot,
}

pub struct ReviewSession {
    id: Uuid,
    mode: ReviewMode,
    result: RwLock<Option<ScoreResult>>,
    modal: Mutex<ModalCoordinator>,
    anchors: Arc<AnchorRegistry>,
    tutorial: TutorialCoordinator,
    scoring: Arc<ScoringClient>,
    events: broadcast::Sender<ReviewEvent>,
    ended: AtomicBool,
}

impl ReviewSession {
    /// Open a session for `browser_id`. Reads the tutorial seen flag once.
    pub async fn start(
        browser_id: &str,
        mode: ReviewMode,
        store: Arc<dyn KeyValueStore>,
        config: TutorialConfig,
        scoring: Arc<ScoringClient>,
    ) -> Self {
        let anchors = AnchorRegistry::new();
        let gate = PersistenceGate::new(store, browser_id);
        let targeter = StepTargeter::new(anchors.clone(), &config);
        let tutorial =
            TutorialCoordinator::start_session(feedback_tour(), gate, targeter, config).await;
        let (events, _rx) = broadcast::channel(EVENT_CAPACITY);
        let id = Uuid::new_v4();
        info!(session = %id, browser = browser_id, ?mode, "Review session opened");

        Self {
            id,
            mode,
            result: RwLock::new(None),
            modal: Mutex::new(ModalCoordinator::new()),
            anchors,
            tutorial,
            scoring,
            events,
            ended: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mode(&self) -> ReviewMode {
        self.mode
    }

    pub fn tutorial(&self) -> &TutorialCoordinator {
        &self.tutorial
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReviewEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let tutorial = self.tutorial.snapshot().await;
        let result = self.result.read().await.clone();
        let modal = self.modal.lock().await;
        SessionSnapshot {
            session_id: self.id,
            mode: self.mode,
            processing_time: result.as_ref().map(ScoreResult::processing_time_label),
            result,
            details: modal.selection().cloned(),
            layers: modal.layers(tutorial.visible),
            tutorial,
        }
    }

    /// Current overlay stack.
    pub async fn layers(&self) -> Vec<StackedLayer> {
        let visible = self.tutorial.snapshot().await.visible;
        self.modal.lock().await.layers(visible)
    }

    /// Apply one client action.
    pub async fn handle(&self, action: ReviewAction) -> Result<(), Error> {
        if self.ended.load(Ordering::SeqCst) {
            return Err(SessionError::Ended(self.id).into());
        }
        match action {
            ReviewAction::LoadResult { result } => self.load_result(result).await,
            ReviewAction::SubmitEssay { prompt, essay } => {
                self.submit_essay(&prompt, &essay).await?
            }
            ReviewAction::LayoutReady => self.tutorial.layout_ready().await,
            ReviewAction::OpenDetails { criterion } => {
                self.open_details(criterion).await?;
            }
            ReviewAction::CloseDetails => self.close_details().await,
            ReviewAction::DetailsReady => self.tutorial.details_ready().await,
            ReviewAction::Click { target } => self.click(target).await?,
            ReviewAction::Next => {
                self.tutorial.next().await;
            }
            ReviewAction::Skip => {
                self.tutorial.skip().await;
            }
            ReviewAction::AnchorMounted { anchor, rect } => {
                self.anchor_mounted(anchor, rect).await
            }
            ReviewAction::AnchorUnmounted { anchor } => self.anchors.unmount(anchor).await,
            ReviewAction::Viewport { viewport } => self.set_viewport(viewport).await,
        }
        Ok(())
    }

    /// Show `result`. Any open details view belonged to the previous result
    /// and is closed.
    pub async fn load_result(&self, result: ScoreResult) {
        let has_feedback = result.has_feedback();
        *self.result.write().await = Some(result.clone());
        if self.modal.lock().await.close() {
            self.anchors.unmount_sections().await;
            self.tutorial.on_details_closed().await;
            self.emit(ReviewEvent::DetailsClosed);
        }

        debug!(session = %self.id, overall = result.overall, has_feedback, "Result loaded");
        let processing_time = result.processing_time_label();
        self.emit(ReviewEvent::ResultLoaded {
            result,
            processing_time,
        });
        self.tutorial
            .on_result_available(has_feedback, self.mode)
            .await;
    }

    pub async fn submit_essay(&self, prompt: &str, essay: &str) -> Result<(), Error> {
        let result = self.scoring.score(prompt, essay).await?;
        self.load_result(result).await;
        Ok(())
    }

    /// Open the details view for `criterion`.
    pub async fn open_details(
        &self,
        criterion: Criterion,
    ) -> Result<FeedbackSelection, SessionError> {
        if self.mode == ReviewMode::Export {
            return Err(SessionError::ExportMode);
        }
        let selection = {
            let result = self.result.read().await;
            let result = result.as_ref().ok_or(SessionError::NoResult)?;
            FeedbackSelection::from_result(result, criterion)
                .ok_or(SessionError::NoFeedback { criterion })?
        };

        let selection = self.modal.lock().await.open(selection).clone();
        debug!(session = %self.id, %criterion, "Details opened");
        self.emit(ReviewEvent::DetailsOpened {
            selection: selection.clone(),
        });
        self.emit_layers().await;
        self.tutorial.on_details_opened(criterion).await;
        Ok(selection)
    }

    /// Close the details view. Its sections unmount with it.
    pub async fn close_details(&self) {
        if !self.modal.lock().await.close() {
            return;
        }
        self.anchors.unmount_sections().await;
        self.tutorial.on_details_closed().await;
        debug!(session = %self.id, "Details closed");
        self.emit(ReviewEvent::DetailsClosed);
        self.emit_layers().await;
        self.spawn_refresh();
    }

    /// Route a click to the action it stands for.
    pub async fn click(&self, target: ClickTarget) -> Result<(), SessionError> {
        let spotlight = self.tutorial.current_anchor().await;
        let has_feedback = self
            .result
            .read()
            .await
            .as_ref()
            .is_some_and(ScoreResult::has_feedback);

        match route_click(target, spotlight, has_feedback) {
            ClickRoute::OpenDetails(criterion) => {
                self.open_details(criterion).await?;
            }
            ClickRoute::ActivateAnchor(anchor) => {
                self.tutorial.anchor_activated(anchor).await;
            }
            ClickRoute::Ignore => debug!(?target, "Click ignored"),
        }
        Ok(())
    }

    pub async fn anchor_mounted(&self, anchor: Anchor, rect: Rect) {
        self.anchors.mount(anchor, rect).await;
        if self.tutorial.current_anchor().await == Some(anchor) {
            self.tutorial.refresh_highlight().await;
        }
    }

    /// Scroll or resize. Re-measuring runs in the background since an
    /// unmounted anchor waits out the retry delay.
    pub async fn set_viewport(&self, viewport: Viewport) {
        self.anchors.set_viewport(viewport).await;
        self.spawn_refresh();
    }

    /// The client went away. Pending tutorial actions never fire.
    pub async fn end(&self) {
        if self.ended.swap(true, Ordering::SeqCst) {
            return;
        }
        self.tutorial.shutdown().await;
        info!(session = %self.id, "Review session ended");
    }

    fn spawn_refresh(&self) {
        let tutorial = self.tutorial.clone();
        tokio::spawn(async move { tutorial.refresh_highlight().await });
    }

    async fn emit_layers(&self) {
        let layers = self.layers().await;
        self.emit(ReviewEvent::Layers { layers });
    }

    fn emit(&self, event: ReviewEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::review::modal::Layer;
    use crate::review::model::fixtures::{result_with_feedback, result_without_feedback};
    use crate::store::MemoryStore;
    use crate::tutorial::{SectionMarker, TutorialEvent, TutorialPhase};

    async fn session(mode: ReviewMode) -> (ReviewSession, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let session = ReviewSession::start(
            "browser-1",
            mode,
            store.clone(),
            TutorialConfig::default(),
            Arc::new(ScoringClient::new("http://127.0.0.1:9")),
        )
        .await;
        (session, store)
    }

    fn card_rect() -> Rect {
        Rect {
            top: 120.0,
            left: 40.0,
            right: 340.0,
            bottom: 220.0,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn full_tour_via_clicks() {
        let (session, store) = session(ReviewMode::Interactive).await;
        session
            .anchor_mounted(
                Anchor::CriterionCard {
                    criterion: Criterion::TaskResponse,
                },
                card_rect(),
            )
            .await;
        session.load_result(result_with_feedback()).await;
        session.handle(ReviewAction::LayoutReady).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(session.tutorial().phase().await, TutorialPhase::Active(0));

        // Clicking the spotlight opens the primary criterion's details
        session.click(ClickTarget::Spotlight).await.unwrap();
        let snapshot = session.snapshot().await;
        assert_eq!(
            snapshot.details.unwrap().criterion,
            Criterion::TaskResponse
        );

        session.handle(ReviewAction::DetailsReady).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(session.tutorial().phase().await, TutorialPhase::Active(1));

        // Section clicks walk the rest of the tour
        for marker in [SectionMarker::Strengths, SectionMarker::Improvements] {
            session
                .click(ClickTarget::Section { marker })
                .await
                .unwrap();
        }
        assert_eq!(session.tutorial().phase().await, TutorialPhase::Active(3));

        session.handle(ReviewAction::Skip).await.unwrap();
        assert_eq!(session.tutorial().phase().await, TutorialPhase::Finished);
        assert_eq!(store.write_count(), 1);

        // Details stay open after the tutorial ends
        assert!(session.snapshot().await.details.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn details_layers_sit_below_tutorial() {
        let (session, _store) = session(ReviewMode::Interactive).await;
        let mut events = session.subscribe();
        session.load_result(result_with_feedback()).await;
        tokio::time::sleep(Duration::from_millis(501)).await;

        session
            .open_details(Criterion::CoherenceCohesion)
            .await
            .unwrap();

        let mut layers = None;
        while let Ok(event) = events.try_recv() {
            if let ReviewEvent::Layers { layers: l } = event {
                layers = Some(l);
            }
        }
        let layers = layers.unwrap();
        let top = layers.last().unwrap();
        assert_eq!(top.layer, Layer::TutorialCard);
        assert!(layers.iter().any(|l| l.layer == Layer::DetailsModal));

        // Non-primary criteria do not advance the tour
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(session.tutorial().phase().await, TutorialPhase::Active(0));
    }

    #[tokio::test(start_paused = true)]
    async fn closing_details_clears_section_highlight() {
        let (session, _store) = session(ReviewMode::Interactive).await;
        let mut tutorial_events = session.tutorial().subscribe();
        session.load_result(result_with_feedback()).await;
        tokio::time::sleep(Duration::from_millis(501)).await;
        session.open_details(Criterion::TaskResponse).await.unwrap();
        session
            .anchor_mounted(
                Anchor::Section {
                    marker: SectionMarker::Strengths,
                },
                card_rect(),
            )
            .await;
        tokio::time::sleep(Duration::from_millis(301)).await;
        assert!(session.snapshot().await.tutorial.highlight.is_some());

        session.close_details().await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        let snapshot = session.snapshot().await;
        assert!(snapshot.details.is_none());
        assert!(snapshot.tutorial.visible);
        assert!(snapshot.tutorial.highlight.is_none());

        let mut saw_cleared = false;
        while let Ok(event) = tutorial_events.try_recv() {
            if let TutorialEvent::TutorialHighlight { position: None, .. } = event {
                saw_cleared = true;
            }
        }
        assert!(saw_cleared);
    }

    #[tokio::test(start_paused = true)]
    async fn viewport_updates_do_not_wait_for_missing_anchor() {
        let (session, _store) = session(ReviewMode::Interactive).await;
        session.load_result(result_with_feedback()).await;
        tokio::time::sleep(Duration::from_millis(501)).await;
        assert_eq!(session.tutorial().phase().await, TutorialPhase::Active(0));

        // Intro card not mounted: every re-measure would hit the retry delay
        let began = tokio::time::Instant::now();
        for scroll_y in 0..10 {
            let viewport = Viewport {
                width: 1280.0,
                scroll_y: f64::from(scroll_y) * 10.0,
            };
            session
                .handle(ReviewAction::Viewport { viewport })
                .await
                .unwrap();
        }
        assert!(began.elapsed() < Duration::from_millis(100));

        // Once the card mounts, the latest scroll offset is applied
        session
            .anchor_mounted(
                Anchor::CriterionCard {
                    criterion: Criterion::TaskResponse,
                },
                card_rect(),
            )
            .await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        let highlight = session.snapshot().await.tutorial.highlight.unwrap();
        assert_eq!(highlight.top, 120.0 + 90.0);
    }

    #[tokio::test]
    async fn open_details_errors() {
        let (session, _store) = session(ReviewMode::Interactive).await;
        assert!(matches!(
            session.open_details(Criterion::TaskResponse).await,
            Err(SessionError::NoResult)
        ));

        session.load_result(result_without_feedback()).await;
        assert!(matches!(
            session.open_details(Criterion::LexicalResource).await,
            Err(SessionError::NoFeedback {
                criterion: Criterion::LexicalResource
            })
        ));

        // Cards without feedback are not clickable
        session
            .click(ClickTarget::CriterionCard {
                criterion: Criterion::TaskResponse,
            })
            .await
            .unwrap();
        assert!(session.snapshot().await.details.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn export_mode_has_no_tutorial_or_details() {
        let (session, _store) = session(ReviewMode::Export).await;
        session.load_result(result_with_feedback()).await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(session.tutorial().phase().await, TutorialPhase::Idle);
        assert!(matches!(
            session.open_details(Criterion::TaskResponse).await,
            Err(SessionError::ExportMode)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn ended_session_rejects_actions() {
        let (session, store) = session(ReviewMode::Interactive).await;
        session.load_result(result_with_feedback()).await;
        session.end().await;

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(session.tutorial().phase().await, TutorialPhase::Idle);
        assert_eq!(store.write_count(), 0);

        let err = session.handle(ReviewAction::Next).await.unwrap_err();
        assert!(matches!(err, Error::Session(SessionError::Ended(_))));
    }

    #[tokio::test]
    async fn blank_submission_reports_validation_message() {
        let (session, _store) = session(ReviewMode::Interactive).await;
        let err = session
            .handle(ReviewAction::SubmitEssay {
                prompt: String::new(),
                essay: "text".to_string(),
            })
            .await
            .unwrap_err();
        assert!(
            err.to_string()
                .ends_with("Please fill in both the prompt and essay fields.")
        );
        assert!(session.snapshot().await.result.is_none());
    }

    #[test]
    fn action_wire_format() {
        let action: ReviewAction = serde_json::from_value(serde_json::json!({
            "action": "anchor_mounted",
            "anchor": { "kind": "section", "marker": "suggestions" },
            "rect": { "top": 1.0, "left": 2.0, "right": 3.0, "bottom": 4.0 }
        }))
        .unwrap();
        assert!(matches!(
            action,
            ReviewAction::AnchorMounted {
                anchor: Anchor::Section {
                    marker: SectionMarker::Suggestions
                },
                ..
            }
        ));

        let action: ReviewAction =
            serde_json::from_value(serde_json::json!({ "action": "details_ready" })).unwrap();
        assert!(matches!(action, ReviewAction::DetailsReady));
    }
}
