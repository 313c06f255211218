//! Step targeting: resolves a step's anchor to a highlight position.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::TutorialConfig;
use crate::review::model::Criterion;

use super::steps::{Anchor, SectionMarker, TutorialStep};

/// Bounding box of a UI element, relative to the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub scroll_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            scroll_y: 0.0,
        }
    }
}

/// Where the tutorial card and spotlight go, in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HighlightPosition {
    pub anchor: Anchor,
    pub top: f64,
    pub left: f64,
    /// The spotlighted region itself.
    pub spotlight: Rect,
}

/// Answers "where is this element right now". Read-only; an element that is
/// not mounted yet yields `None`.
#[async_trait]
pub trait LayoutProbe: Send + Sync {
    /// Direct lookup of a known results-view region.
    async fn criterion_card(&self, criterion: Criterion) -> Option<Rect>;

    /// Lookup by the marker a details section carries.
    async fn section(&self, marker: SectionMarker) -> Option<Rect>;

    async fn viewport(&self) -> Viewport;
}

#[derive(Debug, Default)]
struct Layout {
    cards: HashMap<Criterion, Rect>,
    sections: HashMap<SectionMarker, Rect>,
    viewport: Viewport,
}

/// `LayoutProbe` fed by measurements the client reports as elements mount.
#[derive(Debug, Default)]
pub struct AnchorRegistry {
    layout: RwLock<Layout>,
}

impl AnchorRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn mount(&self, anchor: Anchor, rect: Rect) {
        let mut layout = self.layout.write().await;
        match anchor {
            Anchor::CriterionCard { criterion } => {
                layout.cards.insert(criterion, rect);
            }
            Anchor::Section { marker } => {
                layout.sections.insert(marker, rect);
            }
        }
    }

    pub async fn unmount(&self, anchor: Anchor) {
        let mut layout = self.layout.write().await;
        match anchor {
            Anchor::CriterionCard { criterion } => {
                layout.cards.remove(&criterion);
            }
            Anchor::Section { marker } => {
                layout.sections.remove(&marker);
            }
        }
    }

    /// Forget every details-view section (the view closed).
    pub async fn unmount_sections(&self) {
        self.layout.write().await.sections.clear();
    }

    pub async fn set_viewport(&self, viewport: Viewport) {
        self.layout.write().await.viewport = viewport;
    }
}

#[async_trait]
impl LayoutProbe for AnchorRegistry {
    async fn criterion_card(&self, criterion: Criterion) -> Option<Rect> {
        self.layout.read().await.cards.get(&criterion).copied()
    }

    async fn section(&self, marker: SectionMarker) -> Option<Rect> {
        self.layout.read().await.sections.get(&marker).copied()
    }

    async fn viewport(&self) -> Viewport {
        self.layout.read().await.viewport
    }
}

/// Resolves the active step's anchor, retrying once if it is not mounted.
#[derive(Clone)]
pub struct StepTargeter {
    probe: Arc<dyn LayoutProbe>,
    retry_delay: Duration,
    pointer_offset: f64,
    card_width: f64,
}

impl StepTargeter {
    pub fn new(probe: Arc<dyn LayoutProbe>, config: &TutorialConfig) -> Self {
        Self {
            probe,
            retry_delay: config.anchor_retry_delay,
            pointer_offset: config.pointer_offset,
            card_width: config.card_width,
        }
    }

    /// `None` when the anchor is still missing after the retry; the tutorial
    /// then stays visible without a precise position.
    pub async fn resolve(&self, step: &TutorialStep) -> Option<HighlightPosition> {
        if let Some(position) = self.try_resolve(step.anchor).await {
            return Some(position);
        }
        tokio::time::sleep(self.retry_delay).await;
        let position = self.try_resolve(step.anchor).await;
        if position.is_none() {
            debug!(
                step = step.index,
                anchor = %step.anchor,
                "Tutorial anchor not mounted, showing without highlight"
            );
        }
        position
    }

    async fn try_resolve(&self, anchor: Anchor) -> Option<HighlightPosition> {
        let rect = match anchor {
            Anchor::CriterionCard { criterion } => self.probe.criterion_card(criterion).await,
            Anchor::Section { marker } => self.probe.section(marker).await,
        }?;
        let viewport = self.probe.viewport().await;
        Some(self.position(anchor, rect, viewport))
    }

    /// Card sits beside the anchor, pulled left so it stays on screen.
    pub fn position(&self, anchor: Anchor, rect: Rect, viewport: Viewport) -> HighlightPosition {
        HighlightPosition {
            anchor,
            top: rect.top + viewport.scroll_y,
            left: (rect.right + self.pointer_offset).min(viewport.width - self.card_width),
            spotlight: rect,
        }
    }
}
