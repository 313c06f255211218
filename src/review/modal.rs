//! Feedback details overlay: open/close state, layer stacking and click
//! routing.
//!
//! Clicks are routed from what was clicked to the action it stands for, so a
//! click on the tutorial spotlight performs the spotlighted element's own
//! action directly.

use serde::{Deserialize, Serialize};

use crate::tutorial::{Anchor, SectionMarker};

use super::model::{Criterion, FeedbackSelection};

/// Holds the single details view.
#[derive(Debug, Default)]
pub struct ModalCoordinator {
    selection: Option<FeedbackSelection>,
}

impl ModalCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.selection.is_some()
    }

    pub fn selection(&self) -> Option<&FeedbackSelection> {
        self.selection.as_ref()
    }

    /// Show `selection`, replacing whatever was open.
    pub fn open(&mut self, selection: FeedbackSelection) -> &FeedbackSelection {
        self.selection.insert(selection)
    }

    /// Returns whether the view was open.
    pub fn close(&mut self) -> bool {
        self.selection.take().is_some()
    }

    /// Current layer stack, bottom to top.
    pub fn layers(&self, tutorial_visible: bool) -> Vec<StackedLayer> {
        let mut layers = vec![StackedLayer::new(Layer::Page)];
        if self.is_open() {
            layers.push(StackedLayer::new(Layer::DetailsBackdrop));
            layers.push(StackedLayer::new(Layer::DetailsModal));
        }
        if tutorial_visible {
            layers.push(StackedLayer::new(Layer::TutorialBackdrop));
            layers.push(StackedLayer::new(Layer::TutorialSpotlight));
            layers.push(StackedLayer::new(Layer::TutorialCard));
        }
        layers
    }
}

/// A stacked overlay layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Page,
    DetailsBackdrop,
    DetailsModal,
    TutorialBackdrop,
    TutorialSpotlight,
    TutorialCard,
}

impl Layer {
    pub fn z_index(&self) -> u32 {
        match self {
            Self::Page => 0,
            Self::DetailsBackdrop => 61,
            Self::DetailsModal => 62,
            Self::TutorialBackdrop => 99_000,
            Self::TutorialSpotlight => 99_500,
            Self::TutorialCard => 100_000,
        }
    }

    /// Whether the layer receives clicks. The tutorial backdrop dims the
    /// page but lets clicks through to the spotlighted element.
    pub fn interactive(&self) -> bool {
        !matches!(self, Self::TutorialBackdrop)
    }

    /// Clicking the details backdrop does not close the details view, so a
    /// click meant for the tutorial cannot dismiss it.
    pub fn dismiss_on_click(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StackedLayer {
    pub layer: Layer,
    pub z_index: u32,
    pub interactive: bool,
    pub dismiss_on_click: bool,
}

impl StackedLayer {
    fn new(layer: Layer) -> Self {
        Self {
            layer,
            z_index: layer.z_index(),
            interactive: layer.interactive(),
            dismiss_on_click: layer.dismiss_on_click(),
        }
    }
}

/// What the user clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClickTarget {
    CriterionCard { criterion: Criterion },
    Section { marker: SectionMarker },
    /// The tutorial's highlighted region.
    Spotlight,
    TutorialBackdrop,
    DetailsBackdrop,
    TutorialCard,
}

/// The action a click resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickRoute {
    OpenDetails(Criterion),
    ActivateAnchor(Anchor),
    Ignore,
}

/// Resolve a click. `spotlight` is the anchor the tutorial currently points
/// at; a spotlight click acts as a click on that anchor.
pub fn route_click(
    target: ClickTarget,
    spotlight: Option<Anchor>,
    has_feedback: bool,
) -> ClickRoute {
    match target {
        ClickTarget::CriterionCard { criterion } if has_feedback => {
            ClickRoute::OpenDetails(criterion)
        }
        ClickTarget::CriterionCard { .. } => ClickRoute::Ignore,
        ClickTarget::Section { marker } => {
            ClickRoute::ActivateAnchor(Anchor::Section { marker })
        }
        ClickTarget::Spotlight => match spotlight {
            Some(Anchor::CriterionCard { criterion }) => route_click(
                ClickTarget::CriterionCard { criterion },
                None,
                has_feedback,
            ),
            Some(anchor @ Anchor::Section { .. }) => ClickRoute::ActivateAnchor(anchor),
            None => ClickRoute::Ignore,
        },
        ClickTarget::TutorialBackdrop
        | ClickTarget::DetailsBackdrop
        | ClickTarget::TutorialCard => ClickRoute::Ignore,
    }
}
