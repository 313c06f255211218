//! Tutorial step definitions and their anchors.

use serde::{Deserialize, Serialize};

use crate::review::model::Criterion;

/// Stable marker attached to a section of the details view at render time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionMarker {
    Strengths,
    Improvements,
    Suggestions,
}

impl SectionMarker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strengths => "strengths",
            Self::Improvements => "improvements",
            Self::Suggestions => "suggestions",
        }
    }
}

/// The UI region a step points at.
///
/// `CriterionCard` is a direct reference to a known region of the results
/// view; `Section` is looked up by its marker, since the details view only
/// exists while it is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anchor {
    CriterionCard { criterion: Criterion },
    Section { marker: SectionMarker },
}

impl std::fmt::Display for Anchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CriterionCard { criterion } => write!(f, "card:{criterion}"),
            Self::Section { marker } => write!(f, "section:{}", marker.as_str()),
        }
    }
}

/// Which side of the anchor the tutorial card prefers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardSide {
    Top,
    Bottom,
    Right,
}

/// One step of the tutorial. Immutable once defined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TutorialStep {
    pub index: usize,
    pub title: &'static str,
    pub body: &'static str,
    pub icon: &'static str,
    pub anchor: Anchor,
    pub side: CardSide,
}

/// The fixed four-step feedback tour.
pub fn feedback_tour() -> Vec<TutorialStep> {
    vec![
        TutorialStep {
            index: 0,
            title: "Click to View Feedback",
            body: "Click this card to see detailed feedback about your Task Response",
            icon: "🎯",
            anchor: Anchor::CriterionCard {
                criterion: Criterion::PRIMARY,
            },
            side: CardSide::Right,
        },
        TutorialStep {
            index: 1,
            title: "Strengths Section",
            body: "Review what you did well in your writing",
            icon: "✅",
            anchor: Anchor::Section {
                marker: SectionMarker::Strengths,
            },
            side: CardSide::Bottom,
        },
        TutorialStep {
            index: 2,
            title: "Areas for Improvement",
            body: "Learn what needs improvement",
            icon: "❌",
            anchor: Anchor::Section {
                marker: SectionMarker::Improvements,
            },
            side: CardSide::Bottom,
        },
        TutorialStep {
            index: 3,
            title: "Suggestions",
            body: "Get actionable tips to improve your score",
            icon: "💡",
            anchor: Anchor::Section {
                marker: SectionMarker::Suggestions,
            },
            side: CardSide::Top,
        },
    ]
}
