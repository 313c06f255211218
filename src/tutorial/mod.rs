//! Onboarding tutorial: a guided tour over the result-review screen.
//!
//! The tour highlights the primary criterion card, waits for the user to open
//! its details, then walks through the strengths, improvements and
//! suggestions sections. It auto-starts at most once per browser.

pub mod coordinator;
pub mod gate;
pub mod state;
pub mod steps;
pub mod targeting;
pub mod timer;

pub use coordinator::{
    FinishReason, TutorialCard, TutorialCoordinator, TutorialEvent, TutorialSnapshot,
};
pub use gate::PersistenceGate;
pub use state::{Transition, TutorialPhase, TutorialState};
pub use steps::{Anchor, SectionMarker, TutorialStep, feedback_tour};
pub use targeting::{AnchorRegistry, HighlightPosition, LayoutProbe, Rect, StepTargeter, Viewport};
