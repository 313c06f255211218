//! Result review screen: score cards, the feedback details view and the
//! per-connection session that ties them to the tutorial.

pub mod modal;
pub mod model;
pub mod scoring;
pub mod session;
pub mod ws;

pub use modal::{ClickRoute, ClickTarget, Layer, ModalCoordinator, StackedLayer, route_click};
pub use model::{Criterion, Feedback, FeedbackDetail, FeedbackSelection, ReviewMode, ScoreResult};
pub use scoring::ScoringClient;
pub use session::{ReviewAction, ReviewEvent, ReviewSession, SessionSnapshot};
pub use ws::review_routes;
