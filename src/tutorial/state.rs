//! Tutorial state machine: tracks which step the user is on.

use serde::{Deserialize, Serialize};

/// The phases of the tutorial.
///
/// Progresses linearly: Idle → Active(0) → … → Active(n-1) → Finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "step", rename_all = "snake_case")]
pub enum TutorialPhase {
    Idle,
    Active(usize),
    Finished,
}

impl TutorialPhase {
    /// Current step index, if active.
    pub fn step(&self) -> Option<usize> {
        match self {
            Self::Active(i) => Some(*i),
            _ => None,
        }
    }
}

impl Default for TutorialPhase {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for TutorialPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Active(i) => write!(f, "active({i})"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

/// Outcome of applying an event to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Started,
    Advanced { from: usize, to: usize },
    /// Entered `Finished`. `from` is the step that was showing, if any.
    Finished { from: Option<usize> },
    Unchanged,
}

/// Per-session tutorial state.
#[derive(Debug, Clone)]
pub struct TutorialState {
    phase: TutorialPhase,
    /// Whether the tutorial has been seen on this browser.
    seen: bool,
    step_count: usize,
}

impl TutorialState {
    pub fn new(step_count: usize, seen: bool) -> Self {
        Self {
            phase: TutorialPhase::Idle,
            seen,
            step_count,
        }
    }

    pub fn phase(&self) -> TutorialPhase {
        self.phase
    }

    pub fn seen(&self) -> bool {
        self.seen
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// The overlay is visible only while a step is active.
    pub fn visible(&self) -> bool {
        matches!(self.phase, TutorialPhase::Active(_))
    }

    /// Whether the in-overlay "Next" control is offered (interior steps only).
    pub fn shows_next(&self) -> bool {
        match self.phase {
            TutorialPhase::Active(i) => i > 0 && i + 1 < self.step_count,
            _ => false,
        }
    }

    /// Whether the current step is the last one.
    pub fn is_last_step(&self) -> bool {
        matches!(self.phase, TutorialPhase::Active(i) if i + 1 >= self.step_count)
    }

    /// `Idle → Active(0)`, only while unseen.
    pub fn start(&mut self) -> Transition {
        if self.phase != TutorialPhase::Idle || self.seen || self.step_count == 0 {
            return Transition::Unchanged;
        }
        self.phase = TutorialPhase::Active(0);
        Transition::Started
    }

    /// `Active(0) → Active(1)` after the primary criterion's details opened.
    pub fn advance_from_intro(&mut self) -> Transition {
        match self.phase {
            TutorialPhase::Active(0) => self.step_forward(0),
            _ => Transition::Unchanged,
        }
    }

    /// Explicit advance from an interior or last step (anchor click or "Next").
    ///
    /// Step 0 is left alone: it only moves when the details view opens.
    /// Advancing past the last step, or from an out-of-range index, finishes.
    pub fn advance(&mut self) -> Transition {
        match self.phase {
            TutorialPhase::Active(0) if self.step_count > 1 => Transition::Unchanged,
            TutorialPhase::Active(i) => self.step_forward(i),
            _ => Transition::Unchanged,
        }
    }

    /// Skip or Finish. Idempotent once finished.
    pub fn finish(&mut self) -> Transition {
        match self.phase {
            TutorialPhase::Active(i) => {
                self.phase = TutorialPhase::Finished;
                self.seen = true;
                Transition::Finished { from: Some(i) }
            }
            TutorialPhase::Idle | TutorialPhase::Finished => Transition::Unchanged,
        }
    }

    fn step_forward(&mut self, from: usize) -> Transition {
        let to = from + 1;
        if to >= self.step_count {
            self.phase = TutorialPhase::Finished;
            self.seen = true;
            return Transition::Finished { from: Some(from) };
        }
        self.phase = TutorialPhase::Active(to);
        Transition::Advanced { from, to }
    }
}
