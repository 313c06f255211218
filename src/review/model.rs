//! Score result data model and the feedback selection shown in the details view.

use serde::{Deserialize, Serialize};

/// One of the four scored IELTS writing criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Criterion {
    #[serde(rename = "Task Response")]
    TaskResponse,
    #[serde(rename = "Coherence & Cohesion")]
    CoherenceCohesion,
    #[serde(rename = "Lexical Resource")]
    LexicalResource,
    #[serde(rename = "Grammatical Range & Accuracy")]
    GrammaticalRangeAccuracy,
}

impl Criterion {
    /// All criteria in display order.
    pub const ALL: [Criterion; 4] = [
        Self::TaskResponse,
        Self::CoherenceCohesion,
        Self::LexicalResource,
        Self::GrammaticalRangeAccuracy,
    ];

    /// The criterion the tutorial points at first.
    pub const PRIMARY: Criterion = Self::TaskResponse;

    pub fn is_primary(&self) -> bool {
        *self == Self::PRIMARY
    }

    /// Human-readable title, identical to the feedback key.
    pub fn title(&self) -> &'static str {
        match self {
            Self::TaskResponse => "Task Response",
            Self::CoherenceCohesion => "Coherence & Cohesion",
            Self::LexicalResource => "Lexical Resource",
            Self::GrammaticalRangeAccuracy => "Grammatical Range & Accuracy",
        }
    }
}

impl std::fmt::Display for Criterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title())
    }
}

/// Detailed feedback for one criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackDetail {
    pub score: f64,
    pub strengths: String,
    pub weaknesses: String,
    pub suggestions: String,
}

/// Per-criterion feedback, keyed the way the scoring API returns it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    #[serde(rename = "Task Response", default, skip_serializing_if = "Option::is_none")]
    pub task_response: Option<FeedbackDetail>,
    #[serde(rename = "Coherence & Cohesion", default, skip_serializing_if = "Option::is_none")]
    pub coherence_cohesion: Option<FeedbackDetail>,
    #[serde(rename = "Lexical Resource", default, skip_serializing_if = "Option::is_none")]
    pub lexical_resource: Option<FeedbackDetail>,
    #[serde(
        rename = "Grammatical Range & Accuracy",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub grammatical_range_accuracy: Option<FeedbackDetail>,
    #[serde(rename = "Overall", default, skip_serializing_if = "Option::is_none")]
    pub overall: Option<FeedbackDetail>,
}

impl Feedback {
    pub fn get(&self, criterion: Criterion) -> Option<&FeedbackDetail> {
        match criterion {
            Criterion::TaskResponse => self.task_response.as_ref(),
            Criterion::CoherenceCohesion => self.coherence_cohesion.as_ref(),
            Criterion::LexicalResource => self.lexical_resource.as_ref(),
            Criterion::GrammaticalRangeAccuracy => self.grammatical_range_accuracy.as_ref(),
        }
    }
}

/// Scores returned by the external scoring API. Never mutated here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    #[serde(rename = "TR")]
    pub task_response: f64,
    #[serde(rename = "CC")]
    pub coherence_cohesion: f64,
    #[serde(rename = "LR")]
    pub lexical_resource: f64,
    #[serde(rename = "GA")]
    pub grammatical_accuracy: f64,
    #[serde(rename = "OVERALL")]
    pub overall: f64,
    /// Processing time in seconds. Absent or null when the API did not
    /// report it.
    #[serde(default)]
    pub time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
}

impl ScoreResult {
    pub fn has_feedback(&self) -> bool {
        self.feedback.is_some()
    }

    pub fn score(&self, criterion: Criterion) -> f64 {
        match criterion {
            Criterion::TaskResponse => self.task_response,
            Criterion::CoherenceCohesion => self.coherence_cohesion,
            Criterion::LexicalResource => self.lexical_resource,
            Criterion::GrammaticalRangeAccuracy => self.grammatical_accuracy,
        }
    }

    pub fn feedback_for(&self, criterion: Criterion) -> Option<&FeedbackDetail> {
        self.feedback.as_ref().and_then(|f| f.get(criterion))
    }

    /// Processing time as shown under the overall band, e.g. `"3.27s"`.
    /// A missing or zero time renders as `"N/A"`.
    pub fn processing_time_label(&self) -> String {
        match self.time {
            Some(time) if time > 0.0 => format!("{time:.2}s"),
            _ => "N/A".to_string(),
        }
    }
}

/// The criterion and feedback currently shown in the details view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackSelection {
    pub criterion: Criterion,
    pub title: String,
    pub feedback: FeedbackDetail,
}

impl FeedbackSelection {
    /// Build a selection from a result. `None` when the result carries no
    /// feedback for `criterion`.
    pub fn from_result(result: &ScoreResult, criterion: Criterion) -> Option<Self> {
        let feedback = result.feedback_for(criterion)?.clone();
        Some(Self {
            criterion,
            title: criterion.title().to_string(),
            feedback,
        })
    }
}

/// How results are presented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewMode {
    /// Clickable score cards with the onboarding tutorial.
    #[default]
    Interactive,
    /// Static rendering for image export; no tutorial, no details view.
    Export,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    fn detail(score: f64) -> FeedbackDetail {
        FeedbackDetail {
            score,
            strengths: "Clear position throughout.".to_string(),
            weaknesses: "Some ideas are underdeveloped.".to_string(),
            suggestions: "Extend each main idea with an example.".to_string(),
        }
    }

    pub fn result_with_feedback() -> ScoreResult {
        ScoreResult {
            task_response: 6.5,
            coherence_cohesion: 7.0,
            lexical_resource: 6.0,
            grammatical_accuracy: 6.5,
            overall: 6.5,
            time: Some(3.274),
            feedback: Some(Feedback {
                task_response: Some(detail(6.5)),
                coherence_cohesion: Some(detail(7.0)),
                lexical_resource: Some(detail(6.0)),
                grammatical_range_accuracy: Some(detail(6.5)),
                overall: Some(detail(6.5)),
            }),
        }
    }

    pub fn result_without_feedback() -> ScoreResult {
        ScoreResult {
            feedback: None,
            ..result_with_feedback()
        }
    }
}
