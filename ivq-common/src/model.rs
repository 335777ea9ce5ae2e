//! Schedule and answer data model
//!
//! Types supplied by the host (chapters, questions, player props) and types
//! produced by the engine (user answers, progress snapshots).
//!
//! All types serialize to camelCase JSON; question variants are tagged by a
//! kebab-case `type` field, e.g.
//!
//! ```json
//! {
//!   "id": 1, "type": "multiple-choice", "triggerTime": 31.0,
//!   "promptText": "Which one?", "feedback": "It was b.",
//!   "nextAction": "continue",
//!   "options": [{"id": "a", "text": "A", "isCorrect": false},
//!               {"id": "b", "text": "B", "isCorrect": true}]
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Question identifier (unique within a schedule)
pub type QuestionId = u32;

/// Chapter identifier
pub type ChapterId = u32;

/// A named range of the video timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: ChapterId,
    pub title: String,
    /// Inclusive start (seconds)
    pub start_time: f64,
    /// Exclusive end (seconds), must be greater than `start_time`
    pub end_time: f64,
    #[serde(default)]
    pub description: String,
}

impl Chapter {
    /// True if `t` falls within `[start_time, end_time)`
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start_time && t < self.end_time
    }
}

/// What happens once a question is accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextAction {
    #[default]
    Continue,
    Branch,
}

/// Timeline jump target for one branch bucket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchTarget {
    pub jump_to: f64,
}

/// Branch table of a rating question
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Branches {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<BranchTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medium: Option<BranchTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<BranchTarget>,
}

/// Rating bucket used to pick a branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchBucket {
    Low,
    Medium,
    High,
}

impl BranchBucket {
    /// Map a rating to its bucket: `r <= 2` low, `r <= 3` medium, else high
    pub fn for_rating(rating: u32) -> Self {
        if rating <= 2 {
            BranchBucket::Low
        } else if rating <= 3 {
            BranchBucket::Medium
        } else {
            BranchBucket::High
        }
    }
}

impl Branches {
    /// Target for a bucket, if the author defined one
    pub fn target(&self, bucket: BranchBucket) -> Option<BranchTarget> {
        match bucket {
            BranchBucket::Low => self.low,
            BranchBucket::Medium => self.medium,
            BranchBucket::High => self.high,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.low.is_none() && self.medium.is_none() && self.high.is_none()
    }
}

/// One option of a multiple-choice question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOption {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// Variant-specific part of a question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum QuestionKind {
    MultipleChoice {
        options: Vec<AnswerOption>,
    },
    #[serde(rename_all = "camelCase")]
    TextInput {
        correct_answer: String,
    },
    #[serde(rename_all = "camelCase")]
    Essay {
        min_words: u32,
        #[serde(default)]
        placeholder: String,
    },
    Rating {
        scale: u32,
    },
}

/// Discriminant of [`QuestionKind`], carried by answers and events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    MultipleChoice,
    TextInput,
    Essay,
    Rating,
}

impl QuestionType {
    /// True for types whose correct answers count toward the score
    pub fn is_graded(&self) -> bool {
        matches!(self, QuestionType::MultipleChoice | QuestionType::TextInput)
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuestionType::MultipleChoice => write!(f, "multiple-choice"),
            QuestionType::TextInput => write!(f, "text-input"),
            QuestionType::Essay => write!(f, "essay"),
            QuestionType::Rating => write!(f, "rating"),
        }
    }
}

/// A knowledge-check question pinned to a point of the timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    /// Playback time (seconds) at which the question is due
    pub trigger_time: f64,
    pub prompt_text: String,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub next_action: NextAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branches: Option<Branches>,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

impl Question {
    pub fn question_type(&self) -> QuestionType {
        match self.kind {
            QuestionKind::MultipleChoice { .. } => QuestionType::MultipleChoice,
            QuestionKind::TextInput { .. } => QuestionType::TextInput,
            QuestionKind::Essay { .. } => QuestionType::Essay,
            QuestionKind::Rating { .. } => QuestionType::Rating,
        }
    }

    /// Look up a multiple-choice option by id
    pub fn option(&self, option_id: &str) -> Option<&AnswerOption> {
        match &self.kind {
            QuestionKind::MultipleChoice { options } => options.iter().find(|o| o.id == option_id),
            _ => None,
        }
    }

    /// True for rating questions that branch the timeline
    pub fn is_branching(&self) -> bool {
        self.next_action == NextAction::Branch
            && matches!(self.kind, QuestionKind::Rating { .. })
    }
}

/// The recorded answer to one question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAnswer {
    /// Option id, typed text, essay body or rating value
    pub answer: String,
    pub is_correct: bool,
    /// Playback time at which the answer was accepted
    pub timestamp_seconds: f64,
    pub question_type: QuestionType,
}

/// Debounced progress summary published to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub current_time: f64,
    pub duration: f64,
    pub percent: f64,
    pub current_chapter_index: Option<usize>,
    pub score: u32,
    pub total_questions: u32,
    pub answered_count: u32,
}

/// Playback completion percentage, clamped to `[0, 100]`
///
/// Returns 0 while the duration is unknown (zero).
pub fn progress_percent(current_time: f64, duration: f64) -> f64 {
    if duration > 0.0 {
        (current_time / duration * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Caption track handed through to the playback surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub src: String,
    pub src_lang: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Construction properties for one player instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProps {
    pub video_url: String,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub auto_play: bool,
    #[serde(default)]
    pub muted: bool,
    #[serde(default, rename = "loop")]
    pub loop_playback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(default)]
    pub captions: Vec<CaptionTrack>,
}

impl PlayerProps {
    /// Props with an empty schedule and default flags
    pub fn new(video_url: impl Into<String>) -> Self {
        Self {
            video_url: video_url.into(),
            chapters: Vec::new(),
            questions: Vec::new(),
            auto_play: false,
            muted: false,
            loop_playback: false,
            width: None,
            height: None,
            poster: None,
            captions: Vec::new(),
        }
    }

    /// Parse props from a JSON document
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
