//! Answer evaluation and branch resolution
//!
//! Pure functions: the engine decides what to do with the verdict.
//!
//! | Type            | Accepted when                 | Correct           | Scores        |
//! |-----------------|-------------------------------|-------------------|---------------|
//! | multiple-choice | option id exists              | `option.isCorrect`| iff correct   |
//! | text-input      | non-empty after trim          | normalized match  | iff correct   |
//! | essay           | word count ≥ `minWords`       | always            | never         |
//! | rating          | value in `[1, scale]`         | always            | never         |

use ivq_common::model::{BranchBucket, Question, QuestionKind};

/// Raw answer as collected by the answer draft
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerInput {
    /// Selected multiple-choice option id
    Option(String),
    /// Typed text (text-input answer or essay body)
    Text(String),
    /// Selected rating value
    Rating(u32),
}

impl AnswerInput {
    /// String form stored in the recorded answer
    pub fn as_answer_string(&self) -> String {
        match self {
            AnswerInput::Option(id) => id.clone(),
            AnswerInput::Text(text) => text.clone(),
            AnswerInput::Rating(value) => value.to_string(),
        }
    }
}

/// Verdict for one submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub accepted: bool,
    pub is_correct: bool,
    pub counts_toward_score: bool,
}

impl Evaluation {
    const REJECTED: Evaluation = Evaluation {
        accepted: false,
        is_correct: false,
        counts_toward_score: false,
    };

    fn graded(is_correct: bool) -> Self {
        Self {
            accepted: true,
            is_correct,
            counts_toward_score: is_correct,
        }
    }

    fn ungraded() -> Self {
        Self {
            accepted: true,
            is_correct: true,
            counts_toward_score: false,
        }
    }
}

/// Case- and surrounding-whitespace-insensitive form of a text answer
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Evaluate `input` against `question`
///
/// An input of the wrong shape for the question type is not accepted.
pub fn evaluate(question: &Question, input: &AnswerInput) -> Evaluation {
    match (&question.kind, input) {
        (QuestionKind::MultipleChoice { options }, AnswerInput::Option(id)) => {
            match options.iter().find(|o| &o.id == id) {
                Some(option) => Evaluation::graded(option.is_correct),
                None => Evaluation::REJECTED,
            }
        }
        (QuestionKind::TextInput { correct_answer }, AnswerInput::Text(text)) => {
            if text.trim().is_empty() {
                Evaluation::REJECTED
            } else {
                Evaluation::graded(normalize(text) == normalize(correct_answer))
            }
        }
        (QuestionKind::Essay { min_words, .. }, AnswerInput::Text(text)) => {
            if word_count(text) >= *min_words as usize {
                Evaluation::ungraded()
            } else {
                Evaluation::REJECTED
            }
        }
        (QuestionKind::Rating { scale }, AnswerInput::Rating(value)) => {
            if (1..=*scale).contains(value) {
                Evaluation::ungraded()
            } else {
                Evaluation::REJECTED
            }
        }
        _ => Evaluation::REJECTED,
    }
}

/// Where a branching answer moves the timeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchDecision {
    pub bucket: BranchBucket,
    pub jump_to: f64,
}

/// Resolve the branch taken by a rating answer
///
/// `None` for non-branching questions and for buckets the author left
/// undefined (playback then simply continues).
pub fn resolve_branch(question: &Question, rating: u32) -> Option<BranchDecision> {
    if !question.is_branching() {
        return None;
    }
    let bucket = BranchBucket::for_rating(rating);
    let target = question.branches.as_ref()?.target(bucket)?;
    Some(BranchDecision {
        bucket,
        jump_to: target.jump_to,
    })
}
