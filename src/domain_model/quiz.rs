use crate::domain_model::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuizSetId(pub uuid::Uuid);

impl std::fmt::Display for QuizSetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for QuizSetId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::from_str(s).map(QuizSetId)
    }
}

#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuizQuestionId(pub uuid::Uuid);

impl std::fmt::Display for QuizQuestionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for QuizQuestionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::from_str(s).map(QuizQuestionId)
    }
}

/// `quiz_questions` projected to `id, correct_answer`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerKey {
    #[serde(rename = "id")]
    pub question_id: QuizQuestionId,
    pub correct_answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizAnswer {
    pub question_id: QuizQuestionId,
    pub answer: String,
}

/// Parses `question_id=answer`.
impl std::str::FromStr for QuizAnswer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (question, answer) = s
            .split_once('=')
            .ok_or_else(|| format!("expected question=answer, got {s:?}"))?;
        let question_id = question
            .trim()
            .parse()
            .map_err(|e| format!("invalid question id {question:?}: {e}"))?;
        Ok(Self {
            question_id,
            answer: answer.to_owned(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuizOutcome {
    pub score: u32,
    pub total_questions: u32,
    pub passed: bool,
}

impl QuizOutcome {
    /// Pass mark: 60% of the questions, rounded up.
    pub fn pass_mark(total_questions: u32) -> u32 {
        (total_questions * 3).div_ceil(5)
    }

    /// Later answers to the same question replace earlier ones.
    pub fn grade(key: &[AnswerKey], answers: &[QuizAnswer]) -> Self {
        let given: HashMap<QuizQuestionId, &str> = answers
            .iter()
            .map(|a| (a.question_id, a.answer.as_str()))
            .collect();

        let score = key
            .iter()
            .filter(|k| given.get(&k.question_id) == Some(&k.correct_answer.as_str()))
            .count() as u32;
        let total_questions = key.len() as u32;

        Self {
            score,
            total_questions,
            passed: score >= Self::pass_mark(total_questions),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizProgress {
    pub user_id: UserId,
    pub quiz_set_id: QuizSetId,
    pub completed: bool,
    pub score: u32,
    pub total_questions: u32,
    pub last_attempted_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}
