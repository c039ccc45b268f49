use crate::domain_model::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TutorialId(pub uuid::Uuid);

impl std::fmt::Display for TutorialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TutorialId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::from_str(s).map(TutorialId)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TutorialStatus {
    Started,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorialProgress {
    pub user_id: UserId,
    pub tutorial_id: TutorialId,
    pub status: TutorialStatus,
    #[serde(default)]
    pub last_watched_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSummary {
    pub total_started: usize,
    pub total_completed: usize,
    pub completion_percentage: u8,
}

impl ProgressSummary {
    /// Every progress row counts as started, completed ones included.
    pub fn from_statuses(statuses: &[TutorialStatus]) -> Self {
        let total_started = statuses.len();
        let total_completed = statuses
            .iter()
            .filter(|s| **s == TutorialStatus::Completed)
            .count();
        let completion_percentage = if total_started > 0 {
            ((total_completed as f64 / total_started as f64) * 100.0).round() as u8
        } else {
            0
        };
        Self {
            total_started,
            total_completed,
            completion_percentage,
        }
    }
}
