use crate::application_port::*;
use crate::domain_model::*;
use chrono::{DateTime, Utc};

#[async_trait::async_trait]
pub trait TutorialProgressRepo: Send + Sync {
    async fn upsert_started(
        &self,
        user_id: UserId,
        tutorial_id: TutorialId,
        at: DateTime<Utc>,
    ) -> Result<TutorialProgress, GatewayError>;

    /// Fails with a no-rows error when the user has no row for the tutorial.
    async fn update_completed(
        &self,
        user_id: UserId,
        tutorial_id: TutorialId,
        at: DateTime<Utc>,
    ) -> Result<TutorialProgress, GatewayError>;

    async fn insert_completed(
        &self,
        user_id: UserId,
        tutorial_id: TutorialId,
        at: DateTime<Utc>,
    ) -> Result<TutorialProgress, GatewayError>;

    async fn list_statuses(&self, user_id: UserId) -> Result<Vec<TutorialStatus>, GatewayError>;
}
