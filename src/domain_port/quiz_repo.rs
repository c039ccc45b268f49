use crate::application_port::*;
use crate::domain_model::*;

#[async_trait::async_trait]
pub trait QuizRepo: Send + Sync {
    async fn answer_key(&self, quiz_set_id: QuizSetId) -> Result<Vec<AnswerKey>, GatewayError>;
    /// Upsert keyed on (user_id, quiz_set_id)
    async fn upsert_progress(&self, progress: &QuizProgress) -> Result<(), GatewayError>;
    /// Fails with a no-rows error when the quiz was never attempted.
    async fn get_progress(
        &self,
        user_id: UserId,
        quiz_set_id: QuizSetId,
    ) -> Result<QuizProgress, GatewayError>;
    /// Order by (last_attempted_at DESC)
    async fn list_progress(&self, user_id: UserId) -> Result<Vec<QuizProgress>, GatewayError>;
}
