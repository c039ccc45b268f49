use crate::application_port::GatewayError;
use crate::domain_model::*;

#[async_trait::async_trait]
pub trait ProgressService: Send + Sync {
    async fn start_tutorial(
        &self,
        user_id: UserId,
        tutorial_id: TutorialId,
    ) -> Result<TutorialProgress, GatewayError>;

    /// Updates the existing row, or inserts one when the user never started it.
    async fn mark_tutorial_done(
        &self,
        user_id: UserId,
        tutorial_id: TutorialId,
    ) -> Result<TutorialProgress, GatewayError>;

    async fn tutorial_summary(&self, user_id: UserId) -> Result<ProgressSummary, GatewayError>;

    async fn submit_quiz(
        &self,
        user_id: UserId,
        quiz_set_id: QuizSetId,
        answers: &[QuizAnswer],
    ) -> Result<QuizOutcome, GatewayError>;

    async fn quiz_progress(
        &self,
        user_id: UserId,
        quiz_set_id: QuizSetId,
    ) -> Result<Option<QuizProgress>, GatewayError>;

    /// Order by (last_attempted_at DESC)
    async fn quiz_history(&self, user_id: UserId) -> Result<Vec<QuizProgress>, GatewayError>;
}
