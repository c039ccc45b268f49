use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info};

pub struct RealProgressService {
    tutorial_progress_repo: Arc<dyn TutorialProgressRepo>,
    quiz_repo: Arc<dyn QuizRepo>,
}

impl RealProgressService {
    pub fn new(
        tutorial_progress_repo: Arc<dyn TutorialProgressRepo>,
        quiz_repo: Arc<dyn QuizRepo>,
    ) -> Self {
        Self {
            tutorial_progress_repo,
            quiz_repo,
        }
    }
}

#[async_trait::async_trait]
impl ProgressService for RealProgressService {
    async fn start_tutorial(
        &self,
        user_id: UserId,
        tutorial_id: TutorialId,
    ) -> Result<TutorialProgress, GatewayError> {
        self.tutorial_progress_repo
            .upsert_started(user_id, tutorial_id, Utc::now())
            .await
            .inspect_err(|e| error!("start tutorial: {e}"))
    }

    async fn mark_tutorial_done(
        &self,
        user_id: UserId,
        tutorial_id: TutorialId,
    ) -> Result<TutorialProgress, GatewayError> {
        let now = Utc::now();
        match self
            .tutorial_progress_repo
            .update_completed(user_id, tutorial_id, now)
            .await
        {
            Ok(progress) => {
                debug!("tutorial progress updated to completed");
                Ok(progress)
            }
            Err(e) if e.is_no_rows() => {
                info!("no progress row for tutorial yet, inserting a completed one");
                self.tutorial_progress_repo
                    .insert_completed(user_id, tutorial_id, now)
                    .await
                    .inspect_err(|e| error!("insert completed tutorial progress: {e}"))
            }
            Err(e) => {
                error!("update tutorial progress: {e}");
                Err(e)
            }
        }
    }

    async fn tutorial_summary(&self, user_id: UserId) -> Result<ProgressSummary, GatewayError> {
        let statuses = self
            .tutorial_progress_repo
            .list_statuses(user_id)
            .await
            .inspect_err(|e| error!("tutorial summary: {e}"))?;
        Ok(ProgressSummary::from_statuses(&statuses))
    }

    async fn submit_quiz(
        &self,
        user_id: UserId,
        quiz_set_id: QuizSetId,
        answers: &[QuizAnswer],
    ) -> Result<QuizOutcome, GatewayError> {
        let key = self
            .quiz_repo
            .answer_key(quiz_set_id)
            .await
            .inspect_err(|e| error!("load answer key: {e}"))?;
        if key.is_empty() {
            error!("quiz set has no questions");
            return Err(GatewayError::NoRows);
        }

        let outcome = QuizOutcome::grade(&key, answers);
        let now = Utc::now();
        let progress = QuizProgress {
            user_id,
            quiz_set_id,
            completed: outcome.passed,
            score: outcome.score,
            total_questions: outcome.total_questions,
            last_attempted_at: now,
            updated_at: Some(now),
        };

        self.quiz_repo
            .upsert_progress(&progress)
            .await
            .inspect_err(|e| error!("save quiz progress: {e}"))?;

        Ok(outcome)
    }

    async fn quiz_progress(
        &self,
        user_id: UserId,
        quiz_set_id: QuizSetId,
    ) -> Result<Option<QuizProgress>, GatewayError> {
        match self.quiz_repo.get_progress(user_id, quiz_set_id).await {
            Ok(progress) => Ok(Some(progress)),
            Err(e) if e.is_no_rows() => Ok(None),
            Err(e) => {
                error!("quiz progress: {e}");
                Err(e)
            }
        }
    }

    async fn quiz_history(&self, user_id: UserId) -> Result<Vec<QuizProgress>, GatewayError> {
        self.quiz_repo
            .list_progress(user_id)
            .await
            .inspect_err(|e| error!("quiz history: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_memory::MemoryGateway;
    use chrono::DateTime;
    use uuid::Uuid;

    fn user() -> UserId {
        UserId(Uuid::from_u128(1))
    }

    fn tutorial(n: u128) -> TutorialId {
        TutorialId(Uuid::from_u128(100 + n))
    }

    fn service(gateway: &Arc<MemoryGateway>) -> RealProgressService {
        RealProgressService::new(gateway.clone(), gateway.clone())
    }

    /// Rejects every write with a permission error.
    struct LockedTutorials;

    #[async_trait::async_trait]
    impl TutorialProgressRepo for LockedTutorials {
        async fn upsert_started(
            &self,
            _: UserId,
            _: TutorialId,
            _: DateTime<Utc>,
        ) -> Result<TutorialProgress, GatewayError> {
            Err(denied())
        }

        async fn update_completed(
            &self,
            _: UserId,
            _: TutorialId,
            _: DateTime<Utc>,
        ) -> Result<TutorialProgress, GatewayError> {
            Err(denied())
        }

        async fn insert_completed(
            &self,
            _: UserId,
            _: TutorialId,
            _: DateTime<Utc>,
        ) -> Result<TutorialProgress, GatewayError> {
            panic!("insert must not follow a non-empty failure")
        }

        async fn list_statuses(&self, _: UserId) -> Result<Vec<TutorialStatus>, GatewayError> {
            Ok(vec![])
        }
    }

    fn denied() -> GatewayError {
        ApiFault::new(403, "permission denied for table tutorial_progress")
            .with_code("42501")
            .into()
    }

    #[tokio::test]
    async fn done_without_start_inserts_completed_row() {
        let gateway = Arc::new(MemoryGateway::default());
        let service = service(&gateway);

        let row = service.mark_tutorial_done(user(), tutorial(1)).await.unwrap();

        assert_eq!(row.status, TutorialStatus::Completed);
        assert_eq!(gateway.calls("tutorial_progress.update"), 1);
        assert_eq!(gateway.calls("tutorial_progress.insert"), 1);
    }

    #[tokio::test]
    async fn done_after_start_updates_in_place() {
        let gateway = Arc::new(MemoryGateway::default());
        let service = service(&gateway);
        service.start_tutorial(user(), tutorial(1)).await.unwrap();

        service.mark_tutorial_done(user(), tutorial(1)).await.unwrap();

        assert_eq!(gateway.calls("tutorial_progress.insert"), 0);
        let summary = service.tutorial_summary(user()).await.unwrap();
        assert_eq!(summary.total_started, 1);
        assert_eq!(summary.total_completed, 1);
        assert_eq!(summary.completion_percentage, 100);
    }

    #[tokio::test]
    async fn other_update_failures_are_not_retried_as_insert() {
        let gateway = Arc::new(MemoryGateway::default());
        let service = RealProgressService::new(Arc::new(LockedTutorials), gateway);

        let err = service
            .mark_tutorial_done(user(), tutorial(1))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("42501"));
    }

    #[tokio::test]
    async fn quiz_without_questions_is_rejected() {
        let gateway = Arc::new(MemoryGateway::default());
        let service = service(&gateway);

        let err = service
            .submit_quiz(user(), QuizSetId(Uuid::from_u128(9)), &[])
            .await
            .unwrap_err();
        assert!(err.is_no_rows());
        assert_eq!(gateway.calls("quiz_progress.upsert"), 0);
    }

    #[tokio::test]
    async fn quiz_attempt_is_recorded() {
        let gateway = Arc::new(MemoryGateway::default());
        let quiz = QuizSetId(Uuid::from_u128(9));
        let key: Vec<AnswerKey> = (1..=5)
            .map(|n| AnswerKey {
                question_id: QuizQuestionId(Uuid::from_u128(n)),
                correct_answer: "yes".into(),
            })
            .collect();
        gateway.seed_quiz(quiz, key.clone());
        let service = service(&gateway);
        assert_eq!(service.quiz_progress(user(), quiz).await.unwrap(), None);

        let answers: Vec<QuizAnswer> = key
            .iter()
            .take(3)
            .map(|k| QuizAnswer {
                question_id: k.question_id,
                answer: "yes".into(),
            })
            .collect();
        let outcome = service.submit_quiz(user(), quiz, &answers).await.unwrap();
        assert_eq!(outcome.score, 3);
        assert!(outcome.passed);

        let saved = service.quiz_progress(user(), quiz).await.unwrap().unwrap();
        assert!(saved.completed);
        assert_eq!(saved.total_questions, 5);
        assert_eq!(service.quiz_history(user()).await.unwrap().len(), 1);
    }
}
