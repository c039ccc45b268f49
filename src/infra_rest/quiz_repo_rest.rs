use super::client::RestClient;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;

pub struct RestQuizRepo {
    client: RestClient,
}

impl RestQuizRepo {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl QuizRepo for RestQuizRepo {
    async fn answer_key(&self, quiz_set_id: QuizSetId) -> Result<Vec<AnswerKey>, GatewayError> {
        self.client
            .from("quiz_questions")
            .select("id,correct_answer")
            .eq("quiz_set_id", quiz_set_id)
            .fetch()
            .await
    }

    async fn upsert_progress(&self, progress: &QuizProgress) -> Result<(), GatewayError> {
        self.client
            .from("quiz_progress")
            .on_conflict("user_id,quiz_set_id")
            .upsert_quietly(progress)
            .await
    }

    async fn get_progress(
        &self,
        user_id: UserId,
        quiz_set_id: QuizSetId,
    ) -> Result<QuizProgress, GatewayError> {
        self.client
            .from("quiz_progress")
            .select("*")
            .eq("user_id", user_id)
            .eq("quiz_set_id", quiz_set_id)
            .single()
            .fetch()
            .await
    }

    async fn list_progress(&self, user_id: UserId) -> Result<Vec<QuizProgress>, GatewayError> {
        self.client
            .from("quiz_progress")
            .select("*")
            .eq("user_id", user_id)
            .order("last_attempted_at.desc")
            .fetch()
            .await
    }
}
