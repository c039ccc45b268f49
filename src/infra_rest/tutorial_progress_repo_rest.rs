use super::client::RestClient;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct StatusRow {
    status: TutorialStatus,
}

pub struct RestTutorialProgressRepo {
    client: RestClient,
}

impl RestTutorialProgressRepo {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl TutorialProgressRepo for RestTutorialProgressRepo {
    async fn upsert_started(
        &self,
        user_id: UserId,
        tutorial_id: TutorialId,
        at: DateTime<Utc>,
    ) -> Result<TutorialProgress, GatewayError> {
        self.client
            .from("tutorial_progress")
            .on_conflict("user_id,tutorial_id")
            .single()
            .upsert(&json!({
                "user_id": user_id,
                "tutorial_id": tutorial_id,
                "status": TutorialStatus::Started,
                "last_watched_at": at,
            }))
            .await
    }

    async fn update_completed(
        &self,
        user_id: UserId,
        tutorial_id: TutorialId,
        at: DateTime<Utc>,
    ) -> Result<TutorialProgress, GatewayError> {
        self.client
            .from("tutorial_progress")
            .eq("user_id", user_id)
            .eq("tutorial_id", tutorial_id)
            .single()
            .update(&json!({
                "status": TutorialStatus::Completed,
                "last_watched_at": at,
                "updated_at": at,
            }))
            .await
    }

    async fn insert_completed(
        &self,
        user_id: UserId,
        tutorial_id: TutorialId,
        at: DateTime<Utc>,
    ) -> Result<TutorialProgress, GatewayError> {
        self.client
            .from("tutorial_progress")
            .single()
            .insert(&json!({
                "user_id": user_id,
                "tutorial_id": tutorial_id,
                "status": TutorialStatus::Completed,
                "last_watched_at": at,
            }))
            .await
    }

    async fn list_statuses(&self, user_id: UserId) -> Result<Vec<TutorialStatus>, GatewayError> {
        let rows: Vec<StatusRow> = self
            .client
            .from("tutorial_progress")
            .select("status")
            .eq("user_id", user_id)
            .fetch()
            .await?;
        Ok(rows.into_iter().map(|r| r.status).collect())
    }
}
