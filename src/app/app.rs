use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_rest::*;
use crate::logger::*;
use crate::settings::Settings;
use anyhow::anyhow;
use std::sync::Arc;
use std::time::Duration;

/// Services wired against the configured gateway, acting for one user.
pub struct App {
    pub chat_service: Arc<dyn ChatService>,
    pub progress_service: Arc<dyn ProgressService>,
    pub user_id: UserId,
}

struct Ports {
    chat_repo: Arc<dyn ChatRepo>,
    message_repo: Arc<dyn MessageRepo>,
    message_status_repo: Arc<dyn MessageStatusRepo>,
    attachment_store: Arc<dyn AttachmentStore>,
    message_feed: Arc<dyn MessageFeed>,
    tutorial_progress_repo: Arc<dyn TutorialProgressRepo>,
    quiz_repo: Arc<dyn QuizRepo>,
}

impl Ports {
    fn memory(gateway: Arc<MemoryGateway>) -> Self {
        Self {
            chat_repo: gateway.clone(),
            message_repo: gateway.clone(),
            message_status_repo: gateway.clone(),
            attachment_store: gateway.clone(),
            message_feed: gateway.clone(),
            tutorial_progress_repo: gateway.clone(),
            quiz_repo: gateway,
        }
    }

    fn remote(client: RestClient, bucket: &str) -> Self {
        Self {
            chat_repo: Arc::new(RestChatRepo::new(client.clone())),
            message_repo: Arc::new(RestMessageRepo::new(client.clone())),
            message_status_repo: Arc::new(RestMessageStatusRepo::new(client.clone())),
            attachment_store: Arc::new(RestAttachmentStore::new(client.clone(), bucket)),
            message_feed: Arc::new(RealtimeMessageFeed::new(client.clone())),
            tutorial_progress_repo: Arc::new(RestTutorialProgressRepo::new(client.clone())),
            quiz_repo: Arc::new(RestQuizRepo::new(client)),
        }
    }
}

impl App {
    pub fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let user_id = settings.session.user_id;

        let ports = match settings.gateway.backend.as_str() {
            "memory" => {
                let gateway = Arc::new(MemoryGateway::new(settings.gateway.bucket.clone()));
                let name = settings.session.name.as_deref().unwrap_or("Me");
                gateway.register_user(user_id, name);
                Ports::memory(gateway)
            }
            "remote" => {
                if settings.gateway.url.is_empty() || settings.gateway.api_key.is_empty() {
                    return Err(anyhow!("remote gateway needs both url and api_key"));
                }
                let client = RestClient::new(&GatewayConfig {
                    url: settings.gateway.url.clone(),
                    api_key: settings.gateway.api_key.clone(),
                    access_token: settings.gateway.access_token.clone(),
                    timeout: Duration::from_secs(settings.gateway.timeout_secs),
                })?;
                Ports::remote(client, &settings.gateway.bucket)
            }
            other => return Err(anyhow!("Unknown gateway backend: {}", other)),
        };
        info!(
            "gateway backend {} for user {user_id}",
            settings.gateway.backend
        );

        Ok(Self::with_ports(ports, user_id))
    }

    /// Wires the services over an existing in-process gateway.
    pub fn with_memory_gateway(gateway: Arc<MemoryGateway>, user_id: UserId) -> Self {
        Self::with_ports(Ports::memory(gateway), user_id)
    }

    fn with_ports(ports: Ports, user_id: UserId) -> Self {
        let chat_service: Arc<dyn ChatService> = Arc::new(RealChatService::new(
            ports.chat_repo,
            ports.message_repo,
            ports.message_status_repo,
            ports.attachment_store,
            ports.message_feed,
        ));
        let progress_service: Arc<dyn ProgressService> = Arc::new(RealProgressService::new(
            ports.tutorial_progress_repo,
            ports.quiz_repo,
        ));

        Self {
            chat_service,
            progress_service,
            user_id,
        }
    }
}
