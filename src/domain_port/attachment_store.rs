use crate::application_port::*;
use crate::domain_model::*;

#[async_trait::async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn upload(&self, path: &ObjectPath, attachment: &Attachment) -> Result<(), GatewayError>;
    fn public_url(&self, path: &ObjectPath) -> String;
}
