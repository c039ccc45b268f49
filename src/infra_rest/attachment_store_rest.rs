use super::client::RestClient;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;

pub struct RestAttachmentStore {
    client: RestClient,
    bucket: String,
}

impl RestAttachmentStore {
    pub fn new(client: RestClient, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait::async_trait]
impl AttachmentStore for RestAttachmentStore {
    async fn upload(&self, path: &ObjectPath, attachment: &Attachment) -> Result<(), GatewayError> {
        self.client
            .upload_object(
                &self.bucket,
                path.as_str(),
                attachment.bytes.clone(),
                &attachment.content_type(),
            )
            .await
    }

    fn public_url(&self, path: &ObjectPath) -> String {
        self.client.public_object_url(&self.bucket, path.as_str())
    }
}
