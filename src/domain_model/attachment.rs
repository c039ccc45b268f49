use crate::domain_model::*;
use std::fmt;
use std::path::Path;

const FALLBACK_EXTENSION: &str = "bin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(file_name, bytes))
    }

    /// Text after the last dot (a name without a dot is used whole), reduced
    /// to ASCII letters and digits so it cannot add path, query or fragment
    /// parts to the object key. `bin` when nothing is left.
    pub fn extension(&self) -> String {
        let raw = self.file_name.rsplit('.').next().unwrap_or_default();
        let safe: String = raw.chars().filter(char::is_ascii_alphanumeric).collect();
        if safe.is_empty() {
            FALLBACK_EXTENSION.to_owned()
        } else {
            safe
        }
    }

    pub fn content_type(&self) -> String {
        mime_guess::from_path(&self.file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_owned()
    }
}

/// Object key inside the attachment bucket: `{user_id}/{unix_millis}.{ext}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectPath(String);

impl ObjectPath {
    pub fn for_upload(user_id: UserId, unix_millis: i64, extension: &str) -> Self {
        Self(format!("{}/{}.{}", user_id, unix_millis, extension))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
