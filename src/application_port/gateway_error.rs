use serde_json::Value;
use std::fmt;

/// Gateway code for "the request expected one row and got none".
pub const NO_ROWS_CODE: &str = "PGRST116";

/// Rejection reported by the gateway, with the optional fields it may attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFault {
    pub status: u16,
    pub message: String,
    pub code: Option<String>,
    pub details: Option<String>,
    pub hint: Option<String>,
}

impl ApiFault {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: None,
            details: None,
            hint: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Reads a rejection body. Table errors use `message`/`code`/`details`/`hint`,
    /// storage errors use `error`/`message`/`statusCode`, auth errors use `msg`.
    pub fn from_body(status: u16, body: &[u8]) -> Self {
        let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(body) else {
            let text = String::from_utf8_lossy(body).trim().to_owned();
            return Self::new(status, text);
        };

        let text = |key: &str| -> Option<String> {
            match map.get(key)? {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            }
        };

        let message = text("message")
            .or_else(|| text("msg"))
            .or_else(|| text("error"))
            .unwrap_or_default();
        let code = text("code").or_else(|| text("error_code"));

        Self {
            status,
            message,
            code,
            details: text("details"),
            hint: text("hint"),
        }
    }
}

impl fmt::Display for ApiFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.message)?;
        if let Some(code) = &self.code {
            write!(f, " (code {code})")?;
        }
        if let Some(details) = &self.details {
            write!(f, "; details: {details}")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "; hint: {hint}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("gateway rejected request: {0}")]
    Api(ApiFault),
    #[error("no rows returned")]
    NoRows,
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn is_no_rows(&self) -> bool {
        match self {
            GatewayError::NoRows => true,
            GatewayError::Api(fault) => fault.code.as_deref() == Some(NO_ROWS_CODE),
            _ => false,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            GatewayError::Api(fault) => fault.code.as_deref(),
            GatewayError::NoRows => Some(NO_ROWS_CODE),
            _ => None,
        }
    }

    pub fn hint(&self) -> Option<&str> {
        match self {
            GatewayError::Api(fault) => fault.hint.as_deref(),
            _ => None,
        }
    }
}

impl From<ApiFault> for GatewayError {
    fn from(fault: ApiFault) -> Self {
        GatewayError::Api(fault)
    }
}
