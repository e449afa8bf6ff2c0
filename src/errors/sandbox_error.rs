use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SandboxErrorKind {
    InvalidParams,
    InvalidPayload,
    Parse,
    NotFound,
    Busy,
    Timeout,
    Internal,
}

#[derive(Debug, Clone, Serialize)]
pub struct SandboxError {
    pub kind: SandboxErrorKind,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl SandboxError {
    pub fn new(kind: SandboxErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            hint: None,
            details: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(SandboxErrorKind::InvalidParams, "INVALID_PARAMS", message)
    }

    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::new(SandboxErrorKind::InvalidPayload, "INVALID_PAYLOAD", message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(SandboxErrorKind::Parse, "PARSE", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(SandboxErrorKind::NotFound, "NOT_FOUND", message)
    }

    pub fn busy(message: impl Into<String>) -> Self {
        Self::new(SandboxErrorKind::Busy, "BUSY", message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(SandboxErrorKind::Timeout, "TIMEOUT", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(SandboxErrorKind::Internal, "INTERNAL", message)
    }
}

impl fmt::Display for SandboxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for SandboxError {}
