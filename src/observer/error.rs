use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObserverErrorCode {
    InvalidArgument,
    InvalidConfig,
    MissingScriptNode,
    ProxyUnavailable,
    ProxyFailure,
    Internal,
}

impl ObserverErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObserverErrorCode::InvalidArgument => "observer/invalid-argument",
            ObserverErrorCode::InvalidConfig => "observer/invalid-config",
            ObserverErrorCode::MissingScriptNode => "observer/missing-script-node",
            ObserverErrorCode::ProxyUnavailable => "observer/proxy-unavailable",
            ObserverErrorCode::ProxyFailure => "observer/proxy-failure",
            ObserverErrorCode::Internal => "observer/internal",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ObserverError {
    pub code: ObserverErrorCode,
    message: String,
}

impl ObserverError {
    pub fn new(code: ObserverErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for ObserverError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl std::error::Error for ObserverError {}

pub type ObserverResult<T> = Result<T, ObserverError>;

pub fn invalid_argument(message: impl Into<String>) -> ObserverError {
    ObserverError::new(ObserverErrorCode::InvalidArgument, message)
}

pub fn invalid_config(message: impl Into<String>) -> ObserverError {
    ObserverError::new(ObserverErrorCode::InvalidConfig, message)
}

pub fn missing_script_node(message: impl Into<String>) -> ObserverError {
    ObserverError::new(ObserverErrorCode::MissingScriptNode, message)
}

pub fn proxy_unavailable(message: impl Into<String>) -> ObserverError {
    ObserverError::new(ObserverErrorCode::ProxyUnavailable, message)
}

pub fn proxy_failure(message: impl Into<String>) -> ObserverError {
    ObserverError::new(ObserverErrorCode::ProxyFailure, message)
}

pub fn internal_error(message: impl Into<String>) -> ObserverError {
    ObserverError::new(ObserverErrorCode::Internal, message)
}
