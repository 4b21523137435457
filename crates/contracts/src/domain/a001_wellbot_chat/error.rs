use thiserror::Error;

/// Ошибки обмена с бэкендом чата
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("network error: {0}")]
    Network(String),
    #[error("server returned HTTP {0}")]
    Status(u16),
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("request timed out after {0} ms")]
    Timeout(u32),
    #[error("failed to build request: {0}")]
    Request(String),
}

impl ChatError {
    /// Только для диагностики: повторов отправки нет
    pub fn is_retryable(&self) -> bool {
        match self {
            ChatError::Network(_) | ChatError::Timeout(_) => true,
            ChatError::Status(code) => *code >= 500,
            ChatError::Decode(_) | ChatError::Request(_) => false,
        }
    }
}
