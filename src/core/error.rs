use thiserror::Error;

#[derive(Error, Debug)]
pub enum ListenerError {
    #[error("WebSocket错误: {0}")]
    WebSocketError(String),

    #[error("JSON序列化错误: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("YAML配置错误: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("环境变量错误: {0}")]
    EnvError(#[from] dotenv::Error),

    #[error("URL解析错误: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("数据解析错误: {0}")]
    DecodeError(String),

    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("持久化错误: {0}")]
    PersistenceError(String),

    #[error("策略处理错误: {0}")]
    HandlerError(String),

    #[error("重连失败: 已达到最大重连次数 {0}")]
    ReconnectExhausted(u32),

    #[error("其他错误: {0}")]
    Other(String),
}

impl ListenerError {
    /// 判断错误是否可以通过重连恢复
    pub fn is_retryable(&self) -> bool {
        match self {
            ListenerError::WebSocketError(_) => true,
            // 单条消息解析失败只需丢弃该消息，不需要重建连接
            ListenerError::DecodeError(_) => false,
            _ => false,
        }
    }

    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ListenerError::DecodeError(_) => ErrorSeverity::Warning,
            ListenerError::WebSocketError(_) => ErrorSeverity::Warning,
            ListenerError::HandlerError(_) => ErrorSeverity::Error,
            ListenerError::PersistenceError(_) => ErrorSeverity::Error,
            ListenerError::ConfigError(_) => ErrorSeverity::Critical,
            ListenerError::EnvError(_) => ErrorSeverity::Critical,
            ListenerError::ReconnectExhausted(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }
}

/// 错误严重程度
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorSeverity {
    Info,     // 信息性错误，通常不影响操作
    Warning,  // 警告性错误，丢弃单条消息或重连即可恢复
    Error,    // 一般错误，需要调用方处理
    Critical, // 严重错误，需要立即处理
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ListenerError::WebSocketError("broken pipe".to_string()).is_retryable());
        assert!(!ListenerError::DecodeError("bad json".to_string()).is_retryable());
        assert!(!ListenerError::ReconnectExhausted(5).is_retryable());
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(
            ListenerError::DecodeError("x".to_string()).severity(),
            ErrorSeverity::Warning
        );
        assert_eq!(
            ListenerError::ConfigError("x".to_string()).severity(),
            ErrorSeverity::Critical
        );
    }
}
