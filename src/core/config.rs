use serde::{Deserialize, Serialize};
use std::fs;
use url::Url;

use crate::core::error::ListenerError;

/// 行情源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// 行情源WebSocket地址
    pub endpoint: String,
    /// API密钥所在的环境变量名
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

fn default_token_env() -> String {
    "FINNHUB_API_KEY".to_string()
}

impl FeedConfig {
    /// 拼接带token参数的完整连接地址
    pub fn connect_url(&self, credentials: &FeedCredentials) -> Result<String, ListenerError> {
        let mut url = Url::parse(&self.endpoint)?;
        url.query_pairs_mut().append_pair("token", &credentials.token);
        Ok(url.to_string())
    }
}

/// 重连配置（指数退避）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// 初始延迟（毫秒）
    pub initial_delay_ms: u64,
    /// 最大延迟（毫秒）
    pub max_delay_ms: u64,
    /// 指数退避因子
    pub backoff_factor: f64,
    /// 是否添加抖动
    pub jitter: bool,
    /// 最大重连次数，不配置则无限重试
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            backoff_factor: 2.0,
            jitter: true,
            max_attempts: None,
        }
    }
}

/// 全局配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub feed: FeedConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "INFO".to_string()
}

impl GlobalConfig {
    /// 从YAML文件加载配置
    pub fn from_file(path: &str) -> Result<Self, ListenerError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ListenerError::ConfigError(format!("读取配置文件失败: {}", e)))?;

        let config: GlobalConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }
}

/// 行情源API凭证
#[derive(Debug, Clone)]
pub struct FeedCredentials {
    pub token: String,
}

impl FeedCredentials {
    /// 从环境变量加载凭证
    pub fn from_env(var: &str) -> Result<Self, ListenerError> {
        dotenv::dotenv().ok(); // 加载.env文件，忽略错误

        let token = std::env::var(var)
            .map_err(|_| ListenerError::ConfigError(format!("未找到{}环境变量", var)))?;

        if token.is_empty() {
            return Err(ListenerError::ConfigError(format!("{}环境变量为空", var)));
        }

        Ok(FeedCredentials { token })
    }
}
