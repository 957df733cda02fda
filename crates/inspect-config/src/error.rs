use thiserror::Error;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件读取或解析失败
    #[error("Failed to load config: {0}")]
    Load(#[from] config::ConfigError),

    /// 配置校验失败
    #[error("Invalid config: {0}")]
    Validation(String),

    /// 请求的数据源未配置
    #[error("Datasource '{0}' not found")]
    DatasourceNotFound(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

impl ConfigError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ConfigError::Validation(msg.into())
    }
}
