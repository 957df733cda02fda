use config::{Config, Environment, File};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;
use crate::InspectionConfig;

/// 环境变量前缀，例如 INSPECT_PROJECT_NAME、INSPECT_LOGGING__LEVEL
pub const ENV_PREFIX: &str = "INSPECT";

/// 配置加载器
pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    /// 创建配置加载器，文件格式由扩展名决定（yaml / toml / json）
    pub fn new<P: AsRef<Path>>(config_path: P) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
        }
    }

    /// 加载并校验配置
    pub fn load(&self) -> Result<InspectionConfig> {
        let config = self.load_unchecked()?;
        config.validate()?;

        info!(
            path = %self.config_path.display(),
            project = %config.project_name,
            metric_types = config.metric_types.len(),
            metrics = config.metric_count(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// 加载配置但不校验
    pub fn load_unchecked(&self) -> Result<InspectionConfig> {
        if !self.config_path.exists() {
            // 如果配置文件不存在，返回默认配置
            info!(path = %self.config_path.display(), "Config file not found, using defaults");
            return Ok(InspectionConfig::default());
        }

        let config = Config::builder()
            .add_source(File::from(self.config_path.as_path()))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
