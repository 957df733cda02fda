pub mod error;
pub mod inspection;
pub mod loader;

pub use error::{ConfigError, Result};
pub use inspection::{DataSourceConfig, InspectionConfig, LoggingConfig};
pub use loader::ConfigLoader;
