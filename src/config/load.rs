use super::{ConfigError, ServiceConfig};
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

pub fn load_service_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let config = ServiceConfig::from_path(path)?;
    config.validate()?;
    Ok(config)
}
