pub mod error;
pub mod load;
pub mod settings;

pub use error::ConfigError;
pub use load::{load_service_config, DEFAULT_CONFIG_PATH};
pub use settings::{
    FunctionSpec, InputSpec, InputType, ReturnFormat, ServiceConfig, ServiceSection,
    PLACEHOLDER_API_KEY,
};
