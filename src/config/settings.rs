use super::ConfigError;
use crate::shared::validate_identifier_value;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const PLACEHOLDER_API_KEY: &str = "your-secret-key-here";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    #[default]
    String,
    Number,
    Boolean,
}

impl InputType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

impl std::fmt::Display for InputType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnFormat {
    #[default]
    Text,
    Json,
}

impl ReturnFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }

    // Anything other than `json` is treated as plain text.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

impl<'de> Deserialize<'de> for ReturnFormat {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

impl Serialize for ReturnFormat {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct InputSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub input_type: InputType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionSpec {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "script")]
    pub script_path: PathBuf,
    #[serde(rename = "timeout", default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub return_format: ReturnFormat,
    #[serde(default)]
    pub inputs: Vec<InputSpec>,
}

impl FunctionSpec {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        validate_identifier_value("function id", &self.id).map_err(ConfigError::Validation)?;
        if self.script_path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(format!(
                "function `{}` must declare a `script`",
                self.id
            )));
        }
        if self.timeout_seconds == 0 {
            return Err(ConfigError::Validation(format!(
                "function `{}` `timeout` must be greater than zero",
                self.id
            )));
        }

        let mut names = HashSet::new();
        for input in &self.inputs {
            if input.name.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "function `{}` has an input with an empty `name`",
                    self.id
                )));
            }
            if !names.insert(input.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "function `{}` declares input `{}` more than once",
                    self.id, input.name
                )));
            }
        }
        Ok(())
    }
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceSection {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceConfig {
    pub service: ServiceSection,
    #[serde(default)]
    pub functions: Vec<FunctionSpec>,
}

impl ServiceConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut config: Self = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        if let Some(base) = path.parent() {
            config.resolve_script_paths(base);
        }
        Ok(config)
    }

    pub fn resolve_script_paths(&mut self, base: &Path) {
        for function in &mut self.functions {
            if function.script_path.is_relative() {
                function.script_path = base.join(&function.script_path);
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "`service.name` must be non-empty".to_string(),
            ));
        }
        if self.service.api_key.trim().is_empty() {
            return Err(ConfigError::Validation(
                "`service.api_key` is not configured".to_string(),
            ));
        }

        let mut ids = HashSet::new();
        for function in &self.functions {
            function.validate()?;
            if !ids.insert(function.id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "function id `{}` is declared more than once",
                    function.id
                )));
            }
        }
        Ok(())
    }

    pub fn function(&self, function_id: &str) -> Option<&FunctionSpec> {
        self.functions.iter().find(|f| f.id == function_id)
    }

    pub fn uses_placeholder_api_key(&self) -> bool {
        self.service.api_key == PLACEHOLDER_API_KEY
    }
}
