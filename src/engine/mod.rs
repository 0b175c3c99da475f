use crate::config::InputType;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::time::Duration;

pub mod invocation;
pub mod invocation_engine;
pub mod output_parse;
pub mod runner;
pub mod schema;

pub use invocation::{build_invocation, InvocationSpec};
pub use invocation_engine::{InvocationEngine, InvocationResult, InvocationSuccess};
pub use output_parse::coerce_output;
pub use runner::{run_invocation, ProcessInvoker, ScriptRunner};
pub use schema::validate_params;

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Boolean(bool),
    Number(Number),
    Text(String),
    Other(Value),
}

impl ParamValue {
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Bool(flag) => Self::Boolean(flag),
            Value::Number(number) => Self::Number(number),
            Value::String(text) => Self::Text(text),
            other => Self::Other(other),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Boolean(flag) => Value::Bool(*flag),
            Self::Number(number) => Value::Number(number.clone()),
            Self::Text(text) => Value::String(text.clone()),
            Self::Other(value) => value.clone(),
        }
    }

    pub fn matches(&self, expected: InputType) -> bool {
        matches!(
            (self, expected),
            (Self::Boolean(_), InputType::Boolean)
                | (Self::Number(_), InputType::Number)
                | (Self::Text(_), InputType::String)
        )
    }
}

impl Serialize for ParamValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Boolean(flag) => serializer.serialize_bool(*flag),
            Self::Number(number) => number.serialize(serializer),
            Self::Text(text) => serializer.serialize_str(text),
            Self::Other(value) => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ParamValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Self::from_json)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamBundle(BTreeMap<String, ParamValue>);

impl ParamBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(value: Value) -> Result<Self, InvocationError> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::Object(map) => Ok(Self::from_map(map)),
            _ => Err(InvocationError::InvalidRequest(
                "Request body must be a JSON object".to_string(),
            )),
        }
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(
            map.into_iter()
                .map(|(name, value)| (name, ParamValue::from_json(value)))
                .collect(),
        )
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, ParamValue::from_json(value.into()));
        self
    }

    pub fn insert(&mut self, name: &str, value: ParamValue) {
        self.0.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn to_compact_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required parameter: {name}")]
    MissingParameter { name: String },
    #[error("Parameter {name} must be a {expected}")]
    TypeMismatch { name: String, expected: InputType },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessFailure {
    #[error("script timed out after {timeout_seconds}s")]
    Timeout { timeout_seconds: u64 },
    #[error("Script failed with exit code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },
    #[error("failed to start script {path}: {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("io error while running {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode parameters: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type ProcessOutcome = Result<ProcessOutput, ProcessFailure>;

#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    #[error("Function {function_id} not found")]
    NotFound { function_id: String },
    #[error(transparent)]
    InvalidParams(#[from] ValidationError),
    #[error("{0}")]
    InvalidRequest(String),
    #[error("Function execution timed out")]
    ExecutionTimeout {
        function_id: String,
        timeout_seconds: u64,
    },
    #[error("{reason}")]
    ExecutionFailed {
        function_id: String,
        exit_code: Option<i32>,
        reason: String,
    },
    #[error("internal error: {0}")]
    Internal(String),
}

impl InvocationError {
    pub(crate) fn from_process_failure(function_id: &str, failure: ProcessFailure) -> Self {
        let function_id = function_id.to_string();
        match failure {
            ProcessFailure::Timeout { timeout_seconds } => Self::ExecutionTimeout {
                function_id,
                timeout_seconds,
            },
            ProcessFailure::NonZeroExit { code, .. } => Self::ExecutionFailed {
                function_id,
                exit_code: Some(code),
                reason: failure.to_string(),
            },
            ProcessFailure::Spawn { .. } | ProcessFailure::Io { .. } => Self::ExecutionFailed {
                function_id,
                exit_code: None,
                reason: "Script could not be executed".to_string(),
            },
            ProcessFailure::Encode(err) => Self::Internal(err.to_string()),
        }
    }
}
