use crate::config::FunctionSpec;
use crate::engine::output_parse::coerce_output;
use crate::engine::runner::{ProcessInvoker, ScriptRunner};
use crate::engine::schema::validate_params;
use crate::engine::{InvocationError, ParamBundle};
use crate::shared::now_iso8601;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct InvocationSuccess {
    pub function_id: String,
    pub payload: Value,
    pub timestamp: String,
}

pub type InvocationResult = Result<InvocationSuccess, InvocationError>;

#[derive(Clone)]
pub struct InvocationEngine {
    functions: Arc<[FunctionSpec]>,
    invoker: Arc<dyn ProcessInvoker>,
}

impl std::fmt::Debug for InvocationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationEngine")
            .field("functions", &self.functions)
            .finish_non_exhaustive()
    }
}

impl InvocationEngine {
    pub fn new(functions: Vec<FunctionSpec>) -> Self {
        Self::with_invoker(functions, Arc::new(ScriptRunner))
    }

    pub fn with_invoker(functions: Vec<FunctionSpec>, invoker: Arc<dyn ProcessInvoker>) -> Self {
        Self {
            functions: functions.into(),
            invoker,
        }
    }

    pub fn functions(&self) -> &[FunctionSpec] {
        &self.functions
    }

    pub fn lookup(&self, function_id: &str) -> Result<&FunctionSpec, InvocationError> {
        self.functions
            .iter()
            .find(|spec| spec.id == function_id)
            .ok_or_else(|| InvocationError::NotFound {
                function_id: function_id.to_string(),
            })
    }

    pub fn invoke(&self, function_id: &str, params: &ParamBundle) -> InvocationResult {
        let spec = self.lookup(function_id)?;
        self.execute(spec, params)
    }

    pub fn execute(&self, spec: &FunctionSpec, params: &ParamBundle) -> InvocationResult {
        validate_params(spec, params)?;

        let output = self
            .invoker
            .invoke(spec, params)
            .map_err(|failure| InvocationError::from_process_failure(&spec.id, failure))?;

        Ok(InvocationSuccess {
            function_id: spec.id.clone(),
            payload: coerce_output(&output.stdout, spec.return_format),
            timestamp: now_iso8601(),
        })
    }
}
