use crate::config::FunctionSpec;
use crate::engine::{ParamBundle, ProcessFailure};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl InvocationSpec {
    pub fn command_form(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

pub fn build_invocation(
    spec: &FunctionSpec,
    params: &ParamBundle,
) -> Result<InvocationSpec, ProcessFailure> {
    let mut args = Vec::new();
    if !params.is_empty() {
        args.push(params.to_compact_json()?);
    }
    Ok(InvocationSpec {
        program: spec.script_path.clone(),
        args,
        timeout: spec.timeout(),
    })
}
