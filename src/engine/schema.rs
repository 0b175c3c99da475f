use crate::config::FunctionSpec;
use crate::engine::{ParamBundle, ValidationError};

pub fn validate_params(spec: &FunctionSpec, params: &ParamBundle) -> Result<(), ValidationError> {
    for input in &spec.inputs {
        match params.get(&input.name) {
            None if input.required => {
                return Err(ValidationError::MissingParameter {
                    name: input.name.clone(),
                })
            }
            Some(value) if !value.matches(input.input_type) => {
                return Err(ValidationError::TypeMismatch {
                    name: input.name.clone(),
                    expected: input.input_type,
                })
            }
            _ => {}
        }
    }
    Ok(())
}
