use crate::config::ReturnFormat;
use serde_json::{json, Value};
use tracing::warn;

pub fn coerce_output(raw_stdout: &str, format: ReturnFormat) -> Value {
    let output = raw_stdout.trim();
    match format {
        ReturnFormat::Text => json!({ "output": output }),
        ReturnFormat::Json => match serde_json::from_str::<Value>(output) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(error = %err, output, "expected json output, returning raw text");
                json!({ "rawOutput": output })
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_output_is_trimmed_and_wrapped() {
        assert_eq!(
            coerce_output("  hello  \n", ReturnFormat::Text),
            json!({"output": "hello"})
        );
    }

    #[test]
    fn json_output_is_returned_as_parsed_structure() {
        assert_eq!(
            coerce_output("{\"a\":1}\n", ReturnFormat::Json),
            json!({"a": 1})
        );
        assert_eq!(coerce_output(" [1,2] ", ReturnFormat::Json), json!([1, 2]));
    }

    #[test]
    fn invalid_json_degrades_to_raw_output() {
        assert_eq!(
            coerce_output("not-json", ReturnFormat::Json),
            json!({"rawOutput": "not-json"})
        );
        assert_eq!(
            coerce_output("", ReturnFormat::Json),
            json!({"rawOutput": ""})
        );
    }
}
