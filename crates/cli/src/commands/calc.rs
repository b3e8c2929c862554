use std::path::Path;
use std::process;

use formwork_eval::numeric;
use formwork_eval::{evaluate_formula, EngineConfig, FormData, Value};

use crate::{load_data, print_json, report_error, OutputFormat};

/// Unlike a calculated field, a failing formula here is an error, not a
/// placeholder.
pub(crate) fn cmd_calc(
    formula: &str,
    data_path: Option<&Path>,
    config: &EngineConfig,
    output: OutputFormat,
    quiet: bool,
) {
    let data = match data_path {
        Some(p) => load_data(p, output, quiet),
        None => FormData::new(),
    };

    let value = match evaluate_formula(formula, &data) {
        Ok(v) => v,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    };
    let text = match &value {
        Value::Number(d) => numeric::format(*d, config.decimal_places),
        other => other.to_string(),
    };

    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => println!("{}", text),
        OutputFormat::Json => print_json(&serde_json::json!({
            "formula": formula,
            "value": text,
        })),
    }
}
