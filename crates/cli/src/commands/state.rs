use std::path::Path;

use formwork_eval::{calculate_formula_value, field_states, EngineConfig};
use formwork_interchange::FieldType;

use crate::{load_data, load_metadata, print_json, OutputFormat};

pub(crate) fn cmd_state(
    metadata_path: &Path,
    data_path: &Path,
    config: &EngineConfig,
    output: OutputFormat,
    quiet: bool,
) {
    let metadata = load_metadata(metadata_path, output, quiet);
    let data = load_data(data_path, output, quiet);

    let rows: Vec<_> = metadata
        .fields
        .iter()
        .zip(field_states(&metadata, &data))
        .map(|(field, (_, state))| {
            let display = match (field.field_type, &field.formula) {
                (FieldType::Calculated, Some(formula)) => {
                    Some(calculate_formula_value(formula, &data, config))
                }
                _ => None,
            };
            (field, state, display)
        })
        .collect();

    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => {
            let fields: Vec<serde_json::Value> = rows
                .iter()
                .map(|(field, state, display)| {
                    let mut entry = serde_json::json!({
                        "name": field.name,
                        "visible": state.visible,
                        "required": state.required,
                        "disabled": state.disabled,
                    });
                    if let Some(d) = display {
                        entry["value"] = serde_json::Value::String(d.clone());
                    }
                    entry
                })
                .collect();
            print_json(&serde_json::json!({ "form": metadata.id, "fields": fields }));
        }
        OutputFormat::Text => {
            let width = rows.iter().map(|(f, _, _)| f.name.len()).max().unwrap_or(0);
            for (field, state, display) in &rows {
                let mut flags = vec![if state.visible { "visible" } else { "hidden" }];
                if state.required {
                    flags.push("required");
                }
                if state.disabled {
                    flags.push("disabled");
                }
                match display {
                    Some(d) => println!("{:width$}  {}  = {}", field.name, flags.join(" "), d),
                    None => println!("{:width$}  {}", field.name, flags.join(" ")),
                }
            }
        }
    }
}
