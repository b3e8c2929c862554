use std::path::Path;
use std::process;

use formwork_eval::validate_form_data;

use crate::{load_data, load_metadata, print_json, OutputFormat};

/// Exits 1 when any field fails.
pub(crate) fn cmd_validate(metadata_path: &Path, data_path: &Path, output: OutputFormat, quiet: bool) {
    let metadata = load_metadata(metadata_path, output, quiet);
    let data = load_data(data_path, output, quiet);
    let result = validate_form_data(&metadata, &data);

    match output {
        OutputFormat::Json => {
            if !quiet || !result.valid {
                print_json(&result.to_json());
            }
        }
        OutputFormat::Text => {
            if result.valid {
                if !quiet {
                    println!("valid");
                }
            } else if !quiet {
                println!("invalid ({} field error(s))", result.errors.len());
                for (name, err) in &result.errors {
                    println!("  - {} [{}]: {}", name, err.error.kind(), err.message);
                }
            }
        }
    }

    if !result.valid {
        process::exit(1);
    }
}
