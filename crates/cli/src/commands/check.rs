use std::path::Path;
use std::process;

use formwork_eval::{check_metadata, has_errors, MetadataIssue};

use crate::{print_json, read_json, report_error, OutputFormat};

static FORM_SCHEMA_STR: &str = include_str!("../../../../schema/form-metadata.schema.json");

/// Schema validation, then decoding, then integrity checks. Exits 1 on
/// the first stage that reports errors; warnings alone pass.
pub(crate) fn cmd_check(path: &Path, output: OutputFormat, quiet: bool) {
    let doc = read_json(path, output, quiet);

    // Step 1: JSON Schema
    let schema: serde_json::Value = match serde_json::from_str(FORM_SCHEMA_STR) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("internal error: failed to parse embedded schema: {}", e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    let validator = match jsonschema::validator_for(&schema) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("internal error: failed to compile schema: {}", e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    let schema_errors: Vec<String> = validator.iter_errors(&doc).map(|e| e.to_string()).collect();
    if !schema_errors.is_empty() {
        report_failure("schema", &schema_errors, output, quiet);
        process::exit(1);
    }

    // Step 2: typed decode
    let metadata = match formwork_interchange::from_interchange(&doc) {
        Ok(m) => m,
        Err(e) => {
            report_failure("decode", &[e.to_string()], output, quiet);
            process::exit(1);
        }
    };

    // Step 3: integrity
    let issues = check_metadata(&metadata);
    let failed = has_errors(&issues);
    if !quiet || failed {
        print_issues(&metadata.id, &issues, failed, output, quiet);
    }
    if failed {
        process::exit(1);
    }
}

fn report_failure(stage: &str, errors: &[String], output: OutputFormat, quiet: bool) {
    match output {
        OutputFormat::Text => {
            if !quiet {
                eprintln!("invalid form metadata ({})", stage);
                for err in errors {
                    eprintln!("  - {}", err);
                }
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "valid": false,
                "stage": stage,
                "errors": errors,
            });
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&json).unwrap_or_default()
            );
        }
    }
}

fn print_issues(
    form_id: &str,
    issues: &[MetadataIssue],
    failed: bool,
    output: OutputFormat,
    quiet: bool,
) {
    match output {
        OutputFormat::Json => {
            print_json(&serde_json::json!({
                "valid": !failed,
                "form": form_id,
                "issues": issues,
            }));
        }
        OutputFormat::Text => {
            if quiet {
                for issue in issues {
                    eprintln!("{}", issue);
                }
                return;
            }
            for issue in issues {
                println!("{}", issue);
            }
            if failed {
                println!("form '{}' has errors", form_id);
            } else if issues.is_empty() {
                println!("form '{}' ok", form_id);
            } else {
                println!("form '{}' ok ({} warning(s))", form_id, issues.len());
            }
        }
    }
}
