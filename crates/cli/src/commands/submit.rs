use std::path::Path;
use std::process;

use formwork_eval::{DirectoryRegistry, EngineConfig, FormSession, SubmitError};

use crate::outbox::OutboxSubmitter;
use crate::{load_data, print_json, report_error, OutputFormat};

pub(crate) fn cmd_submit(
    form_id: &str,
    registry_dir: &Path,
    data_path: &Path,
    outbox_path: &Path,
    config: EngineConfig,
    output: OutputFormat,
    quiet: bool,
) {
    let data = load_data(data_path, output, quiet);
    let registry = DirectoryRegistry::new(registry_dir);
    let submitter = OutboxSubmitter::new(outbox_path);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            report_error(&format!("failed to create tokio runtime: {}", e), output, quiet);
            process::exit(1);
        }
    };

    let outcome = rt.block_on(async {
        let session = FormSession::open(&registry, form_id, config).await;
        match session {
            Ok(session) => Ok(session.with_data(data).submit(&submitter).await),
            Err(e) => Err(e),
        }
    });

    match outcome {
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
        Ok(Ok(receipt)) => {
            if !quiet {
                match output {
                    OutputFormat::Text => println!("submitted {}", receipt.reference),
                    OutputFormat::Json => print_json(&serde_json::json!({
                        "submitted": true,
                        "reference": receipt.reference,
                    })),
                }
            }
        }
        Ok(Err(SubmitError::Invalid(result))) => {
            match output {
                OutputFormat::Json => print_json(&result.to_json()),
                OutputFormat::Text => {
                    if !quiet {
                        eprintln!("not submitted: {} field error(s)", result.errors.len());
                        for (name, err) in &result.errors {
                            eprintln!("  - {}: {}", name, err.message);
                        }
                    }
                }
            }
            process::exit(1);
        }
        Ok(Err(SubmitError::Rejected(e))) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}
