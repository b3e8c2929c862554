//! File-backed submitter: each accepted submission becomes one JSON line.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use formwork_eval::{FormData, FormSubmitter, SubmissionError, SubmissionReceipt};

/// References number the lines of the file. The count is taken from disk
/// on the first submission only and kept in memory after that.
pub(crate) struct OutboxSubmitter {
    path: PathBuf,
    written: Mutex<Option<usize>>,
}

impl OutboxSubmitter {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        OutboxSubmitter {
            path: path.into(),
            written: Mutex::new(None),
        }
    }

    async fn existing_lines(&self) -> Result<usize, SubmissionError> {
        let file = match tokio::fs::File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(self.transport(e)),
        };
        let mut lines = BufReader::new(file).lines();
        let mut count = 0;
        while let Some(line) = lines.next_line().await.map_err(|e| self.transport(e))? {
            if !line.trim().is_empty() {
                count += 1;
            }
        }
        Ok(count)
    }

    fn transport(&self, e: std::io::Error) -> SubmissionError {
        SubmissionError::Transport {
            message: format!("{}: {}", self.path.display(), e),
        }
    }
}

#[async_trait]
impl FormSubmitter for OutboxSubmitter {
    async fn submit(
        &self,
        form_id: &str,
        data: &FormData,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let mut written = self.written.lock().await;
        let count = match *written {
            Some(n) => n,
            None => self.existing_lines().await?,
        };
        let reference = format!("{}-{}", form_id, count + 1);
        let line = serde_json::json!({
            "reference": reference,
            "form": form_id,
            "data": data,
        });
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.transport(e))?;
        file.write_all(format!("{}\n", line).as_bytes())
            .await
            .map_err(|e| self.transport(e))?;
        file.flush().await.map_err(|e| self.transport(e))?;
        *written = Some(count + 1);
        Ok(SubmissionReceipt { reference })
    }
}
