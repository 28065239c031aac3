//! Page rasterization through poppler's `pdftoppm`.
//!
//! One invocation renders exactly one page (`-f n -l n`) so every page gets
//! its own timeout budget. The child is spawned with `kill_on_drop`, so when
//! the deadline wins the race the dropped wait future takes the process down
//! with it.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::types::{RasterOutcome, RasterizationJob, Rasterizer};
use super::ExtractionError;

/// Rasterizer backed by the `pdftoppm` executable.
pub struct PdftoppmRasterizer {
    program: PathBuf,
}

impl PdftoppmRasterizer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, job: &RasterizationJob) -> Command {
        let page = job.page_number.to_string();
        let mut command = Command::new(&self.program);
        command
            .arg("-png")
            .arg("-r")
            .arg(job.dpi.to_string())
            .arg("-f")
            .arg(&page)
            .arg("-l")
            .arg(&page)
            .arg(&job.pdf_path)
            .arg(job.output_root())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl Rasterizer for PdftoppmRasterizer {
    async fn rasterize(&self, job: &RasterizationJob) -> Result<RasterOutcome, ExtractionError> {
        tokio::fs::create_dir_all(&job.out_dir).await?;

        tracing::debug!(
            page = job.page_number,
            dpi = job.dpi,
            program = %self.program.display(),
            "Starting pdftoppm"
        );

        let child = self
            .command(job)
            .spawn()
            .map_err(|source| ExtractionError::RasterizationSpawn {
                program: self.program.clone(),
                source,
            })?;

        let output = match tokio::time::timeout(job.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(
                    page = job.page_number,
                    timeout_ms = job.timeout.as_millis() as u64,
                    "pdftoppm timed out, process killed"
                );
                return Err(ExtractionError::RasterizationTimeout {
                    page: job.page_number,
                    timeout: job.timeout,
                });
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if !output.status.success() {
            return Err(ExtractionError::RasterizationExit {
                page: job.page_number,
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(RasterOutcome {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr,
        })
    }
}
