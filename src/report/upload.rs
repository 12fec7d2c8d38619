//! Report upload via `scp`.

use std::path::Path;
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("scp exited with status {status}: {stderr}")]
    Failed { status: i32, stderr: String },
}

pub(crate) fn scp_command(program: &str, file: &Path, target: &str) -> Command {
    let mut command = Command::new(program);
    command
        .args(["-q", "-o", "BatchMode=yes"])
        .arg(file)
        .arg(target)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    command
}

/// Copy `file` to `target` (an scp destination such as `host:/dir/`).
pub async fn upload(program: &str, file: &Path, target: &str) -> Result<(), UploadError> {
    let output = scp_command(program, file, target)
        .output()
        .await
        .map_err(|source| UploadError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(UploadError::Failed {
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    tracing::info!(file = %file.display(), target, "Report uploaded");
    Ok(())
}
