//! Runs the operator's restart command inside a server directory.

use std::{
    io::Read,
    path::Path,
    process::{Child, Command, Stdio},
};

use tracing::{debug, warn};

use crate::error::CoreError;

const SHELL: &str = "sh";

/// Run `cd <server_path> && <command>` through `sh -c` and wait for it.
///
/// Stderr is drained to completion before the exit status is collected. A failing command
/// surfaces its stderr text when there is any, otherwise the exit status. Stderr produced by
/// a successful command is discarded. There is no timeout.
pub fn restart(server_path: &Path, command: &str) -> Result<(), CoreError> {
    let script = shell_line(server_path, command);
    debug!(path = %server_path.display(), script, "launching restart command");

    let mut child = Command::new(SHELL)
        .arg("-c")
        .arg(&script)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| CoreError::RestartSpawn { path: server_path.to_path_buf(), source })?;

    let stderr = match drain_stderr(&mut child) {
        Ok(stderr) => stderr,
        Err(source) => {
            reap(&mut child);
            return Err(CoreError::RestartStderr { path: server_path.to_path_buf(), source });
        }
    };

    let status = child
        .wait()
        .map_err(|source| CoreError::RestartWait { path: server_path.to_path_buf(), source })?;

    if status.success() {
        return Ok(());
    }

    warn!(path = %server_path.display(), %status, "restart command failed");
    if stderr.is_empty() {
        Err(CoreError::RestartExit { path: server_path.to_path_buf(), status })
    } else {
        Err(CoreError::RestartFailed { path: server_path.to_path_buf(), stderr })
    }
}

fn drain_stderr(child: &mut Child) -> std::io::Result<String> {
    let mut pipe = child.stderr.take().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stderr pipe not available")
    })?;
    let mut buffer = Vec::new();
    pipe.read_to_end(&mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

fn reap(child: &mut Child) {
    if let Err(err) = child.kill() {
        debug!(error = %err, "restart command already exited");
    }
    let _ = child.wait();
}

fn shell_line(server_path: &Path, command: &str) -> String {
    format!("cd -- {} && {command}", quote(&server_path.to_string_lossy()))
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
