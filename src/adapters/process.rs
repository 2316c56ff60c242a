//! Child process plumbing shared by the dump tool and the catalog client
//!
//! Stdout of every external invocation is streamed into a writer supplied by
//! the caller, so a dump never has to fit in memory. What remains once the
//! process exits is a [`ProcessOutput`]: the captured stderr and exit
//! status. A process that cannot be started at all is reported as
//! [`DumpError::Spawn`].

use crate::config::{DatabaseConfig, SecretString};
use crate::domain::DumpError;
use secrecy::ExposeSecret;
use std::process::Stdio;
use tokio::io::{AsyncReadExt, AsyncWrite};
use tokio::process::Command;

/// Destination for the stdout of an external process
pub type OutputWriter<'a> = &'a mut (dyn AsyncWrite + Send + Unpin);

/// How a finished process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Success,
    /// Non-zero exit, or `None` when terminated by a signal
    Failed { code: Option<i32> },
}

/// What a finished process left behind besides its streamed stdout
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stderr: String,
    pub status: ProcessStatus,
}

impl ProcessOutput {
    /// A successful run
    pub fn success() -> Self {
        Self {
            stderr: String::new(),
            status: ProcessStatus::Success,
        }
    }

    /// A run that exited with `code` after printing `stderr`
    pub fn failed(code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self {
            stderr: stderr.into(),
            status: ProcessStatus::Failed { code },
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ProcessStatus::Success
    }

    /// `Ok` on success, [`DumpError::Exit`] otherwise
    pub fn into_result(self, tool: &str) -> Result<(), DumpError> {
        match self.status {
            ProcessStatus::Success => Ok(()),
            ProcessStatus::Failed { code } => Err(DumpError::Exit {
                tool: tool.to_string(),
                code,
                stderr: self.stderr.trim().to_string(),
            }),
        }
    }
}

/// Connection arguments shared by mysqldump and the mysql client
#[derive(Debug, Clone, Default)]
pub struct ConnectionArgs {
    args: Vec<String>,
    password: Option<SecretString>,
}

impl ConnectionArgs {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        let mut args = Vec::new();
        if let Some(host) = &config.host {
            args.push(format!("--host={host}"));
        }
        if let Some(port) = config.port {
            args.push(format!("--port={port}"));
        }
        if let Some(user) = &config.user {
            args.push(format!("--user={user}"));
        }
        Self {
            args,
            password: config.password.clone(),
        }
    }

    /// Command-line flags (never includes the password)
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Runs `program` to completion, streaming its stdout into `stdout`
///
/// There is no timeout: the call returns only when the process exits. If
/// `stdout` stops accepting bytes the process is killed and the failure is
/// reported as [`DumpError::Write`].
pub async fn run_process(
    program: &str,
    args: &[String],
    connection: &ConnectionArgs,
    stdout: OutputWriter<'_>,
) -> Result<ProcessOutput, DumpError> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(password) = &connection.password {
        command.env("MYSQL_PWD", password.expose_secret().as_str());
    }

    tracing::debug!(program = %program, args = ?args, "Spawning process");

    let spawn_error = |message: String| DumpError::Spawn {
        tool: program.to_string(),
        message,
    };
    let mut child = command.spawn().map_err(|e| spawn_error(e.to_string()))?;
    let mut child_stdout = child
        .stdout
        .take()
        .ok_or_else(|| spawn_error("stdout was not captured".to_string()))?;
    let mut child_stderr = child
        .stderr
        .take()
        .ok_or_else(|| spawn_error("stderr was not captured".to_string()))?;

    // stderr is drained alongside stdout so neither pipe can fill up
    let mut stderr = Vec::new();
    let (copied, _) = tokio::join!(
        tokio::io::copy(&mut child_stdout, stdout),
        child_stderr.read_to_end(&mut stderr),
    );

    if let Err(e) = copied {
        let _ = child.kill().await;
        return Err(DumpError::Write(format!(
            "Failed to stream output of {program}: {e}"
        )));
    }

    let exit = child
        .wait()
        .await
        .map_err(|e| spawn_error(format!("Failed to wait for process: {e}")))?;
    let status = if exit.success() {
        ProcessStatus::Success
    } else {
        ProcessStatus::Failed { code: exit.code() }
    };

    Ok(ProcessOutput {
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;

    fn database_config() -> DatabaseConfig {
        DatabaseConfig {
            name: "lush".to_string(),
            host: Some("db.internal".to_string()),
            port: Some(3307),
            user: Some("backup".to_string()),
            password: Some(secret_string("hunter2".to_string())),
        }
    }

    #[test]
    fn test_connection_args_exclude_password() {
        let connection = ConnectionArgs::from_config(&database_config());
        assert_eq!(
            connection.args(),
            ["--host=db.internal", "--port=3307", "--user=backup"]
        );
        assert!(connection.args().iter().all(|a| !a.contains("hunter2")));
    }

    #[test]
    fn test_into_result_maps_exit_failure() {
        let output = ProcessOutput::failed(Some(2), "mysqldump: Got error: 1146\n");
        let err = output.into_result("mysqldump").unwrap_err();
        assert_eq!(
            err,
            DumpError::Exit {
                tool: "mysqldump".to_string(),
                code: Some(2),
                stderr: "mysqldump: Got error: 1146".to_string(),
            }
        );
    }

    #[test]
    fn test_into_result_success() {
        let output = ProcessOutput::success();
        assert!(output.is_success());
        assert!(output.into_result("mysqldump").is_ok());
    }

    #[tokio::test]
    async fn test_run_process_spawn_failure() {
        let mut stdout = Vec::new();
        let result = run_process(
            "quarry-definitely-missing-binary",
            &[],
            &ConnectionArgs::default(),
            &mut stdout,
        )
        .await;
        assert!(matches!(result, Err(DumpError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_process_captures_stdout_and_status() {
        let args = [
            "-c".to_string(),
            "printf abc; printf oops >&2; exit 3".to_string(),
        ];
        let mut stdout = Vec::new();
        let output = run_process("sh", &args, &ConnectionArgs::default(), &mut stdout)
            .await
            .unwrap();
        assert_eq!(stdout, b"abc");
        assert_eq!(output.stderr, "oops");
        assert_eq!(output.status, ProcessStatus::Failed { code: Some(3) });
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_process_streams_large_output() {
        // Far beyond a pipe buffer, with stderr written as well
        let args = [
            "-c".to_string(),
            "head -c 1048576 /dev/zero; echo done >&2".to_string(),
        ];
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out.sql");
        let mut file = tokio::fs::File::create(&path).await.unwrap();

        let output = run_process("sh", &args, &ConnectionArgs::default(), &mut file)
            .await
            .unwrap();
        drop(file);

        assert!(output.is_success());
        assert_eq!(output.stderr.trim(), "done");
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 1_048_576);
    }
}
