use crate::ports::{CommandInvocation, CommandResult, CommandRunner, RespondFn};
use anyhow::Context;
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

pub const REQUESTER_ENV: &str = "COMMENT_RELAY_REQUESTER";
pub const REQUEST_ID_ENV: &str = "COMMENT_RELAY_REQUEST_ID";

/// Runs commands by spawning an external program as
/// `<program> <command> <args...>`.
///
/// Every non-empty stdout line is offered to the respond callback; exit
/// status 0 is success, otherwise the last stderr line becomes the message.
pub struct ShellCommandRunner {
    program: PathBuf,
}

impl ShellCommandRunner {
    pub fn new(program: PathBuf) -> Self {
        Self { program }
    }

    /// Resolves `program` on `PATH` (or as a path) so a missing executable
    /// fails at load instead of on the first request.
    pub fn resolve(program: impl AsRef<OsStr>) -> anyhow::Result<Self> {
        let name = program.as_ref();
        let resolved = which::which(name)
            .with_context(|| format!("locating command program '{}'", name.to_string_lossy()))?;
        Ok(Self::new(resolved))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl CommandRunner for ShellCommandRunner {
    async fn run_command(
        &self,
        invocation: CommandInvocation,
        respond: RespondFn,
    ) -> anyhow::Result<CommandResult> {
        let mut command = Command::new(&self.program);
        command
            .arg(invocation.command.as_str())
            .args(&invocation.args)
            .env(REQUESTER_ENV, invocation.extra.requester.as_str())
            .env(REQUEST_ID_ENV, invocation.response().id().to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().with_context(|| {
            format!(
                "failed to spawn '{}' for command '{}'",
                self.program.display(),
                invocation.command
            )
        })?;
        let stdout = child.stdout.take().context("command stdout was not captured")?;
        let stderr = child.stderr.take().context("command stderr was not captured")?;

        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = BufReader::new(stderr).read_to_string(&mut buf).await;
            buf
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut collected = Vec::new();
        while let Some(line) = lines
            .next_line()
            .await
            .context("reading command output")?
        {
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            respond(&invocation.caller, invocation.response(), line);
            collected.push(line.to_string());
        }

        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for '{}'", self.program.display()))?;
        let stderr = stderr_task.await.unwrap_or_default();
        debug!(
            request_id = %invocation.response().id(),
            status = %status,
            stdout_lines = collected.len(),
            "command program exited"
        );

        if status.success() {
            let message = Some(collected.join("\n")).filter(|text| !text.is_empty());
            return Ok(CommandResult::ok(message));
        }

        let message = stderr
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string);
        let reason = match status.code() {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        };
        Ok(CommandResult::failed(message, Some(reason)))
    }
}
