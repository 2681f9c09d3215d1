// src/exec/command.rs

//! Subprocess-backed action.
//!
//! The driver itself never runs processes; concrete actions do. This module
//! provides the stock action most factories hand out: run a shell command,
//! stream its output to the dashboard task, and map the exit status to the
//! action outcome. Declared entity inputs are resolved through the build
//! context first, so a command whose inputs are not provided yet blocks
//! instead of running against half a world.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::action::Action;
use crate::driver::BuildContext;
use crate::errors::Result;
use crate::types::EntityId;

/// An action that runs one shell command.
///
/// Resolved input files are exposed to the subprocess as `FORAGE_INPUT_<n>`
/// environment variables; the declared output file (if any) as
/// `FORAGE_OUTPUT`.
pub struct CommandAction {
    verb: String,
    cmd: String,
    /// Entities that must be provided before the command runs, with the
    /// human title used when reporting them missing.
    requires: Vec<(EntityId, String)>,
    /// Output file to register, and the entities it provides on success.
    output: Option<(String, Vec<EntityId>)>,
}

impl CommandAction {
    pub fn new(verb: impl Into<String>, cmd: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            cmd: cmd.into(),
            requires: Vec::new(),
            output: None,
        }
    }

    pub fn requires(mut self, id: EntityId, title: impl Into<String>) -> Self {
        self.requires.push((id, title.into()));
        self
    }

    pub fn provides(mut self, output_basename: impl Into<String>, entities: Vec<EntityId>) -> Self {
        self.output = Some((output_basename.into(), entities));
        self
    }

    /// The shell command this action will run.
    pub fn command_line(&self) -> &str {
        &self.cmd
    }
}

impl Action for CommandAction {
    fn verb(&self) -> &str {
        &self.verb
    }

    fn start<'a>(
        &'a mut self,
        ctx: &'a mut BuildContext,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            // Resolve declared inputs first; a miss rolls this action back.
            let mut inputs = Vec::new();
            let mut incomplete = false;
            for (id, title) in &self.requires {
                match ctx.find_provider(id, title)? {
                    Some(file) => inputs.push(file),
                    None => incomplete = true,
                }
            }
            if incomplete {
                ctx.failed()?;
                return Ok(());
            }

            // Build a shell command appropriate for the platform.
            let mut command = if cfg!(windows) {
                let mut c = Command::new("cmd");
                c.arg("/C").arg(&self.cmd);
                c
            } else {
                let mut c = Command::new("sh");
                c.arg("-c").arg(&self.cmd);
                c
            };

            command
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            for (i, file) in inputs.iter().enumerate() {
                command.env(format!("FORAGE_INPUT_{i}"), file.path());
            }

            let output_file = match &self.output {
                Some((basename, _)) => {
                    let file = ctx.new_output(basename)?;
                    command.env("FORAGE_OUTPUT", file.path());
                    Some(file)
                }
                None => None,
            };

            let mut child = command
                .spawn()
                .with_context(|| format!("spawning process for '{}'", self.cmd))?;

            let stdout = child.stdout.take();
            let stderr = child.stderr.take();

            // Drain both pipes before waiting so the child can't stall on a
            // full buffer.
            let (out, err_out) = tokio::join!(read_all(stdout), read_all(stderr));

            let status = child
                .wait()
                .await
                .with_context(|| format!("waiting for process of '{}'", self.cmd))?;

            if !out.is_empty() {
                ctx.log(&out)?;
            }
            if !err_out.is_empty() {
                ctx.log(&err_out)?;
            }

            if status.success() {
                if let (Some(file), Some((_, entities))) = (&output_file, &self.output) {
                    ctx.provide(file, entities.clone())?;
                }
                ctx.success()?;
            } else {
                ctx.log(&format!(
                    "command exited with status {}\n",
                    status.code().unwrap_or(-1)
                ))?;
                ctx.failed()?;
            }

            Ok(())
        })
    }
}

impl std::fmt::Debug for CommandAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandAction")
            .field("verb", &self.verb)
            .field("cmd", &self.cmd)
            .finish_non_exhaustive()
    }
}

async fn read_all<R: AsyncRead + Unpin>(reader: Option<R>) -> String {
    let mut buf = String::new();
    if let Some(mut reader) = reader {
        // Non-UTF8 output is dropped rather than crashing the action.
        let _ = reader.read_to_string(&mut buf).await;
    }
    buf
}
