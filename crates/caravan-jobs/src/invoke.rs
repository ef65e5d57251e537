//! Synchronous agent CLI invocation for job lifecycle actions.
//!
//! `run` and `stop` are fire-and-forget: there is no idempotency check and
//! no pre/post-state comparison. Submitting a job twice submits it twice;
//! whether that is a no-op is the agent's decision. Non-zero exits
//! propagate with captured stderr and are never retried.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use tracing::info;

use crate::error::{JobError, JobResult};
use crate::template::Validator;

/// Captured result of one external command invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Whether the process exited successfully.
    pub success: bool,
    /// Exit code when the process terminated normally.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: Vec<u8>,
    /// Captured standard error.
    pub stderr: Vec<u8>,
}

/// Seam for executing external commands, so lifecycle actions can be
/// exercised without an agent binary on the host.
pub trait CommandRunner: Send + Sync {
    /// Execute `program` with `args`, blocking until it exits.
    ///
    /// # Errors
    ///
    /// Returns the IO error from spawning when the program cannot run.
    fn run(&self, program: &Path, args: &[String]) -> std::io::Result<CommandOutput>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for std::sync::Arc<T> {
    fn run(&self, program: &Path, args: &[String]) -> std::io::Result<CommandOutput> {
        (**self).run(program, args)
    }
}

/// Production runner spawning the program directly.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, program: &Path, args: &[String]) -> std::io::Result<CommandOutput> {
        let output = Command::new(program).args(args).output()?;
        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Test double that records invocations and replays preset outputs.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    outputs: Mutex<Vec<CommandOutput>>,
    invocations: Mutex<Vec<(PathBuf, Vec<String>)>>,
}

impl RecordingRunner {
    /// Runner that replays `outputs` in order, then reports clean exits.
    #[must_use]
    pub fn with_outputs(outputs: Vec<CommandOutput>) -> Self {
        let mut reversed = outputs;
        reversed.reverse();
        Self {
            outputs: Mutex::new(reversed),
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Commands recorded so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn invocations(&self) -> Vec<(PathBuf, Vec<String>)> {
        self.invocations.lock().expect("runner lock").clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, program: &Path, args: &[String]) -> std::io::Result<CommandOutput> {
        self.invocations
            .lock()
            .expect("runner lock")
            .push((program.to_path_buf(), args.to_vec()));
        Ok(self
            .outputs
            .lock()
            .expect("runner lock")
            .pop()
            .unwrap_or_else(|| CommandOutput {
                success: true,
                code: Some(0),
                stdout: Vec::new(),
                stderr: Vec::new(),
            }))
    }
}

/// Handle on the orchestrator agent binary.
pub struct AgentCli {
    binary: PathBuf,
    runner: Box<dyn CommandRunner>,
}

impl AgentCli {
    /// Agent CLI invoked through the real process runner.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self::with_runner(binary, Box::new(ProcessRunner))
    }

    /// Agent CLI with a custom command runner.
    #[must_use]
    pub fn with_runner(binary: impl Into<PathBuf>, runner: Box<dyn CommandRunner>) -> Self {
        Self {
            binary: binary.into(),
            runner,
        }
    }

    /// Submit the job definition at `job_path` to the agent.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Process`] on a non-zero exit and
    /// [`JobError::Io`] when the binary cannot be spawned.
    pub fn run(&self, job_path: &Path) -> JobResult<()> {
        self.invoke(&["run".to_string(), job_path.display().to_string()])?;
        info!(job = %job_path.display(), "submitted job to agent");
        Ok(())
    }

    /// Stop the named job.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Process`] on a non-zero exit and
    /// [`JobError::Io`] when the binary cannot be spawned.
    pub fn stop(&self, job_name: &str) -> JobResult<()> {
        self.invoke(&["stop".to_string(), job_name.to_string()])?;
        info!(job = job_name, "stopped job");
        Ok(())
    }

    /// Ask the agent to validate the job definition at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Process`] on a non-zero exit and
    /// [`JobError::Io`] when the binary cannot be spawned.
    pub fn check(&self, path: &Path) -> JobResult<()> {
        self.invoke(&["validate".to_string(), path.display().to_string()])
    }

    fn invoke(&self, args: &[String]) -> JobResult<()> {
        let output = self
            .runner
            .run(&self.binary, args)
            .map_err(|err| JobError::io("spawn", &self.binary, err))?;
        if output.success {
            return Ok(());
        }
        Err(JobError::Process {
            command: format!("{} {}", self.binary.display(), args.join(" ")),
            code: output.code,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl Validator for AgentCli {
    fn validate(&self, path: &Path) -> JobResult<()> {
        self.check(path).map_err(|err| match err {
            JobError::Process { stderr, .. } => JobError::Validation {
                path: path.to_path_buf(),
                detail: stderr,
            },
            other => other,
        })
    }
}
