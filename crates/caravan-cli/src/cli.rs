//! Argument parsing and command dispatch for the `caravan` binary.

use std::io::{self, Write as _};
use std::path::PathBuf;

use anyhow::{Context as _, Result, anyhow};
use caravan_config::{
    DEFAULT_CONFIG_ROOT, DEFAULT_JOB_ROOT, OptionSet, Section, config_file_path, render,
};
use caravan_converge::{Action, DesiredFile, converge, plan};
use caravan_jobs::{AgentCli, JobAction, Validator, deploy, render_job};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing::info;

use crate::manifest::{ConfigAction, JobResourceAction, Manifest, load_manifest};

#[derive(Debug, Parser)]
#[command(name = "caravan", version, about = "Render and converge scheduler agent configuration and jobs")]
struct Cli {
    /// Agent binary used for validate/run/stop.
    #[arg(long, global = true, default_value = "nomad")]
    agent_bin: PathBuf,

    /// Directory configuration fragments are written to.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_ROOT)]
    config_root: PathBuf,

    /// Directory job definitions are written to.
    #[arg(long, global = true, default_value = DEFAULT_JOB_ROOT)]
    job_root: PathBuf,

    /// Log filter when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Converge every resource declared in a manifest.
    Apply {
        /// Manifest file to apply.
        manifest: PathBuf,
    },
    /// Show what apply would change, writing nothing.
    Plan {
        /// Manifest file to inspect.
        manifest: PathBuf,
    },
    /// Render one config section document to stdout.
    Render(RenderArgs),
    /// Direct job lifecycle actions against the agent.
    Job {
        #[command(subcommand)]
        job: JobCommand,
    },
}

#[derive(Debug, Args)]
struct RenderArgs {
    /// Section to render (base|agent|server|client|atlas|consul|vault).
    #[arg(long)]
    section: Section,

    /// Instance name used for the target filename.
    #[arg(long, default_value = "default")]
    name: String,

    /// Node name emitted under "name"; agent section only.
    #[arg(long)]
    agent_name: Option<String>,

    /// Option values as key=value pairs; values parse as JSON, falling
    /// back to plain strings.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,
}

#[derive(Debug, Subcommand)]
enum JobCommand {
    /// Submit a job definition file to the agent.
    Run {
        /// Path of the job definition.
        path: PathBuf,
    },
    /// Stop a named job.
    Stop {
        /// Name of the job to stop.
        name: String,
    },
}

/// Parse arguments, execute the requested command, and return the process
/// exit code.
#[must_use]
pub fn run() -> i32 {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match dispatch(cli) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {err:#}");
            1
        }
    }
}

fn init_tracing(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn dispatch(cli: Cli) -> Result<()> {
    let agent = AgentCli::new(&cli.agent_bin);

    match cli.command {
        Command::Apply { manifest } => {
            let manifest = load_manifest(&manifest)?;
            apply_manifest(&manifest, &cli.config_root, &cli.job_root, &agent)
        }
        Command::Plan { manifest } => {
            let manifest = load_manifest(&manifest)?;
            plan_manifest(&manifest, &cli.config_root, &cli.job_root)
        }
        Command::Render(args) => render_section(&args, &cli.config_root),
        Command::Job { job } => match job {
            JobCommand::Run { path } => Ok(agent.run(&path)?),
            JobCommand::Stop { name } => Ok(agent.stop(&name)?),
        },
    }
}

fn apply_manifest(
    manifest: &Manifest,
    config_root: &std::path::Path,
    job_root: &std::path::Path,
    agent: &AgentCli,
) -> Result<()> {
    for resource in &manifest.config {
        let desired = resource.desired_file(config_root)?;
        let action = match resource.action {
            ConfigAction::Create => Action::Create,
            ConfigAction::Delete => Action::Delete,
        };
        let changed = converge(&desired, action)
            .with_context(|| format!("resource '{}'", resource.label()))?;
        info!(resource = %resource.label(), changed, "converged config resource");
    }

    for job in &manifest.job {
        let spec = job.job_spec(job_root)?;
        match job.action {
            JobResourceAction::Create => {
                let validator = job.validate.then_some(agent as &dyn Validator);
                deploy(&spec, JobAction::Create, validator)
                    .with_context(|| format!("job '{}'", job.name))?;
            }
            JobResourceAction::Delete => {
                deploy(&spec, JobAction::Delete, None)
                    .with_context(|| format!("job '{}'", job.name))?;
            }
            JobResourceAction::Run => {
                agent
                    .run(&spec.job_path())
                    .with_context(|| format!("job '{}'", job.name))?;
            }
            JobResourceAction::Stop => {
                agent
                    .stop(&job.name)
                    .with_context(|| format!("job '{}'", job.name))?;
            }
        }
    }

    Ok(())
}

fn plan_manifest(
    manifest: &Manifest,
    config_root: &std::path::Path,
    job_root: &std::path::Path,
) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for resource in &manifest.config {
        let desired = resource.desired_file(config_root)?;
        let action = match resource.action {
            ConfigAction::Create => Action::Create,
            ConfigAction::Delete => Action::Delete,
        };
        let change = plan(&desired, action)
            .with_context(|| format!("resource '{}'", resource.label()))?;
        writeln!(
            out,
            "config {}: {} ({})",
            resource.label(),
            change.as_str(),
            desired.path.display()
        )?;
    }

    for job in &manifest.job {
        let spec = job.job_spec(job_root)?;
        match job.action {
            JobResourceAction::Create => {
                // Validation is an apply-time side effect; plan only renders.
                let rendered = render_job(&spec)?;
                let desired = DesiredFile::new(spec.job_path(), rendered, 0o640);
                let change = plan(&desired, Action::Create)
                    .with_context(|| format!("job '{}'", job.name))?;
                writeln!(
                    out,
                    "job {}: {} ({})",
                    job.name,
                    change.as_str(),
                    desired.path.display()
                )?;
            }
            JobResourceAction::Delete => {
                let desired = DesiredFile::new(spec.job_path(), Vec::new(), 0o640);
                let change = plan(&desired, Action::Delete)
                    .with_context(|| format!("job '{}'", job.name))?;
                writeln!(
                    out,
                    "job {}: {} ({})",
                    job.name,
                    change.as_str(),
                    desired.path.display()
                )?;
            }
            JobResourceAction::Run => {
                writeln!(out, "job {}: would submit to agent", job.name)?;
            }
            JobResourceAction::Stop => {
                writeln!(out, "job {}: would stop on agent", job.name)?;
            }
        }
    }

    Ok(())
}

fn render_section(args: &RenderArgs, config_root: &std::path::Path) -> Result<()> {
    let mut set = OptionSet::new();
    for pair in &args.set {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("--set expects KEY=VALUE, got '{pair}'"))?;
        let value = serde_json::from_str(raw)
            .unwrap_or_else(|_| Value::String(raw.to_string()));
        set.insert(args.section, key, value)?;
    }

    let content = render(args.section, &set, args.agent_name.as_deref());
    let path = config_file_path(config_root, args.section, &args.name);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "# {}", path.display())?;
    out.write_all(&content)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use caravan_jobs::{CommandOutput, RecordingRunner};
    use tempfile::TempDir;

    use super::*;

    fn recording_agent() -> (Arc<RecordingRunner>, AgentCli) {
        let runner = Arc::new(RecordingRunner::default());
        let agent = AgentCli::with_runner("nomad", Box::new(runner.clone()));
        (runner, agent)
    }

    #[test]
    fn apply_converges_config_and_jobs() -> Result<()> {
        let dir = TempDir::new()?;
        let config_root = dir.path().join("nomad.d");
        let job_root = dir.path().join("jobs");
        let template = dir.path().join("cache.hcl.tera");
        fs::write(&template, r#"job "cache" { image = "{{ image }}" }"#)?;

        let manifest: Manifest = toml::from_str(&format!(
            r#"
            [[config]]
            section = "server"
            name = "main"
            [config.options]
            bootstrap_expect = 3
            data_dir = "/var/nomad"

            [[job]]
            name = "cache"
            template = {template:?}
            [job.variables]
            image = "redis:7"
            "#,
            template = template.display().to_string()
        ))?;

        let (runner, agent) = recording_agent();
        apply_manifest(&manifest, &config_root, &job_root, &agent)?;

        assert_eq!(
            fs::read(config_root.join("server_main.hcl"))?,
            br#"{"server":{"bootstrap_expect":3,"data_dir":"/var/nomad"}}"#
        );
        assert_eq!(
            fs::read_to_string(job_root.join("cache.hcl"))?,
            r#"job "cache" { image = "redis:7" }"#
        );

        // Default validate=true routed one validate call through the agent.
        let calls = runner.invocations();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1[0], "validate");
        Ok(())
    }

    #[test]
    fn failing_config_resource_stops_before_jobs() -> Result<()> {
        let dir = TempDir::new()?;
        let manifest: Manifest = toml::from_str(
            r#"
            [[config]]
            section = "server"
            name = "main"
            [config.options]
            bootstrap_expect = "three"

            [[job]]
            name = "cache"
            action = "stop"
            "#,
        )?;

        let (runner, agent) = recording_agent();
        let err = apply_manifest(&manifest, dir.path(), dir.path(), &agent)
            .expect_err("invalid option should abort the run");
        assert!(err.to_string().contains("server/main"));
        assert!(runner.invocations().is_empty(), "job must not be reached");
        Ok(())
    }

    #[test]
    fn run_and_stop_actions_invoke_the_agent() -> Result<()> {
        let dir = TempDir::new()?;
        let manifest: Manifest = toml::from_str(
            r#"
            [[job]]
            name = "cache"
            action = "run"

            [[job]]
            name = "cache"
            action = "stop"
            "#,
        )?;

        let (runner, agent) = recording_agent();
        apply_manifest(&manifest, dir.path(), dir.path(), &agent)?;

        let calls = runner.invocations();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[0].1,
            vec![
                "run".to_string(),
                dir.path().join("cache.hcl").display().to_string()
            ]
        );
        assert_eq!(calls[1].1, vec!["stop", "cache"]);
        Ok(())
    }

    #[test]
    fn failed_validation_aborts_without_commit() -> Result<()> {
        let dir = TempDir::new()?;
        let template = dir.path().join("cache.hcl.tera");
        fs::write(&template, "{{ image }}")?;
        let job_root = dir.path().join("jobs");

        let manifest: Manifest = toml::from_str(&format!(
            r#"
            [[job]]
            name = "cache"
            template = {template:?}
            [job.variables]
            image = "redis:7"
            "#,
            template = template.display().to_string()
        ))?;

        let runner = Arc::new(RecordingRunner::with_outputs(vec![CommandOutput {
            success: false,
            code: Some(1),
            stdout: Vec::new(),
            stderr: b"invalid job spec".to_vec(),
        }]));
        let agent = AgentCli::with_runner("nomad", Box::new(runner.clone()));

        let err = apply_manifest(&manifest, dir.path(), &job_root, &agent)
            .expect_err("validation failure should abort");
        assert!(err.to_string().contains("cache"));
        assert!(!job_root.join("cache.hcl").exists());
        Ok(())
    }

    #[test]
    fn plan_writes_nothing() -> Result<()> {
        let dir = TempDir::new()?;
        let config_root = dir.path().join("nomad.d");
        let manifest: Manifest = toml::from_str(
            r#"
            [[config]]
            section = "vault"
            name = "main"
            [config.options]
            token = "s.secret"
            "#,
        )?;

        plan_manifest(&manifest, &config_root, dir.path())?;
        assert!(!config_root.exists());
        Ok(())
    }
}
