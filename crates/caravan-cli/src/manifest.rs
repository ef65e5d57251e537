//! Declarative manifest describing config resources and jobs.
//!
//! The manifest is the caller-facing declaration surface: a TOML document
//! listing configuration sections to render and job definitions to manage.
//! Resources converge sequentially in document order; the first failure
//! aborts the run without rolling back earlier resources.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};
use caravan_config::{
    CONFIG_FILE_MODE, OptionSet, Section, config_file_path, render,
};
use caravan_converge::DesiredFile;
use caravan_jobs::JobSpec;
use serde::Deserialize;
use serde_json::Value;

/// Top-level manifest document.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Manifest {
    /// Configuration resources, converged first.
    #[serde(default)]
    pub(crate) config: Vec<ConfigResource>,
    /// Job resources, processed after configuration.
    #[serde(default)]
    pub(crate) job: Vec<JobResource>,
}

/// Desired lifecycle action for a config resource.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ConfigAction {
    /// Render and converge the fragment.
    #[default]
    Create,
    /// Remove the fragment.
    Delete,
}

/// One declared configuration fragment.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ConfigResource {
    /// Section the options belong to.
    pub(crate) section: Section,
    /// Instance name; the fragment file is `<prefix>_<name>.hcl`.
    pub(crate) name: String,
    /// Directory override; defaults to the config root.
    pub(crate) path: Option<PathBuf>,
    /// Lifecycle action, `create` by default.
    #[serde(default)]
    pub(crate) action: ConfigAction,
    /// Node name emitted under `"name"`; agent section only.
    pub(crate) agent_name: Option<String>,
    /// Option values checked against the section schema.
    #[serde(default)]
    pub(crate) options: BTreeMap<String, Value>,
}

impl ConfigResource {
    /// Label used in logs and plan output.
    pub(crate) fn label(&self) -> String {
        format!("{}/{}", self.section.as_str(), self.name)
    }

    /// Render the declared options into the fragment's desired file state.
    pub(crate) fn desired_file(&self, config_root: &Path) -> Result<DesiredFile> {
        if self.agent_name.is_some() && self.section != Section::Agent {
            bail!(
                "resource '{}': agent_name is only valid for the agent section",
                self.label()
            );
        }
        let set = OptionSet::from_values(
            self.section,
            self.options.iter().map(|(k, v)| (k.clone(), v.clone())),
        )
        .with_context(|| format!("resource '{}'", self.label()))?;
        let content = render(self.section, &set, self.agent_name.as_deref());
        let root = self.path.as_deref().unwrap_or(config_root);
        Ok(DesiredFile::new(
            config_file_path(root, self.section, &self.name),
            content,
            CONFIG_FILE_MODE,
        ))
    }
}

/// Desired lifecycle action for a job resource.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum JobResourceAction {
    /// Render, validate, and commit the job definition.
    #[default]
    Create,
    /// Remove the committed job definition.
    Delete,
    /// Submit the committed job definition to the agent.
    Run,
    /// Stop the named job on the agent.
    Stop,
}

/// One declared job.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct JobResource {
    /// Job name; the committed file is `<path>/<name>.hcl`.
    pub(crate) name: String,
    /// Template file rendered for `create`; unused for other actions.
    pub(crate) template: Option<PathBuf>,
    /// Directory override; defaults to the job root.
    pub(crate) path: Option<PathBuf>,
    /// Lifecycle action, `create` by default.
    #[serde(default)]
    pub(crate) action: JobResourceAction,
    /// Whether to run the agent's validate subcommand before committing.
    #[serde(default = "default_validate")]
    pub(crate) validate: bool,
    /// Variables substituted into the template.
    #[serde(default)]
    pub(crate) variables: BTreeMap<String, Value>,
}

const fn default_validate() -> bool {
    true
}

impl JobResource {
    /// Build the job spec for rendering and convergence.
    pub(crate) fn job_spec(&self, job_root: &Path) -> Result<JobSpec> {
        let template = match (self.action, &self.template) {
            (JobResourceAction::Create, None) => {
                bail!("job '{}': template is required for action 'create'", self.name)
            }
            (_, Some(template)) => template.clone(),
            (_, None) => PathBuf::new(),
        };
        Ok(JobSpec {
            name: self.name.clone(),
            template,
            variables: self.variables.clone(),
            job_root: self.path.as_deref().unwrap_or(job_root).to_path_buf(),
        })
    }
}

/// Load and parse a manifest from `path`.
pub(crate) fn load_manifest(path: &Path) -> Result<Manifest> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest at {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("failed to parse manifest at {}", path.display()))
}
