//! Job definition rendering with a verify-before-commit hook.
//!
//! Rendering is two-phase: the template output is staged to a temporary
//! file, the optional validator inspects that staged path, and only on
//! success is the result converged to its final location. A rejected
//! render leaves any previously committed file untouched.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use caravan_config::CONFIG_FILE_MODE;
use caravan_converge::{Action, DesiredFile, converge};
use serde_json::Value;
use tera::{Context, Tera};
use tracing::{debug, info};

use crate::error::{JobError, JobResult};

/// Desired lifecycle action for a job definition file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobAction {
    /// Render the template and commit it to the job root.
    Create,
    /// Remove the committed job definition.
    Delete,
}

/// Hook invoked against rendered-but-uncommitted output.
pub trait Validator {
    /// Inspect the staged file at `path`, rejecting the commit on error.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Validation`] when the rendered output is
    /// rejected.
    fn validate(&self, path: &Path) -> JobResult<()>;
}

/// A named job with its template source and rendering variables.
#[derive(Debug, Clone)]
pub struct JobSpec {
    /// Job name; the committed file is `<job_root>/<name>.hcl`.
    pub name: String,
    /// Path of the template file to render.
    pub template: PathBuf,
    /// Variables substituted into the template.
    pub variables: BTreeMap<String, Value>,
    /// Directory committed job definitions live in.
    pub job_root: PathBuf,
}

impl JobSpec {
    /// Path the committed job definition is written to.
    #[must_use]
    pub fn job_path(&self) -> PathBuf {
        self.job_root.join(format!("{}.hcl", self.name))
    }
}

/// Render the job's template with its variables map.
///
/// # Errors
///
/// Returns [`JobError::Io`] when the template cannot be read and
/// [`JobError::Template`] when substitution fails.
pub fn render_job(spec: &JobSpec) -> JobResult<Vec<u8>> {
    let raw = fs::read_to_string(&spec.template)
        .map_err(|err| JobError::io("read_template", &spec.template, err))?;
    let context = Context::from_serialize(&spec.variables).map_err(|err| JobError::Template {
        name: spec.name.clone(),
        source: err,
    })?;
    let rendered = Tera::one_off(&raw, &context, false).map_err(|err| JobError::Template {
        name: spec.name.clone(),
        source: err,
    })?;
    Ok(rendered.into_bytes())
}

/// Converge the job definition file, optionally validating the rendered
/// output first. Returns whether the committed file changed.
///
/// # Errors
///
/// Returns [`JobError::Template`] or [`JobError::Io`] from rendering,
/// [`JobError::Validation`] when the validator rejects the staged output,
/// and [`JobError::Converge`] when the final write fails.
pub fn deploy(
    spec: &JobSpec,
    action: JobAction,
    validator: Option<&dyn Validator>,
) -> JobResult<bool> {
    let desired_path = spec.job_path();

    if action == JobAction::Delete {
        let desired = DesiredFile::new(&desired_path, Vec::new(), CONFIG_FILE_MODE);
        let changed = converge(&desired, Action::Delete)?;
        info!(job = spec.name.as_str(), changed, "removed job definition");
        return Ok(changed);
    }

    let rendered = render_job(spec)?;

    if let Some(validator) = validator {
        let staged = stage_for_validation(&rendered)?;
        debug!(job = spec.name.as_str(), "validating staged job definition");
        validator.validate(staged.path())?;
    }

    let desired = DesiredFile::new(&desired_path, rendered, CONFIG_FILE_MODE);
    let changed = converge(&desired, Action::Create)?;
    info!(job = spec.name.as_str(), changed, "converged job definition");
    Ok(changed)
}

fn stage_for_validation(rendered: &[u8]) -> JobResult<tempfile::NamedTempFile> {
    let mut staged = tempfile::Builder::new()
        .suffix(".hcl")
        .tempfile()
        .map_err(|err| JobError::io("stage", std::env::temp_dir(), err))?;
    staged
        .write_all(rendered)
        .map_err(|err| JobError::io("stage_write", staged.path().to_path_buf(), err))?;
    staged
        .flush()
        .map_err(|err| JobError::io("stage_flush", staged.path().to_path_buf(), err))?;
    Ok(staged)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    struct RejectAll;

    impl Validator for RejectAll {
        fn validate(&self, path: &Path) -> JobResult<()> {
            Err(JobError::Validation {
                path: path.to_path_buf(),
                detail: "rejected by test validator".to_string(),
            })
        }
    }

    struct AcceptAll;

    impl Validator for AcceptAll {
        fn validate(&self, _path: &Path) -> JobResult<()> {
            Ok(())
        }
    }

    fn spec(dir: &TempDir, template_body: &str) -> anyhow::Result<JobSpec> {
        let template = dir.path().join("cache.hcl.tera");
        fs::write(&template, template_body)?;
        Ok(JobSpec {
            name: "cache".to_string(),
            template,
            variables: BTreeMap::from([("image".to_string(), json!("redis:7"))]),
            job_root: dir.path().join("jobs"),
        })
    }

    #[test]
    fn renders_variables_into_template() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let spec = spec(&dir, r#"job "cache" { image = "{{ image }}" }"#)?;
        let rendered = render_job(&spec)?;
        assert_eq!(
            String::from_utf8(rendered)?,
            r#"job "cache" { image = "redis:7" }"#
        );
        Ok(())
    }

    #[test]
    fn deploy_commits_and_reruns_unchanged() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let spec = spec(&dir, "job {{ image }}")?;

        assert!(deploy(&spec, JobAction::Create, Some(&AcceptAll))?);
        assert!(!deploy(&spec, JobAction::Create, Some(&AcceptAll))?);
        assert_eq!(fs::read_to_string(spec.job_path())?, "job redis:7");
        Ok(())
    }

    #[test]
    fn failed_validation_leaves_prior_file_untouched() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let spec = spec(&dir, "v2 {{ image }}")?;
        fs::create_dir_all(&spec.job_root)?;
        fs::write(spec.job_path(), "v1")?;

        let err = deploy(&spec, JobAction::Create, Some(&RejectAll))
            .expect_err("validator rejection should fail the deploy");
        assert!(matches!(err, JobError::Validation { .. }));
        assert_eq!(fs::read_to_string(spec.job_path())?, "v1");
        Ok(())
    }

    #[test]
    fn failed_validation_writes_nothing_when_absent() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let spec = spec(&dir, "{{ image }}")?;

        let err = deploy(&spec, JobAction::Create, Some(&RejectAll))
            .expect_err("validator rejection should fail the deploy");
        assert!(matches!(err, JobError::Validation { .. }));
        assert!(!spec.job_path().exists());
        Ok(())
    }

    #[test]
    fn delete_removes_job_definition_without_rendering() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let mut spec = spec(&dir, "{{ image }}")?;
        fs::create_dir_all(&spec.job_root)?;
        fs::write(spec.job_path(), "payload")?;
        // Template removal must not matter for deletes.
        fs::remove_file(&spec.template)?;
        spec.template = dir.path().join("gone.hcl.tera");

        assert!(deploy(&spec, JobAction::Delete, None)?);
        assert!(!spec.job_path().exists());
        assert!(!deploy(&spec, JobAction::Delete, None)?);
        Ok(())
    }

    #[test]
    fn template_errors_name_the_job() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let spec = spec(&dir, "{{ image | unknown_filter }}")?;
        let err = render_job(&spec).expect_err("unknown filter should fail");
        assert!(matches!(err, JobError::Template { ref name, .. } if name == "cache"));
        Ok(())
    }
}
