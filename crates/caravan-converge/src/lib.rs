#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Idempotent file convergence: bring a single on-disk file to a declared
//! desired state and report whether anything changed.
//!
//! The engine is split into a pure [`plan`] step that inspects the target
//! without touching it and an [`converge`] step that applies the plan.
//! Writes are wholesale replacements through a temp-file rename; content is
//! treated as sensitive and never logged.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

pub mod error;

pub use error::{ConvergeError, ConvergeResult};

/// Desired state of one target file.
#[derive(Debug, Clone)]
pub struct DesiredFile {
    /// Absolute path of the target.
    pub path: PathBuf,
    /// Exact byte content the file should hold.
    pub content: Vec<u8>,
    /// Permission bits the file should carry.
    pub mode: u32,
}

impl DesiredFile {
    /// Describe a desired file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, content: Vec<u8>, mode: u32) -> Self {
        Self {
            path: path.into(),
            content,
            mode,
        }
    }
}

/// Desired lifecycle action for a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Ensure the file exists with the desired content and mode.
    Create,
    /// Ensure the file is absent.
    Delete,
}

/// Minimal action [`converge`] would take for a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanChange {
    /// Target is absent and would be created.
    CreateFile,
    /// Target exists with diverging content and would be replaced.
    ReplaceContent,
    /// Content matches but permission bits diverge.
    ReplaceMode,
    /// Target exists and would be removed.
    RemoveFile,
    /// On-disk state already matches; nothing to do.
    Unchanged,
}

impl PlanChange {
    /// Whether applying this plan reports a change.
    #[must_use]
    pub const fn would_change(self) -> bool {
        !matches!(self, Self::Unchanged)
    }

    /// Render the plan as a short action label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateFile => "create",
            Self::ReplaceContent => "replace content",
            Self::ReplaceMode => "replace mode",
            Self::RemoveFile => "remove",
            Self::Unchanged => "unchanged",
        }
    }
}

/// Compute the minimal action for `desired` without performing any write.
///
/// Content comparison is byte-exact; permission bits are compared exactly
/// on Unix and ignored elsewhere.
///
/// # Errors
///
/// Returns [`ConvergeError::Io`] when the current state cannot be read.
pub fn plan(desired: &DesiredFile, action: Action) -> ConvergeResult<PlanChange> {
    let exists = desired.path.exists();

    match action {
        Action::Delete => Ok(if exists {
            PlanChange::RemoveFile
        } else {
            PlanChange::Unchanged
        }),
        Action::Create => {
            if !exists {
                return Ok(PlanChange::CreateFile);
            }
            let current = fs::read(&desired.path)
                .map_err(|err| ConvergeError::io("read", &desired.path, err))?;
            if current != desired.content {
                return Ok(PlanChange::ReplaceContent);
            }
            if mode_diverges(&desired.path, desired.mode)? {
                return Ok(PlanChange::ReplaceMode);
            }
            Ok(PlanChange::Unchanged)
        }
    }
}

/// Converge the target to its desired state, returning whether a change was
/// performed.
///
/// Create ensures the parent directory exists (directory creation is
/// skipped entirely for deletes) and replaces the file wholesale through an
/// atomic temp-file rename. Immediate re-runs with identical inputs report
/// no change.
///
/// # Errors
///
/// Returns [`ConvergeError::Io`] when inspection, directory creation, or
/// the write itself fails. A failed write leaves no partial file behind.
pub fn converge(desired: &DesiredFile, action: Action) -> ConvergeResult<bool> {
    if action == Action::Create {
        ensure_parent_dir(&desired.path)?;
    }

    let change = plan(desired, action)?;
    match change {
        PlanChange::Unchanged => {
            debug!(path = %desired.path.display(), "target already converged");
            return Ok(false);
        }
        PlanChange::RemoveFile => {
            fs::remove_file(&desired.path)
                .map_err(|err| ConvergeError::io("remove", &desired.path, err))?;
        }
        PlanChange::CreateFile | PlanChange::ReplaceContent | PlanChange::ReplaceMode => {
            write_atomic(desired)?;
        }
    }

    debug!(
        path = %desired.path.display(),
        action = change.as_str(),
        "converged target"
    );
    Ok(true)
}

fn ensure_parent_dir(path: &Path) -> ConvergeResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|err| ConvergeError::io("create_dir", parent, err))?;
    }
    Ok(())
}

fn write_atomic(desired: &DesiredFile) -> ConvergeResult<()> {
    let parent = desired
        .path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

    let mut staged = NamedTempFile::new_in(&parent)
        .map_err(|err| ConvergeError::io("create_temp", &parent, err))?;
    staged
        .write_all(&desired.content)
        .map_err(|err| ConvergeError::io("write", &desired.path, err))?;
    set_mode(staged.as_file(), &desired.path, desired.mode)?;
    staged
        .persist(&desired.path)
        .map_err(|err| ConvergeError::io("rename", &desired.path, err.error))?;
    Ok(())
}

#[cfg(unix)]
fn mode_diverges(path: &Path, mode: u32) -> ConvergeResult<bool> {
    let metadata = fs::metadata(path).map_err(|err| ConvergeError::io("stat", path, err))?;
    Ok(metadata.permissions().mode() & 0o7777 != mode)
}

#[cfg(not(unix))]
fn mode_diverges(_path: &Path, _mode: u32) -> ConvergeResult<bool> {
    Ok(false)
}

#[cfg(unix)]
fn set_mode(file: &fs::File, path: &Path, mode: u32) -> ConvergeResult<()> {
    file.set_permissions(fs::Permissions::from_mode(mode))
        .map_err(|err| ConvergeError::io("chmod", path, err))
}

#[cfg(not(unix))]
fn set_mode(_file: &fs::File, _path: &Path, _mode: u32) -> ConvergeResult<()> {
    Ok(())
}
