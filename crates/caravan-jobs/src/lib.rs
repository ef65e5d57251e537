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

//! Job definition rendering and agent lifecycle invocation.
//!
//! Layout: `template.rs` (job specs, tera rendering, validate-then-commit
//! deployment), `invoke.rs` (agent CLI runner and the command seam),
//! `error.rs` (job errors).

pub mod error;
pub mod invoke;
pub mod template;

pub use error::{JobError, JobResult};
pub use invoke::{AgentCli, CommandOutput, CommandRunner, ProcessRunner, RecordingRunner};
pub use template::{JobAction, JobSpec, Validator, deploy, render_job};
