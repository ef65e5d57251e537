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

//! Option schemas and configuration rendering for the scheduler agent.
//!
//! Layout: `section.rs` (section descriptors and path conventions),
//! `schema.rs` (static option tables and value constraints), `render.rs`
//! (validated option sets and JSON rendering), `error.rs` (schema errors).

pub mod error;
pub mod render;
pub mod schema;
pub mod section;

pub use error::{SchemaError, SchemaResult};
pub use render::{OptionSet, render};
pub use schema::{OptionKind, OptionSchema, schema_for};
pub use section::{
    CONFIG_FILE_MODE, DEFAULT_CONFIG_ROOT, DEFAULT_JOB_ROOT, Section, config_file_name,
    config_file_path,
};
