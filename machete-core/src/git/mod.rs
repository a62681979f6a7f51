//! Git-backed collaborators of the engine.
//!
//! [`oracle`] answers commit-graph questions through `git2`; [`repository`]
//! ties a discovered repository to its layout file.

pub mod oracle;
pub mod repository;

pub use oracle::{Git2Oracle, fork_point_override_key};
pub use repository::{LAYOUT_FILE_NAME, MacheteRepository, default_layout_path, discover_repository};
