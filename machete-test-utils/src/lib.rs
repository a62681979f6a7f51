//! Test utilities shared across the machete workspace
//!
//! Temporary git repositories ([`GitRepoTestGuard`]) plus helpers to grow
//! branches in them and drop a layout file next to them.
//!
//! The clippy dead_code lint is disabled for this crate because test utilities
//! may not be used by all tests, and the compiler cannot detect usage across
//! crate boundaries in development dependencies.

#![allow(dead_code)]

pub mod git;

pub use git::{
  GitRepoTestGuard, checkout_branch, create_branch, create_commit, head_commit, read_layout, set_upstream,
  write_layout,
};
