//! # Machete CLI Library
//!
//! Command definitions, rendering and output helpers behind the `machete`
//! binary.

pub mod cli;
pub mod output;
pub mod render;
