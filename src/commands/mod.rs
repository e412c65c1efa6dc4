//! Command implementations for the CLI
//!
//! This module contains the implementation of all CLI commands:
//! - run: Ingest device logs and accept tag commands
//! - tags: List the tag catalog
//! - config: Configuration display and validation

pub mod config;
pub mod run;
pub mod tags;
