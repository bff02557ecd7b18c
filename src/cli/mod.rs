//! CLI module for the tutorpad application
//!
//! This module handles the command-line interface for interacting with the
//! note workspace.

mod app;

pub use app::*;
