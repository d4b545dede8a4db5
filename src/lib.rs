//! appgit - Git version control for multi-tenant application workspaces
//!
//! Every application owned by a tenant lives in its own git working tree
//! under a shared root. The default branch sits at
//! `<root>/<tenant>/<app>/repo`; every other branch gets its own working
//! tree nested inside it. Remotes are reached over SSH with a deploy key
//! supplied per call.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to service)
//! - [`service`] - Operations: locking, path routing, and the git calls they need
//! - [`core`] - Domain types, configuration, paths, and locks
//! - [`git`] - Single interface for all Git operations
//! - [`auth`] - Deploy key material
//!
//! # Correctness Invariants
//!
//! 1. Writers to one working tree are serialized; readers share
//! 2. A failed clone or branch creation leaves nothing behind
//! 3. Pushes are never forced and merges never auto-resolve
//! 4. Key material never reaches logs, errors, or output

pub mod auth;
pub mod cli;
pub mod core;
pub mod git;
pub mod service;
