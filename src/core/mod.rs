//! core
//!
//! Domain types, configuration, path routing and locking for appgit.
//!
//! # Modules
//!
//! - [`types`] - Strong types: TenantId, AppId, BranchName, Oid, RemoteUrl, etc.
//! - [`config`] - Configuration schema and loading
//! - [`paths`] - Routing from repository suffixes to working tree paths
//! - [`ops`] - Per-path reader/writer locking
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Nothing here touches git; that is [`crate::git`]'s job

pub mod config;
pub mod ops;
pub mod paths;
pub mod types;
