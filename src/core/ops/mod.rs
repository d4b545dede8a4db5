//! core::ops
//!
//! Concurrency control for repository operations.
//!
//! # Modules
//!
//! - [`lock`] - Shared/exclusive per-path locks
//!
//! # Architecture
//!
//! Every service operation:
//! 1. Resolves the paths it reads and writes
//! 2. Acquires one [`LockSet`] covering them before touching disk
//! 3. Holds it until the operation returns

pub mod lock;

pub use lock::{LockError, LockMode, LockSet, PathLock};
