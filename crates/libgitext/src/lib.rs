#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
//! Workflow safety engine for a two-branch (stage/production) git workflow.
//!
//! Before any mutating operation runs, the engine decides whether it is
//! safe, which git subcommands to issue, and how to report a failure part
//! way through. All repository changes are delegated to the `git` binary.
//! The CLI binary in `crates/gitext` builds on top of this library.

/// Typed failures and their exit codes.
pub mod error;
/// Running git with dry-run, verbose echo and timeouts.
pub mod exec;
/// Read-only repository queries.
pub mod git;
/// The `.gitext` policy file.
pub mod policy;
/// Pure safety checks.
pub mod validate;
/// Sync, start, update, retarget, cleanup, status and PR preparation.
pub mod workflow;

/// Scripted runners and repository fixtures for unit tests.
#[cfg(test)]
mod testing;

/// Re-exports of the main entry points.
pub use error::{ConflictKind, ExecErrorKind, ExecutionError, FailureClass, GitextError, Result};
pub use exec::{Access, CommandResult, ExecOptions, Executor, Invocation, ProcessRunner, Runner};
pub use git::{Divergence, Inspector, RepositoryState};
pub use policy::{BranchKind, Policy, Target};
pub use workflow::{
    CleanupReport, Gitext, PullRequestDraft, RetargetOptions, RetargetReport, StartReport,
    StatusReport, SyncReport, UpdateMode, UpdateReport,
};
