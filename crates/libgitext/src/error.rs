use std::{fmt, io, path::PathBuf, result::Result as StdResult};

use liboutput::OutputError;
use thiserror::Error;

/// Custom Result type for gitext operations.
pub type Result<T> = StdResult<T, GitextError>;

/// Why a single git invocation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecErrorKind {
    /// The git binary could not be started.
    Spawn,
    /// The command ran past its deadline and was killed.
    Timeout,
    /// The command exited unsuccessfully; `None` when killed by a signal.
    NonZeroExit {
        /// Exit status code, if any.
        code: Option<i32>,
    },
    /// The command succeeded but its output could not be parsed.
    UnexpectedOutput,
}

impl fmt::Display for ExecErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn => f.write_str("could not be started"),
            Self::Timeout => f.write_str("timed out"),
            Self::NonZeroExit { code: Some(code) } => write!(f, "exited with status {code}"),
            Self::NonZeroExit { code: None } => f.write_str("was terminated by a signal"),
            Self::UnexpectedOutput => f.write_str("produced unexpected output"),
        }
    }
}

/// A failed git invocation, carrying the combined output so conflict markers
/// and diagnostics can be shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{command}` {kind}")]
pub struct ExecutionError {
    /// Failure classification.
    pub kind: ExecErrorKind,
    /// The command line, e.g. `git rebase origin/stage`.
    pub command: String,
    /// Combined stdout/stderr, trimmed.
    pub output: String,
}

impl ExecutionError {
    /// Build an error for `command` with the given kind and captured output.
    pub fn new(kind: ExecErrorKind, command: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            kind,
            command: command.into(),
            output: output.into(),
        }
    }

    /// Build an `UnexpectedOutput` error quoting the output that failed to parse.
    pub fn unexpected(command: impl Into<String>, output: impl Into<String>) -> Self {
        Self::new(ExecErrorKind::UnexpectedOutput, command, output)
    }
}

/// Which history-applying command hit a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// `git rebase` (including `rebase --onto`).
    Rebase,
    /// `git merge`.
    Merge,
}

impl ConflictKind {
    /// The command that resumes the operation once conflicts are resolved.
    pub fn continuation(self) -> &'static str {
        match self {
            Self::Rebase => "git rebase --continue",
            Self::Merge => "git commit",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rebase => f.write_str("rebase"),
            Self::Merge => f.write_str("merge"),
        }
    }
}

/// Coarse classification used by callers to decide how to react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// A check failed before anything was mutated.
    Precondition,
    /// A git command failed or produced unparseable output.
    Execution,
    /// A mutation stopped half way and needs the operator to finish it.
    Recoverable,
    /// Nothing can be done without a repository.
    Fatal,
    /// Configuration, terminal or user-abort failures.
    Other,
}

/// Gitext-specific error types
#[derive(Error, Debug)]
pub enum GitextError {
    /// No repository could be located from the starting directory.
    #[error("not in a git repository: {}", path.display())]
    NotARepository {
        /// Directory the search started from.
        path: PathBuf,
    },

    /// The `.gitext` file could not be read or failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A caller-supplied argument is not acceptable.
    #[error("{message}")]
    InvalidArgument {
        /// What was wrong.
        message: String,
        /// How to fix it.
        suggestion: String,
    },

    /// The working tree has staged, unstaged or untracked changes.
    #[error("working tree has uncommitted changes")]
    DirtyWorkingTree,

    /// The configured remote does not exist.
    #[error("remote '{remote}' does not exist")]
    RemoteNotFound {
        /// Remote name.
        remote: String,
    },

    /// A branch exists neither locally nor on the remote.
    #[error("branch '{branch}' does not exist locally or on '{remote}'")]
    BranchNotFound {
        /// Branch name.
        branch: String,
        /// Remote that was searched.
        remote: String,
    },

    /// A branch that is about to be created already exists locally.
    #[error("branch '{branch}' already exists")]
    BranchExists {
        /// Branch name.
        branch: String,
    },

    /// A branch name does not match the configured naming pattern.
    #[error("branch '{branch}' does not match pattern '{pattern}'")]
    PatternMismatch {
        /// Branch name that was checked.
        branch: String,
        /// Pattern it was checked against.
        pattern: String,
        /// Whether the caller may bypass the check with an override flag.
        overridable: bool,
    },

    /// A history rewrite was refused because other authors work on the branch.
    #[error("branch '{branch}' appears to be shared (recent authors: {})", authors.join(", "))]
    SharedBranch {
        /// Branch name.
        branch: String,
        /// Distinct authors found in the sampled window.
        authors: Vec<String>,
    },

    /// A rebase or merge stopped on conflicts; the repository is left mid-operation.
    #[error("{kind} onto {onto} stopped with conflicts")]
    Conflict {
        /// Which command conflicted.
        kind: ConflictKind,
        /// The ref being applied.
        onto: String,
        /// Captured git output, including conflict details.
        output: String,
    },

    /// A protected branch could not be fast-forwarded to its remote.
    #[error("fast-forward of '{branch}' to {remote}/{branch} is not possible")]
    FastForwardRejected {
        /// Local branch.
        branch: String,
        /// Remote name.
        remote: String,
        /// Captured git output.
        output: String,
    },

    /// A command failed. Displays as the command and how it failed.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// The operation was cancelled by the user.
    #[error("Aborted by user")]
    UserAborted,

    /// Writing to the output channel failed.
    #[error("output error: {0}")]
    Output(String),

    /// An underlying I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<OutputError> for GitextError {
    fn from(err: OutputError) -> Self {
        match err {
            OutputError::Cancelled => Self::UserAborted,
            other => Self::Output(other.to_string()),
        }
    }
}

impl GitextError {
    /// Classify this error.
    pub fn class(&self) -> FailureClass {
        match self {
            Self::InvalidArgument { .. }
            | Self::DirtyWorkingTree
            | Self::RemoteNotFound { .. }
            | Self::BranchNotFound { .. }
            | Self::BranchExists { .. }
            | Self::PatternMismatch { .. }
            | Self::SharedBranch { .. } => FailureClass::Precondition,
            Self::Conflict { .. } | Self::FastForwardRejected { .. } => FailureClass::Recoverable,
            Self::Execution(_) => FailureClass::Execution,
            Self::NotARepository { .. } => FailureClass::Fatal,
            Self::InvalidConfig(_) | Self::UserAborted | Self::Output(_) | Self::Io(_) => {
                FailureClass::Other
            }
        }
    }

    /// Whether the repository was left mid-operation and needs manual action.
    pub fn is_recoverable(&self) -> bool {
        self.class() == FailureClass::Recoverable
    }

    /// The command that continues a conflicted operation, if this is a conflict.
    pub fn continuation(&self) -> Option<&'static str> {
        match self {
            Self::Conflict { kind, .. } => Some(kind.continuation()),
            _ => None,
        }
    }

    /// Corrective suggestion shown next to the error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::NotARepository { .. } => {
                Some("run this command from within a git repository".to_string())
            }
            Self::InvalidConfig(_) => Some("fix the .gitext file in the repository root".to_string()),
            Self::InvalidArgument { suggestion, .. } => Some(suggestion.clone()),
            Self::DirtyWorkingTree => Some("commit or stash changes first".to_string()),
            Self::RemoteNotFound { remote } => Some(format!("run 'git remote add {remote} <url>'")),
            Self::BranchNotFound { remote, .. } => Some(format!(
                "check the branch names in .gitext or run 'git fetch {remote}'"
            )),
            Self::BranchExists { branch } => Some(format!(
                "switch to it with 'git checkout {branch}' or choose another slug"
            )),
            Self::PatternMismatch {
                pattern,
                overridable,
                ..
            } => Some(if *overridable {
                "use --override to bypass".to_string()
            } else {
                format!("use a branch name matching '{pattern}'")
            }),
            Self::SharedBranch { .. } => Some(
                "coordinate with the other authors, or use --i-know-what-im-doing to proceed"
                    .to_string(),
            ),
            Self::Conflict { kind, .. } => Some(format!(
                "resolve conflicts, then run: {}",
                kind.continuation()
            )),
            Self::FastForwardRejected { branch, remote, .. } => Some(format!(
                "branch has diverged, run: git pull --rebase {remote} {branch}"
            )),
            Self::Execution(err) if err.kind == ExecErrorKind::Timeout => {
                Some("check connectivity to the remote and run the command again".to_string())
            }
            Self::Execution(_) | Self::UserAborted | Self::Output(_) | Self::Io(_) => None,
        }
    }

    /// Return the recommended process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UserAborted => 130,
            Self::NotARepository { .. } => 128,
            _ => match self.class() {
                FailureClass::Precondition => 2,
                FailureClass::Recoverable => 3,
                FailureClass::Execution => 4,
                FailureClass::Fatal | FailureClass::Other => 1,
            },
        }
    }
}
