use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    result::Result as StdResult,
};

use crate::{
    error::{ExecErrorKind, ExecutionError},
    exec::Executor,
};

/// Result alias for inspector queries.
type Result<T> = StdResult<T, ExecutionError>;

/// Walk up from `start_dir` to find the nearest repository root containing a `.git` entry.
pub fn find_root(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir;
    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

/// Commits a local ref has that its remote counterpart lacks, and vice versa.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence {
    /// The remote-tracking ref compared against, e.g. `origin/stage`.
    pub remote_ref: String,
    /// Commits only on the local side.
    pub ahead: u32,
    /// Commits only on the remote side.
    pub behind: u32,
}

impl Divergence {
    /// Whether the two sides point at the same history.
    pub fn is_up_to_date(&self) -> bool {
        self.ahead == 0 && self.behind == 0
    }
}

/// Point-in-time view of the repository, captured when a workflow starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryState {
    /// Short name of `HEAD` (`HEAD` itself when detached).
    pub current_branch: String,
    /// No staged, unstaged or untracked changes.
    pub is_clean: bool,
    /// `HEAD` does not point at a branch.
    pub is_detached_head: bool,
    /// Current branch against its remote counterpart, when both refs exist.
    pub divergence: Option<Divergence>,
    /// Distinct authors of the most recent commits, first seen first.
    pub recent_authors: Vec<String>,
    /// Branches merged into the protected branches; filled by cleanup.
    pub merged_branches: Vec<String>,
}

/// Drop empty lines and duplicates, keeping first-seen order.
fn unique_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    lines
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(*line))
        .map(str::to_string)
        .collect()
}

/// Parse the `<left>\t<right>` output of `rev-list --left-right --count`.
fn parse_left_right(command: &str, output: &str) -> Result<(u32, u32)> {
    let parts: Vec<&str> = output.split_whitespace().collect();
    let [left, right] = parts.as_slice() else {
        return Err(ExecutionError::unexpected(command, output));
    };
    let parse = |s: &str| {
        s.parse::<u32>()
            .map_err(|_| ExecutionError::unexpected(command, output))
    };
    Ok((parse(*left)?, parse(*right)?))
}

/// Whether a failure is git saying "no" rather than git being unusable.
fn is_negative_answer(err: &ExecutionError) -> bool {
    matches!(err.kind, ExecErrorKind::NonZeroExit { .. })
}

/// Read-only queries over a repository. Every call issues fresh git
/// invocations; nothing is cached.
pub struct Inspector<'a> {
    /// Executor the queries run through.
    exec: &'a Executor,
}

impl<'a> Inspector<'a> {
    /// Inspector over the repository `exec` runs in.
    pub fn new(exec: &'a Executor) -> Self {
        Self { exec }
    }

    /// Fail unless the working directory is inside a repository.
    pub fn validate_repository(&self) -> Result<()> {
        self.exec.read(&["rev-parse", "--git-dir"])?;
        Ok(())
    }

    /// Short name of the checked-out branch, or `HEAD` when detached.
    pub fn current_branch(&self) -> Result<String> {
        self.exec.read(&["rev-parse", "--abbrev-ref", "HEAD"])
    }

    /// Whether the repository has no staged, unstaged or untracked changes.
    pub fn is_clean(&self) -> Result<bool> {
        let status = self.exec.read(&["status", "--porcelain"])?;
        Ok(status.trim().is_empty())
    }

    /// Whether `HEAD` is detached. A failing `symbolic-ref` is itself the signal,
    /// so this query never errors.
    pub fn is_detached_head(&self) -> bool {
        match self.exec.read(&["symbolic-ref", "-q", "HEAD"]) {
            Ok(target) => target.trim().is_empty(),
            Err(_) => true,
        }
    }

    /// Whether `remote` is configured with a URL.
    pub fn remote_exists(&self, remote: &str) -> Result<bool> {
        match self.exec.read(&["remote", "get-url", remote]) {
            Ok(url) => Ok(!url.is_empty()),
            Err(err) if is_negative_answer(&err) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Determine if a local branch named exactly `branch` exists. `branch
    /// --list` treats its argument as a glob, so only an exact line counts.
    pub fn branch_exists(&self, branch: &str) -> Result<bool> {
        let output = self.exec.read(&["branch", "--list", branch])?;
        Ok(output
            .lines()
            .map(|line| line.trim_start_matches(['*', '+']).trim())
            .any(|line| line == branch))
    }

    /// Whether `remote` currently has a branch named `branch`. Asks the remote
    /// itself, so the answer does not depend on the last fetch.
    pub fn remote_branch_exists(&self, remote: &str, branch: &str) -> Result<bool> {
        let refname = format!("refs/heads/{branch}");
        let output = self.exec.read(&["ls-remote", "--heads", remote, &refname])?;
        Ok(!output.trim().is_empty())
    }

    /// Whether a fully-qualified ref resolves locally.
    pub fn ref_exists(&self, refname: &str) -> Result<bool> {
        match self.exec.read(&["rev-parse", "--verify", "--quiet", refname]) {
            Ok(_) => Ok(true),
            Err(err) if is_negative_answer(&err) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Ahead/behind counts of `local` relative to `<remote>/<branch>`.
    pub fn ahead_behind(&self, remote: &str, branch: &str, local: &str) -> Result<Divergence> {
        let remote_ref = format!("{remote}/{branch}");
        let range = format!("{remote_ref}...{local}");
        let args = ["rev-list", "--left-right", "--count", range.as_str()];
        let output = self.exec.read(&args)?;
        let (behind, ahead) = parse_left_right(&format!("git {}", args.join(" ")), &output)?;
        Ok(Divergence {
            remote_ref,
            ahead,
            behind,
        })
    }

    /// Ahead/behind counts of local `branch` against `<remote>/<branch>`, or
    /// `None` when either ref is missing locally.
    pub fn divergence(&self, remote: &str, branch: &str) -> Result<Option<Divergence>> {
        let local = format!("refs/heads/{branch}");
        let tracking = format!("refs/remotes/{remote}/{branch}");
        if !self.ref_exists(&local)? || !self.ref_exists(&tracking)? {
            return Ok(None);
        }
        self.ahead_behind(remote, branch, branch).map(Some)
    }

    /// Distinct authors of the last `count` commits on `HEAD`, first seen first.
    pub fn recent_authors(&self, count: usize) -> Result<Vec<String>> {
        let limit = count.to_string();
        let output = self.exec.read(&["log", "-n", &limit, "--format=%an"])?;
        Ok(unique_lines(output.lines()))
    }

    /// Local branches fully merged into `into`, excluding `into` itself.
    pub fn merged_branches(&self, into: &str) -> Result<Vec<String>> {
        let output = self
            .exec
            .read(&["branch", "--merged", into, "--format", "%(refname:short)"])?;
        Ok(unique_lines(output.lines())
            .into_iter()
            .filter(|branch| branch != into && !branch.starts_with('('))
            .collect())
    }

    /// Whether the index differs from `HEAD`.
    pub fn has_staged_changes(&self) -> Result<bool> {
        match self.exec.read(&["diff", "--cached", "--quiet"]) {
            Ok(_) => Ok(false),
            Err(err) if err.kind == (ExecErrorKind::NonZeroExit { code: Some(1) }) => Ok(true),
            Err(err) => Err(err),
        }
    }

    /// One-line summaries of commits reachable from `head` but not `base`.
    pub fn commits_between(&self, base: &str, head: &str) -> Result<Vec<String>> {
        let range = format!("{base}..{head}");
        let output = self.exec.read(&["log", "--oneline", &range])?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Capture the state a workflow starts from.
    ///
    /// `window` is the number of recent commits sampled for authors. An
    /// unborn branch (no commits yet) yields no authors rather than an error.
    pub fn snapshot(&self, remote: &str, window: usize) -> Result<RepositoryState> {
        let is_detached_head = self.is_detached_head();
        let current_branch = self.current_branch()?;
        let is_clean = self.is_clean()?;
        let divergence = if is_detached_head {
            None
        } else {
            self.divergence(remote, &current_branch)?
        };
        let recent_authors = match self.recent_authors(window) {
            Ok(authors) => authors,
            Err(err) if is_negative_answer(&err) => Vec::new(),
            Err(err) => return Err(err),
        };

        Ok(RepositoryState {
            current_branch,
            is_clean,
            is_detached_head,
            divergence,
            recent_authors,
            merged_branches: Vec::new(),
        })
    }
}
