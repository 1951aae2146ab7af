//! Scripted [`Runner`] for exercising workflows without a repository.

use std::{
    fs,
    path::Path,
    process::Command,
    result::Result as StdResult,
    sync::{Arc, Mutex, PoisonError},
};

use anyhow::ensure;

use crate::{
    error::{ExecErrorKind, ExecutionError},
    exec::{Access, Captured, Invocation, Runner},
};

/// Shared log of every invocation that reached the runner.
#[derive(Clone, Default)]
pub struct Journal {
    /// Recorded invocations, in order.
    entries: Arc<Mutex<Vec<Invocation>>>,
}

impl Journal {
    /// Record one invocation.
    fn push(&self, invocation: &Invocation) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(invocation.clone());
    }

    /// All recorded invocations.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Command lines of all recorded invocations.
    pub fn commands(&self) -> Vec<String> {
        self.invocations()
            .iter()
            .map(Invocation::command_line)
            .collect()
    }

    /// Command lines of recorded write invocations.
    pub fn writes(&self) -> Vec<String> {
        self.invocations()
            .iter()
            .filter(|inv| inv.access == Access::Write)
            .map(Invocation::command_line)
            .collect()
    }

    /// Whether any recorded command line starts with `prefix`.
    pub fn issued(&self, prefix: &str) -> bool {
        self.commands().iter().any(|cmd| cmd.starts_with(prefix))
    }
}

/// A canned response for invocations whose arguments start with `prefix`.
struct Rule {
    /// Argument prefix to match.
    prefix: Vec<String>,
    /// Stdout on success, or exit code and combined output on failure.
    response: StdResult<String, (i32, String)>,
}

/// Runner that answers from a list of rules; the most recently added match
/// wins, so a base script can be specialised. Unmatched invocations succeed
/// with empty output.
#[derive(Default)]
pub struct Script {
    /// Rules in insertion order.
    rules: Vec<Rule>,
    /// Where invocations are recorded.
    journal: Journal,
}

impl Script {
    /// Empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer invocations starting with `prefix` with `stdout`.
    pub fn ok(mut self, prefix: &[&str], stdout: &str) -> Self {
        self.rules.push(Rule {
            prefix: prefix.iter().map(|s| (*s).to_string()).collect(),
            response: Ok(stdout.to_string()),
        });
        self
    }

    /// Fail invocations starting with `prefix` with exit `code` and `output`.
    pub fn fail(mut self, prefix: &[&str], code: i32, output: &str) -> Self {
        self.rules.push(Rule {
            prefix: prefix.iter().map(|s| (*s).to_string()).collect(),
            response: Err((code, output.to_string())),
        });
        self
    }

    /// Handle on the journal, valid after the script is moved into an executor.
    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }
}

impl Runner for Script {
    fn run(&self, invocation: &Invocation) -> StdResult<Captured, ExecutionError> {
        self.journal.push(invocation);
        let rule = self
            .rules
            .iter()
            .rev()
            .find(|rule| invocation.args.starts_with(&rule.prefix));
        match rule.map(|rule| &rule.response) {
            None => Ok(Captured::default()),
            Some(Ok(stdout)) => Ok(Captured {
                stdout: stdout.clone(),
                stderr: String::new(),
            }),
            Some(Err((code, output))) => Err(ExecutionError::new(
                ExecErrorKind::NonZeroExit { code: Some(*code) },
                invocation.command_line(),
                output.clone(),
            )),
        }
    }
}

/// Run a real git command in `repo`, failing the test on error.
pub fn git(repo: &Path, args: &[&str]) -> anyhow::Result<String> {
    let output = Command::new("git")
        .current_dir(repo)
        .args(args)
        .output()?;
    ensure!(
        output.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Initialise a repository on `production` with one commit by "Test User".
pub fn init_repo(repo: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(repo)?;
    git(repo, &["init", "-b", "production"])?;
    git(repo, &["config", "user.email", "test@example.com"])?;
    git(repo, &["config", "user.name", "Test User"])?;
    fs::write(repo.join("README.md"), "# Test Repo")?;
    git(repo, &["add", "README.md"])?;
    git(repo, &["commit", "-m", "Initial commit"])?;
    Ok(())
}
