#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
    result::Result as StdResult,
    sync::{Arc, Mutex, PoisonError},
};

use anyhow::{Context, Result, ensure};
use libgitext::{
    Access, ExecOptions, ExecutionError, Executor, Gitext, Invocation, Policy, ProcessRunner,
    Runner, exec::Captured,
};
use liboutput::Capture;
use tempfile::TempDir;

/// Run a git command inside `repo_path`, ensuring it succeeds. Returns trimmed stdout.
pub fn git(repo_path: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .current_dir(repo_path)
        .args(args)
        .output()
        .with_context(|| format!("failed to run git {}", args.join(" ")))?;

    ensure!(
        output.status.success(),
        "git command failed: git {}\nstdout: {}\nstderr: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Set a commit identity on `repo_path`.
pub fn identify(repo_path: &Path, name: &str) -> Result<()> {
    git(repo_path, &["config", "user.email", "test@example.com"])?;
    git(repo_path, &["config", "user.name", name])?;
    Ok(())
}

/// Write `file` and commit it.
pub fn commit_file(repo_path: &Path, file: &str, contents: &str, message: &str) -> Result<()> {
    fs::write(repo_path.join(file), contents)?;
    git(repo_path, &["add", file])?;
    git(repo_path, &["commit", "-m", message])?;
    Ok(())
}

/// A bare remote carrying `production` and `stage` (one commit ahead of
/// production), and a working clone of it checked out on `production`.
pub struct Fixture {
    /// Owns every directory below.
    pub temp_dir: TempDir,
    /// The bare remote, known to the clone as `origin`.
    pub remote: PathBuf,
    /// Repository used to push new remote history.
    pub seed: PathBuf,
    /// The clone workflows run in.
    pub work: PathBuf,
}

impl Fixture {
    /// Build the remote, seed and clone.
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        let seed = root.join("seed");
        let remote = root.join("remote.git");
        let work = root.join("work");

        fs::create_dir_all(&seed)?;
        git(&seed, &["init", "-b", "production"])?;
        identify(&seed, "Seed User")?;
        commit_file(&seed, "README.md", "# Test Project\n", "Initial commit")?;
        git(&seed, &["checkout", "-b", "stage"])?;
        commit_file(&seed, "stage.txt", "integration\n", "Stage work")?;

        git(root, &["init", "--bare", "-b", "production", "remote.git"])?;
        let remote_url = remote.to_str().context("non-utf8 temp path")?;
        git(&seed, &["remote", "add", "origin", remote_url])?;
        git(&seed, &["push", "origin", "production", "stage"])?;

        git(root, &["clone", remote_url, "work"])?;
        identify(&work, "Test User")?;

        Ok(Self {
            temp_dir,
            remote,
            seed,
            work,
        })
    }

    /// Push a new commit to `branch` on the remote through the seed repository.
    pub fn advance_remote(&self, branch: &str, file: &str, contents: &str) -> Result<()> {
        git(&self.seed, &["checkout", branch])?;
        commit_file(&self.seed, file, contents, &format!("Update {file}"))?;
        git(&self.seed, &["push", "origin", branch])?;
        Ok(())
    }

    /// Local branches of the working clone.
    pub fn branches(&self) -> Result<Vec<String>> {
        let output = git(&self.work, &["branch", "--format=%(refname:short)"])?;
        Ok(output.lines().map(str::to_string).collect())
    }

    /// Engine over the working clone, recording every invocation.
    pub fn engine(&self, dry_run: bool) -> Result<Engine> {
        let policy = Policy::load(&self.work)?;
        let recorder = Recorder::default();
        let capture = Capture::new();
        let exec = Executor::with_runner(
            Box::new(recorder.clone()),
            ExecOptions {
                dry_run,
                ..ExecOptions::default()
            },
            Arc::new(capture.clone()),
        )
        .in_dir(&policy.root);
        Ok(Engine {
            gx: Gitext::new(policy, exec, Arc::new(capture.clone())),
            recorder,
            capture,
        })
    }
}

/// A [`Gitext`] plus what it did.
pub struct Engine {
    /// The engine.
    pub gx: Gitext,
    /// Invocations that reached git.
    pub recorder: Recorder,
    /// Narration.
    pub capture: Capture,
}

/// Runs real git and remembers each invocation.
#[derive(Clone, Default)]
pub struct Recorder {
    /// Backend.
    inner: ProcessRunner,
    /// Invocations, in order.
    log: Arc<Mutex<Vec<Invocation>>>,
}

impl Recorder {
    /// Command lines of the write invocations that ran.
    pub fn writes(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|inv| inv.access == Access::Write)
            .map(Invocation::command_line)
            .collect()
    }

    /// Forget what has been recorded so far.
    pub fn clear(&self) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Runner for Recorder {
    fn run(&self, invocation: &Invocation) -> StdResult<Captured, ExecutionError> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(invocation.clone());
        self.inner.run(invocation)
    }
}
