#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Output},
};

use anyhow::{Context, Result, ensure};
use tempfile::TempDir;

/// Return the path to the compiled `gitext` binary.
pub fn gitext_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_gitext"))
}

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

/// Write `file` and commit it with the repository's identity.
pub fn commit_file(repo_path: &Path, file: &str, contents: &str, message: &str) -> Result<()> {
    fs::write(repo_path.join(file), contents)?;
    git(repo_path, &["add", file])?;
    git(repo_path, &["commit", "-m", message])?;
    Ok(())
}

/// A bare remote with `production` and `stage`, and a clone of it on
/// `production`.
pub struct Project {
    /// Owns both repositories.
    pub temp_dir: TempDir,
    /// Repository that feeds the remote.
    pub seed: PathBuf,
    /// The clone the binary runs in.
    pub work: PathBuf,
}

impl Project {
    /// Build the remote and the clone.
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        let seed = root.join("seed");
        let work = root.join("work");

        fs::create_dir_all(&seed)?;
        git(&seed, &["init", "-b", "production"])?;
        git(&seed, &["config", "user.email", "seed@example.com"])?;
        git(&seed, &["config", "user.name", "Seed User"])?;
        commit_file(&seed, "README.md", "# Test Project\n", "Initial commit")?;
        git(&seed, &["checkout", "-b", "stage"])?;
        commit_file(&seed, "stage.txt", "integration\n", "Stage work")?;

        git(root, &["init", "--bare", "-b", "production", "remote.git"])?;
        let remote = root.join("remote.git");
        let remote_url = remote.to_str().context("non-utf8 temp path")?;
        git(&seed, &["remote", "add", "origin", remote_url])?;
        git(&seed, &["push", "origin", "production", "stage"])?;

        git(root, &["clone", remote_url, "work"])?;
        git(&work, &["config", "user.email", "test@example.com"])?;
        git(&work, &["config", "user.name", "Test User"])?;

        Ok(Self {
            temp_dir,
            seed,
            work,
        })
    }

    /// Push a new commit to `branch` on the remote.
    pub fn advance_remote(&self, branch: &str, file: &str) -> Result<()> {
        git(&self.seed, &["checkout", branch])?;
        commit_file(&self.seed, file, "remote change\n", &format!("Add {file}"))?;
        git(&self.seed, &["push", "origin", branch])?;
        Ok(())
    }

    /// Run `gitext` in the clone with colors off and no prompts.
    pub fn run(&self, args: &[&str]) -> Result<Output> {
        run_gitext(&self.work, args)
    }

    /// The clone's current branch.
    pub fn current_branch(&self) -> Result<String> {
        git(&self.work, &["rev-parse", "--abbrev-ref", "HEAD"])
    }
}

/// Run `gitext` in `dir` with colors off and no prompts.
pub fn run_gitext(dir: &Path, args: &[&str]) -> Result<Output> {
    Command::new(gitext_binary())
        .current_dir(dir)
        .args(["--no-color", "--no-prompt"])
        .args(args)
        .env_remove("GITEXT_LOG")
        .output()
        .with_context(|| format!("failed to run gitext {}", args.join(" ")))
}

/// Stdout of a finished run.
pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Stderr of a finished run.
pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}
