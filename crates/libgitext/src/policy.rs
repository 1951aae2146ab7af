use std::{
    collections::BTreeMap,
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    error::{GitextError, Result},
    git::find_root,
    validate::matches_pattern,
};

/// Name of the policy file at the repository root.
pub const CONFIG_FILE: &str = ".gitext";

/// Default production branch name.
pub const DEFAULT_PRODUCTION_BRANCH: &str = "production";
/// Default stage branch name.
pub const DEFAULT_STAGE_BRANCH: &str = "stage";
/// Default remote name.
pub const DEFAULT_REMOTE_NAME: &str = "origin";
/// Default feature branch pattern.
pub const DEFAULT_FEATURE_PATTERN: &str = "feature/*";
/// Default hotfix branch pattern.
pub const DEFAULT_HOTFIX_PATTERN: &str = "hotfix/*";
/// Default number of recent commits sampled by the shared-branch check.
pub const DEFAULT_SHARED_WINDOW: usize = 10;

/// One of the two protected branches, as named on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// The integration branch.
    Stage,
    /// The release branch.
    Production,
}

impl Target {
    /// The name used on the command line and as the CI table key.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stage => "stage",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = GitextError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "stage" => Ok(Self::Stage),
            "production" => Ok(Self::Production),
            other => Err(GitextError::InvalidArgument {
                message: format!("invalid target '{other}'"),
                suggestion: "use 'stage' or 'production'".to_string(),
            }),
        }
    }
}

/// What a branch is, according to the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    /// The configured production branch.
    Production,
    /// The configured stage branch.
    Stage,
    /// Matches the feature pattern.
    Feature,
    /// Matches the hotfix pattern.
    Hotfix,
    /// Anything else.
    Other,
}

/// `branch:` section of the policy file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchSection {
    /// Production branch name.
    pub production: Option<String>,
    /// Stage branch name.
    pub stage: Option<String>,
}

/// `naming:` section of the policy file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingSection {
    /// Feature branch pattern.
    pub feature: Option<String>,
    /// Hotfix branch pattern.
    pub hotfix: Option<String>,
}

/// `pr:` section of the policy file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrSection {
    /// PR template, relative to the repository root.
    pub template_path: Option<String>,
}

/// `remote:` section of the policy file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSection {
    /// Remote name.
    pub name: Option<String>,
}

/// `safety:` section of the policy file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SafetySection {
    /// Commits sampled by the shared-branch check.
    pub shared_window: Option<usize>,
}

/// The `.gitext` file as written; every field optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyFile {
    /// Protected branch names.
    pub branch: BranchSection,
    /// Branch naming patterns.
    pub naming: NamingSection,
    /// CI commands keyed by target name.
    pub ci: BTreeMap<String, Vec<String>>,
    /// Pull request settings.
    pub pr: PrSection,
    /// Remote settings.
    pub remote: RemoteSection,
    /// Safety heuristics.
    pub safety: SafetySection,
}

/// Resolved, validated policy for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    /// Repository root the policy applies to.
    pub root: PathBuf,
    /// Production branch name.
    pub production_branch: String,
    /// Stage branch name.
    pub stage_branch: String,
    /// Feature branch pattern (single `*` wildcard).
    pub feature_pattern: String,
    /// Hotfix branch pattern (single `*` wildcard).
    pub hotfix_pattern: String,
    /// Remote all workflows talk to.
    pub remote_name: String,
    /// Shell commands to run before opening a PR, keyed by target name.
    pub ci_commands: BTreeMap<String, Vec<String>>,
    /// PR template, relative to `root`.
    pub pr_template_path: Option<PathBuf>,
    /// Commits sampled by the shared-branch check.
    pub shared_window: usize,
}

/// Treat missing and blank values alike, falling back to `default`.
fn or_default(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl Policy {
    /// Built-in defaults for a repository at `root`.
    pub fn defaults(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            production_branch: DEFAULT_PRODUCTION_BRANCH.to_string(),
            stage_branch: DEFAULT_STAGE_BRANCH.to_string(),
            feature_pattern: DEFAULT_FEATURE_PATTERN.to_string(),
            hotfix_pattern: DEFAULT_HOTFIX_PATTERN.to_string(),
            remote_name: DEFAULT_REMOTE_NAME.to_string(),
            ci_commands: BTreeMap::new(),
            pr_template_path: None,
            shared_window: DEFAULT_SHARED_WINDOW,
        }
    }

    /// Locate the repository containing `start` and load its policy.
    ///
    /// A missing `.gitext` file yields the defaults.
    pub fn load(start: &Path) -> Result<Self> {
        let root = find_root(start).ok_or_else(|| GitextError::NotARepository {
            path: start.to_path_buf(),
        })?;
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            debug!(root = %root.display(), "no policy file, using defaults");
            return Self::resolve(root, PolicyFile::default());
        }

        let text = fs::read_to_string(&path)
            .map_err(|err| GitextError::InvalidConfig(format!("failed to read {CONFIG_FILE}: {err}")))?;
        let policy = Self::from_yaml(root, &text)?;
        info!(path = %path.display(), "loaded policy");
        Ok(policy)
    }

    /// Parse policy YAML for a repository at `root`.
    pub fn from_yaml(root: impl Into<PathBuf>, text: &str) -> Result<Self> {
        let file: PolicyFile = if text.trim().is_empty() {
            PolicyFile::default()
        } else {
            serde_yaml::from_str(text).map_err(|err| {
                GitextError::InvalidConfig(format!("failed to parse {CONFIG_FILE}: {err}"))
            })?
        };
        Self::resolve(root, file)
    }

    /// Apply defaults to `file` and validate the result.
    pub fn resolve(root: impl Into<PathBuf>, file: PolicyFile) -> Result<Self> {
        let policy = Self {
            root: root.into(),
            production_branch: or_default(file.branch.production, DEFAULT_PRODUCTION_BRANCH),
            stage_branch: or_default(file.branch.stage, DEFAULT_STAGE_BRANCH),
            feature_pattern: or_default(file.naming.feature, DEFAULT_FEATURE_PATTERN),
            hotfix_pattern: or_default(file.naming.hotfix, DEFAULT_HOTFIX_PATTERN),
            remote_name: or_default(file.remote.name, DEFAULT_REMOTE_NAME),
            ci_commands: file.ci,
            pr_template_path: file
                .pr
                .template_path
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from),
            shared_window: file.safety.shared_window.unwrap_or(DEFAULT_SHARED_WINDOW),
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Check the invariants every workflow relies on.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(GitextError::InvalidConfig(msg.to_string()));
        if self.production_branch.is_empty() {
            return invalid("branch.production cannot be empty");
        }
        if self.stage_branch.is_empty() {
            return invalid("branch.stage cannot be empty");
        }
        if self.production_branch == self.stage_branch {
            return invalid("branch.production and branch.stage must be different");
        }
        if self.remote_name.is_empty() {
            return invalid("remote.name cannot be empty");
        }
        if self.shared_window == 0 {
            return invalid("safety.sharedWindow must be at least 1");
        }
        for key in self.ci_commands.keys() {
            if key.parse::<Target>().is_err() {
                return Err(GitextError::InvalidConfig(format!(
                    "ci.{key} is not a target; use 'stage' or 'production'"
                )));
            }
        }
        Ok(())
    }

    /// Branch name configured for `target`.
    pub fn branch(&self, target: Target) -> &str {
        match target {
            Target::Stage => &self.stage_branch,
            Target::Production => &self.production_branch,
        }
    }

    /// Whether `branch` is one of the protected branches.
    pub fn is_protected(&self, branch: &str) -> bool {
        branch == self.production_branch || branch == self.stage_branch
    }

    /// Classify `branch` by name.
    pub fn classify(&self, branch: &str) -> BranchKind {
        if branch == self.production_branch {
            BranchKind::Production
        } else if branch == self.stage_branch {
            BranchKind::Stage
        } else if matches_pattern(branch, &self.feature_pattern) {
            BranchKind::Feature
        } else if matches_pattern(branch, &self.hotfix_pattern) {
            BranchKind::Hotfix
        } else {
            BranchKind::Other
        }
    }

    /// CI commands to run before a PR into `target`.
    pub fn ci_commands(&self, target: Target) -> &[String] {
        self.ci_commands
            .get(target.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Absolute path of the PR template, if one is configured.
    pub fn template_path(&self) -> Option<PathBuf> {
        self.pr_template_path
            .as_ref()
            .map(|path| self.root.join(path))
    }
}
