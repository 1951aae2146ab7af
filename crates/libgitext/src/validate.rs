//! Pure safety checks. Nothing here talks to git; callers gather the facts
//! through the inspector and hand them in.

use regex::Regex;

use crate::error::{GitextError, Result};

/// Whether `branch` matches a glob-style `pattern`.
///
/// `*` matches any run of characters (including none); everything else is
/// literal. The match is anchored at both ends and case-sensitive.
pub fn matches_pattern(branch: &str, pattern: &str) -> bool {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{body}$")).is_ok_and(|re| re.is_match(branch))
}

/// Whether a branch looks like more than one person works on it: it exists on
/// the remote and its recent history has more than one distinct author.
///
/// This samples a window of recent commits, so co-authors who only appear
/// further back are missed.
pub fn is_shared_branch(remote_exists: bool, recent_authors: &[String]) -> bool {
    let mut authors: Vec<&str> = recent_authors.iter().map(String::as_str).collect();
    authors.sort_unstable();
    authors.dedup();
    remote_exists && authors.len() > 1
}

/// Fail with [`GitextError::DirtyWorkingTree`] unless the tree is clean.
pub fn require_clean(is_clean: bool) -> Result<()> {
    if is_clean {
        Ok(())
    } else {
        Err(GitextError::DirtyWorkingTree)
    }
}

/// Fail with [`GitextError::RemoteNotFound`] unless the remote exists.
pub fn require_remote(exists: bool, remote: &str) -> Result<()> {
    if exists {
        Ok(())
    } else {
        Err(GitextError::RemoteNotFound {
            remote: remote.to_string(),
        })
    }
}

/// Fail with [`GitextError::BranchNotFound`] unless `branch` exists locally
/// or on `remote`.
pub fn require_branch(exists_locally: bool, exists_remotely: bool, branch: &str, remote: &str) -> Result<()> {
    if exists_locally || exists_remotely {
        Ok(())
    } else {
        Err(GitextError::BranchNotFound {
            branch: branch.to_string(),
            remote: remote.to_string(),
        })
    }
}

/// Fail with [`GitextError::PatternMismatch`] unless `branch` matches
/// `pattern`. `overridable` records whether the caller offers a bypass.
pub fn require_pattern(branch: &str, pattern: &str, overridable: bool) -> Result<()> {
    if matches_pattern(branch, pattern) {
        Ok(())
    } else {
        Err(GitextError::PatternMismatch {
            branch: branch.to_string(),
            pattern: pattern.to_string(),
            overridable,
        })
    }
}

/// Derive `feature/<ticket>-<slug>`.
pub fn feature_branch_name(ticket: &str, slug: &str) -> Result<String> {
    let ticket = ticket.trim();
    let slug = slug.trim();
    if ticket.is_empty() {
        return Err(GitextError::InvalidArgument {
            message: "ticket cannot be empty".to_string(),
            suggestion: "pass a ticket id, e.g. --ticket ABC-123".to_string(),
        });
    }
    if slug.is_empty() {
        return Err(GitextError::InvalidArgument {
            message: "slug cannot be empty".to_string(),
            suggestion: "pass a short description, e.g. --slug retry-policy".to_string(),
        });
    }
    if ticket.contains(char::is_whitespace) || slug.contains(char::is_whitespace) {
        return Err(GitextError::InvalidArgument {
            message: format!("'{ticket}' and '{slug}' must not contain whitespace"),
            suggestion: "join words with '-'".to_string(),
        });
    }
    Ok(format!("feature/{ticket}-{slug}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_pattern() {
        assert!(matches_pattern("feature/ABC-1-x", "feature/*"));
        assert!(matches_pattern("feature/", "feature/*"));
        assert!(!matches_pattern("hotfix/ABC-1-x", "feature/*"));
        assert!(!matches_pattern("Feature/ABC-1-x", "feature/*"));
        assert!(!matches_pattern("my-feature/x", "feature/*"));
        assert!(matches_pattern("stage", "stage"));
    }

    #[test]
    fn test_pattern_metacharacters_are_literal() {
        assert!(matches_pattern("release/1.2", "release/1.2"));
        assert!(!matches_pattern("release/1x2", "release/1.2"));
        assert!(matches_pattern("fix+(ABC)/y", "fix+(ABC)/*"));
        assert!(matches_pattern("team/a/feature/x", "team/*/feature/*"));
    }

    #[test]
    fn test_is_shared_branch() {
        let one = vec!["Ada".to_string()];
        let two = vec!["Ada".to_string(), "Grace".to_string()];
        let repeated = vec!["Ada".to_string(), "Ada".to_string()];

        assert!(is_shared_branch(true, &two));
        assert!(!is_shared_branch(false, &two));
        assert!(!is_shared_branch(true, &one));
        assert!(!is_shared_branch(true, &repeated));
        assert!(!is_shared_branch(true, &[]));
    }

    #[test]
    fn test_requirements() {
        assert!(require_clean(true).is_ok());
        assert!(matches!(
            require_clean(false),
            Err(GitextError::DirtyWorkingTree)
        ));

        assert!(require_remote(true, "origin").is_ok());
        let err = require_remote(false, "upstream").unwrap_err();
        assert_eq!(
            err.suggestion().as_deref(),
            Some("run 'git remote add upstream <url>'")
        );

        assert!(require_branch(false, true, "stage", "origin").is_ok());
        assert!(require_branch(true, false, "stage", "origin").is_ok());
        assert!(matches!(
            require_branch(false, false, "stage", "origin"),
            Err(GitextError::BranchNotFound { .. })
        ));

        let err = require_pattern("main", "feature/*", true).unwrap_err();
        assert_eq!(err.suggestion().as_deref(), Some("use --override to bypass"));
    }

    #[test]
    fn test_feature_branch_name() {
        assert_eq!(
            feature_branch_name("ABC-1", "retry-policy").unwrap(),
            "feature/ABC-1-retry-policy"
        );
        assert_eq!(feature_branch_name(" ABC-1 ", "x").unwrap(), "feature/ABC-1-x");
        assert!(feature_branch_name("", "x").is_err());
        assert!(feature_branch_name("ABC-1", "  ").is_err());
        assert!(feature_branch_name("ABC 1", "x").is_err());
    }
}
