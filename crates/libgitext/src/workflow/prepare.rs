use std::fs;

use tracing::{debug, warn};

use super::Gitext;
use crate::{
    error::{GitextError, Result},
    policy::Target,
};

/// Shown in place of a commit list when the branch adds nothing.
const NO_COMMITS: &str = "No commits (branch is up to date or behind)";

/// A pull request description ready to paste.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestDraft {
    /// Branch the PR comes from.
    pub branch: String,
    /// Target as named on the command line.
    pub target: Target,
    /// Branch the PR goes into.
    pub target_branch: String,
    /// Ticket id taken from the branch name.
    pub ticket: Option<String>,
    /// One-line summaries of the commits the PR adds.
    pub commits: Vec<String>,
    /// Rendered markdown.
    pub body: String,
    /// Recommended next command.
    pub next: String,
}

/// Ticket id from a branch such as `feature/ABC-123-retry-policy`.
///
/// Looks at the path segment after the first `/`; its first two `-`
/// separated parts form the ticket when the prefix has at least two
/// characters.
pub fn extract_ticket(branch: &str) -> Option<String> {
    let (_, name) = branch.split_once('/')?;
    let name = name.split('/').next().unwrap_or(name);
    let mut parts = name.split('-');
    let prefix = parts.next()?;
    let number = parts.next()?;
    (prefix.len() >= 2 && !number.is_empty()).then(|| format!("{prefix}-{number}"))
}

/// Assemble the markdown body.
fn render(draft: &PullRequestDraft, template: Option<&str>) -> String {
    let mut body = String::new();
    if let Some(template) = template {
        body.push_str(template.trim_end());
        body.push_str("\n\n---\n\n");
    }
    body.push_str(&format!("## Branch: {}\n\n", draft.branch));
    if let Some(ticket) = &draft.ticket {
        body.push_str(&format!("**Ticket:** {ticket}\n\n"));
    }
    body.push_str(&format!("**Target:** {}\n\n", draft.target_branch));
    body.push_str("## Commits\n\n");
    if draft.commits.is_empty() {
        body.push_str(NO_COMMITS);
        body.push('\n');
    } else {
        for commit in &draft.commits {
            body.push_str(&format!("- {commit}\n"));
        }
    }
    body.push_str("\n## Description\n\n<!-- Add description here -->\n");
    body
}

/// Draft a PR from the current branch into `to`. Read-only.
pub(super) fn run(gx: &Gitext, to: Target) -> Result<PullRequestDraft> {
    let state = gx.snapshot()?;
    if state.is_detached_head {
        return Err(GitextError::InvalidArgument {
            message: "HEAD is detached".to_string(),
            suggestion: "checkout the branch to open a PR from".to_string(),
        });
    }
    let branch = state.current_branch;
    let target_branch = gx.policy.branch(to).to_string();

    gx.output.step("Generating PR text")?;
    let template = gx.policy.template_path().and_then(|path| {
        match fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "PR template unreadable");
                None
            }
        }
    });
    if gx.policy.pr_template_path.is_some() && template.is_none() {
        gx.output.warn("PR template could not be read, continuing without it")?;
    }

    let base = gx.remote_ref(&target_branch);
    let commits = match gx.inspector().commits_between(&base, &branch) {
        Ok(commits) => commits,
        Err(err) => {
            debug!(base = %base, error = %err, "commit summary unavailable");
            Vec::new()
        }
    };

    let mut draft = PullRequestDraft {
        ticket: extract_ticket(&branch),
        branch,
        target: to,
        target_branch,
        commits,
        body: String::new(),
        next: "create the PR on your forge, or copy the text above".to_string(),
    };
    draft.body = render(&draft, template.as_deref());
    gx.output.success("PR text generated")?;
    Ok(draft)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::{
        policy::Policy,
        workflow::tests::{clean_repo, harness, harness_with},
    };

    #[test]
    fn test_extract_ticket() {
        assert_eq!(
            extract_ticket("feature/KWS-123-retry-policy").as_deref(),
            Some("KWS-123")
        );
        assert_eq!(extract_ticket("hotfix/AB-1").as_deref(), Some("AB-1"));
        assert_eq!(extract_ticket("feature/x-1-y"), None);
        assert_eq!(extract_ticket("feature/retry"), None);
        assert_eq!(extract_ticket("stage"), None);
    }

    #[test]
    fn test_prepare_renders_branch_ticket_and_commits() {
        let h = harness(
            clean_repo("feature/ABC-7-login").ok(
                &["log", "--oneline", "origin/stage..feature/ABC-7-login"],
                "a1b2c3d Add login form\ne4f5a6b Validate password",
            ),
            false,
        );
        let draft = h.gx.prepare_pr(Target::Stage).unwrap();

        assert_eq!(draft.ticket.as_deref(), Some("ABC-7"));
        assert_eq!(draft.commits.len(), 2);
        assert_eq!(
            draft.body,
            "## Branch: feature/ABC-7-login\n\n\
             **Ticket:** ABC-7\n\n\
             **Target:** stage\n\n\
             ## Commits\n\n\
             - a1b2c3d Add login form\n\
             - e4f5a6b Validate password\n\
             \n## Description\n\n<!-- Add description here -->\n"
        );
        assert!(h.journal.writes().is_empty());
    }

    #[test]
    fn test_prepare_without_commits() {
        let h = harness(clean_repo("experiment"), false);
        let draft = h.gx.prepare_pr(Target::Production).unwrap();

        assert_eq!(draft.ticket, None);
        assert_eq!(draft.target_branch, "production");
        assert!(draft.body.contains(NO_COMMITS));
    }

    #[test]
    fn test_prepare_prepends_template() -> anyhow::Result<()> {
        let temp_dir = tempfile::TempDir::new()?;
        fs::write(temp_dir.path().join("PR.md"), "## Checklist\n- [ ] tests\n")?;
        let mut policy = Policy::defaults(temp_dir.path());
        policy.pr_template_path = Some(PathBuf::from("PR.md"));

        let h = harness_with(clean_repo("feature/ABC-7-login"), false, policy);
        let draft = h.gx.prepare_pr(Target::Stage)?;

        assert!(draft.body.starts_with("## Checklist\n- [ ] tests\n\n---\n\n## Branch:"));
        Ok(())
    }

    #[test]
    fn test_prepare_missing_template_warns() {
        let mut policy = Policy::defaults("/nonexistent-gitext-root");
        policy.pr_template_path = Some(PathBuf::from("PR.md"));

        let h = harness_with(clean_repo("feature/ABC-7-login"), false, policy);
        let draft = h.gx.prepare_pr(Target::Stage).unwrap();

        assert!(draft.body.starts_with("## Branch:"));
        assert!(h.capture.contains("PR template could not be read"));
    }
}
