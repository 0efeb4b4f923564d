//! Target branch and backport branch name resolution.

use super::ConfigError;
use bstr::BStr;
use regex::Regex;
use tracing::{debug, warn};

/// Longest backport branch name that is kept as is.
pub const MAX_BRANCH_NAME_LENGTH: usize = 250;

/// Capture group holding the branch name in a target branch pattern.
const TARGET_GROUP: &str = "target";

/// Splits a comma separated list, trimming entries and dropping blanks and
/// duplicates. First occurrences keep their position.
#[must_use]
pub fn split_list(value: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for item in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !items.iter().any(|existing| existing == item) {
            items.push(item.to_string());
        }
    }
    items
}

/// Extracts target branches from labels using the `target` group of
/// `pattern`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidPattern`] for a malformed regex and
/// [`ConfigError::NoTargetBranches`] if no label matches.
pub fn extract_target_branches(pattern: &str, labels: &[String]) -> Result<Vec<String>, ConfigError> {
    let regex = Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut branches: Vec<String> = Vec::new();
    for label in labels {
        let Some(target) = regex
            .captures(label)
            .and_then(|caps| caps.name(TARGET_GROUP))
            .map(|m| m.as_str().trim())
            .filter(|t| !t.is_empty())
        else {
            continue;
        };

        debug!(label = %label, target, "Label matched target branch pattern");
        if !branches.iter().any(|b| b == target) {
            branches.push(target.to_string());
        }
    }

    if branches.is_empty() {
        return Err(ConfigError::NoTargetBranches {
            pattern: pattern.to_string(),
        });
    }
    Ok(branches)
}

/// Resolves the target branches.
///
/// A pattern takes precedence over the explicit list.
///
/// # Errors
///
/// Returns [`ConfigError`] if no target branch can be determined.
pub fn resolve_target_branches(
    target_branch: Option<&str>,
    pattern: Option<&str>,
    labels: &[String],
) -> Result<Vec<String>, ConfigError> {
    if let Some(pattern) = pattern.filter(|p| !p.trim().is_empty()) {
        return extract_target_branches(pattern, labels);
    }

    let branches = target_branch.map(split_list).unwrap_or_default();
    if branches.is_empty() {
        return Err(ConfigError::EmptyTargetBranches);
    }
    Ok(branches)
}

/// Computes one backport branch name per target.
///
/// Without custom names, each target gets `bp-<target>-<sha7>[-<sha7>...]`.
/// A single custom name is suffixed with `-<target>` when there are several
/// targets. Otherwise there must be exactly one custom name per target.
/// Names longer than [`MAX_BRANCH_NAME_LENGTH`] are truncated.
///
/// # Errors
///
/// Returns [`ConfigError`] on a cardinality mismatch, an invalid git
/// reference name or a duplicate name.
pub fn backport_branch_names(
    custom: Option<&str>,
    targets: &[String],
    commits: &[String],
) -> Result<Vec<String>, ConfigError> {
    let custom = custom.map(split_list).unwrap_or_default();

    let names: Vec<String> = match custom.len() {
        0 => {
            let suffix = commits
                .iter()
                .map(|sha| short_sha(sha))
                .collect::<Vec<_>>()
                .join("-");
            targets
                .iter()
                .map(|target| format!("bp-{target}-{suffix}"))
                .collect()
        }
        1 if targets.len() > 1 => targets
            .iter()
            .map(|target| format!("{}-{target}", custom[0]))
            .collect(),
        n if n == targets.len() => custom,
        provided => return Err(ConfigError::BranchNameCount { provided }),
    };

    let names: Vec<String> = names.into_iter().map(truncate_branch_name).collect();

    for (i, name) in names.iter().enumerate() {
        validate_branch_name(name)?;
        if names[..i].contains(name) {
            return Err(ConfigError::DuplicateBranchName { name: name.clone() });
        }
    }
    Ok(names)
}

/// Truncates `name` to [`MAX_BRANCH_NAME_LENGTH`] characters.
#[must_use]
pub fn truncate_branch_name(name: String) -> String {
    if name.chars().count() <= MAX_BRANCH_NAME_LENGTH {
        return name;
    }

    warn!(
        branch = %name,
        max = MAX_BRANCH_NAME_LENGTH,
        "Backport branch name is too long, truncating"
    );
    name.chars().take(MAX_BRANCH_NAME_LENGTH).collect()
}

/// Checks that `name` is usable as `refs/heads/<name>`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidBranchName`] describing the violation.
pub fn validate_branch_name(name: &str) -> Result<(), ConfigError> {
    gix_validate::reference::name_partial(BStr::new(name))
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidBranchName {
            name: name.to_string(),
            message: e.to_string(),
        })
}

fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}
