//! Host inference from pull/merge request URLs.
//!
//! These are pure functions: they never touch the network.

use super::{ClientError, GitClientType};
use url::Url;

/// Public GitHub web host.
const PUBLIC_GITHUB_HOST: &str = "github.com";

/// Public GitHub API host.
const PUBLIC_GITHUB_API_HOST: &str = "api.github.com";

/// Fixed API base for public GitHub.
pub const PUBLIC_GITHUB_API_URL: &str = "https://api.github.com";

/// Codeberg host.
const CODEBERG_HOST: &str = "codeberg.org";

/// Default GitLab REST API version.
pub const DEFAULT_API_VERSION: &str = "v4";

/// Owner, project and number extracted from a pull/merge request URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestCoordinates {
    /// Owner, or the full namespace path on GitLab. Empty when a GitLab API
    /// URL refers to the project by numeric ID.
    pub owner: String,
    /// Repository name, or the numeric project ID (see `owner`).
    pub project: String,
    /// Pull request number or merge request iid.
    pub number: u64,
}

impl PullRequestCoordinates {
    /// Returns `owner/project`, or just `project` when the owner is unknown.
    #[must_use]
    pub fn project_path(&self) -> String {
        if self.owner.is_empty() {
            self.project.clone()
        } else {
            format!("{}/{}", self.owner, self.project)
        }
    }
}

/// Infers the git host type from a pull/merge request URL.
///
/// Matches well-known host tokens in priority order: `github`, `gitlab`,
/// `codeberg`. This covers GitHub Enterprise and self-hosted GitLab instances
/// whose host name carries the product name.
///
/// # Errors
///
/// Returns [`ClientError::UnsupportedHost`] if no token matches.
pub fn infer_git_client(url: &str) -> Result<GitClientType, ClientError> {
    let normalized = url.trim().to_ascii_lowercase();

    if normalized.contains(GitClientType::GitHub.as_str()) {
        Ok(GitClientType::GitHub)
    } else if normalized.contains(GitClientType::GitLab.as_str()) {
        Ok(GitClientType::GitLab)
    } else if normalized.contains(GitClientType::Codeberg.as_str()) {
        Ok(GitClientType::Codeberg)
    } else {
        Err(ClientError::UnsupportedHost {
            url: url.to_string(),
        })
    }
}

/// Infers the REST API base URL from a pull/merge request URL.
///
/// - public GitHub (web or API host) resolves to `https://api.github.com`;
/// - Codeberg always resolves to its own `v1` API;
/// - everything else resolves to `{scheme}://{host}/api/{api_version}`.
///
/// Only the origin of `url` is used, so URLs that already point at an API
/// path (e.g. `.../api/v1/repos/...`) resolve to the same base.
///
/// # Errors
///
/// Returns [`ClientError::InvalidPullRequestUrl`] if `url` is not absolute.
pub fn infer_git_api_url(url: &str, api_version: &str) -> Result<String, ClientError> {
    let parsed = parse_url(url)?;
    let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();

    if host == PUBLIC_GITHUB_HOST || host == PUBLIC_GITHUB_API_HOST {
        return Ok(PUBLIC_GITHUB_API_URL.to_string());
    }

    let origin = parsed.origin().ascii_serialization();
    if host == CODEBERG_HOST {
        return Ok(format!("{origin}/api/v1"));
    }

    Ok(format!("{origin}/api/{api_version}"))
}

/// Returns the API version a host type uses when self-hosted.
#[must_use]
pub fn default_api_version(client_type: GitClientType) -> &'static str {
    match client_type {
        // GitHub Enterprise Server
        GitClientType::GitHub => "v3",
        GitClientType::GitLab => DEFAULT_API_VERSION,
        GitClientType::Codeberg => "v1",
    }
}

/// Extracts owner, repository and number from a GitHub or Codeberg URL.
///
/// Accepts web URLs (`/owner/repo/pull/1`, `/owner/repo/pulls/1`) and API URLs
/// (`/repos/owner/repo/pulls/1`, `/api/v1/repos/owner/repo/pulls/1`).
///
/// # Errors
///
/// Returns [`ClientError::InvalidPullRequestUrl`] if the path does not match.
pub fn parse_github_url(url: &str) -> Result<PullRequestCoordinates, ClientError> {
    let parsed = parse_url(url)?;
    let segments = path_segments(&parsed);

    let start = match segments.first().copied() {
        Some("repos") => 1,
        Some("api") => segments
            .iter()
            .position(|s| *s == "repos")
            .map(|pos| pos + 1)
            .ok_or_else(|| invalid(url, "missing 'repos' segment in API URL"))?,
        _ => 0,
    };

    match segments.get(start..start + 4) {
        Some([owner, repo, kind, number]) if matches!(*kind, "pull" | "pulls") => {
            Ok(PullRequestCoordinates {
                owner: (*owner).to_string(),
                project: (*repo).to_string(),
                number: parse_number(url, number)?,
            })
        }
        _ => Err(invalid(url, "expected '<owner>/<repo>/pull/<number>'")),
    }
}

/// Extracts namespace, project and iid from a GitLab URL.
///
/// Accepts web URLs with arbitrarily nested namespaces
/// (`/group/sub/project/-/merge_requests/1`) and API URLs
/// (`/api/v4/projects/group%2Fproject/merge_requests/1`).
///
/// # Errors
///
/// Returns [`ClientError::InvalidPullRequestUrl`] if the path does not match.
pub fn parse_gitlab_url(url: &str) -> Result<PullRequestCoordinates, ClientError> {
    let parsed = parse_url(url)?;
    let segments = path_segments(&parsed);

    let mr_pos = segments
        .iter()
        .position(|s| *s == "merge_requests")
        .ok_or_else(|| invalid(url, "missing 'merge_requests' segment"))?;
    let number = segments
        .get(mr_pos + 1)
        .ok_or_else(|| invalid(url, "missing merge request iid"))?;
    let number = parse_number(url, number)?;

    // API form: .../projects/<encoded path or id>/merge_requests/<iid>
    if mr_pos >= 2 && segments[mr_pos - 2] == "projects" {
        let decoded = segments[mr_pos - 1].replace("%2F", "/").replace("%2f", "/");
        let (owner, project) = match decoded.rsplit_once('/') {
            Some((owner, project)) => (owner.to_string(), project.to_string()),
            None => (String::new(), decoded),
        };
        return Ok(PullRequestCoordinates {
            owner,
            project,
            number,
        });
    }

    // Web form: <namespace...>/<project>/-/merge_requests/<iid>
    let end = if mr_pos >= 1 && segments[mr_pos - 1] == "-" {
        mr_pos - 1
    } else {
        mr_pos
    };
    if end < 2 {
        return Err(invalid(url, "expected '<namespace>/<project>/-/merge_requests/<iid>'"));
    }

    Ok(PullRequestCoordinates {
        owner: segments[..end - 1].join("/"),
        project: segments[end - 1].to_string(),
        number,
    })
}

fn parse_url(url: &str) -> Result<Url, ClientError> {
    Url::parse(url.trim()).map_err(|e| invalid(url, &e.to_string()))
}

fn path_segments(url: &Url) -> Vec<&str> {
    url.path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

fn parse_number(url: &str, value: &str) -> Result<u64, ClientError> {
    value
        .parse()
        .map_err(|_| invalid(url, &format!("'{value}' is not a valid number")))
}

fn invalid(url: &str, message: &str) -> ClientError {
    ClientError::InvalidPullRequestUrl {
        url: url.to_string(),
        message: message.to_string(),
    }
}
