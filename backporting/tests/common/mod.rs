//! Hand-written fakes shared by the integration tests.

#![allow(dead_code)]

use backporting::{
    Args, BackportRequest, CherryPickOptions, ClientError, GitCli, GitClient, GitClientType,
    GitError, GitRepository, PullRequest, PullRequestState,
};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const MERGE_SHA: &str = "28f63db774185f4ec4b57cd9aaeb12dbfb4c9ecc";
pub const ORIGINAL_URL: &str = "https://github.com/owner/reponame/pull/2368";

/// A merged pull request #2368 on `owner/reponame`, opened from a fork.
pub fn merged_pull_request() -> PullRequest {
    PullRequest {
        number: 2368,
        author: "gh-user".to_string(),
        url: "https://api.github.com/repos/owner/reponame/pulls/2368".to_string(),
        html_url: ORIGINAL_URL.to_string(),
        title: "PR Title".to_string(),
        body: "Please review and merge".to_string(),
        state: PullRequestState::Merged,
        merged: true,
        merged_by: Some("that-s-a-user".to_string()),
        reviewers: vec!["requested-gh-user".to_string()],
        assignees: Vec::new(),
        labels: vec!["backport prod".to_string(), "bug".to_string()],
        source_repo: GitRepository {
            owner: "fork".to_string(),
            project: "reponame".to_string(),
            clone_url: "https://github.com/fork/reponame.git".to_string(),
        },
        target_repo: GitRepository {
            owner: "owner".to_string(),
            project: "reponame".to_string(),
            clone_url: "https://github.com/owner/reponame.git".to_string(),
        },
        commit_count: 1,
        commits: vec![MERGE_SHA.to_string()],
    }
}

/// Args backporting [`ORIGINAL_URL`] to `targets`.
pub fn args_for(targets: &str, folder: &Path) -> Args {
    Args {
        pull_request: ORIGINAL_URL.to_string(),
        target_branch: Some(targets.to_string()),
        folder: Some(folder.to_path_buf()),
        ..Args::default()
    }
}

/// In-memory [`GitClient`] serving a single pull request.
pub struct FakeClient {
    pub client_type: GitClientType,
    pub pull_request: PullRequest,
    pub fail_create: bool,
    pub requested_squash: Mutex<Vec<Option<bool>>>,
    pub created: Mutex<Vec<BackportRequest>>,
    pub comments: Mutex<Vec<(String, String)>>,
}

impl FakeClient {
    pub fn new(pull_request: PullRequest) -> Self {
        Self {
            client_type: GitClientType::GitHub,
            pull_request,
            fail_create: false,
            requested_squash: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
            comments: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn created(&self) -> Vec<BackportRequest> {
        self.created.lock().unwrap().clone()
    }

    pub fn comments(&self) -> Vec<(String, String)> {
        self.comments.lock().unwrap().clone()
    }
}

impl GitClient for FakeClient {
    fn client_type(&self) -> GitClientType {
        self.client_type
    }

    async fn get_pull_request(
        &self,
        _owner: &str,
        _repo: &str,
        _number: u64,
        squash: Option<bool>,
    ) -> Result<PullRequest, ClientError> {
        self.requested_squash.lock().unwrap().push(squash);
        Ok(self.pull_request.clone())
    }

    async fn get_pull_request_from_url(
        &self,
        _url: &str,
        squash: Option<bool>,
    ) -> Result<PullRequest, ClientError> {
        self.get_pull_request("owner", "reponame", 2368, squash)
            .await
    }

    async fn create_pull_request(&self, request: &BackportRequest) -> Result<String, ClientError> {
        if self.fail_create {
            return Err(ClientError::ApiError {
                method: "POST".to_string(),
                url: format!("/repos/owner/reponame/pulls?base={}", request.base),
                status: 422,
                message: format!("cannot create {}", request.head),
            });
        }

        let mut created = self.created.lock().unwrap();
        created.push(request.clone());
        Ok(format!(
            "https://github.com/owner/reponame/pull/{}",
            2368 + created.len()
        ))
    }

    async fn create_pull_request_comment(&self, url: &str, comment: &str) -> Option<String> {
        self.comments
            .lock()
            .unwrap()
            .push((url.to_string(), comment.to_string()));
        Some(format!("{url}#issuecomment-1"))
    }
}

/// [`GitCli`] recording every call instead of running git.
#[derive(Default)]
pub struct FakeGit {
    pub calls: Mutex<Vec<String>>,
    /// Cherry-picks fail in working directories ending with this name.
    pub fail_cherry_pick_in: Option<String>,
}

impl FakeGit {
    pub fn failing_cherry_pick_in(dir: &str) -> Self {
        Self {
            fail_cherry_pick_in: Some(dir.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl GitCli for FakeGit {
    async fn clone_repository(&self, from: &str, to: &Path, branch: &str) -> Result<(), GitError> {
        self.record(format!("clone {from} {} {branch}", dir_name(to)));
        Ok(())
    }

    async fn create_local_branch(&self, cwd: &Path, branch: &str) -> Result<(), GitError> {
        self.record(format!("checkout {} {branch}", dir_name(cwd)));
        Ok(())
    }

    async fn fetch(&self, cwd: &Path, remote_ref: &str, remote: &str) -> Result<(), GitError> {
        self.record(format!("fetch {} {remote} {remote_ref}", dir_name(cwd)));
        Ok(())
    }

    async fn cherry_pick(
        &self,
        cwd: &Path,
        sha: &str,
        options: &CherryPickOptions,
    ) -> Result<(), GitError> {
        let dir = dir_name(cwd);
        self.record(format!(
            "cherry-pick {dir} {sha} {}",
            options.strategy.as_deref().unwrap_or("-")
        ));

        if self.fail_cherry_pick_in.as_deref() == Some(dir.as_str()) {
            return Err(GitError::CommandFailed {
                command: format!("cherry-pick -m 1 {sha}"),
                stderr: "error: could not apply 28f63db".to_string(),
            });
        }
        Ok(())
    }

    async fn push(&self, cwd: &Path, branch: &str, remote: &str, force: bool) -> Result<(), GitError> {
        self.record(format!("push {} {remote} {branch} force={force}", dir_name(cwd)));
        Ok(())
    }
}

/// A temporary folder for working directories.
pub fn work_folder() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bp");
    (dir, path)
}
