use backporting::client::GitLabClient;
use backporting::{BackportRequest, GitClient, PullRequestState};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROJECT_PATH: &str = "/api/v4/projects/group%2Fsub%2Fproj";
const MERGE_SHA: &str = "4d369c3e9a8d1d5b7e56c892a8ab2a7666583ac3";
const SQUASH_SHA: &str = "ebb1eca696c42fd067658bd9b5267709f78ef38e";
const HEAD_SHA: &str = "9e15674ebd48e05c6e428a1fa31dbb60a778d644";
const MR_URL: &str = "https://my.gitlab.host/group/sub/proj/-/merge_requests/4";

fn merge_request(state: &str, squash_sha: Option<&str>) -> Value {
    json!({
        "iid": 4,
        "project_id": 76316,
        "author": { "id": 1, "username": "superuser" },
        "web_url": MR_URL,
        "title": "Update test.txt",
        "description": "This is the body",
        "state": state,
        "merge_user": { "id": 2, "username": "merger" },
        "reviewers": [{ "id": 3, "username": "reviewer" }],
        "assignees": [],
        "labels": ["backport-prod"],
        "source_project_id": 76316,
        "target_project_id": 76316,
        "sha": HEAD_SHA,
        "merge_commit_sha": MERGE_SHA,
        "squash_commit_sha": squash_sha
    })
}

fn project() -> Value {
    json!({
        "id": 76316,
        "path": "proj",
        "namespace": { "full_path": "group/sub" },
        "http_url_to_repo": "https://my.gitlab.host/group/sub/proj.git"
    })
}

async fn mount_get(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_merge_request(server: &MockServer, body: Value) {
    mount_get(server, &format!("{PROJECT_PATH}/merge_requests/4"), body).await;
    mount_get(server, "/api/v4/projects/76316", project()).await;
}

fn client(server: &MockServer) -> GitLabClient {
    GitLabClient::new(format!("{}/api/v4", server.uri()), Some("s3cr3t")).unwrap()
}

#[tokio::test]
async fn maps_merged_request_with_squash_commit() {
    let server = MockServer::start().await;
    mount_merge_request(&server, merge_request("merged", Some(SQUASH_SHA))).await;

    let pr = client(&server)
        .get_pull_request_from_url(MR_URL, Some(true))
        .await
        .unwrap();

    assert_eq!(pr.number, 4);
    assert_eq!(pr.state, PullRequestState::Merged);
    assert_eq!(pr.author, "superuser");
    assert_eq!(pr.merged_by.as_deref(), Some("merger"));
    assert_eq!(pr.body, "This is the body");
    assert_eq!(pr.target_repo.owner, "group/sub");
    assert_eq!(pr.target_repo.project, "proj");
    assert_eq!(
        pr.target_repo.clone_url,
        "https://my.gitlab.host/group/sub/proj.git"
    );
    assert_eq!(pr.commits, vec![SQUASH_SHA]);
}

#[tokio::test]
async fn falls_back_to_merge_commit() {
    let server = MockServer::start().await;
    mount_merge_request(&server, merge_request("merged", None)).await;

    let pr = client(&server)
        .get_pull_request("group/sub", "proj", 4, Some(true))
        .await
        .unwrap();

    assert_eq!(pr.commits, vec![MERGE_SHA]);
}

#[tokio::test]
async fn open_request_is_squashed_to_head() {
    let server = MockServer::start().await;
    mount_merge_request(&server, merge_request("opened", None)).await;

    let pr = client(&server)
        .get_pull_request("group/sub", "proj", 4, None)
        .await
        .unwrap();

    assert_eq!(pr.state, PullRequestState::Open);
    assert_eq!(pr.commits, vec![HEAD_SHA]);
}

#[tokio::test]
async fn merge_commit_lists_commits_oldest_first() {
    let server = MockServer::start().await;
    mount_merge_request(&server, merge_request("merged", None)).await;
    mount_get(
        &server,
        &format!("{PROJECT_PATH}/repository/commits/{MERGE_SHA}"),
        json!({ "id": MERGE_SHA, "parent_ids": ["a", "b"] }),
    )
    .await;
    mount_get(
        &server,
        &format!("{PROJECT_PATH}/merge_requests/4/commits"),
        json!([
            { "id": "11da4e38aa3e577ffde6d546f1c52e53b04d3151" },
            { "id": "0404fb922ab75c3a8aecad5c97d9af388df04695" }
        ]),
    )
    .await;

    let pr = client(&server)
        .get_pull_request("group/sub", "proj", 4, None)
        .await
        .unwrap();

    assert_eq!(
        pr.commits,
        vec![
            "0404fb922ab75c3a8aecad5c97d9af388df04695",
            "11da4e38aa3e577ffde6d546f1c52e53b04d3151"
        ]
    );
    assert_eq!(pr.commit_count, 2);
}

fn commit_page(ids: impl Iterator<Item = usize>) -> Value {
    Value::Array(
        ids.map(|i| json!({ "id": format!("{i:040x}") }))
            .collect(),
    )
}

#[tokio::test]
async fn merge_commit_follows_every_commit_page() {
    let server = MockServer::start().await;
    mount_merge_request(&server, merge_request("merged", None)).await;
    mount_get(
        &server,
        &format!("{PROJECT_PATH}/repository/commits/{MERGE_SHA}"),
        json!({ "id": MERGE_SHA, "parent_ids": ["a", "b"] }),
    )
    .await;

    // 25 commits, newest first: 20 on the first page, 5 on the second.
    let commits_path = format!("{PROJECT_PATH}/merge_requests/4/commits");
    Mock::given(method("GET"))
        .and(path(commits_path.as_str()))
        .and(query_param("per_page", "100"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-next-page", "2")
                .set_body_json(commit_page((5..25).rev())),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(commits_path.as_str()))
        .and(query_param("per_page", "100"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-next-page", "")
                .set_body_json(commit_page((0..5).rev())),
        )
        .expect(1)
        .mount(&server)
        .await;

    let pr = client(&server)
        .get_pull_request("group/sub", "proj", 4, None)
        .await
        .unwrap();

    let expected: Vec<String> = (0..25).map(|i| format!("{i:040x}")).collect();
    assert_eq!(pr.commits, expected);
    assert_eq!(pr.commit_count, 25);
}

#[tokio::test]
async fn reports_api_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("{\"message\":\"404 Not found\"}"))
        .mount(&server)
        .await;

    let err = client(&server)
        .get_pull_request("group/sub", "proj", 4, Some(true))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        backporting::ClientError::ApiError { status: 404, .. }
    ));
}

#[tokio::test]
async fn creates_and_decorates_merge_request() {
    let server = MockServer::start().await;
    mount_get(&server, PROJECT_PATH, project()).await;

    Mock::given(method("POST"))
        .and(path("/api/v4/projects/76316/merge_requests"))
        .and(header("authorization", "Bearer s3cr3t"))
        .and(body_json(json!({
            "source_branch": "bp-prod-ebb1eca",
            "target_branch": "prod",
            "title": "[prod] Update test.txt",
            "description": "**Backport:** https://my.gitlab.host/group/sub/proj/-/merge_requests/4\r\n\r\nThis is the body"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "iid": 5,
            "web_url": "https://my.gitlab.host/group/sub/proj/-/merge_requests/5",
            "state": "opened",
            "source_project_id": 76316,
            "target_project_id": 76316
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v4/users"))
        .and(query_param("username", "superuser"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "id": 1, "username": "superuser" }])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v4/users"))
        .and(query_param("username", "ghost"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v4/users"))
        .and(query_param("username", "merger"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "id": 2, "username": "merger" }])),
        )
        .mount(&server)
        .await;

    let mr_route = "/api/v4/projects/76316/merge_requests/5";
    for body in [
        json!({ "labels": "backport,bug" }),
        json!({ "reviewer_ids": [1] }),
        json!({ "assignee_ids": [2] }),
    ] {
        Mock::given(method("PUT"))
            .and(path(mr_route))
            .and(body_json(body))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path(format!("{mr_route}/notes")))
        .and(body_json(json!({ "body": "please check" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 7 })))
        .expect(1)
        .mount(&server)
        .await;

    let request = BackportRequest {
        owner: "group/sub".to_string(),
        repo: "proj".to_string(),
        head: "bp-prod-ebb1eca".to_string(),
        base: "prod".to_string(),
        title: "[prod] Update test.txt".to_string(),
        body: format!("**Backport:** {MR_URL}\r\n\r\nThis is the body"),
        // The unknown user is skipped.
        reviewers: vec!["superuser".to_string(), "ghost".to_string()],
        assignees: vec!["merger".to_string()],
        labels: vec!["backport".to_string(), "bug".to_string()],
        comments: vec!["please check".to_string()],
    };

    let url = client(&server).create_pull_request(&request).await.unwrap();
    assert_eq!(url, "https://my.gitlab.host/group/sub/proj/-/merge_requests/5");
}

#[tokio::test]
async fn posts_note_on_original_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{PROJECT_PATH}/merge_requests/4/notes")))
        .and(body_json(json!({ "body": "The backport to `prod` failed." })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 99 })))
        .mount(&server)
        .await;

    let url = client(&server)
        .create_pull_request_comment(MR_URL, "The backport to `prod` failed.")
        .await;
    assert_eq!(url, Some(format!("{MR_URL}#note_99")));
}

#[tokio::test]
async fn note_failure_yields_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    assert!(client(&server)
        .create_pull_request_comment(MR_URL, "text")
        .await
        .is_none());
}
