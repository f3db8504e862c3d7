//! REST adapter tests against a wiremock stand-in for the GitHub API.

use github::{GithubClient, GithubSettings};
use serde_json::json;
use triage::{
    CardId, CardMove, ColumnId, GitHubError, IssueNumber, IssueTracker, ItemKind, NewCard,
    ProjectBoard, ProjectId, PullRequestManager, RepositoryRef, SearchQuery,
};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> GithubClient {
    GithubClient::new(&GithubSettings {
        api_url: server.uri(),
        token: "ghp_test".into(),
        ..GithubSettings::default()
    })
    .unwrap()
}

fn repo() -> RepositoryRef {
    RepositoryRef::parse("dotnet/runtime").unwrap()
}

fn issue_json(number: u64, labels: &[&str]) -> serde_json::Value {
    json!({
        "id": 1000 + number,
        "number": number,
        "title": format!("Issue {number}"),
        "body": "body",
        "user": { "login": "octocat" },
        "state": "open",
        "labels": labels.iter().map(|l| json!({ "name": l })).collect::<Vec<_>>(),
        "milestone": null,
        "html_url": format!("https://github.com/dotnet/runtime/issues/{number}")
    })
}

#[tokio::test]
async fn get_issue_sends_auth_headers_and_decodes_issue() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/dotnet/runtime/issues/42"))
        .and(header("authorization", "Bearer ghp_test"))
        .and(header("accept", "application/vnd.github+json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(issue_json(42, &["area-System.Net"])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let issue = client(&server)
        .get_issue(&repo(), IssueNumber::new(42))
        .await
        .unwrap();

    assert_eq!(issue.number, IssueNumber::new(42));
    assert_eq!(issue.labels, vec!["area-System.Net"]);
    assert!(!issue.is_pull_request);
}

#[tokio::test]
async fn search_issues_renders_query_and_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/issues"))
        .and(query_param(
            "q",
            "repo:dotnet/runtime is:issue is:open label:\"needs further triage\"",
        ))
        .and(query_param("page", "2"))
        .and(query_param("per_page", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 101,
            "incomplete_results": false,
            "items": [issue_json(7, &["needs further triage"])]
        })))
        .mount(&server)
        .await;

    let query = SearchQuery::new(repo(), ItemKind::Issue).with_label("needs further triage");
    let page = client(&server).search_issues(&query, 2).await.unwrap();

    assert_eq!(page.total_count, 101);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].number, IssueNumber::new(7));
}

#[tokio::test]
async fn list_cards_follows_pages_until_short_page() {
    let server = MockServer::start().await;
    let full_page: Vec<_> = (1..=100)
        .map(|id| {
            json!({
                "id": id,
                "content_url": format!("https://api.github.com/repos/dotnet/runtime/issues/{id}"),
                "note": null
            })
        })
        .collect();
    Mock::given(method("GET"))
        .and(path("/projects/columns/12751149/cards"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(full_page))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/columns/12751149/cards"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 101, "content_url": null, "note": "Triage guidelines" }
        ])))
        .mount(&server)
        .await;

    let cards = client(&server)
        .list_cards(ColumnId::new(12751149))
        .await
        .unwrap();

    assert_eq!(cards.len(), 101);
    assert_eq!(cards[100].note.as_deref(), Some("Triage guidelines"));
    assert!(cards[100].content_url.is_none());
}

#[tokio::test]
async fn list_columns_and_get_card() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects/3935839/columns"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 12751149, "name": "Untriaged" },
            { "id": 12751157, "name": "Future" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/columns/cards/55"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 55,
            "content_url": "https://api.github.com/repos/dotnet/runtime/issues/9",
            "note": null
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let columns = client.list_columns(ProjectId::new(3935839)).await.unwrap();
    assert_eq!(
        columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        vec!["Untriaged", "Future"]
    );

    let card = client.get_card(CardId::new(55)).await.unwrap();
    assert_eq!(
        card.content_url.as_deref(),
        Some("https://api.github.com/repos/dotnet/runtime/issues/9")
    );
}

#[tokio::test]
async fn create_and_move_cards_post_expected_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/projects/columns/12751161/cards"))
        .and(body_json(json!({ "content_id": 5007, "content_type": "PullRequest" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 900,
            "content_url": "https://api.github.com/repos/dotnet/runtime/issues/7",
            "note": null
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/projects/columns/cards/900/moves"))
        .and(body_json(json!({ "position": "top", "column_id": 12751157 })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let card = client
        .create_card(
            ColumnId::new(12751161),
            NewCard::for_pull_request(triage::PullRequestId::new(5007)),
        )
        .await
        .unwrap();
    assert_eq!(card.id, CardId::new(900));

    client
        .move_card(card.id, CardMove::to_top_of(ColumnId::new(12751157)))
        .await
        .unwrap();
}

#[tokio::test]
async fn pull_request_and_files_are_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/dotnet/runtime/pulls/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 5007,
            "number": 7,
            "title": "Fix Bitmap leak",
            "body": null,
            "user": { "login": "contributor" },
            "state": "open",
            "draft": true
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/dotnet/runtime/pulls/7/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "filename": "src/libraries/System.Drawing/src/Bitmap.cs", "status": "modified", "additions": 3, "deletions": 1 }
        ])))
        .mount(&server)
        .await;

    let client = client(&server);
    let pr = client
        .get_pull_request(&repo(), IssueNumber::new(7))
        .await
        .unwrap();
    assert!(pr.draft);
    assert_eq!(pr.author.as_deref(), Some("contributor"));

    let files = client
        .get_pull_request_files(&repo(), IssueNumber::new(7))
        .await
        .unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].additions, 3);
}

#[tokio::test]
async fn add_labels_posts_label_list() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/dotnet/runtime/issues/42/labels"))
        .and(body_json(json!({ "labels": ["area-System.Net"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "area-System.Net" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .add_labels(&repo(), IssueNumber::new(42), &["area-System.Net".to_string()])
        .await
        .unwrap();
}

#[tokio::test]
async fn error_statuses_map_to_typed_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/dotnet/runtime/issues/1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/dotnet/runtime/issues/2"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "0")
                .insert_header("retry-after", "17")
                .set_body_json(json!({ "message": "API rate limit exceeded" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/dotnet/runtime/issues/3"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Bad credentials" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/projects/columns/1/cards"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "Validation Failed"
        })))
        .mount(&server)
        .await;

    let client = client(&server);

    let err = client.get_issue(&repo(), IssueNumber::new(1)).await.unwrap_err();
    assert!(matches!(err, GitHubError::NotFound { .. }));

    let err = client.get_issue(&repo(), IssueNumber::new(2)).await.unwrap_err();
    assert_eq!(
        err,
        GitHubError::RateLimited {
            reset_after: Some(std::time::Duration::from_secs(17))
        }
    );

    let err = client.get_issue(&repo(), IssueNumber::new(3)).await.unwrap_err();
    assert_eq!(
        err,
        GitHubError::Authentication {
            status: 401,
            message: "Bad credentials".into()
        }
    );

    let err = client
        .create_card(ColumnId::new(1), NewCard::for_issue(triage::IssueId::new(5)))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        GitHubError::Http {
            status: 422,
            message: "Validation Failed".into()
        }
    );
}

#[tokio::test]
async fn malformed_bodies_are_decode_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/dotnet/runtime/issues/5"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = client(&server)
        .get_issue(&repo(), IssueNumber::new(5))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "decode");
}
