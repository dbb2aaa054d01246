//! Offset (`page` / `perPage`) pagination against a mocked v1 API.
//!
//! Uses wiremock to serve pages and count requests.

use serde_json::{json, Value};
use snykapi::{ListQuery, SnykClient, SnykError};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DEPS: &str = "/v1/org/org-1/dependencies";

fn client(server: &MockServer) -> SnykClient {
    SnykClient::builder("test-token")
        .v1_url(format!("{}/v1", server.uri()))
        .rest_url(format!("{}/rest", server.uri()))
        .build()
        .unwrap()
}

fn records(ids: &[&str]) -> Value {
    let results: Vec<Value> = ids.iter().map(|id| json!({"id": id, "name": id})).collect();
    json!({"results": results, "total": 5})
}

async fn mount_page(server: &MockServer, page: u32, per_page: u32, ids: &[&str], times: u64) {
    Mock::given(method("GET"))
        .and(path(DEPS))
        .and(query_param("page", page.to_string()))
        .and(query_param("perPage", per_page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(records(ids)))
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_short_last_page_ends_traversal() {
    let server = MockServer::start().await;
    mount_page(&server, 1, 2, &["a", "b"], 1).await;
    mount_page(&server, 2, 2, &["c", "d"], 1).await;
    mount_page(&server, 3, 2, &["e"], 1).await;

    let deps = client(&server)
        .manager("dependencies")
        .unwrap()
        .scoped("org_id", "org-1");
    let mut models = deps.all(&ListQuery::new().with_per_page(2)).unwrap();

    let mut ids = Vec::new();
    while let Some(model) = models.try_next().await.unwrap() {
        ids.push(model.id);
    }

    assert_eq!(ids, ["a", "b", "c", "d", "e"]);
    assert_eq!(models.pages_fetched(), 3);
}

#[tokio::test]
async fn test_exact_multiple_ends_on_empty_page() {
    let server = MockServer::start().await;
    mount_page(&server, 1, 2, &["a", "b"], 1).await;
    mount_page(&server, 2, 2, &["c", "d"], 1).await;
    mount_page(&server, 3, 2, &[], 1).await;

    let deps = client(&server)
        .manager("dependencies")
        .unwrap()
        .scoped("org_id", "org-1");
    let all = deps.list(&ListQuery::new().with_per_page(2)).await.unwrap();

    assert_eq!(all.len(), 4);
}

#[tokio::test]
async fn test_oversized_page_is_protocol_error_before_any_record() {
    let server = MockServer::start().await;
    mount_page(&server, 1, 2, &["a", "b", "c"], 1).await;

    let deps = client(&server)
        .manager("dependencies")
        .unwrap()
        .scoped("org_id", "org-1");
    let mut models = deps.all(&ListQuery::new().with_per_page(2)).unwrap();

    let err = models.try_next().await.unwrap_err();
    assert!(matches!(err, SnykError::Protocol(_)), "got {err:?}");
    assert!(models.try_next().await.unwrap().is_none());
}

#[tokio::test]
async fn test_start_page_skips_earlier_pages() {
    let server = MockServer::start().await;
    mount_page(&server, 1, 2, &["a", "b"], 0).await;
    mount_page(&server, 2, 2, &["c", "d"], 1).await;
    mount_page(&server, 3, 2, &["e"], 1).await;

    let deps = client(&server)
        .manager("dependencies")
        .unwrap()
        .scoped("org_id", "org-1");
    let all = deps
        .list(&ListQuery::new().with_per_page(2).with_start_page(2))
        .await
        .unwrap();

    let ids: Vec<&str> = all.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, ["c", "d", "e"]);
}

#[tokio::test]
async fn test_traversals_restart_from_first_page() {
    let server = MockServer::start().await;
    mount_page(&server, 1, 2, &["a", "b"], 2).await;
    mount_page(&server, 2, 2, &["c"], 2).await;

    let deps = client(&server)
        .manager("dependencies")
        .unwrap()
        .scoped("org_id", "org-1");
    let collection = deps.collection(&ListQuery::new().with_per_page(2)).unwrap();

    let first = collection.collect_records().await.unwrap();
    let second = collection.collect_records().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}

#[tokio::test]
async fn test_fetch_concurrently_keeps_page_order() {
    let server = MockServer::start().await;
    mount_page(&server, 1, 2, &["a", "b"], 1).await;
    mount_page(&server, 2, 2, &["c", "d"], 1).await;
    mount_page(&server, 3, 2, &["e"], 1).await;
    mount_page(&server, 4, 2, &[], 1).await;

    let deps = client(&server)
        .manager("dependencies")
        .unwrap()
        .scoped("org_id", "org-1");
    let records = deps
        .collection(&ListQuery::new().with_per_page(2))
        .unwrap()
        .fetch_concurrently(2)
        .await
        .unwrap();

    let ids: Vec<&str> = records.iter().filter_map(|r| r["id"].as_str()).collect();
    assert_eq!(ids, ["a", "b", "c", "d", "e"]);
}

#[tokio::test]
async fn test_fetch_concurrently_caps_window_width() {
    let server = MockServer::start().await;
    mount_page(&server, 1, 2, &["a", "b"], 1).await;
    mount_page(&server, 2, 2, &["c"], 1).await;
    // Pages 3..=16 of the first window.
    Mock::given(method("GET"))
        .and(path(DEPS))
        .respond_with(ResponseTemplate::new(200).set_body_json(records(&[])))
        .with_priority(10)
        .expect(14)
        .mount(&server)
        .await;

    let deps = client(&server)
        .manager("dependencies")
        .unwrap()
        .scoped("org_id", "org-1");
    let records = deps
        .collection(&ListQuery::new().with_per_page(2))
        .unwrap()
        .fetch_concurrently(usize::MAX)
        .await
        .unwrap();

    assert_eq!(records.len(), 3);
}

#[tokio::test]
async fn test_interleaved_traversals_keep_separate_state() {
    let server = MockServer::start().await;
    mount_page(&server, 1, 2, &["a", "b"], 2).await;
    mount_page(&server, 2, 2, &["c"], 2).await;

    let deps = client(&server)
        .manager("dependencies")
        .unwrap()
        .scoped("org_id", "org-1");
    let collection = deps.collection(&ListQuery::new().with_per_page(2)).unwrap();

    let mut left = collection.traverse();
    let mut right = collection.traverse();
    let mut left_ids = Vec::new();
    let mut right_ids = Vec::new();
    loop {
        let l = left.next_record().await.unwrap();
        let r = right.next_record().await.unwrap();
        if l.is_none() && r.is_none() {
            break;
        }
        left_ids.extend(l.and_then(|v| v["id"].as_str().map(String::from)));
        right_ids.extend(r.and_then(|v| v["id"].as_str().map(String::from)));
    }

    assert_eq!(left_ids, ["a", "b", "c"]);
    assert_eq!(right_ids, left_ids);
}

#[tokio::test]
async fn test_fetch_concurrently_rejects_cursor_collections() {
    let server = MockServer::start().await;
    let client = SnykClient::builder("test-token")
        .rest_url(format!("{}/rest", server.uri()))
        .version("2024-10-15".parse().unwrap())
        .build()
        .unwrap();

    let err = client
        .manager("targets")
        .unwrap()
        .scoped("org_id", "org-1")
        .collection(&ListQuery::default())
        .unwrap()
        .fetch_concurrently(4)
        .await
        .unwrap_err();

    assert!(matches!(err, SnykError::Configuration(_)));
}

#[tokio::test]
async fn test_raw_v1_pages_helper() {
    let server = MockServer::start().await;
    mount_page(&server, 1, 2, &["a", "b"], 1).await;
    mount_page(&server, 2, 2, &["c"], 1).await;

    let records = client(&server)
        .get_v1_pages("org/org-1/dependencies", "results", &ListQuery::new().with_per_page(2))
        .await
        .unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[2]["name"], "c");
}
