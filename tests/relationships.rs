//! Relationship navigation between hydrated models.

use serde_json::json;
use snykapi::{Binding, ListQuery, RelatedIds, SnykClient};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const VERSION: &str = "2024-10-15";

fn client(server: &MockServer) -> SnykClient {
    SnykClient::builder("test-token")
        .v1_url(format!("{}/v1", server.uri()))
        .rest_url(format!("{}/rest", server.uri()))
        .version(VERSION.parse().unwrap())
        .build()
        .unwrap()
}

async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_org_children_are_scoped_by_org_id() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "/v1/orgs",
        json!({"orgs": [{"id": "o1", "name": "Acme", "group": {"id": "g1", "name": "Holding"}}]}),
        1,
    )
    .await;
    mount_json(
        &server,
        "/v1/org/o1/projects",
        json!({"org": {"id": "o1"}, "projects": [{"id": "p1", "name": "api"}, {"id": "p2", "name": "web"}]}),
        1,
    )
    .await;

    let client = client(&server);
    let orgs = client.organizations().unwrap().list(&ListQuery::default()).await.unwrap();

    let projects = orgs[0].relationship("projects").unwrap();
    assert_eq!(projects.target, Some("projects"));
    assert!(matches!(&projects.binding, Binding::Scoped(params) if params.get("org_id") == Some("o1")));

    let related = projects.resolve(&client).await.unwrap();
    let ids: Vec<&str> = related.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, ["p1", "p2"]);
    assert_eq!(related[0].scope.get("org_id"), Some("o1"));
}

#[tokio::test]
async fn test_v1_reference_resolves_through_target_resource() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "/v1/orgs",
        json!({"orgs": [{"id": "o1", "name": "Acme", "group": {"id": "g1", "name": "Holding"}}]}),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/rest/groups/g1"))
        .and(query_param("version", VERSION))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"id": "g1", "type": "group", "attributes": {"name": "Holding"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let orgs = client.organizations().unwrap().list(&ListQuery::default()).await.unwrap();

    let group = orgs[0].relationship("group").unwrap();
    assert_eq!(group.data, RelatedIds::One("g1".to_string()));
    assert_eq!(group.related_type.as_deref(), Some("group"));

    let groups = group.resolve(&client).await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].attr_str("name"), Some("Holding"));
}

#[tokio::test]
async fn test_rest_related_link_is_followed() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "/rest/orgs/o1/projects",
        json!({
            "data": [{
                "id": "p1",
                "type": "project",
                "attributes": {"name": "api"},
                "relationships": {
                    "target": {
                        "data": {"id": "t1", "type": "target"},
                        "links": {"related": "/rest/orgs/o1/targets/t1?version=2024-05-23"}
                    }
                }
            }]
        }),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/rest/orgs/o1/targets/t1"))
        .and(query_param("version", "2024-05-23"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"id": "t1", "type": "target", "attributes": {"display_name": "acme/api"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let projects = client
        .manager("rest_projects")
        .unwrap()
        .scoped("org_id", "o1")
        .list(&ListQuery::default())
        .await
        .unwrap();

    let target = projects[0].relationship("target").unwrap();
    assert_eq!(target.target, Some("targets"));
    assert!(matches!(target.binding, Binding::Link(_)));

    let resolved = target.resolve(&client).await.unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].id, "t1");
    assert_eq!(resolved[0].attr_str("display_name"), Some("acme/api"));
}

#[tokio::test]
async fn test_rest_identifier_without_link_fetches_by_id() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "/rest/orgs/o1/projects",
        json!({
            "data": [{
                "id": "p1",
                "type": "project",
                "attributes": {"name": "api"},
                "relationships": {"target": {"data": {"id": "t7", "type": "target"}}}
            }]
        }),
        1,
    )
    .await;
    mount_json(
        &server,
        "/rest/orgs/o1/targets/t7",
        json!({"data": {"id": "t7", "type": "target", "attributes": {"display_name": "acme/web"}}}),
        1,
    )
    .await;

    let client = client(&server);
    let projects = client
        .manager("rest_projects")
        .unwrap()
        .scoped("org_id", "o1")
        .list(&ListQuery::default())
        .await
        .unwrap();

    let target = projects[0].relationship("target").unwrap();
    assert_eq!(target.binding, Binding::Identified);

    let resolved = target.resolve(&client).await.unwrap();
    assert_eq!(resolved[0].attr_str("display_name"), Some("acme/web"));
}

#[tokio::test]
async fn test_rest_organization_identifier_fetches_org_by_id() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "/rest/orgs/o1/projects",
        json!({
            "data": [{
                "id": "p1",
                "type": "project",
                "attributes": {"name": "api"},
                "relationships": {"organization": {"data": {"id": "o1", "type": "org"}}}
            }]
        }),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/rest/orgs/o1"))
        .and(query_param("version", VERSION))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"id": "o1", "type": "org", "attributes": {"name": "Acme", "slug": "acme"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let projects = client
        .manager("rest_projects")
        .unwrap()
        .scoped("org_id", "o1")
        .list(&ListQuery::default())
        .await
        .unwrap();

    let org = projects[0].relationship("organization").unwrap();
    assert_eq!(org.target, Some("rest_orgs"));
    assert_eq!(org.binding, Binding::Identified);

    let resolved = org.resolve(&client).await.unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].id, "o1");
    assert_eq!(resolved[0].attr_str("slug"), Some("acme"));
}

#[tokio::test]
async fn test_identifier_without_addressable_target_is_configuration_error() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "/rest/orgs/o1/projects",
        json!({
            "data": [{
                "id": "p1",
                "type": "project",
                "relationships": {"importer": {"data": {"id": "u1", "type": "user"}}}
            }]
        }),
        1,
    )
    .await;

    let client = client(&server);
    let projects = client
        .manager("rest_projects")
        .unwrap()
        .scoped("org_id", "o1")
        .list(&ListQuery::default())
        .await
        .unwrap();

    let importer = projects[0].relationship("importer").unwrap();
    assert_eq!(importer.target, None);
    assert!(matches!(
        importer.resolve(&client).await,
        Err(snykapi::SnykError::Configuration(_))
    ));
}

#[tokio::test]
async fn test_unknown_identified_target_is_configuration_error() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "/rest/orgs/o1/projects",
        json!({
            "data": [{
                "id": "p1",
                "type": "project",
                "relationships": {"importer": {"data": {"id": "u1", "type": "robot"}}}
            }]
        }),
        1,
    )
    .await;

    let client = client(&server);
    let projects = client
        .manager("rest_projects")
        .unwrap()
        .scoped("org_id", "o1")
        .list(&ListQuery::default())
        .await
        .unwrap();

    let importer = projects[0].relationship("importer").unwrap();
    assert_eq!(importer.target, None);
    assert_eq!(importer.ids(), ["u1"]);
    assert!(matches!(
        importer.manager(&client),
        Err(snykapi::SnykError::Configuration(_))
    ));
}
