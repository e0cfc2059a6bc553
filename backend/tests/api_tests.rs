//! End-to-end tests of the REST surface
//!
//! Each test builds the full router over a fresh SQLite file and drives
//! it with `tower::ServiceExt::oneshot`.

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use collector_api::auth::jwt::issue_token;
use collector_api::config::Config;
use collector_api::db::{CreateUser, Database, UpsertTag, run_seeds};
use collector_api::query::Identity;
use collector_api::query::acl::{MANAGER, NODE_MANAGER};
use collector_api::{AppState, build_app, entities};

const SECRET: &str = "test-secret";

struct Fixture {
    _dir: TempDir,
    db: Database,
    app: Router,
    alice: i64,
}

async fn setup() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("collector.db").display().to_string();
    let config = Config::from_lookup(|key| match key {
        "DATABASE_PATH" => Some(path.clone()),
        "JWT_SECRET" => Some(SECRET.to_string()),
        _ => None,
    })
    .unwrap();

    let registry = entities::registry();
    let db = Database::connect(&config.database_url, 1).await.unwrap();
    let sync = db.sync_schema(&registry).await;
    assert!(sync.errors.is_empty(), "{:?}", sync.errors);
    run_seeds(&db, &config).await;

    let alice = seed(&db).await;
    let app = build_app(AppState::new(config, db.clone(), registry));

    Fixture {
        _dir: dir,
        db,
        app,
        alice,
    }
}

/// Two apps, one node each. alice's group is published on app X only.
/// `prod` is on node1, `dev` on both nodes, `orphan` on none.
async fn seed(db: &Database) -> i64 {
    let pool = db.pool();
    for sql in [
        "INSERT INTO apps (id, app) VALUES (1, 'X'), (2, 'Y')",
        "INSERT INTO nodes (node_id, nodename, app) VALUES ('nid-1', 'node1', 'X'), ('nid-2', 'node2', 'Y')",
        "INSERT INTO auth_node (nodename, node_id, uuid) VALUES ('node1', 'nid-1', 'node1-uuid')",
    ] {
        sqlx::query(sql).execute(pool).await.unwrap();
    }

    let users = db.users();
    users.ensure_group("team-x", "Team X", false).await.unwrap();
    let team = users.get_group_by_role("team-x").await.unwrap().unwrap();
    let alice = users
        .create(CreateUser {
            username: "alice".to_string(),
            first_name: None,
            last_name: None,
            email: Some("alice@example.com".to_string()),
            password_hash: bcrypt::hash("secret", 4).unwrap(),
        })
        .await
        .unwrap();
    users.add_membership(alice, team.id, true).await.unwrap();
    sqlx::query("INSERT INTO apps_publications (app_id, group_id) VALUES (1, ?)")
        .bind(team.id)
        .execute(pool)
        .await
        .unwrap();

    let tags = db.tags();
    for name in ["prod", "dev", "orphan"] {
        tags.upsert(&UpsertTag {
            tag_name: name.to_string(),
            tag_exclude: None,
            tag_data: None,
        })
        .await
        .unwrap();
    }
    for (node_id, tag_name) in [("nid-1", "prod"), ("nid-1", "dev"), ("nid-2", "dev")] {
        sqlx::query(
            "INSERT INTO node_tags (node_id, tag_id) SELECT ?, tag_id FROM tags WHERE tag_name = ?",
        )
        .bind(node_id)
        .bind(tag_name)
        .execute(pool)
        .await
        .unwrap();
    }

    alice
}

fn bearer(identity: &Identity) -> String {
    let issued = issue_token(identity, None, SECRET, 600).unwrap();
    format!("Bearer {}", issued.token)
}

fn alice(fx: &Fixture) -> String {
    bearer(&Identity::user(fx.alice, "alice", Vec::new()))
}

fn manager() -> String {
    bearer(&Identity::user(999, "root", vec![MANAGER.to_string()]))
}

async fn send(app: &Router, method: Method, uri: &str, auth: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn tag_count(db: &Database) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM tags")
        .fetch_one(db.pool())
        .await
        .unwrap()
}

#[tokio::test]
async fn unauthenticated_requests_are_rejected() {
    let fx = setup().await;
    let (status, body) = send(&fx.app, Method::GET, "/tags", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = send(&fx.app, Method::GET, "/tags", Some("Bearer not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&fx.app, Method::GET, "/healthz", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn user_sees_tags_through_published_apps() {
    let fx = setup().await;
    let (status, body) = send(
        &fx.app,
        Method::GET,
        "/tags?props=tag_name,nodes.nodename&filters=tag_name=prod",
        Some(&alice(&fx)),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"], json!([{"tag_name": "prod", "nodes.nodename": "node1"}]));
    assert_eq!(body["meta"]["included_props"], json!(["tag_name", "nodes.nodename"]));
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["meta"]["count"], 1);
    assert_eq!(body["meta"]["limit"], 20);
    assert_eq!(body["meta"]["offset"], 0);

    let available = body["meta"]["available_props"].as_array().unwrap();
    assert!(available.contains(&json!("tag_id")));
    assert!(available.contains(&json!("nodes.fqdn")));
}

#[tokio::test]
async fn negative_offset_is_reported_as_applied() {
    let fx = setup().await;
    let (status, body) = send(
        &fx.app,
        Method::GET,
        "/tags?props=tag_name&orderby=tag_name&offset=-5&limit=2",
        Some(&manager()),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["meta"]["offset"], 0);
    assert_eq!(body["meta"]["limit"], 2);
    assert_eq!(body["meta"]["total"], 3);
    assert_eq!(body["data"], json!([{"tag_name": "dev"}, {"tag_name": "orphan"}]));
}

#[tokio::test]
async fn unpublished_apps_stay_hidden() {
    let fx = setup().await;
    let (status, body) = send(
        &fx.app,
        Method::GET,
        "/tags?props=tag_name,nodes.nodename&orderby=tag_name",
        Some(&alice(&fx)),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!([
            {"tag_name": "dev", "nodes.nodename": "node1"},
            {"tag_name": "prod", "nodes.nodename": "node1"},
        ])
    );

    let (_, body) = send(&fx.app, Method::GET, "/tags?meta=0", Some(&manager()), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
    assert!(body.get("meta").is_none());
}

#[tokio::test]
async fn node_callers_are_scoped_to_their_app() {
    let fx = setup().await;
    let node = bearer(&Identity::node("nid-1", "node1"));
    let (status, body) = send(&fx.app, Method::GET, "/nodes?props=nodename", Some(&node), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([{"nodename": "node1"}]));
}

#[tokio::test]
async fn node_basic_credentials_issue_a_token() {
    let fx = setup().await;
    // node1:node1-uuid
    let basic = "Basic bm9kZTE6bm9kZTEtdXVpZA==";
    let (status, body) = send(&fx.app, Method::GET, "/auth/node/token", Some(basic), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let token = format!("Bearer {}", body["token"].as_str().unwrap());
    let (status, body) = send(&fx.app, Method::GET, "/auth/user/token", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");
}

#[tokio::test]
async fn delete_without_names_or_filters_is_refused() {
    let fx = setup().await;
    let (status, _) = send(&fx.app, Method::DELETE, "/tags", Some(&manager()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&fx.app, Method::DELETE, "/tags?filters=???", Some(&manager()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert_eq!(tag_count(&fx.db).await, 3);
}

#[tokio::test]
async fn delete_requires_tag_manager() {
    let fx = setup().await;
    let (status, _) = send(
        &fx.app,
        Method::DELETE,
        "/tags?filters=tag_name=prod",
        Some(&alice(&fx)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(tag_count(&fx.db).await, 3);
}

#[tokio::test]
async fn delete_by_name_removes_attachments() {
    let fx = setup().await;
    let (status, body) = send(
        &fx.app,
        Method::DELETE,
        "/tags",
        Some(&manager()),
        Some(json!([{"tag_name": "dev"}])),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"][0]["tag_name"], "dev");
    assert_eq!(tag_count(&fx.db).await, 2);

    let attached: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM node_tags")
        .fetch_one(fx.db.pool())
        .await
        .unwrap();
    assert_eq!(attached, 1);
}

#[tokio::test]
async fn delete_matching_nothing_is_no_content() {
    let fx = setup().await;
    let (status, _) = send(
        &fx.app,
        Method::DELETE,
        "/tags?filters=tag_name=missing",
        Some(&manager()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(tag_count(&fx.db).await, 3);
}

#[tokio::test]
async fn post_tags_upserts_by_name() {
    let fx = setup().await;
    let (status, body) = send(
        &fx.app,
        Method::POST,
        "/tags?props=tag_name,tag_data",
        Some(&manager()),
        Some(json!([{"tag_name": "prod", "tag_data": "p"}, {"tag_name": "qa"}])),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(
        body["data"],
        json!([{"tag_name": "prod", "tag_data": "p"}, {"tag_name": "qa", "tag_data": null}])
    );
    assert_eq!(tag_count(&fx.db).await, 4);
}

#[tokio::test]
async fn tag_detail_by_id_or_name() {
    let fx = setup().await;
    let (status, body) = send(&fx.app, Method::GET, "/tags/prod", Some(&alice(&fx)), None).await;
    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["tag_id"], entities::tag_id_for("prod"));

    let (_, body) = send(&fx.app, Method::GET, "/tags/orphan", Some(&alice(&fx)), None).await;
    assert_eq!(body["data"], json!([]));

    let (_, body) = send(&fx.app, Method::GET, "/tags/dev/nodes?props=nodename", Some(&alice(&fx)), None).await;
    assert_eq!(body["data"], json!([{"nodename": "node1"}]));
}

#[tokio::test]
async fn node_update_checks_privilege_and_columns() {
    let fx = setup().await;
    let (status, _) = send(
        &fx.app,
        Method::POST,
        "/nodes/node1",
        Some(&alice(&fx)),
        Some(json!({"fqdn": "node1.example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = bearer(&Identity::user(999, "ops", vec![NODE_MANAGER.to_string()]));
    let (status, _) = send(
        &fx.app,
        Method::POST,
        "/nodes/node1",
        Some(&admin),
        Some(json!({"node_id": "other"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &fx.app,
        Method::POST,
        "/nodes/node1?props=nodename,fqdn",
        Some(&manager()),
        Some(json!({"fqdn": "node1.example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"], json!([{"nodename": "node1", "fqdn": "node1.example.com"}]));
}

#[tokio::test]
async fn node_writes_need_responsibility_not_publication() {
    let fx = setup().await;
    let operator = bearer(&Identity::user(fx.alice, "alice", vec![NODE_MANAGER.to_string()]));
    let change = json!({"fqdn": "node1.example.com"});

    let (status, _) = send(&fx.app, Method::GET, "/nodes/node1", Some(&operator), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &fx.app,
        Method::POST,
        "/nodes/node1",
        Some(&operator),
        Some(change.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");

    let team = fx.db.users().get_group_by_role("team-x").await.unwrap().unwrap();
    sqlx::query("INSERT INTO apps_responsibles (app_id, group_id) VALUES (1, ?)")
        .bind(team.id)
        .execute(fx.db.pool())
        .await
        .unwrap();

    let (status, body) = send(
        &fx.app,
        Method::POST,
        "/nodes/node1?props=fqdn",
        Some(&operator),
        Some(change),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"], json!([{"fqdn": "node1.example.com"}]));

    let (status, _) = send(
        &fx.app,
        Method::DELETE,
        "/nodes/node2",
        Some(&operator),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn candidate_tags_exclude_attached_ones() {
    let fx = setup().await;
    let (status, body) = send(
        &fx.app,
        Method::GET,
        "/nodes/node2/candidate_tags?props=tag_name&orderby=tag_name",
        Some(&manager()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"], json!([{"tag_name": "orphan"}, {"tag_name": "prod"}]));
}

#[tokio::test]
async fn users_without_privilege_see_themselves() {
    let fx = setup().await;
    let (status, body) = send(&fx.app, Method::GET, "/users", Some(&alice(&fx)), None).await;
    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["username"], "alice");
    assert!(data[0].get("password").is_none());

    let (status, body) = send(&fx.app, Method::GET, "/users?props=password", Some(&manager()), None).await;
    assert_eq!(status, StatusCode::OK);
    for user in body["data"].as_array().unwrap() {
        assert!(user.get("password").is_none(), "{user}");
        assert!(user.get("username").is_some());
    }

    let node = bearer(&Identity::node("nid-1", "node1"));
    let (status, _) = send(&fx.app, Method::GET, "/users", Some(&node), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let uri = format!("/users/{}/apps/publication?props=app", fx.alice);
    let (_, body) = send(&fx.app, Method::GET, &uri, Some(&alice(&fx)), None).await;
    assert_eq!(body["data"], json!([{"app": "X"}]));

    let uri = format!("/users/{}/apps/responsible", fx.alice);
    let (_, body) = send(&fx.app, Method::GET, &uri, Some(&alice(&fx)), None).await;
    assert_eq!(body["data"], json!([]));
}
