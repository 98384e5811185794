//! Router-level tests. Each test builds its own in-process app over a fresh
//! database, so they are independent and can run in parallel.

mod common;

use axum::http::StatusCode;
use chrono::Duration;
use serde_json::{Value, json};

use common::{Auth, TestApp};

fn revision_numbers(history: &Value) -> Vec<i64> {
    history
        .as_array()
        .expect("history is an array")
        .iter()
        .map(|rev| rev["revision_number"].as_i64().expect("revision number"))
        .collect()
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let resp = app.get("/health", Auth::None).await;
    assert_eq!(resp.status, StatusCode::OK);
}

#[tokio::test]
async fn test_history_and_revert() {
    let app = TestApp::new();
    let (_, token) = app.user("alice");
    let ns = app.namespace(&token, "config").await;
    let auth = || Auth::Bearer(&token);

    let resp = app
        .post(
            "/api/v1/keys",
            auth(),
            json!({ "namespaceId": ns, "name": "db-url", "value": "v1" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED, "{:?}", resp.body);
    assert_eq!(resp.data()["current_revision_number"], 1);

    for value in ["v2", "v3"] {
        let resp = app
            .put(
                &format!("/api/v1/keys/db-url?namespaceId={ns}"),
                auth(),
                json!({ "value": value }),
            )
            .await;
        assert_eq!(resp.status, StatusCode::OK, "{:?}", resp.body);
    }

    let resp = app
        .post(
            "/api/v1/keys/db-url/revert/1",
            auth(),
            json!({ "namespaceId": ns }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{:?}", resp.body);
    assert_eq!(resp.data()["current_value"], "v1");
    assert_eq!(resp.data()["current_revision_number"], 1);

    let resp = app
        .put(
            &format!("/api/v1/keys/db-url?namespaceId={ns}"),
            auth(),
            json!({ "value": "v4" }),
        )
        .await;
    assert_eq!(resp.data()["current_revision_number"], 4);

    let resp = app
        .get(&format!("/api/v1/keys/db-url/history?namespaceId={ns}"), auth())
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(revision_numbers(resp.data()), vec![4, 3, 2, 1]);

    let resp = app
        .get(
            &format!("/api/v1/keys/db-url/revisions/2?namespaceId={ns}"),
            auth(),
        )
        .await;
    assert_eq!(resp.data()["value"], "v2");

    let resp = app
        .get(&format!("/api/v1/keys/db-url/value?namespaceId={ns}"), auth())
        .await;
    assert_eq!(resp.data()["value"], "v4");
    assert_eq!(resp.data()["revision_number"], 4);

    let resp = app
        .get(
            &format!("/api/v1/keys/db-url/revisions/9?namespaceId={ns}"),
            auth(),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let resp = app
        .get(
            &format!("/api/v1/keys/db-url/revisions/0?namespaceId={ns}"),
            auth(),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_readonly_member_can_read_but_not_write() {
    let app = TestApp::new();
    let (_, owner) = app.user("owner");
    let (bob_id, bob) = app.user("bob");
    let ns = app.namespace(&owner, "shared").await;

    app.post(
        "/api/v1/keys",
        Auth::Bearer(&owner),
        json!({ "namespaceId": ns, "name": "greeting", "value": "hello" }),
    )
    .await;

    let resp = app
        .post(
            "/api/v1/namespace/members",
            Auth::Bearer(&owner),
            json!({ "namespaceId": ns, "user_id": bob_id, "role": "ReadOnly" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{:?}", resp.body);
    assert_eq!(resp.data()["role"], "ReadOnly");

    let resp = app
        .get(
            &format!("/api/v1/keys/greeting?namespaceId={ns}"),
            Auth::Bearer(&bob),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.data()["current_value"], "hello");

    let resp = app
        .put(
            &format!("/api/v1/keys/greeting?namespaceId={ns}"),
            Auth::Bearer(&bob),
            json!({ "value": "goodbye" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .get(
            &format!("/api/v1/namespace/members?namespaceId={ns}"),
            Auth::Bearer(&bob),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .get(
            &format!("/api/v1/namespace/access?namespaceId={ns}&role=Editor"),
            Auth::Bearer(&bob),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.data()["role"], "ReadOnly");
    assert_eq!(resp.data()["allowed"], false);

    let resp = app
        .get(
            &format!("/api/v1/keys/greeting?namespaceId={ns}"),
            Auth::Bearer(&owner),
        )
        .await;
    assert_eq!(resp.data()["current_value"], "hello");
}

#[tokio::test]
async fn test_outsider_is_forbidden() {
    let app = TestApp::new();
    let (_, owner) = app.user("owner");
    let (_, eve) = app.user("eve");
    let ns = app.namespace(&owner, "private").await;

    let resp = app
        .get(&format!("/api/v1/keys?namespaceId={ns}"), Auth::Bearer(&eve))
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.error(), "You do not have access to this namespace");
}

#[tokio::test]
async fn test_namespace_id_required_and_validated() {
    let app = TestApp::new();
    let (_, token) = app.user("alice");
    app.namespace(&token, "config").await;

    let resp = app.get("/api/v1/keys", Auth::Bearer(&token)).await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.error(), "Namespace context required");

    let resp = app
        .get("/api/v1/keys?namespaceId=abc", Auth::Bearer(&token))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = app
        .post(
            "/api/v1/keys",
            Auth::Bearer(&token),
            json!({ "namespaceId": -4, "name": "k", "value": "v" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unauthenticated_requests() {
    let app = TestApp::new();
    let (_, token) = app.user("alice");
    let ns = app.namespace(&token, "config").await;

    let resp = app
        .get(&format!("/api/v1/keys?namespaceId={ns}"), Auth::None)
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert!(resp.headers.contains_key("www-authenticate"));

    let resp = app
        .get(
            &format!("/api/v1/keys?namespaceId={ns}"),
            Auth::Bearer("revlo_deadbeef_notarealtoken"),
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

    let resp = app.get("/api/v1/admin/users", Auth::Bearer(&token)).await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_namespace_soft_delete_cascades() {
    let app = TestApp::new();
    let (_, token) = app.user("alice");
    let ns = app.namespace(&token, "doomed").await;

    app.post(
        "/api/v1/keys",
        Auth::Bearer(&token),
        json!({ "namespaceId": ns, "name": "a", "value": "1" }),
    )
    .await;
    let issued = app
        .post(
            "/api/v1/credentials",
            Auth::Bearer(&token),
            json!({ "namespaceId": ns, "role": "Editor" }),
        )
        .await;
    assert_eq!(issued.status, StatusCode::CREATED, "{:?}", issued.body);
    let secret = issued.data()["secret"].as_str().unwrap().to_string();

    let resp = app
        .delete(
            &format!("/api/v1/namespace?namespaceId={ns}"),
            Auth::Bearer(&token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let resp = app
        .get(&format!("/api/v1/keys/a?namespaceId={ns}"), Auth::Bearer(&token))
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app.get("/api/v1/keys/a", Auth::ApiKey(&secret)).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

    let resp = app.get("/api/v1/namespaces", Auth::Bearer(&token)).await;
    assert_eq!(resp.data(), &json!([]));

    let resp = app.get("/api/v1/credentials", Auth::Bearer(&token)).await;
    assert_eq!(resp.data(), &json!([]));

    let stats = revlo::store::Store::stats(app.store.as_ref()).unwrap();
    assert_eq!(stats.keys, 0);
    assert_eq!(stats.namespaces, 0);

    // The name is free again.
    app.namespace(&token, "doomed").await;
}

#[tokio::test]
async fn test_key_delete_and_restore() {
    let app = TestApp::new();
    let (_, token) = app.user("alice");
    let ns = app.namespace(&token, "config").await;
    let uri = format!("/api/v1/keys/flag?namespaceId={ns}");

    let resp = app
        .post(
            "/api/v1/keys",
            Auth::Bearer(&token),
            json!({ "namespaceId": ns, "name": "flag", "value": "on" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);

    let resp = app
        .post(
            "/api/v1/keys",
            Auth::Bearer(&token),
            json!({ "namespaceId": ns, "name": "flag", "value": "again" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CONFLICT);

    assert_eq!(
        app.delete(&uri, Auth::Bearer(&token)).await.status,
        StatusCode::NO_CONTENT
    );
    assert_eq!(
        app.get(&uri, Auth::Bearer(&token)).await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        app.delete(&uri, Auth::Bearer(&token)).await.status,
        StatusCode::NOT_FOUND
    );

    let resp = app
        .post(
            "/api/v1/keys/flag/restore",
            Auth::Bearer(&token),
            json!({ "namespaceId": ns }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{:?}", resp.body);
    assert_eq!(resp.data()["current_value"], "on");

    let resp = app
        .get(&format!("/api/v1/keys?namespaceId={ns}"), Auth::Bearer(&token))
        .await;
    assert_eq!(resp.data().as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_credential_scope_and_ceiling() {
    let app = TestApp::new();
    let (_, owner) = app.user("owner");
    let (bob_id, bob) = app.user("bob");
    let ns_a = app.namespace(&owner, "alpha").await;
    let ns_b = app.namespace(&owner, "beta").await;

    app.post(
        "/api/v1/namespace/members",
        Auth::Bearer(&owner),
        json!({ "namespaceId": ns_a, "user_id": bob_id, "role": "Editor" }),
    )
    .await;

    let resp = app
        .post(
            "/api/v1/credentials",
            Auth::Bearer(&bob),
            json!({ "namespaceId": ns_a, "role": "Admin" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .post(
            "/api/v1/credentials",
            Auth::Bearer(&bob),
            json!({ "namespaceId": ns_b, "role": "ReadOnly" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .post(
            "/api/v1/credentials",
            Auth::Bearer(&bob),
            json!({ "namespaceId": ns_a, "role": "Editor", "ttl_days": 31 }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = app
        .post(
            "/api/v1/credentials",
            Auth::Bearer(&bob),
            json!({ "namespaceId": ns_a.to_string(), "role": "Editor", "description": "ci" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED, "{:?}", resp.body);
    let secret = resp.data()["secret"].as_str().unwrap().to_string();
    assert_eq!(secret.len(), 86);
    assert_eq!(resp.data()["role"], "Editor");
    assert_eq!(resp.data()["user_id"], bob_id);

    // Defaults to the credential's own namespace.
    let resp = app
        .post(
            "/api/v1/keys",
            Auth::ApiKey(&secret),
            json!({ "name": "from-ci", "value": "1" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED, "{:?}", resp.body);
    assert_eq!(resp.data()["namespace_id"], ns_a);

    let resp = app
        .get(
            &format!("/api/v1/keys?namespaceId={ns_b}"),
            Auth::ApiKey(&secret),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .delete(
            &format!("/api/v1/namespace?namespaceId={ns_a}"),
            Auth::ApiKey(&secret),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    // Session-only routes reject API keys.
    let resp = app.get("/api/v1/credentials", Auth::ApiKey(&secret)).await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let listed = app.get("/api/v1/credentials", Auth::Bearer(&bob)).await;
    let listed = listed.data().as_array().unwrap().clone();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].get("secret").is_none());
    assert!(listed[0]["secret_preview"].as_str().unwrap().contains('*'));

    let id = listed[0]["id"].as_i64().unwrap();
    let resp = app
        .delete(&format!("/api/v1/credentials/{id}"), Auth::Bearer(&owner))
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_credential_issue_namespace_from_gate() {
    let app = TestApp::new();
    let (_, alice) = app.user("alice");
    let (bob_id, bob) = app.user("bob");
    let ns_a = app.namespace(&alice, "alpha").await;
    let ns_b = app.namespace(&alice, "beta").await;

    app.post(
        "/api/v1/namespace/members",
        Auth::Bearer(&alice),
        json!({ "namespaceId": ns_a, "user_id": bob_id, "role": "ReadOnly" }),
    )
    .await;

    let resp = app
        .post(
            "/api/v1/credentials",
            Auth::Bearer(&alice),
            json!({ "role": "ReadOnly" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert!(!resp.error().is_empty());

    let resp = app
        .post(
            &format!("/api/v1/credentials?namespaceId={ns_a}"),
            Auth::Bearer(&alice),
            json!({ "role": "ReadOnly" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED, "{:?}", resp.body);
    assert_eq!(resp.data()["namespace_id"], ns_a);

    // Query wins over the body.
    let resp = app
        .post(
            &format!("/api/v1/credentials?namespaceId={ns_b}"),
            Auth::Bearer(&alice),
            json!({ "namespaceId": ns_a, "role": "Editor" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED, "{:?}", resp.body);
    assert_eq!(resp.data()["namespace_id"], ns_b);
    let secret = resp.data()["secret"].as_str().unwrap().to_string();

    // bob only belongs to alpha, so the query id decides the outcome.
    let resp = app
        .post(
            &format!("/api/v1/credentials?namespaceId={ns_b}"),
            Auth::Bearer(&bob),
            json!({ "namespaceId": ns_a, "role": "ReadOnly" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .post(
            "/api/v1/credentials?namespaceId=abc",
            Auth::Bearer(&alice),
            json!({ "role": "ReadOnly" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    // API keys cannot mint further keys.
    let resp = app
        .post(
            "/api/v1/credentials",
            Auth::ApiKey(&secret),
            json!({ "role": "ReadOnly" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(
        app.get("/api/v1/credentials", Auth::Bearer(&alice))
            .await
            .data()
            .as_array()
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn test_namespace_lookup_by_name() {
    let app = TestApp::new();
    let (_, alice) = app.user("alice");
    let (bob_id, bob) = app.user("bob");
    let alpha = app.namespace(&alice, "alpha").await;
    app.namespace(&alice, "beta").await;
    let bobs_alpha = app.namespace(&bob, "alpha").await;

    let resp = app
        .get("/api/v1/namespaces?name=alpha", Auth::Bearer(&alice))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let found = resp.data().as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["id"], alpha);
    assert_eq!(found[0]["role"], "Admin");

    // Only namespaces the caller belongs to are visible.
    let resp = app
        .get("/api/v1/namespaces?name=beta", Auth::Bearer(&bob))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.data().as_array().unwrap().is_empty());

    let resp = app
        .get("/api/v1/namespaces?name=alpha", Auth::Bearer(&bob))
        .await;
    assert_eq!(resp.data()[0]["id"], bobs_alpha);

    app.post(
        "/api/v1/namespace/members",
        Auth::Bearer(&alice),
        json!({ "namespaceId": alpha, "user_id": bob_id, "role": "ReadOnly" }),
    )
    .await;
    let resp = app
        .get("/api/v1/namespaces?name=alpha", Auth::Bearer(&bob))
        .await;
    assert_eq!(resp.data().as_array().unwrap().len(), 2);

    let resp = app.get("/api/v1/namespaces", Auth::Bearer(&alice)).await;
    assert_eq!(resp.data().as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_expired_and_revoked_credentials_are_unauthorized() {
    let app = TestApp::new();
    let (_, token) = app.user("alice");
    let ns = app.namespace(&token, "config").await;

    let issue = |ttl: i64| {
        app.post(
            "/api/v1/credentials",
            Auth::Bearer(&token),
            json!({ "namespaceId": ns, "role": "ReadOnly", "ttl_days": ttl }),
        )
    };

    let short = issue(1).await;
    let short_secret = short.data()["secret"].as_str().unwrap().to_string();
    let long = issue(30).await;
    let long_secret = long.data()["secret"].as_str().unwrap().to_string();
    let long_id = long.data()["id"].as_i64().unwrap();

    let resp = app.get("/api/v1/keys", Auth::ApiKey(&short_secret)).await;
    assert_eq!(resp.status, StatusCode::OK);

    app.clock.advance(Duration::days(2));

    let resp = app.get("/api/v1/keys", Auth::ApiKey(&short_secret)).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.error(), "API key has expired");

    let resp = app.get("/api/v1/keys", Auth::ApiKey(&long_secret)).await;
    assert_eq!(resp.status, StatusCode::OK);

    let resp = app
        .delete(&format!("/api/v1/credentials/{long_id}"), Auth::Bearer(&token))
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let resp = app.get("/api/v1/keys", Auth::ApiKey(&long_secret)).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.error(), "API key has been revoked");

    let resp = app
        .delete(&format!("/api/v1/credentials/{long_id}"), Auth::Bearer(&token))
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let resp = app.get("/api/v1/keys", Auth::ApiKey("not-a-key")).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_membership_management() {
    let app = TestApp::new();
    let (owner_id, owner) = app.user("owner");
    let (bob_id, bob) = app.user("bob");
    let ns = app.namespace(&owner, "team").await;
    let members_uri = format!("/api/v1/namespace/members?namespaceId={ns}");

    let grant = |role: &'static str| {
        app.post(
            "/api/v1/namespace/members",
            Auth::Bearer(&owner),
            json!({ "namespaceId": ns, "user_id": bob_id, "role": role }),
        )
    };

    assert_eq!(grant("Editor").await.data()["role"], "Editor");
    // Granting again keeps the existing role.
    assert_eq!(grant("Admin").await.data()["role"], "Editor");
    assert_eq!(grant("Owner").await.status, StatusCode::BAD_REQUEST);

    let resp = app
        .post(
            "/api/v1/namespace/members",
            Auth::Bearer(&owner),
            json!({ "namespaceId": ns, "user_id": 999, "role": "Editor" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let resp = app.get(&members_uri, Auth::Bearer(&owner)).await;
    assert_eq!(resp.data().as_array().unwrap().len(), 2);

    let resp = app.get("/api/v1/namespaces", Auth::Bearer(&bob)).await;
    assert_eq!(resp.data()[0]["role"], "Editor");
    assert_eq!(resp.data()[0]["name"], "team");

    let resp = app
        .delete(
            &format!("/api/v1/namespace/members/{owner_id}?namespaceId={ns}"),
            Auth::Bearer(&owner),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .delete(
            &format!("/api/v1/namespace/members/{bob_id}?namespaceId={ns}"),
            Auth::Bearer(&owner),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let resp = app
        .get(&format!("/api/v1/keys?namespaceId={ns}"), Auth::Bearer(&bob))
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_namespace_rename() {
    let app = TestApp::new();
    let (_, token) = app.user("alice");
    let ns = app.namespace(&token, "old").await;
    app.namespace(&token, "taken").await;

    let resp = app
        .put(
            "/api/v1/namespace",
            Auth::Bearer(&token),
            json!({ "namespaceId": ns, "name": "new", "description": "renamed" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{:?}", resp.body);
    assert_eq!(resp.data()["name"], "new");
    assert_eq!(resp.data()["role"], "Admin");

    let resp = app
        .put(
            "/api/v1/namespace",
            Auth::Bearer(&token),
            json!({ "namespaceId": ns, "name": "taken" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CONFLICT);

    let resp = app
        .get(&format!("/api/v1/namespace?namespaceId={ns}"), Auth::Bearer(&token))
        .await;
    assert_eq!(resp.data()["name"], "new");
    assert_eq!(resp.data()["description"], "renamed");
}

#[tokio::test]
async fn test_admin_user_lifecycle() {
    let app = TestApp::new();
    let admin = || Auth::Bearer(&app.admin_token);

    let resp = app
        .post("/api/v1/admin/users", admin(), json!({ "username": "carol" }))
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    let carol_id = resp.data()["id"].as_i64().unwrap();

    let resp = app
        .post("/api/v1/admin/users", admin(), json!({ "username": "carol" }))
        .await;
    assert_eq!(resp.status, StatusCode::CONFLICT);

    let resp = app
        .post(
            &format!("/api/v1/admin/users/{carol_id}/tokens"),
            admin(),
            json!({ "expires_in_seconds": 3600 }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED, "{:?}", resp.body);
    let carol_token = resp.data()["token"].as_str().unwrap().to_string();
    assert_eq!(resp.data()["metadata"]["user_id"], carol_id);

    let resp = app.get("/api/v1/user", Auth::Bearer(&carol_token)).await;
    assert_eq!(resp.data()["username"], "carol");

    let resp = app.get("/api/v1/admin/users", admin()).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["data"].as_array().unwrap().len(), 1);
    assert_eq!(resp.body["has_more"], false);

    let resp = app.get("/api/v1/admin/users?cursor=oops", admin()).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    app.clock.advance(Duration::hours(2));
    let resp = app.get("/api/v1/user", Auth::Bearer(&carol_token)).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

    let resp = app
        .delete(&format!("/api/v1/admin/users/{carol_id}"), admin())
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let resp = app
        .get(&format!("/api/v1/admin/users/{carol_id}"), admin())
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_tokens() {
    let app = TestApp::new();
    let admin = || Auth::Bearer(&app.admin_token);
    let (_, _token) = app.user("alice");

    let resp = app.get("/api/v1/admin/tokens", admin()).await;
    let tokens = resp.body["data"].as_array().unwrap().clone();
    assert_eq!(tokens.len(), 2);

    let user_token = tokens
        .iter()
        .find(|t| t["is_admin"] == false)
        .expect("user token listed");
    let admin_token = tokens
        .iter()
        .find(|t| t["is_admin"] == true)
        .expect("admin token listed");

    let resp = app
        .delete(
            &format!("/api/v1/admin/tokens/{}", admin_token["id"].as_str().unwrap()),
            admin(),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let id = user_token["id"].as_str().unwrap();
    let resp = app.delete(&format!("/api/v1/admin/tokens/{id}"), admin()).await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let resp = app.get(&format!("/api/v1/admin/tokens/{id}"), admin()).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_self_delete_and_sweep() {
    let app = TestApp::new();
    let (_, alice) = app.user("alice");
    let (_, bob) = app.user("bob");
    let ns = app.namespace(&alice, "kept").await;
    let bob_ns = app.namespace(&bob, "gone").await;

    app.post(
        "/api/v1/keys",
        Auth::Bearer(&alice),
        json!({ "namespaceId": ns, "name": "old", "value": "x" }),
    )
    .await;
    app.delete(
        &format!("/api/v1/keys/old?namespaceId={ns}"),
        Auth::Bearer(&alice),
    )
    .await;
    app.delete(
        &format!("/api/v1/namespace?namespaceId={bob_ns}"),
        Auth::Bearer(&bob),
    )
    .await;

    // Alice still owns an active namespace.
    let resp = app.delete("/api/v1/user", Auth::Bearer(&alice)).await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);
    let resp = app.delete("/api/v1/user", Auth::Bearer(&bob)).await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let resp = app.get("/api/v1/user", Auth::Bearer(&alice)).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

    let resp = app
        .post(
            "/api/v1/admin/sweep",
            Auth::Bearer(&app.admin_token),
            json!({}),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{:?}", resp.body);
    let report = resp.data();
    assert_eq!(report["keys_purged"], 1);
    assert_eq!(report["namespaces_purged"], 1);
    assert_eq!(report["users_purged"], 1);
    assert_eq!(report["users_skipped"].as_array().unwrap().len(), 1);
    assert_eq!(report["failures"], json!([]));

    let resp = app
        .post(
            "/api/v1/admin/sweep",
            Auth::Bearer(&app.admin_token),
            json!({}),
        )
        .await;
    assert_eq!(resp.data()["keys_purged"], 0);
    assert_eq!(resp.data()["namespaces_purged"], 0);
    assert_eq!(resp.data()["users_purged"], 0);
}
