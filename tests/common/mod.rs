#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use revlo::auth::API_KEY_HEADER;
use revlo::clock::ManualClock;
use revlo::server::{AppState, create_router};
use revlo::service::Directory;
use revlo::store::{SqliteStore, Store};

/// In-process server over a throwaway database and a manual clock.
pub struct TestApp {
    pub temp_dir: TempDir,
    pub store: Arc<SqliteStore>,
    pub clock: Arc<ManualClock>,
    pub state: Arc<AppState>,
    pub directory: Directory,
    pub admin_token: String,
    router: Router,
}

pub enum Auth<'a> {
    None,
    Bearer(&'a str),
    ApiKey(&'a str),
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn error(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}

impl TestApp {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = Arc::new(SqliteStore::new(temp_dir.path().join("revlo.db")).expect("open store"));
        store.initialize().expect("initialize store");

        let clock = Arc::new(ManualClock::new(Utc::now()));
        let state = Arc::new(AppState::new(store.clone(), clock.clone(), false));
        let directory = Directory::new(store.clone(), clock.clone());
        let admin_token = directory.create_admin_token().expect("admin token").raw;
        let router = create_router(state.clone());

        Self {
            temp_dir,
            store,
            clock,
            state,
            directory,
            admin_token,
            router,
        }
    }

    /// Creates a user and returns (user id, raw session token).
    pub fn user(&self, username: &str) -> (i64, String) {
        let user = self.directory.create_user(username).expect("create user");
        let token = self
            .directory
            .issue_session_token(user.id, None)
            .expect("issue token");
        (user.id, token.raw)
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        auth: Auth<'_>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        builder = match auth {
            Auth::None => builder,
            Auth::Bearer(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
            Auth::ApiKey(secret) => builder.header(API_KEY_HEADER, secret),
        };

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("response is JSON")
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, auth: Auth<'_>) -> TestResponse {
        self.request("GET", uri, auth, None).await
    }

    pub async fn post(&self, uri: &str, auth: Auth<'_>, body: Value) -> TestResponse {
        self.request("POST", uri, auth, Some(body)).await
    }

    pub async fn put(&self, uri: &str, auth: Auth<'_>, body: Value) -> TestResponse {
        self.request("PUT", uri, auth, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, auth: Auth<'_>) -> TestResponse {
        self.request("DELETE", uri, auth, None).await
    }

    /// Creates a namespace owned by the token's user and returns its id.
    pub async fn namespace(&self, token: &str, name: &str) -> i64 {
        let resp = self
            .post(
                "/api/v1/namespaces",
                Auth::Bearer(token),
                serde_json::json!({ "name": name }),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "{:?}", resp.body);
        resp.data()["id"].as_i64().expect("namespace id")
    }
}
