//! Common test utilities for integration tests
//!
//! Builds the full application over in-memory user and session stores, and
//! provides a small cookie-keeping client that drives it through
//! `tower::Service`.
#![allow(dead_code)]

use std::{collections::BTreeMap, sync::Arc};

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    response::Response,
    Router,
};
use courseware_api::{
    app::{build_router, AppState},
    config::{Config, Mode},
    routes::RouteGroups,
};
use courseware_shared::{
    auth::password::hash_password,
    db::users::{MemoryUserStore, UserStore},
    models::{NewUser, User},
};
use serde_json::{json, Value};
use tower::Service as _;
use tower_cookies::cookie::Cookie;
use tower_sessions::MemoryStore;

pub const HOST: &str = "courses.example.com";
pub const PASSWORD: &str = "correct-horse-battery";

/// Test context containing the application and its user store
pub struct TestContext {
    pub app: Router,
    pub users: Arc<MemoryUserStore>,
    pub mode: Mode,
}

impl TestContext {
    /// Application with the built-in route groups
    pub fn new(mode: Mode) -> Self {
        Self::with_groups(mode, RouteGroups::default())
    }

    /// Application with caller-supplied route groups
    pub fn with_groups(mode: Mode, groups: RouteGroups) -> Self {
        let config = Config::from_vars(mode, |key| match key {
            "DATABASE_URL" | "TEST_DB" => Some("postgres://localhost/courseware_test".to_string()),
            "SESSION_KEY" => Some("integration-test-session-key-0123456789".to_string()),
            "PUBLIC_DIR" => Some(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/public").to_string()),
            _ => None,
        })
        .expect("test configuration");

        let users = Arc::new(MemoryUserStore::new());
        let state = AppState::new(users.clone(), config);
        let app = build_router(state, MemoryStore::default(), groups);

        Self { app, users, mode }
    }

    /// Creates a user who can log in with [`PASSWORD`]
    pub async fn seed_user(&self, username: &str, is_admin: bool) -> User {
        self.users
            .create(NewUser {
                password: hash_password(PASSWORD).unwrap(),
                is_admin,
                ..NewUser::with_username(username)
            })
            .await
            .unwrap()
    }

    pub fn client(&self) -> TestClient {
        let mut headers = vec![(header::HOST.as_str().to_string(), HOST.to_string())];
        if self.mode.is_production() {
            headers.push(("x-forwarded-proto".to_string(), "https".to_string()));
        }

        TestClient {
            app: self.app.clone(),
            jar: BTreeMap::new(),
            headers,
        }
    }
}

/// Browser-like client that keeps cookies between requests
pub struct TestClient {
    app: Router,
    jar: BTreeMap<String, String>,
    headers: Vec<(String, String)>,
}

impl TestClient {
    pub async fn send(&mut self, mut request: Request<Body>) -> Response {
        let headers = request.headers_mut();

        for (name, value) in &self.headers {
            if !headers.contains_key(name.as_str()) {
                headers.insert(
                    header::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                    value.parse().unwrap(),
                );
            }
        }

        if !self.jar.is_empty() {
            let cookies: Vec<String> = self
                .jar
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect();
            headers.insert(header::COOKIE, cookies.join("; ").parse().unwrap());
        }

        let response = self.app.clone().call(request).await.unwrap();

        for value in response.headers().get_all(header::SET_COOKIE) {
            let cookie = Cookie::parse(value.to_str().unwrap().to_string()).unwrap();
            let expired = cookie.max_age().is_some_and(|age| age.is_zero());

            if expired || cookie.value().is_empty() {
                self.jar.remove(cookie.name());
            } else {
                self.jar
                    .insert(cookie.name().to_string(), cookie.value().to_string());
            }
        }

        response
    }

    pub async fn get(&mut self, uri: &str) -> Response {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    /// Fetches a CSRF token from the session status endpoint
    pub async fn csrf_token(&mut self) -> String {
        let body = json_body(self.get("/").await).await;
        body["csrf_token"].as_str().unwrap().to_string()
    }

    /// Sends a JSON body with a valid CSRF token
    pub async fn send_json(&mut self, method: Method, uri: &str, body: Value) -> Response {
        let token = self.csrf_token().await;

        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-csrf-token", token)
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Sends a url-encoded form body with the CSRF token in its `_csrf` field
    pub async fn send_form(&mut self, method: Method, uri: &str, fields: &[(&str, &str)]) -> Response {
        let token = self.csrf_token().await;

        let mut pairs = vec![("_csrf", token.as_str())];
        pairs.extend_from_slice(fields);
        let body = serde_urlencoded::to_string(&pairs).unwrap();

        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Response {
        self.send_json(
            Method::POST,
            "/login",
            json!({ "username": username, "password": password }),
        )
        .await
    }
}

pub async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn text_body(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8_lossy(&bytes).into_owned()
}
