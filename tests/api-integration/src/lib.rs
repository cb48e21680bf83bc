//! Shared harness for the API integration tests: boots the server
//! in-process on an ephemeral port and hands out authenticated clients.

use std::sync::Arc;

use serde_json::{json, Value};

use rummage_server::AppState;

pub struct TestServer {
    pub base: String,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Bind the router on an ephemeral local port and serve it in the
    /// background for the lifetime of the test process.
    pub async fn spawn() -> TestServer {
        let state = Arc::new(AppState::new());
        let app = rummage_server::router(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("test server failed");
        });
        TestServer {
            base: format!("http://{addr}"),
            client: reqwest::Client::new(),
        }
    }

    /// Open a session for `user` and return its bearer token.
    pub async fn login(&self, user: &str) -> String {
        self.login_with(user, true).await
    }

    pub async fn login_with(&self, user: &str, email_verified: bool) -> String {
        let resp: Value = self
            .client
            .post(format!("{}/api/auth/login", self.base))
            .json(&json!({ "user_id": user, "email_verified": email_verified }))
            .send()
            .await
            .expect("login request")
            .json()
            .await
            .expect("login body");
        resp["token"].as_str().expect("token").to_string()
    }

    /// Create a minimal active listing owned by the token's user and
    /// return its id.
    pub async fn create_listing(&self, token: &str, title: &str, price_cents: u64) -> String {
        let resp = self
            .client
            .post(format!("{}/api/listings", self.base))
            .bearer_auth(token)
            .json(&json!({
                "title": title,
                "description": "integration test listing",
                "price_cents": price_cents,
                "city": "Lyon",
                "category": "Books",
                "condition": "used",
            }))
            .send()
            .await
            .expect("create listing");
        assert_eq!(resp.status(), 201, "listing creation failed");
        let body: Value = resp.json().await.expect("listing body");
        body["id"].as_str().expect("listing id").to_string()
    }
}

