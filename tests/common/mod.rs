#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use pasetors::claims::Claims;
use pasetors::keys::SymmetricKey;
use pasetors::{local, version4::V4};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use stride::app::auth::TOKEN_ISSUER;
use stride::app::content::ContentAccessor;
use stride::app::social::RelationshipMutator;
use stride::app::users::AccountService;
use stride::infra::memory::MemoryStore;
use stride::AppState;

// "0123456789abcdef0123456789abcdef", test-only
pub const TEST_PASETO_ACCESS_KEY: [u8; 32] = *b"0123456789abcdef0123456789abcdef";

// ---------------------------------------------------------------------------
// TestApp: fresh in-memory graph per test
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub store: Arc<MemoryStore>,
    pub mutator: RelationshipMutator,
    pub content: ContentAccessor,
    pub accounts: AccountService,
}

pub struct TestResponse {
    pub status: StatusCode,
    body_bytes: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub handle: String,
    pub access_token: String,
}

pub fn app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let state = AppState {
        store: store.clone(),
        paseto_access_key: TEST_PASETO_ACCESS_KEY,
        default_page_limit: 30,
        max_page_limit: 200,
    };

    TestApp {
        router: stride::http::router(state.clone()),
        mutator: RelationshipMutator::new(state.store.clone()),
        content: ContentAccessor::new(state.store.clone()),
        accounts: AccountService::new(state.store.clone()),
        store,
    }
}

pub fn access_token(user_id: Uuid) -> String {
    mint_token(user_id, "access")
}

pub fn mint_token(user_id: Uuid, typ: &str) -> String {
    let mut claims = Claims::new().expect("claims");
    claims.issuer(TOKEN_ISSUER).expect("issuer");
    claims.audience(TOKEN_ISSUER).expect("audience");
    claims.subject(&user_id.to_string()).expect("subject");
    claims.add_additional("typ", typ).expect("typ");
    let key = SymmetricKey::<V4>::from(&TEST_PASETO_ACCESS_KEY).expect("key");
    local::encrypt(&key, &claims, None, None).expect("encrypt")
}

impl TestApp {
    // ------------------------------------------------------------------
    // Low-level request helper
    // ------------------------------------------------------------------
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost");

        if let Some(t) = token {
            builder = builder.header("Authorization", format!("Bearer {}", t));
        }

        let request = if let Some(body) = body {
            builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap()
        } else {
            builder.body(Body::empty()).unwrap()
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse { status, body_bytes }
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, path, None, token).await
    }

    pub async fn post_json(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        self.request(Method::POST, path, Some(body), token).await
    }

    pub async fn patch_json(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        self.request(Method::PATCH, path, Some(body), token).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, path, None, token).await
    }

    // ------------------------------------------------------------------
    // Test data helpers
    // ------------------------------------------------------------------

    pub async fn create_user(&self, handle: &str) -> TestUser {
        self.create_user_with_privacy(handle, false).await
    }

    pub async fn create_private_user(&self, handle: &str) -> TestUser {
        self.create_user_with_privacy(handle, true).await
    }

    async fn create_user_with_privacy(&self, handle: &str, is_private: bool) -> TestUser {
        let id = self.store.create_actor(handle, is_private).await;
        TestUser {
            id,
            handle: handle.to_string(),
            access_token: access_token(id),
        }
    }

    pub async fn create_workout(&self, owner: &TestUser) -> Uuid {
        self.store
            .create_workout(owner.id, "morning run")
            .await
            .expect("create workout")
    }

    pub async fn followers_count(&self, user: Uuid) -> i64 {
        self.accounts.get_actor(user).await.unwrap().followers_count
    }

    pub async fn following_count(&self, user: Uuid) -> i64 {
        self.accounts.get_actor(user).await.unwrap().following_count
    }
}
