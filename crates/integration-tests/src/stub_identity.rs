//! Stub identity service for integration tests.
//!
//! Serves the two endpoints the orders service calls (`GET /users/{id}` and
//! `POST /auth/verify-token`) with verdicts registered by the test.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use url::Url;
use uuid::Uuid;

use orchard_core::{Role, UserId};

/// Verdict the stub gives for a registered token.
#[derive(Debug, Clone)]
enum TokenVerdict {
    Accept { user_id: UserId, role: Role },
    Reject,
}

#[derive(Clone, Default)]
struct StubState {
    users: Arc<Mutex<HashMap<Uuid, Role>>>,
    tokens: Arc<Mutex<HashMap<String, TokenVerdict>>>,
}

/// A running stub identity service.
pub struct StubIdentity {
    base_url: Url,
    state: StubState,
}

impl StubIdentity {
    /// Start the stub on an ephemeral port.
    pub async fn spawn() -> Self {
        let state = StubState::default();
        let app = Router::new()
            .route("/users/{id}", get(get_user))
            .route("/auth/verify-token", post(verify_token))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub listener");
        let addr = listener.local_addr().expect("stub addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve stub");
        });

        Self {
            base_url: format!("http://{addr}/").parse().expect("valid url"),
            state,
        }
    }

    /// Base URL for the orders service configuration.
    #[must_use]
    pub fn base_url(&self) -> Url {
        self.base_url.clone()
    }

    /// Register a user so lookups for it succeed.
    pub fn register_user(&self, user_id: UserId, role: Role) {
        self.state
            .users
            .lock()
            .expect("users lock")
            .insert(user_id.as_uuid(), role);
    }

    /// Make `POST /auth/verify-token` confirm this token for the given user.
    pub fn accept_token(&self, token: &str, user_id: UserId, role: Role) {
        self.state
            .tokens
            .lock()
            .expect("tokens lock")
            .insert(token.to_string(), TokenVerdict::Accept { user_id, role });
    }

    /// Make `POST /auth/verify-token` explicitly invalidate this token.
    pub fn reject_token(&self, token: &str) {
        self.state
            .tokens
            .lock()
            .expect("tokens lock")
            .insert(token.to_string(), TokenVerdict::Reject);
    }
}

async fn get_user(State(state): State<StubState>, Path(id): Path<Uuid>) -> Response {
    let users = state.users.lock().expect("users lock");
    match users.get(&id) {
        Some(role) => Json(json!({ "id": id, "role": role })).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct VerifyRequest {
    token: String,
}

async fn verify_token(
    State(state): State<StubState>,
    Json(body): Json<VerifyRequest>,
) -> Json<serde_json::Value> {
    let tokens = state.tokens.lock().expect("tokens lock");
    match tokens.get(&body.token) {
        Some(TokenVerdict::Accept { user_id, role }) => {
            let now = Utc::now().timestamp();
            Json(json!({
                "valid": true,
                "user": { "id": user_id, "role": role, "iat": now, "exp": now + 3600 },
            }))
        }
        Some(TokenVerdict::Reject) | None => Json(json!({ "valid": false })),
    }
}
