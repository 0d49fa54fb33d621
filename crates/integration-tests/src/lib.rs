//! Integration test support for Vitrine.
//!
//! [`MockSupabase`] is an in-process stand-in for a Supabase project: the
//! GoTrue endpoints the storefront uses (`signup`, `token`, `logout`) and a
//! small PostgREST subset over `products`, `profiles` and `cart` with `eq.`
//! filters and the `products(*)` embed. Every request is recorded so tests
//! can assert on the exact calls made.
//!
//! # Example
//!
//! ```rust,ignore
//! let mock = MockSupabase::start().await;
//! let user = mock.add_user("ana@example.com", "hunter22", "ana", true);
//! let mut state = mock.app_state(MemoryStorage::new());
//! state.sign_in("ana@example.com", &SecretString::from("hunter22")).await?;
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use uuid::Uuid;

use vitrine_core::UserId;
use vitrine_storefront::AppState;
use vitrine_storefront::config::SupabaseConfig;
use vitrine_storefront::storage::LocalStorage;
use vitrine_storefront::supabase::SupabaseClient;

/// Anon key the mock expects in the `apikey` header.
pub const ANON_KEY: &str = "test-anon-key";

/// Lifetime of issued access tokens, in seconds.
const TOKEN_TTL_SECS: i64 = 3600;

/// A request the mock received.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub bearer: Option<String>,
    pub body: Option<Value>,
}

impl RecordedRequest {
    /// The value of query parameter `key`.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether this is `method` on `/rest/v1/<table>`.
    #[must_use]
    pub fn is_rest(&self, method: &Method, table: &str) -> bool {
        &self.method == method && self.path == format!("/rest/v1/{table}")
    }
}

#[derive(Debug, Clone)]
struct MockUser {
    id: Uuid,
    email: String,
    password: String,
    metadata: Value,
}

#[derive(Debug, Default)]
struct MockState {
    requests: Vec<RecordedRequest>,
    users: Vec<MockUser>,
    /// access token → user id
    access_tokens: HashMap<String, Uuid>,
    /// refresh token → user id
    refresh_tokens: HashMap<String, Uuid>,
    products: Vec<Value>,
    profiles: Vec<Value>,
    cart: Vec<Value>,
    next_product_id: i64,
    autoconfirm: bool,
    failing_tables: Vec<String>,
}

/// In-process mock of the Supabase auth and data APIs.
pub struct MockSupabase {
    addr: SocketAddr,
    state: Arc<Mutex<MockState>>,
}

impl MockSupabase {
    /// Bind to an ephemeral local port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(MockState {
            next_product_id: 1,
            ..MockState::default()
        }));

        let app = Router::new().fallback(handle).with_state(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|e| panic!("failed to bind mock server: {e}"));
        let addr = listener
            .local_addr()
            .unwrap_or_else(|e| panic!("mock server has no address: {e}"));

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Mock Supabase stopped");
            }
        });

        Self { addr, state }
    }

    /// Project URL to configure the client with.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// A client pointed at this mock.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[must_use]
    pub fn client(&self) -> SupabaseClient {
        let config = SupabaseConfig::new(&self.url(), ANON_KEY)
            .unwrap_or_else(|e| panic!("invalid mock config: {e}"));
        SupabaseClient::new(&config, Duration::from_secs(5))
            .unwrap_or_else(|e| panic!("failed to build client: {e}"))
    }

    /// Application state backed by this mock and `storage`.
    #[must_use]
    pub fn app_state(&self, storage: impl LocalStorage + 'static) -> AppState {
        AppState::new(self.client(), storage)
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    /// Register a confirmed user with a matching profile row.
    pub fn add_user(&self, email: &str, password: &str, username: &str, admin: bool) -> UserId {
        let id = Uuid::new_v4();
        let mut state = self.lock();
        state.users.push(MockUser {
            id,
            email: email.to_string(),
            password: password.to_string(),
            metadata: json!({ "username": username, "admin": false }),
        });
        state.profiles.push(json!({
            "id": id,
            "email": email,
            "username": username,
            "admin": admin,
        }));
        UserId::new(id)
    }

    /// Insert a product row as-is.
    pub fn add_product(&self, product: Value) {
        self.lock().products.push(product);
    }

    /// Insert a remote cart row.
    pub fn add_cart_row(&self, user_id: UserId, product_id: Value, quantity: i32) {
        self.lock().cart.push(json!({
            "user_id": user_id,
            "product_id": product_id,
            "quantity": quantity,
        }));
    }

    /// Whether sign-up returns a session immediately.
    pub fn set_autoconfirm(&self, autoconfirm: bool) {
        self.lock().autoconfirm = autoconfirm;
    }

    /// Make every request against `table` fail with a 500.
    pub fn fail_table(&self, table: &str) {
        self.lock().failing_tables.push(table.to_string());
    }

    /// A session for `user_id` as a stored JSON value, valid for an hour or
    /// already expired.
    ///
    /// # Panics
    ///
    /// Panics if the user was not added.
    #[must_use]
    pub fn session_json(&self, user_id: UserId, expired: bool) -> Value {
        let mut state = self.lock();
        let user = state
            .users
            .iter()
            .find(|u| u.id == *user_id.as_uuid())
            .cloned()
            .unwrap_or_else(|| panic!("unknown user {user_id}"));
        let mut session = issue_session(&mut state, &user);
        if expired {
            session["expires_at"] = json!(now_secs() - 60);
        }
        session
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// Forget the recorded requests.
    pub fn clear_requests(&self) {
        self.lock().requests.clear();
    }

    /// Remote cart rows for a user.
    #[must_use]
    pub fn cart_rows(&self, user_id: UserId) -> Vec<Value> {
        let user = user_id.to_string();
        self.lock()
            .cart
            .iter()
            .filter(|row| field_eq(row, "user_id", &user))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn products(&self) -> Vec<Value> {
        self.lock().products.clone()
    }

    #[must_use]
    pub fn profile(&self, user_id: UserId) -> Option<Value> {
        let id = user_id.to_string();
        self.lock()
            .profiles
            .iter()
            .find(|row| field_eq(row, "id", &id))
            .cloned()
    }
}

// =============================================================================
// Request handling
// =============================================================================

async fn handle(
    State(state): State<Arc<Mutex<MockState>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let query: Vec<(String, String)> = uri
        .query()
        .map(url_pairs)
        .unwrap_or_default();
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);
    let body = serde_json::from_slice::<Value>(&body).ok();

    let request = RecordedRequest {
        method,
        path: uri.path().to_string(),
        query,
        bearer,
        body,
    };

    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
    state.requests.push(request.clone());

    if headers.get("apikey").and_then(|v| v.to_str().ok()) != Some(ANON_KEY) {
        return error(StatusCode::UNAUTHORIZED, json!({ "message": "Invalid API key" }));
    }

    let wants_object = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("vnd.pgrst.object"));

    if let Some(endpoint) = request.path.strip_prefix("/auth/v1/") {
        handle_auth(&mut state, endpoint, &request)
    } else if let Some(table) = request.path.strip_prefix("/rest/v1/") {
        if state.failing_tables.iter().any(|t| t == table) {
            return error(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "message": "simulated failure" }),
            );
        }
        handle_rest(&mut state, table, &request, wants_object)
    } else {
        error(StatusCode::NOT_FOUND, json!({ "message": "no route" }))
    }
}

fn handle_auth(state: &mut MockState, endpoint: &str, request: &RecordedRequest) -> Response {
    let body = request.body.clone().unwrap_or(Value::Null);
    let text = |key: &str| body.get(key).and_then(Value::as_str).unwrap_or_default().to_string();

    match (endpoint, request.query_value("grant_type")) {
        ("signup", _) => {
            let email = text("email");
            if state.users.iter().any(|u| u.email == email) {
                return error(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    json!({ "code": 422, "msg": "User already registered" }),
                );
            }
            let user = MockUser {
                id: Uuid::new_v4(),
                email,
                password: text("password"),
                metadata: body.get("data").cloned().unwrap_or_else(|| json!({})),
            };
            state.users.push(user.clone());
            if state.autoconfirm {
                ok(issue_session(state, &user))
            } else {
                ok(user_json(&user))
            }
        }
        ("token", Some("password")) => {
            let (email, password) = (text("email"), text("password"));
            let user = state
                .users
                .iter()
                .find(|u| u.email == email && u.password == password)
                .cloned();
            match user {
                Some(user) => ok(issue_session(state, &user)),
                None => error(
                    StatusCode::BAD_REQUEST,
                    json!({ "error": "invalid_grant", "error_description": "Invalid login credentials" }),
                ),
            }
        }
        ("token", Some("refresh_token")) => {
            let token = text("refresh_token");
            let user = state
                .refresh_tokens
                .remove(&token)
                .and_then(|id| state.users.iter().find(|u| u.id == id).cloned());
            match user {
                Some(user) => ok(issue_session(state, &user)),
                None => error(
                    StatusCode::BAD_REQUEST,
                    json!({ "error": "invalid_grant", "error_description": "Invalid Refresh Token: Refresh Token Not Found" }),
                ),
            }
        }
        ("logout", _) => {
            if let Some(token) = &request.bearer {
                state.access_tokens.remove(token);
            }
            StatusCode::NO_CONTENT.into_response()
        }
        _ => error(StatusCode::NOT_FOUND, json!({ "msg": "unknown auth endpoint" })),
    }
}

fn handle_rest(
    state: &mut MockState,
    table: &str,
    request: &RecordedRequest,
    wants_object: bool,
) -> Response {
    let filters: Vec<(&str, &str)> = request
        .query
        .iter()
        .filter_map(|(k, v)| v.strip_prefix("eq.").map(|value| (k.as_str(), value)))
        .collect();
    let matches = |row: &Value| filters.iter().all(|(k, v)| field_eq(row, k, v));

    let body_rows = match request.body.clone() {
        Some(Value::Array(rows)) => rows,
        Some(row @ Value::Object(_)) => vec![row],
        _ => Vec::new(),
    };

    match (&request.method, table) {
        (&Method::GET, "products") => ok(Value::Array(
            state.products.iter().filter(|r| matches(*r)).cloned().collect(),
        )),
        (&Method::POST, "products") => {
            let mut inserted = Vec::new();
            for mut row in body_rows {
                if row.get("id").is_none() {
                    row["id"] = json!(state.next_product_id);
                    state.next_product_id += 1;
                }
                state.products.push(row.clone());
                inserted.push(row);
            }
            (StatusCode::CREATED, axum::Json(Value::Array(inserted))).into_response()
        }
        (&Method::PATCH, "products") => {
            let mut updated = Vec::new();
            for row in state.products.iter_mut().filter(|r| matches(&**r)) {
                for patch in &body_rows {
                    if let (Some(target), Some(fields)) = (row.as_object_mut(), patch.as_object()) {
                        for (k, v) in fields {
                            target.insert(k.clone(), v.clone());
                        }
                    }
                }
                updated.push(row.clone());
            }
            ok(Value::Array(updated))
        }
        (&Method::DELETE, "products") => {
            state.products.retain(|r| !matches(r));
            StatusCode::NO_CONTENT.into_response()
        }
        (&Method::GET, "profiles") => {
            let rows: Vec<Value> = state.profiles.iter().filter(|r| matches(*r)).cloned().collect();
            if wants_object {
                match rows.as_slice() {
                    [row] => ok(row.clone()),
                    _ => error(
                        StatusCode::NOT_ACCEPTABLE,
                        json!({ "code": "PGRST116", "message": "JSON object requested, multiple (or no) rows returned" }),
                    ),
                }
            } else {
                ok(Value::Array(rows))
            }
        }
        (&Method::POST, "profiles") => {
            for row in body_rows {
                let id = row.get("id").map(value_text).unwrap_or_default();
                state.profiles.retain(|p| !field_eq(p, "id", &id));
                state.profiles.push(row);
            }
            StatusCode::CREATED.into_response()
        }
        (&Method::GET, "cart") => {
            let rows = state
                .cart
                .iter()
                .filter(|r| matches(*r))
                .map(|row| {
                    let product_id = row.get("product_id").map(value_text).unwrap_or_default();
                    let product = state
                        .products
                        .iter()
                        .find(|p| field_eq(p, "id", &product_id))
                        .cloned()
                        .unwrap_or(Value::Null);
                    json!({
                        "product_id": row["product_id"],
                        "quantity": row["quantity"],
                        "products": product,
                    })
                })
                .collect();
            ok(Value::Array(rows))
        }
        (&Method::POST, "cart") => {
            state.cart.extend(body_rows);
            StatusCode::CREATED.into_response()
        }
        (&Method::DELETE, "cart") => {
            state.cart.retain(|r| !matches(r));
            StatusCode::NO_CONTENT.into_response()
        }
        _ => error(
            StatusCode::NOT_FOUND,
            json!({ "message": format!("unsupported {} on {table}", request.method) }),
        ),
    }
}

fn issue_session(state: &mut MockState, user: &MockUser) -> Value {
    let access_token = format!("access-{}", Uuid::new_v4());
    let refresh_token = format!("refresh-{}", Uuid::new_v4());
    state.access_tokens.insert(access_token.clone(), user.id);
    state.refresh_tokens.insert(refresh_token.clone(), user.id);

    json!({
        "access_token": access_token,
        "refresh_token": refresh_token,
        "token_type": "bearer",
        "expires_in": TOKEN_TTL_SECS,
        "expires_at": now_secs() + TOKEN_TTL_SECS,
        "user": user_json(user),
    })
}

fn user_json(user: &MockUser) -> Value {
    json!({
        "id": user.id,
        "email": user.email,
        "user_metadata": user.metadata,
    })
}

fn ok(body: Value) -> Response {
    (StatusCode::OK, axum::Json(body)).into_response()
}

fn error(status: StatusCode, body: Value) -> Response {
    (status, axum::Json(body)).into_response()
}

fn field_eq(row: &Value, field: &str, expected: &str) -> bool {
    row.get(field).is_some_and(|v| value_text(v) == expected)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn url_pairs(query: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}
