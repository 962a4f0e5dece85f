// In-process stub of the Memories REST API and the asset host upload endpoint
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path as FsPath;
use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use memories::api::HttpApi;
use memories::config::{ApiConfig, CredentialMode};
use memories::credentials::Credentials;

pub const SESSION_COOKIE: &str = "memories_session";
pub const EMAIL: &str = "ada@example.com";
pub const PASSWORD: &str = "password1";
pub const GOOD_SIGNATURE: &str = "sig-ok";

#[derive(Debug, Clone)]
pub struct StubUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub password: String,
}

impl StubUser {
    fn public(&self) -> Value {
        json!({ "_id": self.id, "id": self.id, "email": self.email, "name": self.name })
    }
}

#[derive(Debug)]
pub struct StubState {
    pub users: Vec<StubUser>,
    pub sessions: HashMap<String, String>,
    pub posts: Vec<Value>,
    pub next_id: u64,
    pub bearer_seen: Vec<String>,
    pub signature: String,
    pub uploads: Vec<String>,
}

impl Default for StubState {
    fn default() -> Self {
        Self {
            users: vec![StubUser {
                id: "u1".into(),
                email: EMAIL.into(),
                name: "Ada".into(),
                password: PASSWORD.into(),
            }],
            sessions: HashMap::new(),
            posts: Vec::new(),
            next_id: 100,
            bearer_seen: Vec::new(),
            signature: GOOD_SIGNATURE.into(),
            uploads: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Stub {
    pub inner: Arc<Mutex<StubState>>,
}

impl Stub {
    pub fn posts(&self) -> Vec<Value> {
        self.inner.lock().unwrap().posts.clone()
    }

    pub fn seed_post(&self, post: Value) {
        self.inner.lock().unwrap().posts.push(post);
    }

    pub fn bearer_seen(&self) -> Vec<String> {
        self.inner.lock().unwrap().bearer_seen.clone()
    }

    pub fn session_count(&self) -> usize {
        self.inner.lock().unwrap().sessions.len()
    }

    pub fn set_signature(&self, signature: &str) {
        self.inner.lock().unwrap().signature = signature.to_string();
    }

    fn current_user(&self, headers: &HeaderMap) -> Option<StubUser> {
        let mut state = self.inner.lock().unwrap();
        if let Some(bearer) = bearer_token(headers) {
            state.bearer_seen.push(bearer);
        }
        let token = bearer_token(headers).or_else(|| cookie_token(headers))?;
        let user_id = state.sessions.get(&token)?.clone();
        state.users.iter().find(|u| u.id == user_id).cloned()
    }
}

pub struct StubServer {
    pub base_url: String,
    pub stub: Stub,
}

pub async fn spawn() -> StubServer {
    let stub = Stub::default();
    let app = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/signup", post(signup))
        .route("/auth/me", get(me))
        .route("/auth/logout", post(logout))
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/{id}", patch(update_post).delete(delete_post))
        .route("/posts/{id}/likePost", patch(like_post))
        .route("/cloudinary/sign", get(sign))
        .route("/uploads/signature", post(sign))
        .route("/v1_1/{cloud}/image/upload", post(upload))
        .route("/slow/{cloud}/image/upload", post(slow_upload))
        .with_state(stub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    StubServer {
        base_url: format!("http://{}", addr),
        stub,
    }
}

/// Client wired to the stub with credentials persisted at `path`.
pub async fn connect(base_url: &str, mode: CredentialMode, path: &FsPath) -> Arc<HttpApi> {
    let config = ApiConfig {
        base_url: base_url.to_string(),
        credentials: mode,
        ..ApiConfig::default()
    };
    connect_with(&config, path).await
}

pub async fn connect_with(config: &ApiConfig, path: &FsPath) -> Arc<HttpApi> {
    let credentials = Credentials::load(path).unwrap();
    Arc::new(HttpApi::connect(config, credentials).await.unwrap())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(str::trim)
        .find_map(|cookie| {
            let (key, value) = cookie.split_once('=')?;
            (key == SESSION_COOKIE).then(|| value.to_string())
        })
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn issue_session(stub: &Stub, user: &StubUser) -> Response {
    let token = uuid::Uuid::now_v7().to_string();
    stub.inner
        .lock()
        .unwrap()
        .sessions
        .insert(token.clone(), user.id.clone());
    let cookie = format!("{}={}; HttpOnly; SameSite=Strict; Path=/", SESSION_COOKIE, token);
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "token": token, "user": user.public() })),
    )
        .into_response()
}

async fn login(State(stub): State<Stub>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    let user = stub
        .inner
        .lock()
        .unwrap()
        .users
        .iter()
        .find(|u| u.email == email && u.password == password)
        .cloned();
    match user {
        Some(user) => issue_session(&stub, &user),
        None => json_error(StatusCode::UNAUTHORIZED, "Invalid credentials"),
    }
}

async fn signup(State(stub): State<Stub>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let password = body["password"].as_str().unwrap_or_default().to_string();
    if body["confirmPassword"].as_str() != Some(password.as_str()) {
        return json_error(StatusCode::BAD_REQUEST, "Passwords do not match");
    }
    let user = {
        let mut state = stub.inner.lock().unwrap();
        if state.users.iter().any(|u| u.email == email) {
            return json_error(StatusCode::BAD_REQUEST, "User already exists");
        }
        state.next_id += 1;
        let user = StubUser {
            id: format!("u{}", state.next_id),
            email,
            name: body["name"].as_str().unwrap_or_default().to_string(),
            password,
        };
        state.users.push(user.clone());
        user
    };
    issue_session(&stub, &user)
}

async fn me(State(stub): State<Stub>, headers: HeaderMap) -> Response {
    match stub.current_user(&headers) {
        Some(user) => Json(user.public()).into_response(),
        None => json_error(StatusCode::UNAUTHORIZED, "Unauthenticated"),
    }
}

async fn logout(State(stub): State<Stub>, headers: HeaderMap) -> Response {
    if let Some(token) = bearer_token(&headers).or_else(|| cookie_token(&headers)) {
        stub.inner.lock().unwrap().sessions.remove(&token);
    }
    let cleared = format!("{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0", SESSION_COOKIE);
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cleared)],
        Json(json!({ "message": "Logged out" })),
    )
        .into_response()
}

async fn list_posts(State(stub): State<Stub>, headers: HeaderMap) -> Response {
    if stub.current_user(&headers).is_none() {
        return json_error(StatusCode::UNAUTHORIZED, "Unauthenticated");
    }
    Json(Value::Array(stub.posts())).into_response()
}

async fn create_post(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let Some(user) = stub.current_user(&headers) else {
        return json_error(StatusCode::UNAUTHORIZED, "Unauthenticated");
    };
    let mut state = stub.inner.lock().unwrap();
    state.next_id += 1;
    let record = json!({
        "_id": format!("m{}", state.next_id),
        "title": body["title"],
        "message": body["message"],
        "tags": body["tags"],
        "selectedFile": body["selectedFile"],
        "imagePublicId": body.get("imagePublicId").cloned().unwrap_or(Value::Null),
        "creatorId": user.id,
        "creatorEmail": user.email,
        "creator": user.name,
        "likecount": 0,
        "createdAt": chrono::Utc::now().to_rfc3339(),
    });
    state.posts.push(record.clone());
    (StatusCode::CREATED, Json(record)).into_response()
}

async fn update_post(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if stub.current_user(&headers).is_none() {
        return json_error(StatusCode::UNAUTHORIZED, "Unauthenticated");
    }
    let mut state = stub.inner.lock().unwrap();
    let Some(record) = state.posts.iter_mut().find(|p| p["_id"] == id.as_str()) else {
        return json_error(StatusCode::NOT_FOUND, "Post not found");
    };
    for key in ["title", "message", "tags", "selectedFile", "imagePublicId"] {
        if let Some(value) = body.get(key) {
            record[key] = value.clone();
        }
    }
    Json(record.clone()).into_response()
}

async fn delete_post(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if stub.current_user(&headers).is_none() {
        return json_error(StatusCode::UNAUTHORIZED, "Unauthenticated");
    }
    stub.inner
        .lock()
        .unwrap()
        .posts
        .retain(|p| p["_id"] != id.as_str());
    Json(json!({ "message": "Post deleted successfully." })).into_response()
}

async fn like_post(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if stub.current_user(&headers).is_none() {
        return json_error(StatusCode::UNAUTHORIZED, "Unauthenticated");
    }
    let mut state = stub.inner.lock().unwrap();
    let Some(record) = state.posts.iter_mut().find(|p| p["_id"] == id.as_str()) else {
        return json_error(StatusCode::NOT_FOUND, "Post not found");
    };
    let likes = record["likecount"].as_u64().unwrap_or(0) + 1;
    record["likecount"] = json!(likes);
    Json(record.clone()).into_response()
}

async fn sign(State(stub): State<Stub>, headers: HeaderMap) -> Response {
    if stub.current_user(&headers).is_none() {
        return json_error(StatusCode::UNAUTHORIZED, "Unauthenticated");
    }
    let signature = stub.inner.lock().unwrap().signature.clone();
    Json(json!({
        "cloudName": "demo",
        "apiKey": "key-123",
        "timestamp": 1_700_000_000,
        "signature": signature,
    }))
    .into_response()
}

async fn upload(
    State(stub): State<Stub>,
    Path(cloud): Path<String>,
    mut multipart: Multipart,
) -> Response {
    let mut file_name = None;
    let mut size = 0;
    let mut fields = HashMap::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            file_name = field.file_name().map(str::to_string);
            size = field.bytes().await.map(|b| b.len()).unwrap_or(0);
        } else {
            let text = field.text().await.unwrap_or_default();
            fields.insert(name, text);
        }
    }

    if fields.get("signature").map(String::as_str) != Some(GOOD_SIGNATURE)
        || fields.get("api_key").map(String::as_str) != Some("key-123")
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": { "message": "Invalid Signature" } })),
        )
            .into_response();
    }
    let Some(file_name) = file_name.filter(|_| size > 0) else {
        return (StatusCode::BAD_REQUEST, "missing file").into_response();
    };

    stub.inner.lock().unwrap().uploads.push(file_name.clone());
    Json(json!({
        "secure_url": format!("https://res.cdn.test/{}/{}", cloud, file_name),
        "public_id": format!("memories/{}", file_name),
    }))
    .into_response()
}

async fn slow_upload() -> Response {
    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
    (StatusCode::GATEWAY_TIMEOUT, "too slow").into_response()
}
