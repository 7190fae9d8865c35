//! In-process fake of the campvoiceus backend, served by axum on an
//! ephemeral port.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use cv_http::HttpApi;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};

pub const USER_ID: &str = "u1";
pub const PASSWORD: &str = "correct horse";
const CREATED_AT: &str = "2026-10-01T12:00:00Z";

/// Server-signed JWT naming `user_id`, expiring in 2100.
pub fn jwt_for(user_id: &str) -> String {
    let claims = json!({ "id": user_id, "exp": 4_102_444_800_i64 });
    encode(&Header::default(), &claims, &EncodingKey::from_secret(b"fake-backend")).unwrap()
}

#[derive(Default)]
pub struct Backend {
    pub threads: Vec<Value>,
    pub users: HashMap<String, Value>,
    pub notifications: Vec<Value>,
    pub fail_votes: bool,
    /// `"{direction}:{threadId}"` or `"{direction}:{threadId}/{commentId}"`.
    pub vote_calls: Vec<String>,
    pub created: Vec<HashMap<String, String>>,
    pub profile_updates: Vec<HashMap<String, String>>,
    pub push_tokens: Vec<String>,
    /// `"thread:{id}"` or `"user:{id}"` for each by-id lookup body received.
    pub lookups: Vec<String>,
}

pub type Shared = Arc<Mutex<Backend>>;

pub fn user(id: &str, name: &str) -> Value {
    json!({
        "_id": id,
        "name": name,
        "username": name.to_lowercase(),
        "email": format!("{}@campus.edu", name.to_lowercase()),
    })
}

pub fn thread(id: &str, author: &str, tags: &[&str]) -> Value {
    json!({
        "_id": id,
        "title": format!("Thread {id}"),
        "content": "Anyone up for it?",
        "authorId": author,
        "comments": [],
        "upvotes": [],
        "downvotes": [],
        "tags": tags,
        "createdAt": CREATED_AT,
        "__v": 0,
    })
}

pub fn comment(id: &str, user_id: &str) -> Value {
    json!({
        "commentId": id,
        "userId": user_id,
        "content": "count me in",
        "upvotes": [],
        "downvotes": [],
        "createdAt": CREATED_AT,
    })
}

/// Two users, two threads; `t1` carries one comment.
pub fn seed() -> Backend {
    let mut t1 = thread("t1", "u2", &["exams", "study group"]);
    t1["comments"] = json!([comment("c1", USER_ID)]);
    let mut backend = Backend {
        threads: vec![t1, thread("t2", USER_ID, &["events"])],
        notifications: vec![json!({
            "_id": "n1",
            "title": "New comment",
            "message": "Bo commented on your thread",
            "threadId": "t2",
        })],
        ..Backend::default()
    };
    backend.users.insert(USER_ID.into(), user(USER_ID, "Ada"));
    backend.users.insert("u2".into(), user("u2", "Bo"));
    backend
}

pub struct FakeServer {
    pub base_url: String,
    pub state: Shared,
}

impl FakeServer {
    pub async fn start() -> Self {
        Self::with(seed()).await
    }

    pub async fn with(backend: Backend) -> Self {
        let state: Shared = Arc::new(Mutex::new(backend));
        let app = router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            base_url: format!("http://{addr}/api/"),
            state,
        }
    }

    pub fn api(&self) -> HttpApi {
        HttpApi::new(&self.base_url, None).unwrap()
    }

    pub fn backend(&self) -> std::sync::MutexGuard<'_, Backend> {
        self.state.lock().unwrap()
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/api/users/login", post(login))
        .route("/api/users/register", post(register))
        .route("/api/users/profile", get(profile).put(update_profile))
        .route("/api/users/notifications", get(notifications))
        .route("/api/users/fcm-token", post(push_token))
        .route("/api/users/getuser", post(user_by_id))
        .route("/api/threads/homethreads", post(home_threads))
        .route("/api/threads/getthread", post(thread_by_id))
        .route("/api/threads/createthread", post(create_thread))
        .route("/api/threads/addcomment", post(add_comment))
        .route("/api/threads/tag/{tag}", get(threads_by_tag))
        .route("/api/threads/user/{user_id}", get(threads_by_user))
        .route("/api/threads/comments/{direction}", post(vote_comment))
        .route("/api/threads/{direction}", post(vote_thread))
        .with_state(state)
}

fn reject(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn authorize(headers: &HeaderMap) -> Result<(), Response> {
    let expected = format!("Bearer {}", jwt_for(USER_ID));
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(reject(StatusCode::UNAUTHORIZED, "Invalid token")),
    }
}

fn toggle(entity: &mut Value, direction: &str, user: &str) {
    let (own, other) = if direction == "upvote" {
        ("upvotes", "downvotes")
    } else {
        ("downvotes", "upvotes")
    };
    let had = entity[own].as_array().is_some_and(|a| a.iter().any(|u| u == user));
    for key in [own, other] {
        if let Some(list) = entity[key].as_array_mut() {
            list.retain(|u| u != user);
        }
    }
    if !had {
        if let Some(list) = entity[own].as_array_mut() {
            list.push(json!(user));
        }
    }
}

async fn fields(mut multipart: Multipart) -> HashMap<String, String> {
    let mut out = HashMap::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string).unwrap_or_default();
        let bytes = field.bytes().await.unwrap_or_default();
        let value = match file_name {
            Some(file_name) => format!("{file_name}|{content_type}|{}", bytes.len()),
            None => String::from_utf8_lossy(&bytes).into_owned(),
        };
        out.insert(name, value);
    }
    out
}

// ---------------------------------------------------------------------------
// users/*
// ---------------------------------------------------------------------------

async fn login(Json(body): Json<Value>) -> Response {
    let identifier = body["identifier"].as_str().unwrap_or_default();
    let known = identifier == "ada" || identifier == "ada@campus.edu";
    if known && body["password"] == PASSWORD {
        Json(json!({ "token": jwt_for(USER_ID) })).into_response()
    } else {
        reject(StatusCode::UNAUTHORIZED, "Invalid credentials")
    }
}

async fn register(Json(body): Json<Value>) -> Response {
    let response = json!({ "email": body["email"], "username": body["username"] });
    (StatusCode::CREATED, Json(response)).into_response()
}

async fn profile(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(r) = authorize(&headers) {
        return r;
    }
    let backend = state.lock().unwrap();
    Json(backend.users[USER_ID].clone()).into_response()
}

async fn update_profile(State(state): State<Shared>, headers: HeaderMap, multipart: Multipart) -> Response {
    if let Err(r) = authorize(&headers) {
        return r;
    }
    let fields = fields(multipart).await;
    let mut backend = state.lock().unwrap();
    if let Some(me) = backend.users.get_mut(USER_ID) {
        if let Some(name) = fields.get("name") {
            me["name"] = json!(name);
        }
        if let Some(bio) = fields.get("bio") {
            me["bio"] = json!(bio);
        }
    }
    backend.profile_updates.push(fields);
    StatusCode::OK.into_response()
}

async fn notifications(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(r) = authorize(&headers) {
        return r;
    }
    let backend = state.lock().unwrap();
    Json(json!({ "notifications": backend.notifications })).into_response()
}

async fn push_token(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(r) = authorize(&headers) {
        return r;
    }
    let token = body["fcmToken"].as_str().unwrap_or_default().to_string();
    state.lock().unwrap().push_tokens.push(token);
    StatusCode::OK.into_response()
}

async fn user_by_id(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(r) = authorize(&headers) {
        return r;
    }
    let id = body["id"].as_str().unwrap_or_default();
    if id == "broken" {
        return (StatusCode::OK, "{\"_id\": ").into_response();
    }
    let mut backend = state.lock().unwrap();
    backend.lookups.push(format!("user:{id}"));
    match backend.users.get(id) {
        Some(user) => Json(user.clone()).into_response(),
        None => reject(StatusCode::NOT_FOUND, "User not found"),
    }
}

// ---------------------------------------------------------------------------
// threads/*
// ---------------------------------------------------------------------------

async fn home_threads(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(r) = authorize(&headers) {
        return r;
    }
    let backend = state.lock().unwrap();
    Json(backend.threads.clone()).into_response()
}

async fn thread_by_id(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(r) = authorize(&headers) {
        return r;
    }
    let id = body["id"].as_str().unwrap_or_default();
    let mut backend = state.lock().unwrap();
    backend.lookups.push(format!("thread:{id}"));
    match backend.threads.iter().find(|t| t["_id"] == id) {
        Some(thread) => Json(json!({ "thread": thread })).into_response(),
        None => reject(StatusCode::NOT_FOUND, "Thread not found"),
    }
}

async fn threads_by_tag(State(state): State<Shared>, headers: HeaderMap, Path(tag): Path<String>) -> Response {
    if let Err(r) = authorize(&headers) {
        return r;
    }
    let backend = state.lock().unwrap();
    let threads: Vec<Value> = backend
        .threads
        .iter()
        .filter(|t| t["tags"].as_array().is_some_and(|tags| tags.iter().any(|x| x == tag.as_str())))
        .cloned()
        .collect();
    Json(json!({ "threads": threads })).into_response()
}

async fn threads_by_user(State(state): State<Shared>, headers: HeaderMap, Path(user_id): Path<String>) -> Response {
    if let Err(r) = authorize(&headers) {
        return r;
    }
    let backend = state.lock().unwrap();
    let threads: Vec<Value> = backend
        .threads
        .iter()
        .filter(|t| t["authorId"] == user_id.as_str())
        .cloned()
        .collect();
    Json(threads).into_response()
}

async fn create_thread(State(state): State<Shared>, headers: HeaderMap, multipart: Multipart) -> Response {
    if let Err(r) = authorize(&headers) {
        return r;
    }
    let fields = fields(multipart).await;
    let mut backend = state.lock().unwrap();
    let id = format!("t{}", backend.threads.len() + 1);
    let tags: Vec<&str> = fields
        .get("tags")
        .map(|t| t.split(',').collect())
        .unwrap_or_default();
    let mut created = thread(&id, USER_ID, &tags);
    created["title"] = json!(fields.get("title").cloned().unwrap_or_default());
    created["content"] = json!(fields.get("content").cloned().unwrap_or_default());
    backend.threads.insert(0, created);
    backend.created.push(fields);
    StatusCode::CREATED.into_response()
}

async fn add_comment(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(r) = authorize(&headers) {
        return r;
    }
    let mut backend = state.lock().unwrap();
    let thread_id = body["threadId"].as_str().unwrap_or_default().to_string();
    let Some(thread) = backend.threads.iter_mut().find(|t| t["_id"] == thread_id.as_str()) else {
        return reject(StatusCode::NOT_FOUND, "Thread not found");
    };
    let next = thread["comments"].as_array().map_or(0, Vec::len) + 1;
    let mut new_comment = comment(&format!("c{next}"), USER_ID);
    new_comment["content"] = body["content"].clone();
    if let Some(comments) = thread["comments"].as_array_mut() {
        comments.push(new_comment);
    }
    StatusCode::CREATED.into_response()
}

async fn vote_thread(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(direction): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(r) = authorize(&headers) {
        return r;
    }
    if direction != "upvote" && direction != "downvote" {
        return reject(StatusCode::NOT_FOUND, "Not found");
    }
    let thread_id = body["threadId"].as_str().unwrap_or_default().to_string();
    let mut backend = state.lock().unwrap();
    backend.vote_calls.push(format!("{direction}:{thread_id}"));
    if backend.fail_votes {
        return reject(StatusCode::INTERNAL_SERVER_ERROR, "Vote store unavailable");
    }
    match backend.threads.iter_mut().find(|t| t["_id"] == thread_id.as_str()) {
        Some(thread) => {
            toggle(thread, &direction, USER_ID);
            StatusCode::OK.into_response()
        }
        None => reject(StatusCode::NOT_FOUND, "Thread not found"),
    }
}

async fn vote_comment(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(direction): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(r) = authorize(&headers) {
        return r;
    }
    let thread_id = body["threadId"].as_str().unwrap_or_default().to_string();
    let comment_id = body["commentId"].as_str().unwrap_or_default().to_string();
    let mut backend = state.lock().unwrap();
    backend.vote_calls.push(format!("{direction}:{thread_id}/{comment_id}"));
    if backend.fail_votes {
        return reject(StatusCode::INTERNAL_SERVER_ERROR, "Vote store unavailable");
    }
    let comment = backend
        .threads
        .iter_mut()
        .find(|t| t["_id"] == thread_id.as_str())
        .and_then(|t| t["comments"].as_array_mut())
        .and_then(|cs| cs.iter_mut().find(|c| c["commentId"] == comment_id.as_str()));
    match comment {
        Some(comment) => {
            toggle(comment, &direction, USER_ID);
            StatusCode::OK.into_response()
        }
        None => reject(StatusCode::NOT_FOUND, "Comment not found"),
    }
}
