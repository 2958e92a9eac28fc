//! A small OMERO.web stand-in served over real HTTP.
//!
//! Saved containers are owned by the logged-in admin, list endpoints honour
//! `owner`/`group`/`limit`/`offset`, and every POST must carry the CSRF token.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use parking_lot::{Mutex, MutexGuard};
use serde_json::{json, Value};

use limsync_core::ConnectionConfig;

pub const CSRF: &str = "csrf-token";
pub const PASSWORD: &str = "secret";
pub const ADMIN_ID: i64 = 1;
pub const USER_ID: i64 = 2;
pub const GROUP_ID: i64 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub id: i64,
    pub name: String,
    pub owner: i64,
}

#[derive(Debug)]
pub struct FakeState {
    next_id: i64,
    pub projects: Vec<Container>,
    pub datasets: Vec<Container>,
    /// (project, dataset)
    pub project_links: Vec<(i64, i64)>,
    /// (dataset, image)
    pub image_links: Vec<(i64, i64)>,
    /// (image, client path)
    pub images: Vec<(i64, String)>,
    pub annotations: Vec<Vec<(String, String)>>,
    /// Largest page handed out, whatever `limit` asks for.
    pub page_cap: usize,
    pub omit_meta: bool,
    pub fail_links: bool,
    pub logged_out: bool,
    /// `METHOD /path?query` of every request, in arrival order.
    pub requests: Vec<String>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            next_id: 100,
            projects: Vec::new(),
            datasets: Vec::new(),
            project_links: Vec::new(),
            image_links: Vec::new(),
            images: Vec::new(),
            annotations: Vec::new(),
            page_cap: 200,
            omit_meta: false,
            fail_links: false,
            logged_out: false,
            requests: Vec::new(),
        }
    }
}

impl FakeState {
    fn next(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn requests_to(&self, path: &str) -> Vec<&String> {
        self.requests
            .iter()
            .filter(|r| r.split_whitespace().nth(1).is_some_and(|p| p.starts_with(path)))
            .collect()
    }
}

type Shared = Arc<Mutex<FakeState>>;

pub struct FakeOmero {
    state: Shared,
    pub url: String,
}

impl FakeOmero {
    pub fn start() -> Self {
        Self::with(|_| {})
    }

    pub fn with(setup: impl FnOnce(&mut FakeState)) -> Self {
        let mut state = FakeState::default();
        setup(&mut state);
        let state = Arc::new(Mutex::new(state));

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let app = router(state.clone());
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                axum::serve(listener, app).await.unwrap();
            });
        });

        Self { state, url }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock()
    }

    /// Settings pointing the client at this server as `root` for `jdoe`/`lab`.
    pub fn config(&self) -> ConnectionConfig {
        let mut config = ConnectionConfig::new("root", "jdoe", "lab");
        config.web_url = Some(self.url.clone());
        config.timeout_secs = 5;
        config
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/api/v0/token/", get(token))
        .route("/api/v0/servers/", get(servers))
        .route("/api/v0/login/", post(login))
        .route("/api/v0/m/experimentergroups/", get(groups))
        .route("/api/v0/m/experimenters/", get(experimenters))
        .route("/api/v0/m/images/", get(images))
        .route("/api/v0/m/projects/", get(projects))
        .route("/api/v0/m/projects/{pid}/datasets/", get(datasets))
        .route("/api/v0/m/save/", post(save))
        .route("/webgateway/original_file_paths/{id}/", get(original_file_paths))
        .route("/webclient/api/links/", post(links))
        .route("/webclient/annotate_map/", post(annotate_map))
        .route("/webclient/logout/", post(logout))
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state)
}

async fn record(State(state): State<Shared>, request: Request, next: Next) -> Response {
    state
        .lock()
        .requests
        .push(format!("{} {}", request.method(), request.uri()));
    next.run(request).await
}

// ---------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------

fn csrf_ok(headers: &HeaderMap) -> bool {
    headers.get("X-CSRFToken").and_then(|v| v.to_str().ok()) == Some(CSRF)
}

fn forbidden() -> Response {
    (StatusCode::FORBIDDEN, "CSRF verification failed").into_response()
}

fn visible(owner: i64, query: &HashMap<String, String>) -> bool {
    let group_ok = query.get("group").map_or(true, |g| *g == GROUP_ID.to_string());
    let owner_ok = query.get("owner").map_or(true, |o| *o == owner.to_string());
    group_ok && owner_ok
}

fn page(state: &FakeState, items: Vec<Value>, query: &HashMap<String, String>) -> Json<Value> {
    let offset: usize = query.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
    let limit: usize = query
        .get("limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(200)
        .min(state.page_cap);
    let total = items.len();
    let data: Vec<Value> = items.into_iter().skip(offset).take(limit).collect();
    if state.omit_meta {
        Json(json!({ "data": data }))
    } else {
        Json(json!({
            "data": data,
            "meta": { "totalCount": total, "offset": offset, "limit": limit }
        }))
    }
}

fn named(containers: &[&Container]) -> Vec<Value> {
    containers
        .iter()
        .map(|c| json!({ "@id": c.id, "Name": c.name }))
        .collect()
}

// ---------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------

async fn token() -> Json<Value> {
    Json(json!({ "data": CSRF }))
}

async fn servers() -> Json<Value> {
    Json(json!({
        "data": [{ "id": 1, "host": "localhost", "port": 4064, "server": "omero" }]
    }))
}

async fn login(headers: HeaderMap, Form(form): Form<HashMap<String, String>>) -> Response {
    if !csrf_ok(&headers) {
        return forbidden();
    }
    if form.get("username").map(String::as_str) != Some("root")
        || form.get("password").map(String::as_str) != Some(PASSWORD)
    {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "message": "Connection not available, please check your user name and password." })),
        )
            .into_response();
    }
    (
        [(header::SET_COOKIE, "sessionid=abc; Path=/")],
        Json(json!({ "success": true, "eventContext": { "userId": ADMIN_ID } })),
    )
        .into_response()
}

async fn groups(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let items = vec![
        json!({ "@id": 3, "Name": "system" }),
        json!({ "@id": GROUP_ID, "Name": "lab" }),
    ];
    page(&state.lock(), items, &query)
}

async fn experimenters(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let items = vec![
        json!({ "@id": ADMIN_ID, "omeName": "root" }),
        json!({ "@id": USER_ID, "omeName": "jdoe" }),
    ];
    page(&state.lock(), items, &query)
}

async fn images(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let state = state.lock();
    let items = state
        .images
        .iter()
        .filter(|(id, _)| !state.image_links.iter().any(|(_, i)| i == id))
        .filter(|_| visible(USER_ID, &query))
        .map(|(id, path)| json!({ "@id": id, "Name": path }))
        .collect();
    page(&state, items, &query)
}

async fn projects(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let state = state.lock();
    let matching: Vec<&Container> = state
        .projects
        .iter()
        .filter(|c| visible(c.owner, &query))
        .collect();
    page(&state, named(&matching), &query)
}

async fn datasets(
    State(state): State<Shared>,
    Path(pid): Path<i64>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let state = state.lock();
    let matching: Vec<&Container> = state
        .datasets
        .iter()
        .filter(|c| state.project_links.contains(&(pid, c.id)))
        .filter(|c| visible(c.owner, &query))
        .collect();
    page(&state, named(&matching), &query)
}

async fn save(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !csrf_ok(&headers) {
        return forbidden();
    }
    let object_type = body["@type"].as_str().unwrap_or_default().to_string();
    let name = body["Name"].as_str().unwrap_or_default().to_string();

    let mut state = state.lock();
    let id = state.next();
    let container = Container {
        id,
        name: name.clone(),
        owner: ADMIN_ID,
    };
    if object_type.ends_with("#Project") {
        state.projects.push(container);
    } else if object_type.ends_with("#Dataset") {
        state.datasets.push(container);
    } else {
        return (StatusCode::BAD_REQUEST, "unknown @type").into_response();
    }
    Json(json!({ "data": { "@id": id, "@type": object_type, "Name": name } })).into_response()
}

async fn original_file_paths(State(state): State<Shared>, Path(id): Path<i64>) -> Response {
    let state = state.lock();
    match state.images.iter().find(|(i, _)| *i == id) {
        Some((_, path)) => {
            let name = path.rsplit('/').next().unwrap_or(path);
            Json(json!({
                "repo": [format!("jdoe_2/2024-01/15/{}", name)],
                "client": [path]
            }))
            .into_response()
        }
        None => (StatusCode::NOT_FOUND, "no such image").into_response(),
    }
}

async fn links(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !csrf_ok(&headers) {
        return forbidden();
    }
    let mut state = state.lock();
    if state.fail_links {
        return (StatusCode::INTERNAL_SERVER_ERROR, "link failed").into_response();
    }

    let Some(by_type) = body.as_object() else {
        return (StatusCode::BAD_REQUEST, "expected an object").into_response();
    };
    for (parent_type, parents) in by_type {
        for (parent, children) in parents.as_object().into_iter().flatten() {
            let parent: i64 = parent.parse().unwrap_or_default();
            for (_, ids) in children.as_object().into_iter().flatten() {
                for child in ids.as_array().into_iter().flatten() {
                    let child = child.as_i64().unwrap_or_default();
                    match parent_type.as_str() {
                        "project" => state.project_links.push((parent, child)),
                        "dataset" => state.image_links.push((parent, child)),
                        _ => {}
                    }
                }
            }
        }
    }
    Json(json!({ "success": true })).into_response()
}

async fn annotate_map(
    State(state): State<Shared>,
    headers: HeaderMap,
    Form(form): Form<Vec<(String, String)>>,
) -> Response {
    if !csrf_ok(&headers) {
        return forbidden();
    }
    let mut state = state.lock();
    let id = state.next();
    state.annotations.push(form);
    Json(json!({ "annId": id })).into_response()
}

async fn logout(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !csrf_ok(&headers) {
        return forbidden();
    }
    state.lock().logged_out = true;
    StatusCode::OK.into_response()
}
