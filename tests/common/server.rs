//! In-process stand-in for the hiddb index service.
//!
//! Implements the `/index` routes with immediate consistency and records
//! every request it receives so tests can inspect the wire shape.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use hiddb_client::types::{CreateIndexRequest, InsertVectorRequest, SearchRequest};

/// A request as the stub saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub content_type: Option<String>,
    pub body: String,
}

struct StoredIndex {
    k: usize,
    dimension: usize,
    vectors: Vec<(u64, Vec<f64>)>,
}

#[derive(Default)]
struct Inner {
    indices: BTreeMap<u64, StoredIndex>,
    requests: Vec<Recorded>,
}

#[derive(Clone, Default)]
pub struct StubService {
    inner: Arc<Mutex<Inner>>,
}

type Reply = (StatusCode, Json<Value>);

impl StubService {
    pub fn requests(&self) -> Vec<Recorded> {
        self.inner.lock().unwrap().requests.clone()
    }

    pub fn index_count(&self) -> usize {
        self.inner.lock().unwrap().indices.len()
    }

    pub fn vector_count(&self, id: u64) -> Option<usize> {
        self.inner
            .lock()
            .unwrap()
            .indices
            .get(&id)
            .map(|i| i.vectors.len())
    }

    fn record(&self, method: Method, path: String, headers: &HeaderMap, body: String) {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.inner.lock().unwrap().requests.push(Recorded {
            method,
            path,
            content_type,
            body,
        });
    }
}

fn info(id: u64, index: &StoredIndex) -> Value {
    json!({
        "id": id,
        "k": index.k,
        "dimension": index.dimension,
        "n_vectors": index.vectors.len(),
    })
}

fn error(status: StatusCode, message: String) -> Reply {
    (status, Json(json!({ "message": message })))
}

fn not_found(id: u64) -> Reply {
    error(StatusCode::NOT_FOUND, format!("index {id} does not exist"))
}

async fn health() -> Reply {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

async fn create_index(State(stub): State<StubService>, headers: HeaderMap, body: String) -> Reply {
    stub.record(Method::POST, "/index".into(), &headers, body.clone());
    let req: CreateIndexRequest = match serde_json::from_str(&body) {
        Ok(req) => req,
        Err(e) => return error(StatusCode::BAD_REQUEST, e.to_string()),
    };
    let mut inner = stub.inner.lock().unwrap();
    if inner.indices.contains_key(&req.id) {
        return error(
            StatusCode::BAD_REQUEST,
            format!("index {} already exists", req.id),
        );
    }
    let index = StoredIndex {
        k: req.k,
        dimension: req.dimension,
        vectors: Vec::new(),
    };
    let body = info(req.id, &index);
    inner.indices.insert(req.id, index);
    (StatusCode::OK, Json(body))
}

async fn list_indices(State(stub): State<StubService>, headers: HeaderMap) -> Reply {
    stub.record(Method::GET, "/index".into(), &headers, String::new());
    let inner = stub.inner.lock().unwrap();
    let indices: Vec<Value> = inner.indices.iter().map(|(id, i)| info(*id, i)).collect();
    (StatusCode::OK, Json(json!({ "indices": indices })))
}

async fn get_index(
    State(stub): State<StubService>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> Reply {
    stub.record(Method::GET, format!("/index/{id}"), &headers, String::new());
    let inner = stub.inner.lock().unwrap();
    match inner.indices.get(&id) {
        Some(index) => (StatusCode::OK, Json(info(id, index))),
        None => not_found(id),
    }
}

async fn delete_index(
    State(stub): State<StubService>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> Reply {
    stub.record(Method::DELETE, format!("/index/{id}"), &headers, String::new());
    let mut inner = stub.inner.lock().unwrap();
    match inner.indices.remove(&id) {
        Some(index) => (StatusCode::OK, Json(info(id, &index))),
        None => not_found(id),
    }
}

async fn insert_vector(
    State(stub): State<StubService>,
    Path(id): Path<u64>,
    headers: HeaderMap,
    body: String,
) -> Reply {
    stub.record(Method::POST, format!("/index/{id}/insert"), &headers, body.clone());
    let req: InsertVectorRequest = match serde_json::from_str(&body) {
        Ok(req) => req,
        Err(e) => return error(StatusCode::BAD_REQUEST, e.to_string()),
    };
    let mut inner = stub.inner.lock().unwrap();
    let Some(index) = inner.indices.get_mut(&id) else {
        return not_found(id);
    };
    if req.vector.len() != index.dimension {
        return error(
            StatusCode::BAD_REQUEST,
            format!(
                "vector has dimension {} but index has dimension {}",
                req.vector.len(),
                index.dimension
            ),
        );
    }
    index.vectors.push((req.id_user, req.vector));
    (StatusCode::OK, Json(json!({ "inserted": req.id_user })))
}

async fn search(
    State(stub): State<StubService>,
    Path(id): Path<u64>,
    headers: HeaderMap,
    body: String,
) -> Reply {
    stub.record(Method::POST, format!("/index/{id}/search"), &headers, body.clone());
    let req: SearchRequest = match serde_json::from_str(&body) {
        Ok(req) => req,
        Err(e) => return error(StatusCode::BAD_REQUEST, e.to_string()),
    };
    let inner = stub.inner.lock().unwrap();
    let Some(index) = inner.indices.get(&id) else {
        return not_found(id);
    };
    if req.vector.len() != index.dimension {
        return error(StatusCode::BAD_REQUEST, "dimension mismatch".into());
    }
    let mut scored: Vec<(u64, f64)> = index
        .vectors
        .iter()
        .map(|(user, v)| {
            let d: f64 = v
                .iter()
                .zip(&req.vector)
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            (*user, d.sqrt())
        })
        .collect();
    scored.sort_by(|a, b| a.1.total_cmp(&b.1));
    scored.truncate(index.k);
    let data: Vec<Value> = scored
        .into_iter()
        .map(|(user, d)| json!([user.to_string(), d.to_string()]))
        .collect();
    (StatusCode::OK, Json(json!({ "data": data })))
}

pub fn build_router(stub: StubService) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/index", post(create_index).get(list_indices))
        .route("/index/:id", get(get_index).delete(delete_index))
        .route("/index/:id/insert", post(insert_vector))
        .route("/index/:id/search", post(search))
        .with_state(stub)
}

/// Start the stub on a random port, returning (base_url, handle).
pub async fn start_stub_server() -> (String, StubService) {
    let stub = StubService::default();
    let app = build_router(stub.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{addr}");

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (base_url, stub)
}

/// A base URL on which nothing is listening.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
