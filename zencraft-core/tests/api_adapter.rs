//! REST adapter against an in-process backend
//!
//! The mock backend keeps items in memory and answers the item routes with
//! `{success, data}` envelopes, the way the real backend does.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{body::Incoming, Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use uuid::Uuid;
use zencraft_core::filter::DbFilterHandler;
use zencraft_core::storage::{ApiHandler, ApiHandlerDbInterface, AppDataSource, SelectMultipleOpts};
use zencraft_core::store::{GenericItemStore, SaveOutcome, StoreOptions};
use zencraft_core::{DbFilter, DbPagination, Error, FilterOperator, ItemDatabase};

const TOKEN: &str = "test-token";

#[derive(Default)]
struct Backend {
    items: Mutex<BTreeMap<Uuid, Value>>,
    requests: Mutex<Vec<String>>,
}

fn reply(status: StatusCode, body: Value) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
    *response.status_mut() = status;
    response
}

fn ok(data: Value) -> Response<Full<Bytes>> {
    reply(StatusCode::OK, json!({ "success": true, "data": data }))
}

async fn handle(req: Request<Incoming>, backend: Arc<Backend>) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().trim_start_matches('/').to_string();
    backend.requests.lock().unwrap().push(format!("{} {}", method, path));

    let authorized = req
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .is_some_and(|h| h == format!("Bearer {}", TOKEN));
    if !authorized {
        return Ok(reply(StatusCode::FORBIDDEN, json!({ "success": false, "error": "Forbidden", "data": null })));
    }

    let body = req.into_body().collect().await?.to_bytes();
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let segments: Vec<&str> = path.split('/').collect();

    let response = match (&method, segments.as_slice()) {
        (&Method::POST, ["items", "addItem"]) | (&Method::POST, ["items", "updateItem"]) => {
            let id: Uuid = body["itemId"].as_str().unwrap().parse().unwrap();
            let mut items = backend.items.lock().unwrap();
            let mut record = items.get(&id).cloned().unwrap_or_else(|| json!({}));
            for (k, v) in body["data"].as_object().unwrap() {
                record[k] = v.clone();
            }
            record["id"] = json!(id.to_string());
            record["typeId"] = body["typeId"].clone();
            items.insert(id, record.clone());
            ok(record)
        }
        (&Method::POST, ["items", "searchItems"]) => {
            let filters: Vec<DbFilter> = serde_json::from_value(body["filters"].clone()).unwrap_or_default();
            let item_type = body["itemType"].as_str().unwrap_or_default().to_string();
            let results: Vec<Value> = backend
                .items
                .lock()
                .unwrap()
                .values()
                .filter(|r| r["typeId"] == item_type.as_str())
                .filter(|r| DbFilterHandler::traverse_filters(&filters, r))
                .cloned()
                .collect();
            let total = results.len();
            ok(json!({ "results": results, "totalItems": total, "hasMore": false, "pagination": body["pagination"] }))
        }
        (&Method::POST, ["items", "removeItem", _, id]) => {
            let id: Uuid = id.parse().unwrap();
            backend.items.lock().unwrap().remove(&id);
            ok(Value::Null)
        }
        (&Method::GET, ["session", "current"]) => ok(json!({ "sessionId": "session-1", "userId": "admin" })),
        (&Method::GET, ["items", _, id]) => {
            let id: Uuid = id.parse().unwrap();
            match backend.items.lock().unwrap().get(&id) {
                Some(record) => ok(record.clone()),
                None => reply(StatusCode::NOT_FOUND, json!({ "success": false, "error": "Not found", "data": null })),
            }
        }
        _ => reply(StatusCode::NOT_FOUND, json!({ "success": false, "error": "No route", "data": null })),
    };
    Ok(response)
}

async fn spawn_backend() -> (SocketAddr, Arc<Backend>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let backend = Arc::new(Backend::default());
    let shared = backend.clone();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let io = TokioIo::new(stream);
            let backend = shared.clone();
            tokio::spawn(async move {
                let service = service_fn(move |req| handle(req, backend.clone()));
                let _ = http1::Builder::new().serve_connection(io, service).await;
            });
        }
    });

    (addr, backend)
}

fn api(addr: SocketAddr, token: Option<&str>) -> ApiHandler {
    let api = ApiHandler::new(format!("http://{}/", addr)).unwrap();
    match token {
        Some(token) => api.with_jwt(token),
        None => api,
    }
}

fn db(addr: SocketAddr, token: Option<&str>) -> Arc<ApiHandlerDbInterface> {
    Arc::new(ApiHandlerDbInterface::new(Arc::new(api(addr, token))))
}

fn data(value: Value) -> Map<String, Value> {
    value.as_object().unwrap().clone()
}

#[tokio::test]
async fn test_crud_round_trip() {
    let (addr, backend) = spawn_backend().await;
    let db = db(addr, Some(TOKEN));
    assert_eq!(db.source(), AppDataSource::Api);

    let id = Uuid::new_v4();
    db.insert(id, "Page", data(json!({ "title": "Home" }))).await.unwrap();
    db.update(id, "Page", data(json!({ "slug": "home" })), true).await.unwrap();

    let page = db.select(id, "Page").await.unwrap().unwrap();
    assert_eq!(page.id, id);
    assert_eq!(page.type_id, "Page");
    assert_eq!(page.fields["title"], "Home");
    assert_eq!(page.fields["slug"], "home");

    db.remove(id, "Page").await.unwrap();
    assert!(db.select(id, "Page").await.unwrap().is_none());

    let requests = backend.requests.lock().unwrap().clone();
    assert_eq!(requests[0], "POST items/addItem");
    assert_eq!(requests[1], "POST items/updateItem");
    assert_eq!(requests[2], format!("GET items/Page/{}", id));
    assert_eq!(requests[3], format!("POST items/removeItem/Page/{}", id));
}

#[tokio::test]
async fn test_search_with_filters() {
    let (addr, _backend) = spawn_backend().await;
    let db = db(addr, Some(TOKEN));

    for (title, status) in [("Home", "live"), ("About", "draft"), ("Blog", "live")] {
        db.insert(Uuid::new_v4(), "Page", data(json!({ "title": title, "status": status })))
            .await
            .unwrap();
    }
    db.insert(Uuid::new_v4(), "Hub", data(json!({ "title": "Docs", "status": "live" })))
        .await
        .unwrap();

    let opts = SelectMultipleOpts::new("Page")
        .with_filters(vec![DbFilter::single("status", FilterOperator::IsEqual, "live")])
        .with_pagination(DbPagination::page(1, 10));
    let response = db.select_multiple(opts).await.unwrap();

    assert_eq!(response.total_items, 2);
    assert!(!response.has_more);
    assert!(response.results.iter().all(|item| item.type_id == "Page"));
}

#[tokio::test]
async fn test_missing_token_is_refused_locally() {
    let (addr, backend) = spawn_backend().await;
    let db = db(addr, None);

    let err = db.insert(Uuid::new_v4(), "Page", Map::new()).await.unwrap_err();
    assert!(matches!(err, Error::Api { status: 403, .. }));
    assert!(backend.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_rejected_token_surfaces_api_error() {
    let (addr, _backend) = spawn_backend().await;
    let db = db(addr, Some("stale"));

    match db.select(Uuid::new_v4(), "Page").await {
        Err(Error::Api { status, .. }) => assert_eq!(status, 403),
        other => panic!("expected an API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_store_over_api() {
    let (addr, _backend) = spawn_backend().await;
    let db = db(addr, Some(TOKEN));
    let pages = GenericItemStore::new(db.clone(), StoreOptions::new("Page"));

    let id = Uuid::new_v4();
    let outcome = pages.save_item(id, Some(&data(json!({ "title": "Home" }))), true).await.unwrap();
    assert!(matches!(outcome, SaveOutcome::Saved(_)));

    let fresh = GenericItemStore::new(db, StoreOptions::new("Page"));
    assert_eq!(fresh.load_all_items().await, 1);
    assert_eq!(fresh.get_item(id).unwrap().fields["title"], "Home");
}

#[tokio::test]
async fn test_session_check() {
    let (addr, backend) = spawn_backend().await;

    assert!(api(addr, Some(TOKEN)).is_session_valid().await);
    assert!(!api(addr, Some("stale")).is_session_valid().await);
    let requests = backend.requests.lock().unwrap().clone();
    assert_eq!(requests, vec!["GET session/current".to_string(); 2]);

    assert!(!api(addr, None).is_session_valid().await);
    assert_eq!(backend.requests.lock().unwrap().len(), 2);
}
