use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path as FsPath;
use std::sync::{Arc, Mutex};

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat, Utc};
use tempfile::TempDir;
use serde_json::{Value, json};

use shiftreport_client::notice::NoticeBoard;
use shiftreport_client::offline_queue::QUEUE_KEY;
use shiftreport_client::submission::{MSG_REJECTED, MSG_UNREACHABLE};
use shiftreport_client::{
    ApiError, DeleteOutcome, FileStore, HttpReportsApi, KeyValueStore, OfflineQueue,
    ReportsApi, ReviewFlow, SubmissionFlow, SubmissionOutcome,
};
use shiftreport_core::{Report, ReportForm, ReportId};

/// What the emulated service holds.
#[derive(Default)]
struct ServiceState {
    reports: Vec<Value>,
    next_id: u64,
    down: bool,
}

type Shared = Arc<Mutex<ServiceState>>;

fn insert(state: &mut ServiceState, mut body: Value, created_at: DateTime<Utc>) -> Value {
    state.next_id += 1;
    body["_id"] = json!(format!("{:024x}", state.next_id));
    body["createdAt"] = json!(created_at.to_rfc3339_opts(SecondsFormat::Millis, true));
    state.reports.push(body.clone());
    body
}

fn unavailable() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "message": "Servicio no disponible" })),
    )
        .into_response()
}

async fn list(State(state): State<Shared>, Query(q): Query<HashMap<String, String>>) -> Response {
    let state = state.lock().unwrap();
    if state.down {
        return unavailable();
    }
    let reports: Vec<Value> = match q.get("fecha") {
        Some(fecha) => state
            .reports
            .iter()
            .filter(|r| r["createdAt"].as_str().is_some_and(|ts| ts.starts_with(fecha.as_str())))
            .cloned()
            .collect(),
        None => state.reports.clone(),
    };
    Json(reports).into_response()
}

async fn create(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    if state.down {
        return unavailable();
    }
    match body["nombreApellido"].as_str() {
        Some("rechazar") => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "nombre inválido" })),
        )
            .into_response(),
        Some("texto") => {
            insert(&mut state, body, Utc::now());
            (StatusCode::CREATED, "guardado").into_response()
        }
        _ => (StatusCode::CREATED, Json(insert(&mut state, body, Utc::now()))).into_response(),
    }
}

async fn remove(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let mut state = state.lock().unwrap();
    if state.down {
        return unavailable();
    }
    let before = state.reports.len();
    state.reports.retain(|r| r["_id"] != id.as_str());
    if state.reports.len() == before {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Registro no encontrado" })),
        )
            .into_response();
    }
    Json(json!({ "message": "Registro eliminado" })).into_response()
}

struct TestServer {
    addr: SocketAddr,
    state: Shared,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        Self::serve(listener)
    }

    /// Serve on `addr`, typically one a client already failed to reach.
    async fn spawn_at(addr: SocketAddr) -> Self {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .expect("failed to rebind port");
        Self::serve(listener)
    }

    fn serve(listener: tokio::net::TcpListener) -> Self {
        let addr = listener.local_addr().unwrap();
        let state = Shared::default();
        let app = Router::new()
            .route("/drivers", get(list).post(create))
            .route("/drivers/:id", delete(remove))
            .with_state(state.clone());

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    fn endpoint(&self) -> String {
        drivers_endpoint(self.addr)
    }

    fn seed(&self, name: &str, created_at: &str) {
        let created_at = DateTime::parse_from_rfc3339(created_at)
            .unwrap()
            .with_timezone(&Utc);
        let body = serde_json::to_value(Report::new(name, "AB123CD", "Norte", 10, 9, 4)).unwrap();
        insert(&mut self.state.lock().unwrap(), body, created_at);
    }

    fn set_down(&self, down: bool) {
        self.state.lock().unwrap().down = down;
    }

    fn stored_bodies(&self) -> Vec<Value> {
        self.state.lock().unwrap().reports.clone()
    }

    fn stored_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .reports
            .iter()
            .map(|r| r["nombreApellido"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn drivers_endpoint(addr: SocketAddr) -> String {
    format!("http://{addr}/drivers")
}

/// An address nothing is listening on.
async fn vacant_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

fn form(name: &str) -> ReportForm {
    ReportForm {
        driver_name: name.into(),
        vehicle_plate: "AB123CD".into(),
        route: "Norte".into(),
        package_count: "120".into(),
        packages_received: "118".into(),
        stop_count: "35".into(),
        notes: "portón, \"B\"".into(),
        ..ReportForm::default()
    }
}

fn submission(endpoint: String, dir: &FsPath) -> SubmissionFlow {
    let api: Arc<dyn ReportsApi> = Arc::new(HttpReportsApi::with_endpoint(endpoint));
    let queue = OfflineQueue::new(Arc::new(FileStore::new(dir)));
    SubmissionFlow::new(api, queue, NoticeBoard::default())
}

fn review(server: &TestServer) -> ReviewFlow {
    let api: Arc<dyn ReportsApi> = Arc::new(HttpReportsApi::with_endpoint(server.endpoint()));
    ReviewFlow::new(api, FixedOffset::east_opt(0).unwrap(), NoticeBoard::default())
}

#[tokio::test]
async fn report_submitted_offline_is_sent_on_next_load() {
    let dir = TempDir::new().unwrap();
    let addr = vacant_addr().await;

    let mut flow = submission(drivers_endpoint(addr), dir.path());
    let mut input = form("Ana Pérez");
    let outcome = flow.submit(&mut input).await;
    match &outcome {
        SubmissionOutcome::QueuedOffline { error, .. } => assert!(error.is_network()),
        other => panic!("expected queued outcome, got {other:?}"),
    }
    assert_eq!(
        flow.notices().current().unwrap().text,
        MSG_UNREACHABLE
    );
    assert_eq!(input.driver_name, "Ana Pérez");

    let expected = form("Ana Pérez").validate().unwrap();
    let raw = FileStore::new(dir.path()).get(QUEUE_KEY).unwrap().unwrap();
    let persisted: Vec<Value> = serde_json::from_str(&raw).unwrap();
    assert_eq!(persisted.len(), 1);
    let entry = &persisted[0];
    let timestamp = entry["timestamp"].as_str().expect("queued entry has a timestamp");
    assert!(DateTime::parse_from_rfc3339(timestamp).is_ok(), "bad timestamp {timestamp}");
    assert!(entry["localId"].as_str().is_some_and(|id| !id.is_empty()));
    assert_eq!(serde_json::from_value::<Report>(entry.clone()).unwrap(), expected);

    // Service comes up; a fresh flow plays the role of the next page load.
    let server = TestServer::spawn_at(addr).await;
    let mut reloaded = submission(server.endpoint(), dir.path());
    assert_eq!(reloaded.pending().len(), 1);

    let summary = reloaded.on_load().await;
    assert_eq!(summary.sent, 1);
    assert_eq!(summary.remaining, 0);
    assert!(reloaded.pending().is_empty());
    let bodies = server.stored_bodies();
    assert_eq!(bodies.len(), 1);
    let recorded: Report = serde_json::from_value(bodies[0].clone()).unwrap();
    assert_eq!(recorded, expected);
    assert_eq!(recorded.notes.as_deref(), Some("portón, \"B\""));
    assert_eq!(recorded.stop_count, 35);
}

#[tokio::test]
async fn confirmed_submission_round_trips_through_the_service() {
    let dir = TempDir::new().unwrap();
    let server = TestServer::spawn().await;
    let mut flow = submission(server.endpoint(), dir.path());

    let mut input = form("Luis");
    let stored = match flow.submit(&mut input).await {
        SubmissionOutcome::Confirmed { stored, .. } => stored.expect("service echoes the report"),
        other => panic!("expected confirmation, got {other:?}"),
    };
    assert_eq!(stored.report.notes.as_deref(), Some("portón, \"B\""));
    assert!(stored.created_at.is_some());
    assert!(input.is_blank());
    assert!(flow.pending().is_empty());
}

#[tokio::test]
async fn rejected_submission_stays_queued_with_server_message() {
    let dir = TempDir::new().unwrap();
    let server = TestServer::spawn().await;
    let mut flow = submission(server.endpoint(), dir.path());

    match flow.submit(&mut form("rechazar")).await {
        SubmissionOutcome::QueuedOffline { error, .. } => assert_eq!(
            error,
            ApiError::Api {
                status: 400,
                message: "nombre inválido".into()
            }
        ),
        other => panic!("expected queued outcome, got {other:?}"),
    }
    assert_eq!(flow.notices().current().unwrap().text, MSG_REJECTED);
    assert!(!flow.connectivity().is_offline());
    assert_eq!(flow.pending().len(), 1);
}

#[tokio::test]
async fn unreadable_success_reply_still_counts_as_sent() {
    let server = TestServer::spawn().await;
    let api = HttpReportsApi::with_endpoint(server.endpoint());

    let reply = api
        .create(&Report::new("texto", "AB1", "Sur", 1, 1, 1))
        .await
        .unwrap();
    assert_eq!(reply, None);
    assert_eq!(server.stored_names(), vec!["texto"]);
}

#[tokio::test]
async fn delete_shrinks_listing_and_second_delete_is_not_found() {
    let server = TestServer::spawn().await;
    for (i, name) in ["a", "b", "c", "d", "e"].iter().enumerate() {
        server.seed(name, &format!("2025-03-1{i}T12:00:00Z"));
    }

    let mut flow = review(&server);
    assert_eq!(flow.load_all().await.unwrap().len(), 5);
    let id = flow.displayed()[2].id.clone();

    let outcome = flow.delete(&id, |_| true).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::Deleted);
    assert_eq!(flow.displayed_count(), 4);
    assert_eq!(flow.total(), 4);

    let err = flow.delete(&id, |_| true).await.unwrap_err();
    assert_eq!(
        err.api_error(),
        &ApiError::NotFound("Registro no encontrado".into())
    );
    assert_eq!(flow.displayed_count(), 4);
    assert_eq!(server.stored_names(), vec!["a", "b", "d", "e"]);
}

#[tokio::test]
async fn day_filter_goes_through_the_query_string() {
    let server = TestServer::spawn().await;
    server.seed("ayer", "2025-03-09T23:59:59.999Z");
    server.seed("hoy-1", "2025-03-10T00:00:00.000Z");
    server.seed("hoy-2", "2025-03-10T23:59:59.999Z");
    server.seed("mañana", "2025-03-11T00:00:00.000Z");

    let api = HttpReportsApi::with_endpoint(server.endpoint());
    let day = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
    assert_eq!(api.list(Some(day)).await.unwrap().len(), 2);

    let mut flow = review(&server);
    flow.filter_by_date(day).await.unwrap();
    let names: Vec<_> = flow
        .displayed()
        .iter()
        .map(|r| r.report.driver_name.clone())
        .collect();
    assert_eq!(names, vec!["hoy-1", "hoy-2"]);
}

#[tokio::test]
async fn service_errors_carry_the_server_message() {
    let server = TestServer::spawn().await;
    server.set_down(true);
    let api = HttpReportsApi::with_endpoint(server.endpoint());

    assert_eq!(
        api.list(None).await.unwrap_err(),
        ApiError::Api {
            status: 503,
            message: "Servicio no disponible".into()
        }
    );

    let id: ReportId = "000000000000000000000001".parse().unwrap();
    let err = api.delete(&id).await.unwrap_err();
    assert_eq!(err.user_message(), "Servicio no disponible");

    server.set_down(false);
    assert!(api.list(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn unreachable_service_is_a_network_error() {
    let api = HttpReportsApi::with_endpoint(drivers_endpoint(vacant_addr().await));
    let err = api.list(None).await.unwrap_err();
    assert!(err.is_network(), "got {err:?}");
    assert_eq!(err.user_message(), "Error al conectar con el servidor");
}
