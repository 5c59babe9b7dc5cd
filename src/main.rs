use {
    axum::{
        Router,
        extract::{Path, Query, Request, State},
        http::StatusCode,
        middleware::{self, Next},
        response::Response,
        routing::get,
    },
    egress_audit::{
        AuditConfig, AuditableResponse, AuthenticatedActor, EgressAuditor, Entity, EntityJson,
        Page,
    },
    serde::{Deserialize, Serialize},
    std::{env, net::SocketAddr, sync::Arc, time::Duration},
    tokio::signal,
    tower_http::timeout::TimeoutLayer,
};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Serialize)]
struct Patient {
    id: u64,
    name: String,
}

impl Entity for Patient {
    const ENTITY_TYPE: &'static str = "Patient";

    fn primary_key(&self) -> Option<String> {
        Some(self.id.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
struct Order {
    id: u64,
    patient_id: u64,
    total_cents: i64,
}

impl Entity for Order {
    const ENTITY_TYPE: &'static str = "Order";

    fn primary_key(&self) -> Option<String> {
        Some(self.id.to_string())
    }
}

#[derive(Clone)]
struct AppState {
    patients: Arc<[Patient]>,
    orders: Arc<[Order]>,
}

#[derive(Debug, Deserialize)]
struct PageParams {
    page: Option<u32>,
    per_page: Option<u32>,
}

#[derive(Serialize)]
struct PatientSummary {
    name: String,
    order_count: usize,
    lifetime_cents: i64,
}

#[tokio::main]
async fn main() {
    egress_audit::telemetry::init().expect("failed to install log subscriber");

    dotenvy::dotenv().ok();
    let config = AuditConfig::from_env().expect("invalid egress audit configuration");
    let auditor = EgressAuditor::from_config(&config).expect("failed to build audit sink");
    tracing::info!(
        service = %config.service_name,
        log_type = %config.log_type,
        dispatch = %config.dispatch,
        "egress audit configured"
    );

    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    let state = AppState {
        patients: seed_patients().into(),
        orders: seed_orders().into(),
    };

    let api = Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/patients", get(list_patients))
        .route("/patients/{id}", get(get_patient))
        .route("/patients/{id}/summary", get(patient_summary))
        .route("/orders", get(list_orders))
        .with_state(state);

    // Request timeout inside the audit middleware: the audited status is the
    // one the client gets. The actor must be resolved before the audit
    // middleware captures request metadata.
    let app = auditor
        .wrap(api.layer(TimeoutLayer::new(Duration::from_secs(10))))
        .layer(middleware::from_fn(demo_auth));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await.unwrap();
    tracing::info!("listening on {bind_addr}");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .unwrap();

    auditor.shutdown(SHUTDOWN_GRACE).await;
}

/// Stand-in for a real authentication layer: trusts `X-Demo-User`.
async fn demo_auth(mut request: Request, next: Next) -> Response {
    let user = request
        .headers()
        .get("x-demo-user")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    if let Some(user) = user {
        request.extensions_mut().insert(AuthenticatedActor(user));
    }
    next.run(request).await
}

async fn list_patients(State(state): State<AppState>) -> EntityJson<Vec<Patient>> {
    EntityJson(state.patients.to_vec())
}

async fn get_patient(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<EntityJson<Patient>, StatusCode> {
    state
        .patients
        .iter()
        .find(|p| p.id == id)
        .cloned()
        .map(EntityJson)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn list_orders(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Page<Order> {
    Page::paginate(
        &state.orders,
        params.page.unwrap_or(1),
        params.per_page.unwrap_or(20),
    )
}

async fn patient_summary(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<AuditableResponse<PatientSummary>, StatusCode> {
    let patient = state
        .patients
        .iter()
        .find(|p| p.id == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    let orders: Vec<Order> = state
        .orders
        .iter()
        .filter(|o| o.patient_id == id)
        .cloned()
        .collect();

    let summary = PatientSummary {
        name: patient.name.clone(),
        order_count: orders.len(),
        lifetime_cents: orders.iter().map(|o| o.total_cents).sum(),
    };

    Ok(AuditableResponse::new(summary)
        .with_source(patient)
        .with_source(&orders))
}

fn seed_patients() -> Vec<Patient> {
    ["Ada", "Grace", "Linus"]
        .into_iter()
        .zip(41..)
        .map(|(name, id)| Patient {
            id,
            name: name.to_string(),
        })
        .collect()
}

fn seed_orders() -> Vec<Order> {
    (1..=50)
        .map(|id| Order {
            id,
            patient_id: 41 + id % 3,
            total_cents: (id as i64) * 1250,
        })
        .collect()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl+c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
